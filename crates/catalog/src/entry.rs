//! Defines the descriptor schema shared by on-disk effect list files and the
//! engine, giving `library` predictable metadata to concatenate while letting
//! the frame driver consult capability records instead of matching on effect
//! id strings.
//!
//! Types:
//!
//! - `EffectDescriptor` captures id, display name, source locator, category,
//!   and the derived `EffectTraits` consumed by the frame driver.
//! - `EffectCategory` distinguishes compute-based programs from the three
//!   built-in draw modes.
//! - `EffectTraits` is the per-effect capability record: pointer substitution,
//!   ripple lifetime class, uniform-slot repurposing, and the plasma family
//!   flag, all parsed from the entry's `features` array.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One selectable visual program as it appears in a category list file.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EffectDescriptor {
    pub id: String,
    pub name: String,
    /// Source locator: path to the WGSL program, resolved against the
    /// library root for relative entries. Ignored for built-in draw modes.
    #[serde(default)]
    pub source: PathBuf,
    #[serde(default)]
    pub category: EffectCategory,
    #[serde(default)]
    pub features: Vec<String>,
}

impl EffectDescriptor {
    /// Derives the capability record the frame driver keys its per-effect
    /// behaviour on.
    pub fn traits(&self) -> EffectTraits {
        let has = |name: &str| self.features.iter().any(|f| f == name);
        EffectTraits {
            pointer_driven: has("mouse-driven"),
            plasma_driven: has("plasma"),
            ripple_lifetime: if has("viscous") {
                RippleLifetime::Viscous
            } else {
                RippleLifetime::Standard
            },
            uniform_layout: if has("depth-feedback") {
                UniformLayout::DepthFeedback
            } else {
                UniformLayout::Standard
            },
        }
    }
}

/// Rendering family an effect belongs to. `Compute` entries get a dedicated
/// compute pipeline; the other three map onto the fixed draw modes.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EffectCategory {
    /// Compute program consuming the shared 13-slot layout.
    #[serde(alias = "shader")]
    Compute,
    /// Built-in procedural full-screen pass.
    Procedural,
    /// Still-image passthrough.
    Image,
    /// Video-frame passthrough.
    Video,
}

impl Default for EffectCategory {
    fn default() -> Self {
        Self::Compute
    }
}

/// How long interaction points stay alive for this effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RippleLifetime {
    Standard,
    /// Feedback-heavy effects keep ripples around longer so trails persist.
    Viscous,
}

impl RippleLifetime {
    /// Age threshold in seconds.
    pub fn seconds(self) -> f32 {
        match self {
            RippleLifetime::Standard => 4.0,
            RippleLifetime::Viscous => 8.0,
        }
    }
}

/// Which interpretation the compute uniform tail carries for this effect.
/// The two uses are mutually exclusive per effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLayout {
    /// Tail holds the zero-padded ripple array.
    Standard,
    /// First tail slot is overwritten with the four lighting parameters and
    /// the mode scalar carries the depth threshold.
    DepthFeedback,
}

/// Per-effect capability record replacing inline id special-casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTraits {
    /// Substitute the live pointer position for the caller's hint point.
    pub pointer_driven: bool,
    /// Member of the particle family: tick the plasma simulator and re-upload
    /// its buffer every frame while active.
    pub plasma_driven: bool,
    pub ripple_lifetime: RippleLifetime,
    pub uniform_layout: UniformLayout,
}

impl Default for EffectTraits {
    fn default() -> Self {
        Self {
            pointer_driven: false,
            plasma_driven: false,
            ripple_lifetime: RippleLifetime::Standard,
            uniform_layout: UniformLayout::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(features: &[&str]) -> EffectDescriptor {
        EffectDescriptor {
            id: "demo".into(),
            name: "Demo".into(),
            source: PathBuf::from("demo.wgsl"),
            category: EffectCategory::Compute,
            features: features.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn default_traits_for_plain_entry() {
        let traits = entry(&[]).traits();
        assert!(!traits.pointer_driven);
        assert!(!traits.plasma_driven);
        assert_eq!(traits.ripple_lifetime, RippleLifetime::Standard);
        assert_eq!(traits.uniform_layout, UniformLayout::Standard);
    }

    #[test]
    fn features_map_onto_capabilities() {
        let traits = entry(&["mouse-driven", "viscous", "depth-feedback"]).traits();
        assert!(traits.pointer_driven);
        assert_eq!(traits.ripple_lifetime, RippleLifetime::Viscous);
        assert_eq!(traits.uniform_layout, UniformLayout::DepthFeedback);
    }

    #[test]
    fn plasma_feature_marks_particle_family() {
        assert!(entry(&["plasma"]).traits().plasma_driven);
    }

    #[test]
    fn shader_category_alias_parses_as_compute() {
        let parsed: EffectDescriptor = serde_json::from_str(
            r#"{"id": "x", "name": "X", "source": "x.wgsl", "category": "shader"}"#,
        )
        .unwrap();
        assert_eq!(parsed.category, EffectCategory::Compute);
    }
}

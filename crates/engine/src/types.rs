use std::path::Path;

use anyhow::Context;
use catalog::EffectCategory;

/// Fixed capacity of the ripple uniform array.
pub const MAX_RIPPLES: usize = 100;

/// Fixed capacity of the plasma storage buffer.
pub const MAX_PLASMA_BALLS: usize = 50;

/// Floats per plasma storage record (position/velocity, color/radius,
/// age/max-age/seed/reserved).
pub const PLASMA_RECORD_FLOATS: usize = 12;

/// Compute dispatch footprint per workgroup on each axis.
pub const WORKGROUP_SIZE: u32 = 8;

/// Which persistent texture feeds the input binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Video,
}

impl Default for InputKind {
    fn default() -> Self {
        Self::Image
    }
}

/// A decoded still image, tightly packed RGBA float pixels.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl InputImage {
    pub fn from_dynamic(image: image::DynamicImage) -> Self {
        let width = image.width();
        let height = image.height();
        let rgba = image.to_rgba32f();
        Self {
            pixels: rgba.into_raw(),
            width,
            height,
        }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        Ok(Self::from_dynamic(image))
    }
}

/// A decoded video frame supplied by the host, tightly packed RGBA8.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Numeric parameters tuned per effect by the host UI.
#[derive(Debug, Clone, Copy)]
pub struct EffectParams {
    /// Four general-purpose values; zoom effects read them as
    /// foreground/background speed, parallax strength, and fog density.
    pub generic: [f32; 4],
    /// Light strength, ambient, normal strength, fog falloff; only consumed
    /// by depth-feedback effects.
    pub lighting: [f32; 4],
    /// Depth threshold for depth-feedback effects.
    pub depth_threshold: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            generic: [0.08, 0.0, 2.0, 0.7],
            lighting: [1.0, 0.2, 0.1, 4.0],
            depth_threshold: 0.5,
        }
    }
}

/// Everything the host passes into one frame of rendering.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub effect_id: String,
    pub params: EffectParams,
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// Externally computed point of interest (e.g. farthest depth point).
    pub hint_point: [f32; 2],
    /// Live pointer position in normalized coordinates; negative x means
    /// "no pointer".
    pub pointer: [f32; 2],
    pub pointer_down: bool,
}

impl FrameRequest {
    pub fn new(effect_id: impl Into<String>) -> Self {
        Self {
            effect_id: effect_id.into(),
            params: EffectParams::default(),
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            hint_point: [0.5, 0.5],
            pointer: [-1.0, -1.0],
            pointer_down: false,
        }
    }
}

/// Fixed draw mode resolved from a catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Compute,
    Procedural,
    Media(InputKind),
}

impl DrawMode {
    pub fn from_category(category: EffectCategory) -> Self {
        match category {
            EffectCategory::Compute => DrawMode::Compute,
            EffectCategory::Procedural => DrawMode::Procedural,
            EffectCategory::Image => DrawMode::Media(InputKind::Image),
            EffectCategory::Video => DrawMode::Media(InputKind::Video),
        }
    }
}

/// Number of workgroups needed to cover `pixels` at the fixed footprint.
pub fn dispatch_extent(pixels: u32) -> u32 {
    pixels.div_ceil(WORKGROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_extent_rounds_up() {
        assert_eq!(dispatch_extent(0), 0);
        assert_eq!(dispatch_extent(1), 1);
        assert_eq!(dispatch_extent(8), 1);
        assert_eq!(dispatch_extent(9), 2);
        assert_eq!(dispatch_extent(1920), 240);
        assert_eq!(dispatch_extent(1081), 136);
    }

    #[test]
    fn categories_resolve_to_draw_modes() {
        assert_eq!(
            DrawMode::from_category(EffectCategory::Compute),
            DrawMode::Compute
        );
        assert_eq!(
            DrawMode::from_category(EffectCategory::Video),
            DrawMode::Media(InputKind::Video)
        );
    }
}

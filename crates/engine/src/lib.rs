//! Real-time catalog-driven GPU effects engine.
//!
//! The engine turns a host surface plus a catalog of effect entries into a
//! per-frame render loop:
//!
//! ```text
//! EffectLibrary ──compile──▶ PipelineRegistry ─┐
//!                                              ▼
//! FrameRequest ──▶ EffectEngine::render ──▶ compute dispatch ──▶ blit
//!        │                 │                     ▲
//!        │                 ├── RippleField ──────┤  (uniform tail)
//!        │                 └── PlasmaField ──────┘  (storage buffer)
//!        └── built-in modes: procedural / image / video passthrough
//! ```
//!
//! Every compute effect shares one fixed 13-slot bind layout, so pipelines
//! never need per-effect layout plumbing and bind groups are rebuilt only
//! when the underlying textures change identity.

mod gpu;
mod sim;
mod types;

pub use gpu::EffectEngine;
pub use sim::plasma::{PlasmaBall, PlasmaField};
pub use sim::ripple::{RippleField, RipplePoint};
pub use types::{
    dispatch_extent, DrawMode, EffectParams, FrameRequest, InputImage, InputKind, VideoFrame,
    MAX_PLASMA_BALLS, MAX_RIPPLES, PLASMA_RECORD_FLOATS, WORKGROUP_SIZE,
};

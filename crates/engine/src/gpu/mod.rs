mod bindings;
mod context;
mod frame;
mod pipeline;
mod resources;
mod uniforms;

pub use frame::EffectEngine;

mod entry;
mod library;

pub use entry::{
    EffectCategory, EffectDescriptor, EffectTraits, RippleLifetime, UniformLayout,
};
pub use library::{EffectLibrary, LibraryError, CATEGORY_LISTS};

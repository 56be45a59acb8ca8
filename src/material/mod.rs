//! Materials, uniform slots and material instances.
//!
//! - [`Material`] compiles and links one GPU program and owns the ordered
//!   [`UniformRegistry`] discovered from its shader text.
//! - [`MaterialInstance`] links per-object overrides against a shared
//!   material and binds them in slot order.
//! - [`TextureUnitAllocator`] gives every sampler slot of a material its own
//!   texture unit.

mod attributes;
mod instance;
mod linker;
mod material;
mod slot;
mod texture_units;
mod uniform;

pub use attributes::{Attribute, AttributeValue};
pub use instance::MaterialInstance;
pub use linker::{link, LinkedUniforms, UniformBinding};
pub use material::{Material, MaterialDescriptor, DEFAULT_MAX_TEXTURE_UNITS};
pub use slot::{UniformRegistry, UniformSlot};
pub use texture_units::{TextureUnit, TextureUnitAllocator, GL_TEXTURE0};
pub use uniform::{TextureLookup, UniformKind, UniformOverrides, UniformValue};

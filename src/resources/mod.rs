//! Resource management
//!
//! Named shaders, textures and material instance data, plus the material
//! cache built from them.

mod instance_file;
mod registry;

pub use instance_file::MaterialInstanceData;
pub use registry::{ResourceRegistry, ShaderProgramSource};

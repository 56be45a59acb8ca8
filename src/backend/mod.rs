//! GPU backend abstraction layer.
//!
//! Everything the material runtime does on the GPU goes through the
//! [`ShaderBackend`] trait, so materials can be built and bound against
//! different graphics APIs.
//!
//! # Available Backends
//!
//! - `dummy` (always available): records calls, no GPU. Used by tests and
//!   headless tools.
//! - `gl-backend`: OpenGL backend using glow

pub mod dummy;
pub mod traits;
pub mod types;

#[cfg(feature = "gl-backend")]
pub mod glow_backend;

pub use dummy::{BackendCall, DummyBackend};
pub use traits::*;
pub use types::*;

#[cfg(feature = "gl-backend")]
pub use glow_backend::GlowBackend;

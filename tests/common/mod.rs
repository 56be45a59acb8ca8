//! Shared shaders and helpers for the integration tests.

use std::rc::Rc;

use material_runtime::{DummyBackend, Material};

/// Install the test logger once per binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const VERTEX: &str = r#"#version 330 core
uniform mat4 model;
uniform mat4 view_projection;
uniform vec4 color;

void main() {
    gl_Position = view_projection * model * vec4(color.xyz, 1.0);
}
"#;

/// Fragment stage with `color` (shared with the vertex stage) and two samplers.
pub const FRAGMENT_TEXTURED: &str = r#"#version 330 core
uniform vec4 color;
uniform sampler2D tex0;
uniform sampler2D tex1;
uniform float blend;
out vec4 frag_color;

void main() {
    vec4 a = texture(tex0, vec2(0.5));
    vec4 b = texture(tex1, vec2(0.5));
    frag_color = mix(a, b, blend) * color;
}
"#;

/// Fragment stage declaring `color` and `tex`.
pub const FRAGMENT_COLOR_TEX: &str = r#"#version 330 core
uniform vec4 color;
uniform sampler2D tex;
out vec4 frag_color;

void main() {
    frag_color = texture(tex, vec2(0.5)) * color;
}
"#;

/// Fragment stage declaring only `color`.
pub const FRAGMENT_COLOR: &str = r#"#version 330 core
uniform vec4 color;
out vec4 frag_color;

void main() {
    frag_color = color;
}
"#;

/// Vertex stage without matrices, for materials whose slots are all in
/// the fragment stage.
pub const VERTEX_PLAIN: &str = r#"#version 330 core
layout(location = 0) in vec3 position;

void main() {
    gl_Position = vec4(position, 1.0);
}
"#;

pub fn compile(backend: &mut DummyBackend, name: &str, vertex: &str, fragment: &str) -> Rc<Material> {
    Rc::new(
        Material::compile_sources(backend, name, vertex, fragment)
            .expect("test material should compile"),
    )
}

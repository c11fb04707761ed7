use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Program names known to the renderer.
pub const VIDEO: &str = "video";
pub const DISPLAY: &str = "display";
pub const OVERLAY: &str = "overlay";
pub const COMPOSITE: &str = "composite";

/// Layer quad in raster space.
const VIDEO_VERTEX: &str = r#"
#version 330 core

layout (location = 0) in vec2 a_pos;
layout (location = 1) in vec2 a_uv;

uniform mat4 u_mvp;

out vec2 v_uv;
out vec2 v_raster;

void main() {
    gl_Position = u_mvp * vec4(a_pos, 0.0, 1.0);
    v_uv = a_uv;
    v_raster = a_pos;
}
"#;

/// One layer into the offscreen target, premultiplied for ONE / ONE_MINUS_SRC_ALPHA blending.
const VIDEO_FRAGMENT: &str = r#"
#version 330 core

in vec2 v_uv;
in vec2 v_raster;
out vec4 FragColor;

uniform sampler2D u_image;
uniform sampler2D u_image_b;
uniform float u_dissolve;     // 0 shows u_image, 1 shows u_image_b
uniform int u_compare;        // 0 plain, 1 wipe, 2 overlay
uniform vec2 u_render_size;
uniform vec2 u_wipe_center;   // normalized render space
uniform float u_wipe_rotation; // radians
uniform float u_overlay;

void main() {
    vec4 c = texture(u_image, v_uv);
    if (u_dissolve > 0.0) {
        c = mix(c, texture(u_image_b, v_uv), u_dissolve);
    }
    if (u_compare == 1) {
        vec2 d = v_raster / u_render_size - u_wipe_center;
        vec2 n = vec2(cos(u_wipe_rotation), sin(u_wipe_rotation));
        if (dot(d, n) < 0.0) {
            discard;
        }
    } else if (u_compare == 2) {
        c *= u_overlay;
    }
    FragColor = c;
}
"#;

/// Offscreen target into the window.
const DISPLAY_VERTEX: &str = r#"
#version 330 core

layout (location = 0) in vec2 a_pos;
layout (location = 1) in vec2 a_uv;

uniform mat4 u_mvp;

out vec2 v_uv;

void main() {
    gl_Position = u_mvp * vec4(a_pos, 0.0, 1.0);
    v_uv = a_uv;
}
"#;

const DISPLAY_FRAGMENT: &str = r#"
#version 330 core

in vec2 v_uv;
out vec4 FragColor;

uniform sampler2D u_texture;
uniform float u_exposure;
uniform float u_gamma;
uniform float u_saturation;
uniform int u_channel;      // 0 color, 1 red, 2 green, 3 blue, 4 alpha, 5 luma
uniform int u_difference;   // show |A - B|
uniform int u_env;          // 0 flat, 1 spherical, 2 cubic
uniform vec2 u_env_rotation; // radians, x = pitch, y = yaw
uniform float u_fov;        // radians
uniform float u_aspect;

const vec3 LUMA = vec3(0.2126, 0.7152, 0.0722);
const float PI = 3.14159265358979;

vec2 env_uv(vec2 uv) {
    vec2 ndc = uv * 2.0 - 1.0;
    float t = tan(u_fov * 0.5);
    vec3 dir = normalize(vec3(ndc.x * t, -ndc.y * t / u_aspect, -1.0));
    float cp = cos(u_env_rotation.x), sp = sin(u_env_rotation.x);
    float cy = cos(u_env_rotation.y), sy = sin(u_env_rotation.y);
    dir = vec3(dir.x, cp * dir.y - sp * dir.z, sp * dir.y + cp * dir.z);
    dir = vec3(cy * dir.x + sy * dir.z, dir.y, -sy * dir.x + cy * dir.z);
    if (u_env == 1) {
        return vec2(atan(dir.x, -dir.z) / (2.0 * PI) + 0.5, acos(clamp(dir.y, -1.0, 1.0)) / PI);
    }
    // cubic: horizontal cross of six faces
    vec3 a = abs(dir);
    vec2 face;
    vec2 cell;
    if (a.x >= a.y && a.x >= a.z) {
        face = dir.x > 0.0 ? vec2(dir.z, -dir.y) / a.x : vec2(-dir.z, -dir.y) / a.x;
        cell = dir.x > 0.0 ? vec2(2.0, 1.0) : vec2(0.0, 1.0);
    } else if (a.y >= a.z) {
        face = dir.y > 0.0 ? vec2(dir.x, dir.z) / a.y : vec2(dir.x, -dir.z) / a.y;
        cell = dir.y > 0.0 ? vec2(1.0, 0.0) : vec2(1.0, 2.0);
    } else {
        face = dir.z > 0.0 ? vec2(-dir.x, -dir.y) / a.z : vec2(dir.x, -dir.y) / a.z;
        cell = dir.z > 0.0 ? vec2(3.0, 1.0) : vec2(1.0, 1.0);
    }
    return (cell + face * 0.5 + 0.5) / vec2(4.0, 3.0);
}

void main() {
    vec2 uv = u_env == 0 ? v_uv : env_uv(v_uv);
    vec4 c = texture(u_texture, uv);
    if (u_difference == 1) {
        c.rgb = abs(c.rgb);
    }
    c.rgb *= u_exposure;
    float l = dot(c.rgb, LUMA);
    c.rgb = mix(vec3(l), c.rgb, u_saturation);
    c.rgb = pow(max(c.rgb, vec3(0.0)), vec3(1.0 / max(u_gamma, 0.0001)));
    if (u_channel == 1) c = vec4(c.rrr, 1.0);
    else if (u_channel == 2) c = vec4(c.ggg, 1.0);
    else if (u_channel == 3) c = vec4(c.bbb, 1.0);
    else if (u_channel == 4) c = vec4(c.aaa, 1.0);
    else if (u_channel == 5) c = vec4(vec3(dot(c.rgb, LUMA)), 1.0);
    FragColor = c;
}
"#;

/// Flat colored triangles in raster space (shapes, masks, guides).
const OVERLAY_VERTEX: &str = r#"
#version 330 core

layout (location = 0) in vec2 a_pos;

uniform mat4 u_mvp;

void main() {
    gl_Position = u_mvp * vec4(a_pos, 0.0, 1.0);
}
"#;

const OVERLAY_FRAGMENT: &str = r#"
#version 330 core

out vec4 FragColor;

uniform vec4 u_color;
uniform int u_erase;

void main() {
    // erase is blended with ZERO / ONE_MINUS_SRC_ALPHA and clears the overlay
    FragColor = u_erase == 1 ? vec4(1.0) : u_color;
}
"#;

/// Premultiplied overlay target over the window.
const COMPOSITE_FRAGMENT: &str = r#"
#version 330 core

in vec2 v_uv;
out vec4 FragColor;

uniform sampler2D u_texture;

void main() {
    FragColor = texture(u_texture, v_uv);
}
"#;

/// GLSL sources of the viewport programs.
///
/// Embedded sources are always present; `<name>.glsl` files in a shader
/// directory replace the fragment shader of the program with that name.
#[derive(Clone)]
pub struct Shaders {
    pub programs: HashMap<String, (String, String)>, // (vertex_shader, fragment_shader)
}

impl Default for Shaders {
    fn default() -> Self {
        Self::new()
    }
}

impl Shaders {
    pub fn new() -> Self {
        let mut shaders = Self {
            programs: HashMap::new(),
        };
        shaders.load_embedded_shaders();
        shaders
    }

    fn load_embedded_shaders(&mut self) {
        for (name, vertex, fragment) in [
            (VIDEO, VIDEO_VERTEX, VIDEO_FRAGMENT),
            (DISPLAY, DISPLAY_VERTEX, DISPLAY_FRAGMENT),
            (OVERLAY, OVERLAY_VERTEX, OVERLAY_FRAGMENT),
            (COMPOSITE, DISPLAY_VERTEX, COMPOSITE_FRAGMENT),
        ] {
            self.programs.insert(name.to_string(), (vertex.to_string(), fragment.to_string()));
        }
        log::debug!("Loaded {} embedded shaders", self.programs.len());
    }

    /// Replace fragment shaders from `<dir>/<name>.glsl`. Returns how many were replaced.
    pub fn load_shader_directory(&mut self, shader_dir: &Path) -> Result<usize, String> {
        if !shader_dir.exists() {
            return Err(format!("Shader directory does not exist: {:?}", shader_dir));
        }

        let mut replaced = 0;
        for entry in fs::read_dir(shader_dir).map_err(|e| e.to_string())? {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) == Some("glsl")
                && let Some(name) = path.file_stem().and_then(|s| s.to_str())
            {
                let Some(program) = self.programs.get_mut(name) else {
                    log::warn!("Ignoring shader {:?}: no program named {}", path, name);
                    continue;
                };
                match fs::read_to_string(&path) {
                    Ok(fragment) => {
                        program.1 = fragment;
                        replaced += 1;
                        log::info!("Loaded shader: {}", name);
                    }
                    Err(e) => log::warn!("Failed to read shader file {:?}: {}", path, e),
                }
            }
        }
        Ok(replaced)
    }

    /// Vertex and fragment source of `name`.
    pub fn get(&self, name: &str) -> Option<(&str, &str)> {
        self.programs.get(name).map(|(v, f)| (v.as_str(), f.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_programs() {
        let s = Shaders::new();
        for name in [VIDEO, DISPLAY, OVERLAY, COMPOSITE] {
            let (v, f) = s.get(name).expect("program");
            assert!(v.contains("#version 330 core"));
            assert!(f.contains("FragColor"));
        }
        assert!(s.get("missing").is_none());
    }

    #[test]
    fn test_directory_overrides_fragment() {
        let dir = std::env::temp_dir().join(format!("mrv_shaders_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("display.glsl"), "// custom").expect("write");
        fs::write(dir.join("unknown.glsl"), "// ignored").expect("write");

        let mut s = Shaders::new();
        assert_eq!(s.load_shader_directory(&dir), Ok(1));
        assert_eq!(s.get(DISPLAY).map(|(_, f)| f), Some("// custom"));
        assert!(s.get("unknown").is_none());
        fs::remove_dir_all(&dir).ok();

        assert!(s.load_shader_directory(&dir).is_err());
    }
}

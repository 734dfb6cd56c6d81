//! GLSL programs the grid renders card planes and the final frame with.
//!
//! The sources target WebGL 1 (`attribute`/`varying`, `texture2D`), and the
//! vertex stages expect the host to supply `modelViewMatrix` and
//! `projectionMatrix`.

/// Fragment stage of the card background blur: a 3×3 weighted tap pattern
/// spread ten texels apart, with `uOpacity` scaling alpha.
pub const GAUSSIAN_BLUR_FRAGMENT: &str = r#"precision highp float;

uniform sampler2D map;
uniform vec2 resolution;
uniform float uOpacity;

varying vec2 vUv;

void main() {
    vec2 texel = vec2(1.0, 1.0) / resolution;
    float spread = 10.0;

    vec4 sum = vec4(0.0);
    sum += texture2D(map, vUv + texel * vec2(-1.0, -1.0) * spread) * 0.0625;
    sum += texture2D(map, vUv + texel * vec2( 0.0, -1.0) * spread) * 0.125;
    sum += texture2D(map, vUv + texel * vec2( 1.0, -1.0) * spread) * 0.0625;
    sum += texture2D(map, vUv + texel * vec2(-1.0,  0.0) * spread) * 0.125;
    sum += texture2D(map, vUv + texel * vec2( 0.0,  0.0) * spread) * 0.25;
    sum += texture2D(map, vUv + texel * vec2( 1.0,  0.0) * spread) * 0.125;
    sum += texture2D(map, vUv + texel * vec2(-1.0,  1.0) * spread) * 0.0625;
    sum += texture2D(map, vUv + texel * vec2( 0.0,  1.0) * spread) * 0.125;
    sum += texture2D(map, vUv + texel * vec2( 1.0,  1.0) * spread) * 0.0625;

    gl_FragColor = vec4(sum.rgb, sum.a * uOpacity);
}
"#;

/// Vertex stage of the card background blur. V is flipped so canvas-origin
/// textures land upright.
pub const GAUSSIAN_BLUR_VERTEX: &str = r#"attribute vec2 uv;
attribute vec3 position;

uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;

varying vec2 vUv;

void main() {
    vUv = vec2(uv.x, 1.0 - uv.y);
    gl_Position = projectionMatrix * modelViewMatrix * vec4(position, 1.0);
}
"#;

/// Full-screen pass: barrel lens distortion plus a vignette towards rgb(9,9,9).
pub const POST_PROCESS_FRAGMENT: &str = r#"precision highp float;

uniform sampler2D tDiffuse;
uniform vec2 distortion;
uniform float vignetteOffset;
uniform float vignetteDarkness;

varying vec2 vUv;

void main() {
    vec2 centered = 2.0 * (vUv - 0.5);
    float radius = length(centered);

    centered *= (0.88 + distortion.x * dot(centered, centered));
    vec2 lensUv = centered * 0.5 + 0.5;

    float vignette = smoothstep(vignetteOffset, vignetteDarkness, radius);
    vec3 edgeColor = vec3(9.0 / 255.0, 9.0 / 255.0, 9.0 / 255.0);

    vec3 source = texture2D(tDiffuse, lensUv).rgb;
    gl_FragColor = vec4(mix(source, edgeColor, vignette), 1.0);
}
"#;

pub const POST_PROCESS_VERTEX: &str = r#"attribute vec2 uv;
attribute vec3 position;

uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;

varying vec2 vUv;

void main() {
    vUv = uv;
    gl_Position = projectionMatrix * modelViewMatrix * vec4(position, 1.0);
}
"#;

/// GLSL type of a uniform the host must bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Sampler2D,
    Float,
    Vec2,
    Mat4,
}

impl UniformKind {
    pub fn glsl_name(&self) -> &'static str {
        match self {
            UniformKind::Sampler2D => "sampler2D",
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Mat4 => "mat4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uniform {
    pub name: &'static str,
    pub kind: UniformKind,
}

const fn uniform(name: &'static str, kind: UniformKind) -> Uniform {
    Uniform { name, kind }
}

const MATRICES: [Uniform; 2] = [
    uniform("modelViewMatrix", UniformKind::Mat4),
    uniform("projectionMatrix", UniformKind::Mat4),
];

/// A vertex/fragment pair and the uniforms its fragment stage reads.
#[derive(Debug, Clone, Copy)]
pub struct ShaderProgram {
    pub name: &'static str,
    pub vertex: &'static str,
    pub fragment: &'static str,
    fragment_uniforms: &'static [Uniform],
}

pub const BLUR_PROGRAM: ShaderProgram = ShaderProgram {
    name: "blur",
    vertex: GAUSSIAN_BLUR_VERTEX,
    fragment: GAUSSIAN_BLUR_FRAGMENT,
    fragment_uniforms: &[
        uniform("map", UniformKind::Sampler2D),
        uniform("resolution", UniformKind::Vec2),
        uniform("uOpacity", UniformKind::Float),
    ],
};

pub const POST_PROCESS_PROGRAM: ShaderProgram = ShaderProgram {
    name: "post",
    vertex: POST_PROCESS_VERTEX,
    fragment: POST_PROCESS_FRAGMENT,
    fragment_uniforms: &[
        uniform("tDiffuse", UniformKind::Sampler2D),
        uniform("distortion", UniformKind::Vec2),
        uniform("vignetteOffset", UniformKind::Float),
        uniform("vignetteDarkness", UniformKind::Float),
    ],
};

impl ShaderProgram {
    /// Every program the grid uses.
    pub fn all() -> [ShaderProgram; 2] {
        [BLUR_PROGRAM, POST_PROCESS_PROGRAM]
    }

    pub fn by_name(name: &str) -> Option<ShaderProgram> {
        Self::all().into_iter().find(|p| p.name == name)
    }

    /// Uniforms the host binds: the fragment inputs followed by the two
    /// transform matrices of the vertex stage.
    pub fn uniforms(&self) -> Vec<Uniform> {
        self.fragment_uniforms
            .iter()
            .chain(MATRICES.iter())
            .copied()
            .collect()
    }
}

/// `(type, name)` of every `uniform` declaration in `source`.
pub fn declared_uniforms(source: &str) -> Vec<(&str, &str)> {
    source
        .lines()
        .filter_map(|line| {
            let decl = line.trim().strip_prefix("uniform ")?;
            let decl = decl.split("//").next()?.trim().trim_end_matches(';');
            let mut parts = decl.split_whitespace();
            let (kind, name) = (parts.next()?, parts.next()?);
            Some((kind, name))
        })
        .collect()
}

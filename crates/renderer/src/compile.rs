use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the noise fragment shader.
///
/// Compilation errors are reported through the device error scope opened by
/// the caller, not through the return value.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("tile noise fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(NOISE_FRAGMENT_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Per-pixel hash noise.
///
/// The uniform block layout must match [`crate::gpu::NoiseUniforms`].
/// `origin` is the tile's bottom-left corner in bottom-left frame
/// coordinates; the render target is addressed top-down, so rows are
/// mirrored against `extent.y` before hashing.
const NOISE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform NoiseParams {
    vec2 seed;
    vec2 origin;
    vec2 extent;
    vec2 _padding;
} params;

float hash12(vec2 p) {
    vec3 p3 = fract(vec3(p.xyx) * 0.1031);
    p3 += dot(p3, p3.yzx + 33.33);
    return fract((p3.x + p3.y) * p3.z);
}

void main() {
    vec2 local = vec2(gl_FragCoord.x, params.extent.y - gl_FragCoord.y);
    vec2 p = params.origin + local + params.seed;
    outColor = vec4(
        hash12(p),
        hash12(p + vec2(19.19, 7.13)),
        hash12(p + vec2(3.71, 47.77)),
        1.0
    );
}
";

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_GLSL: &str = r"#version 450
const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    gl_Position = vec4(positions[vertex_index], 0.0, 1.0);
}
";

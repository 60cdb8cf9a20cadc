//! Build script to compile the triangle GLSL shaders to SPIR-V.
//!
//! The output lands next to the sources in the workspace `shaders/` directory,
//! where the viewer reads it at startup.

use shaderc::{Compiler, ShaderKind};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let shader_dir = manifest_dir.join("../../shaders");

    // Rerun if shaders change
    println!("cargo:rerun-if-changed={}", shader_dir.join("shader.vert").display());
    println!("cargo:rerun-if-changed={}", shader_dir.join("shader.frag").display());

    let compiler = Compiler::new().expect("Failed to create shader compiler");

    compile_shader(
        &compiler,
        shader_dir.join("shader.vert"),
        shader_dir.join("vert.spv"),
        ShaderKind::Vertex,
    );
    compile_shader(
        &compiler,
        shader_dir.join("shader.frag"),
        shader_dir.join("frag.spv"),
        ShaderKind::Fragment,
    );
}

fn compile_shader(
    compiler: &Compiler,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    kind: ShaderKind,
) {
    let input_path = input.as_ref();
    let output_path = output.as_ref();

    let source = fs::read_to_string(input_path)
        .unwrap_or_else(|e| panic!("Failed to read shader {}: {e}", input_path.display()));

    let file_name = input_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("shader");

    // The instance asks for API 1.0, so stay on SPIR-V 1.0.
    let mut options = shaderc::CompileOptions::new().expect("Failed to create compile options");
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_0 as u32,
    );
    options.set_target_spirv(shaderc::SpirvVersion::V1_0);

    let result = compiler
        .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
        .unwrap_or_else(|e| panic!("Failed to compile shader {}: {e}", input_path.display()));

    if result.get_num_warnings() > 0 {
        println!(
            "cargo:warning=Shader warnings in {}: {}",
            input_path.display(),
            result.get_warning_messages()
        );
    }

    fs::write(
        output_path,
        bytemuck::cast_slice::<u32, u8>(result.as_binary()),
    )
    .unwrap_or_else(|e| panic!("Failed to write shader {}: {e}", output_path.display()));
}

//! Command line arguments.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use renderer::{ShaderFailurePolicy, TextureProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GpuBackend {
    /// Let wgpu pick the best available backend.
    #[default]
    Auto,
    Vulkan,
    Dx12,
    Metal,
    Gl,
}

impl From<GpuBackend> for wgpu::Backends {
    fn from(value: GpuBackend) -> Self {
        match value {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OnShaderError {
    /// Abort startup with the diagnostic.
    #[default]
    Fail,
    /// Log the diagnostic and keep running without drawing.
    Warn,
}

impl From<OnShaderError> for ShaderFailurePolicy {
    fn from(value: OnShaderError) -> Self {
        match value {
            OnShaderError::Fail => ShaderFailurePolicy::FailFast,
            OnShaderError::Warn => ShaderFailurePolicy::WarnAndContinue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TextureSampling {
    /// Full mip chain, trilinear, clamped.
    Mipmapped,
    /// Base level only, repeating.
    SingleLevel,
}

impl From<TextureSampling> for TextureProfile {
    fn from(value: TextureSampling) -> Self {
        match value {
            TextureSampling::Mipmapped => TextureProfile::Mipmapped,
            TextureSampling::SingleLevel => TextureProfile::SingleLevel,
        }
    }
}

/// Spinning mesh viewer with optional diffuse and tangent-space normal maps.
#[derive(Parser, Debug)]
#[command(name = "meshview", version, about)]
pub struct Cli {
    /// Wavefront OBJ mesh to display.
    pub mesh: PathBuf,

    /// Diffuse texture.
    pub diffuse: Option<PathBuf>,

    /// Tangent-space normal map (requires a diffuse texture).
    #[arg(requires = "diffuse")]
    pub normal_map: Option<PathBuf>,

    /// Upload shared vertices with an index buffer (untextured only).
    #[arg(long)]
    pub indexed: bool,

    #[arg(long, default_value = "auto", value_enum)]
    pub gpu_backend: GpuBackend,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Directory holding `<variant>.vert.wgsl` / `<variant>.frag.wgsl`.
    #[arg(long)]
    pub shader_dir: Option<PathBuf>,

    #[arg(long, default_value = "fail", value_enum)]
    pub on_shader_error: OnShaderError,

    /// Defaults to mipmapped for one texture and single-level for two.
    #[arg(long, value_enum)]
    pub texture_profile: Option<TextureSampling>,

    /// Minimum interval between animation ticks, in milliseconds.
    #[arg(long, default_value_t = 20)]
    pub tick_ms: u64,

    #[arg(long, default_value_t = 1.0)]
    pub degrees_per_tick: f32,

    /// Uniform scale applied to the model.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Start with the animation paused.
    #[arg(long)]
    pub paused: bool,

    /// Log accepted ticks per second.
    #[arg(long)]
    pub show_fps: bool,
}

impl Cli {
    pub fn images(&self) -> Vec<PathBuf> {
        self.diffuse
            .iter()
            .chain(self.normal_map.iter())
            .cloned()
            .collect()
    }

    pub fn texture_profile(&self) -> TextureProfile {
        match (self.texture_profile, self.normal_map.is_some()) {
            (Some(sampling), _) => sampling.into(),
            (None, true) => TextureProfile::SingleLevel,
            (None, false) => TextureProfile::Mipmapped,
        }
    }

    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_is_required() {
        assert!(Cli::try_parse_from(["meshview"]).is_err());
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["meshview", "suzanne.obj"]).unwrap();
        assert_eq!(cli.mesh, PathBuf::from("suzanne.obj"));
        assert!(cli.images().is_empty());
        assert_eq!((cli.width, cli.height), (800, 600));
        assert_eq!(cli.tick_interval(), Duration::from_millis(20));
        assert_eq!(cli.degrees_per_tick, 1.0);
        assert_eq!(cli.gpu_backend, GpuBackend::Auto);
        assert_eq!(
            ShaderFailurePolicy::from(cli.on_shader_error),
            ShaderFailurePolicy::FailFast
        );
        assert_eq!(cli.texture_profile(), TextureProfile::Mipmapped);
        assert!(!cli.indexed && !cli.paused && !cli.show_fps);
    }

    #[test]
    fn normal_map_pair_defaults_to_single_level() {
        let cli = Cli::try_parse_from(["meshview", "cube.obj", "diffuse.png", "normal.png"])
            .unwrap();
        assert_eq!(cli.images().len(), 2);
        assert_eq!(cli.texture_profile(), TextureProfile::SingleLevel);

        let cli = Cli::try_parse_from([
            "meshview",
            "cube.obj",
            "diffuse.png",
            "normal.png",
            "--texture-profile",
            "mipmapped",
        ])
        .unwrap();
        assert_eq!(cli.texture_profile(), TextureProfile::Mipmapped);
    }

    #[test]
    fn options_parse() {
        let cli = Cli::try_parse_from([
            "meshview",
            "m.obj",
            "--indexed",
            "--gpu-backend",
            "vulkan",
            "--on-shader-error",
            "warn",
            "--tick-ms",
            "5",
            "--scale",
            "0.001",
            "--shader-dir",
            "shaders",
        ])
        .unwrap();
        assert!(cli.indexed);
        assert_eq!(wgpu::Backends::from(cli.gpu_backend), wgpu::Backends::VULKAN);
        assert_eq!(
            ShaderFailurePolicy::from(cli.on_shader_error),
            ShaderFailurePolicy::WarnAndContinue
        );
        assert_eq!(cli.tick_interval(), Duration::from_millis(5));
        assert_eq!(cli.scale, 0.001);
        assert_eq!(cli.shader_dir, Some(PathBuf::from("shaders")));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["meshview", "m.obj", "--gpu-backend", "glide"]).is_err());
    }
}

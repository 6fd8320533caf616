//! Entry point for meshview.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use asset::{DecodedImage, MeshStreams, ObjModel};
use clap::Parser;
use cli::Cli;
use corelib::{Mat4, features::PipelineFeatures};
use platform::LoopConfig;
use renderer::RendererConfig;

/// Status reported for any setup failure.
const SETUP_FAILURE: i32 = -1;

fn run(cli: Cli) -> Result<()> {
    let images = cli.images();
    let texture_count = u8::try_from(images.len()).context("too many textures")?;
    let features = PipelineFeatures::from_texture_count(cli.indexed, texture_count)?;
    log::info!(
        "Starting meshview. Backend: {:?}, features: {features:?}, window_size={}x{}",
        cli.gpu_backend,
        cli.width,
        cli.height
    );

    let model = ObjModel::load(&cli.mesh)?;
    if features.needs_surface_attributes() && !model.has_texcoords() {
        log::warn!(
            "{} has no texture coordinates; textures will sample a single texel",
            cli.mesh.display()
        );
    }

    let model_matrix = Mat4::from_scale(corelib::Vec3::splat(cli.scale));
    let mesh = if features.use_indices {
        MeshStreams::indexed(&model)?
    } else {
        let tangent_model = features.tangent_space.then_some(&model_matrix);
        MeshStreams::expanded(&model, features.needs_surface_attributes(), tangent_model)
    };

    let images = images
        .iter()
        .map(DecodedImage::load)
        .collect::<Result<Vec<_>>>()?;

    let loop_config = LoopConfig {
        title: format!("meshview - {}", cli.mesh.display()),
        width: cli.width.max(1),
        height: cli.height.max(1),
        tick_interval: cli.tick_interval(),
        degrees_per_tick: cli.degrees_per_tick,
        start_paused: cli.paused,
        show_fps: cli.show_fps,
        ..LoopConfig::default()
    };
    let renderer_config = RendererConfig {
        backends: cli.gpu_backend.into(),
        features,
        shader_dir: cli.shader_dir.clone(),
        shader_policy: cli.on_shader_error.into(),
        texture_profile: cli.texture_profile(),
        ..RendererConfig::default()
    };

    platform::run(loop_config, renderer_config, mesh, images, model_matrix)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            // Usage errors share the setup-failure status.
            if let Err(io) = e.print() {
                log::error!("failed to print usage: {io}");
            }
            std::process::exit(SETUP_FAILURE);
        }
    };

    match run(cli) {
        Ok(()) => {
            log::info!("Graceful shutdown. Bye!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(SETUP_FAILURE);
        }
    }
}

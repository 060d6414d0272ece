//! pano360 viewer
//!
//! Loads a model or panorama image, starts the render thread and shows the
//! result as an environment map on the desktop or through the simulated
//! HMD. W/S move the camera, the arrow keys look around, Escape quits.

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use pano_engine::camera::InteractiveCamera;
use pano_engine::config::ConfigError;
use pano_engine::display::gl::GlBackend;
use pano_engine::display::{DisplayError, DisplayLoop, SimulatedHmd, ViewerWindow, WindowError};
use pano_engine::foundation::logging;
use pano_engine::pipeline::{PipelineController, PipelineError, PipelineHealth};
use pano_engine::renderers::{RegistryError, RendererRegistry, SourceOptions};
use pano_engine::scene::{split_overrides, NodeOverride};

use cli::Cli;

/// Fatal viewer errors; all of them exit with status 1
#[derive(Error, Debug)]
enum ViewerError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("renderer: {0}")]
    Registry(#[from] RegistryError),

    #[error("window: {0}")]
    Window(#[from] WindowError),

    #[error("display: {0}")]
    Display(#[from] DisplayError),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),
}

fn main() -> ExitCode {
    let (overrides, args) = split_overrides(std::env::args());
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also land here
            let _ = err.print();
            return if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    match run(&cli, &overrides) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("pano360: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, overrides: &[NodeOverride]) -> Result<(), ViewerError> {
    let config = cli.load_config()?;
    logging::init(&config.logging.level);
    log::info!("pano360 starting: {}", cli.model.display());

    let mut registry = RendererRegistry::new();
    for name in &cli.modules {
        if let Err(err) = registry.load_module(name) {
            log::warn!("Skipping module: {err}");
        }
    }

    let renderer_type = cli.renderer_type();
    let options = SourceOptions {
        frame_size: config.panorama.frame_size(),
        ground_plane: !cli.no_ground_plane,
    };
    let mut source = registry.create_source(renderer_type, &cli.model, &options)?;

    match source.scene_graph_mut() {
        Some(scene) => {
            let applied = overrides.iter().filter(|o| o.apply(scene).is_some()).count();
            log::debug!("Applied {applied} of {} scene overrides", overrides.len());
        }
        None if !overrides.is_empty() => {
            log::warn!("Renderer '{renderer_type}' has no scene graph; ignoring {} overrides", overrides.len());
        }
        None => {}
    }
    if cli.print_scene {
        match source.scene_graph() {
            Some(scene) => print!("{scene}"),
            None => println!("Renderer '{renderer_type}' has no scene graph"),
        }
    }

    let window = ViewerWindow::new(&config.window)?;
    let backend = GlBackend::new()?;

    let mut pipeline = PipelineController::start(source, &config.pipeline)?;
    let camera = InteractiveCamera::new(
        pipeline.initial_cameras(),
        config.camera.move_step,
        Duration::from_millis(config.camera.revert_delay_ms),
    );

    let mut display = DisplayLoop::new(window, backend, pipeline.handle(), camera, &config.camera);
    if cli.vr {
        display = display.with_vr(Box::new(SimulatedHmd::new(&config.vr)));
    }
    let result = display.run();
    drop(display);

    pipeline.shutdown();
    if let PipelineHealth::Degraded(reason) = pipeline.health() {
        log::warn!("Render thread had stopped early: {reason}");
    }
    let stats = result?;
    log::info!(
        "Presented {} frames: {} uploaded, {} skipped; {} panoramas published",
        stats.presented,
        stats.uploaded,
        stats.skipped,
        pipeline.relay().published_frames()
    );
    Ok(())
}

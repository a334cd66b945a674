//! Headless Terra demo: orbits a planet, refining the cube-sphere quadtree
//! every frame and logging what would be drawn.
//!
//! Configuration is loaded from `terra.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p terra-demo -- --frames 300 --distance 1.5`.

mod camera;
mod tiles;

use std::collections::BTreeSet;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use terra_config::{CliArgs, Config, default_config_dir};
use terra_lod::{DrawList, PlanetCube, TileCache};
use tracing::{error, info};

use crate::camera::OrbitCamera;
use crate::tiles::DemoStore;

/// Totals over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RunSummary {
    frames: u64,
    draws: u64,
    peak_draws: usize,
    /// Distinct map tiles bound in the busiest frame.
    peak_textures: usize,
}

impl RunSummary {
    fn record(&mut self, draws: &DrawList) {
        let count = draws.draws().len();
        self.frames += 1;
        self.draws += count as u64;
        if count >= self.peak_draws {
            self.peak_draws = count;
            self.peak_textures = draws
                .draws()
                .iter()
                .map(|draw| draw.texture)
                .collect::<BTreeSet<_>>()
                .len();
        }
    }
}

fn report(frame: u64, cube: &PlanetCube<DemoStore>, draws: &DrawList, camera: &OrbitCamera) {
    let stats = cube.stats();
    let tiles = cube.cache().stats();
    let failed = cube
        .nodes()
        .filter(|(_, node)| cube.cache().has_failed(node.address()))
        .count();
    info!(
        frame,
        altitude = camera.altitude(),
        nodes = stats.nodes,
        open = stats.open_nodes,
        renderables = stats.renderables,
        map_tiles = stats.map_tiles,
        paged_out = stats.paged_out,
        max_lod = stats.max_lod,
        draws = draws.draws().len(),
        render_requests = stats.render_requests,
        inline_requests = stats.inline_requests,
        fetched = tiles.completed,
        reused = tiles.reused,
        failed,
        "Frame"
    );
}

fn run(config: &Config) -> Result<RunSummary, Box<dyn std::error::Error>> {
    config.validate()?;
    let planet = config.planet.to_planet();
    let store = tiles::build_store(config)?;
    let mut cube = PlanetCube::new(config.lod.clone(), planet, store)?;
    let mut camera = OrbitCamera::new(&config.camera, &planet);
    cube.set_parameters(camera.fov_y(), f64::from(config.camera.viewport_height));

    info!(
        radius = planet.radius,
        altitude = camera.altitude(),
        frames = config.debug.frames,
        "Starting orbit"
    );

    let interval = Duration::from_millis(config.debug.frame_interval_ms);
    let mut draws = DrawList::new();
    let mut summary = RunSummary::default();
    for frame in 0..config.debug.frames {
        cube.set_view_projection(&camera.view_projection());
        cube.update(&camera.view());
        draws.clear();
        cube.render(&mut draws);
        summary.record(&draws);

        if config.debug.report_every > 0 && frame % config.debug.report_every == 0 {
            report(frame, &cube, &draws, &camera);
        }
        camera.advance();
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    Ok(summary)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    terra_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let started = Instant::now();
    match run(&config) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                draws = summary.draws,
                peak_draws = summary.peak_draws,
                peak_textures = summary.peak_textures,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_run_draws_planet() {
        let mut config = Config::default();
        config.debug.frames = 40;
        config.debug.frame_interval_ms = 1;
        config.debug.report_every = 0;
        config.lod.texture_size = 32;
        config.tiles.worker_threads = 2;

        let summary = run(&config).unwrap();
        assert_eq!(summary.frames, 40);
        assert!(summary.peak_draws > 0, "tiles arrive within the run");
        assert!(summary.peak_textures >= 1);
    }

    #[test]
    fn test_invalid_lod_settings_fail_run() {
        let mut config = Config::default();
        config.lod.grid_size = 1;
        config.debug.frames = 1;
        assert!(run(&config).is_err());
    }

    #[test]
    fn test_zero_radius_planet_fails_run() {
        let mut config = Config::default();
        config.planet.radius_m = 0.0;
        config.debug.frames = 1;
        let error = run(&config).expect_err("degenerate planet");
        assert!(error.to_string().contains("radius"));
    }
}

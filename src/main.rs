//! Galaxy Engine demo entry point.
//!
//! Runs the falling-crate scene from [`game`] headless for a fixed amount of
//! wall-clock time and prints a run report.
//!
//! # Main Loop
//!
//! 1. Initialize logging and load `config.ini` (or the `--config` file)
//! 2. Build the application with the physics system and the scene init hook
//! 3. Arm a kill timer thread
//! 4. Run: physical loop on its own thread, headless render loop here
//! 5. Print the report once both loops have stopped
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --seconds 5 --objects 500 --report-json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use galaxyengine::app::Application;
use galaxyengine::frontend::HeadlessFrontend;
use galaxyengine::game::{self, SceneOptions};
use galaxyengine::logging::{LoggingConfig, init_logging};
use galaxyengine::resources::gameconfig::AppConfig;
use galaxyengine::systems::physics::Physics2DSystem;

/// Galaxy Engine 2D headless demo
#[derive(Parser)]
#[command(version, about = "Falling crates on a fixed-rate physical loop with a parallel executor")]
struct Cli {
    /// INI configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wall-clock seconds to run before killing the application.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Number of crates in the scene.
    #[arg(long, default_value_t = 64)]
    objects: usize,

    /// Executor worker count (overrides the config file).
    #[arg(long)]
    parallelism: Option<usize>,

    /// Run executor tasks inline on the physical thread.
    #[arg(long)]
    single_threaded: bool,

    /// Write the effective configuration back to the config file.
    #[arg(long)]
    save_config: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    report_json: bool,
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::with_path(path),
        None => AppConfig::new(),
    };
    if let Err(e) = config.load_from_file() {
        // defaults are fine for the demo
        warn!("{}", e);
    }
    if let Some(n) = cli.parallelism {
        config.parallelism = n;
    }
    if cli.single_threaded {
        config.multithreading = false;
    }
    if cli.save_config {
        if let Err(e) = config.save_to_file() {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let scene = SceneOptions {
        crates: cli.objects,
        width: config.resolution.width as f32,
        floor_y: config.resolution.height as f32 - 40.0,
        ..SceneOptions::default()
    };

    let built = Application::builder(config)
        .system(Arc::new(Physics2DSystem::new(0)))
        .init(move |ctx| game::setup_scene(ctx, &scene))
        .build();
    let mut app = match built {
        Ok(app) => app,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let kill = app.kill_handle();
    let run_for = match Duration::try_from_secs_f64(cli.seconds) {
        Ok(d) => d,
        Err(e) => {
            error!("invalid --seconds {}: {}", cli.seconds, e);
            return ExitCode::FAILURE;
        }
    };
    let timer = thread::Builder::new().name("kill-timer".into()).spawn(move || {
        thread::sleep(run_for);
        if kill.kill().is_ok() {
            info!("kill timer fired after {:?}", run_for);
        }
    });
    if let Err(e) = timer {
        error!("failed to spawn kill timer: {}", e);
        return ExitCode::FAILURE;
    }

    let mut frontend = HeadlessFrontend::new();
    if let Err(e) = app.run(&mut frontend) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let report = app.report();
    if cli.report_json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!(
            "ticks={} frames={} registered={} unregistered={} active={} tasks={} failed={} panicked={}",
            report.ticks,
            report.frames,
            report.registered,
            report.unregistered,
            report.active_objects,
            report.executor.completed,
            report.executor.failed,
            report.executor.panicked
        );
    }
    ExitCode::SUCCESS
}

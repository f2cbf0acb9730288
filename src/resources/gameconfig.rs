//! Application configuration.
//!
//! Holds the tick rates, worker parallelism and window settings the driver
//! needs. Provides defaults for safe startup and methods to load/save an INI
//! file.
//!
//! # Configuration File Format
//!
//! ```ini
//! [engine]
//! physical_fps = 60
//! render_fps = 60
//! parallelism = 4
//! multithreading = true
//! queue_capacity = 256
//!
//! [window]
//! width = 640
//! height = 480
//! title = Galaxy Engine
//! ```

use std::path::PathBuf;

use configparser::ini::Ini;
use log::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::resources::requests::DEFAULT_QUEUE_CAPACITY;

/// Default safe values for startup
const DEFAULT_PHYSICAL_FPS: u32 = 60;
const DEFAULT_RENDER_FPS: u32 = 60;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_MULTITHREADING: bool = true;
const DEFAULT_TITLE: &str = "Galaxy Engine";
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Window size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Everything the application driver reads at construction.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Initial window resolution.
    pub resolution: Resolution,
    /// Physical (simulation) tick rate in Hz.
    pub physical_fps: u32,
    /// Render tick rate in Hz.
    pub render_fps: u32,
    /// Executor worker count. Values below one are raised to one.
    pub parallelism: usize,
    /// When false, executor tasks run inline on the physical thread.
    pub multithreading: bool,
    /// Capacity of each register/unregister request queue.
    pub queue_capacity: usize,
    /// Window title.
    pub title: String,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            resolution: Resolution {
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
            },
            physical_fps: DEFAULT_PHYSICAL_FPS,
            render_fps: DEFAULT_RENDER_FPS,
            parallelism,
            multithreading: DEFAULT_MULTITHREADING,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            title: DEFAULT_TITLE.to_string(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current (default) values.
    pub fn load_from_file(&mut self) -> EngineResult<()> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| EngineError::Config(format!("failed to load {:?}: {}", self.config_path, e)))?;

        // [engine] section
        if let Some(fps) = config.getuint("engine", "physical_fps").ok().flatten() {
            self.physical_fps = fps as u32;
        }
        if let Some(fps) = config.getuint("engine", "render_fps").ok().flatten() {
            self.render_fps = fps as u32;
        }
        if let Some(n) = config.getint("engine", "parallelism").ok().flatten() {
            self.parallelism = n.max(0) as usize;
        }
        if let Some(mt) = config.getbool("engine", "multithreading").ok().flatten() {
            self.multithreading = mt;
        }
        if let Some(cap) = config.getuint("engine", "queue_capacity").ok().flatten() {
            self.queue_capacity = cap as usize;
        }

        // [window] section
        if let Some(width) = config.getuint("window", "width").ok().flatten() {
            self.resolution.width = width as u32;
        }
        if let Some(height) = config.getuint("window", "height").ok().flatten() {
            self.resolution.height = height as u32;
        }
        if let Some(title) = config.get("window", "title") {
            self.title = title;
        }

        info!(
            "Loaded config: physical={}Hz render={}Hz parallelism={} multithreading={} queue={} window={}x{}",
            self.physical_fps,
            self.render_fps,
            self.parallelism,
            self.multithreading,
            self.queue_capacity,
            self.resolution.width,
            self.resolution.height
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> EngineResult<()> {
        let mut config = Ini::new();

        // [engine] section
        config.set("engine", "physical_fps", Some(self.physical_fps.to_string()));
        config.set("engine", "render_fps", Some(self.render_fps.to_string()));
        config.set("engine", "parallelism", Some(self.parallelism.to_string()));
        config.set("engine", "multithreading", Some(self.multithreading.to_string()));
        config.set("engine", "queue_capacity", Some(self.queue_capacity.to_string()));

        // [window] section
        config.set("window", "width", Some(self.resolution.width.to_string()));
        config.set("window", "height", Some(self.resolution.height.to_string()));
        config.set("window", "title", Some(self.title.clone()));

        config
            .write(&self.config_path)
            .map_err(|e| EngineError::Config(format!("failed to save {:?}: {}", self.config_path, e)))?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Check the values the loops depend on. Parallelism below one is
    /// raised to one; zero rates or a zero-capacity queue are rejected.
    pub fn validate(&mut self) -> EngineResult<()> {
        if self.parallelism < 1 {
            warn!("parallelism {} raised to 1", self.parallelism);
            self.parallelism = 1;
        }
        if self.physical_fps == 0 {
            return Err(EngineError::InvalidConfig("physical_fps must be at least 1".into()));
        }
        if self.render_fps == 0 {
            return Err(EngineError::InvalidConfig("render_fps must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Builder: set both tick rates.
    pub fn with_rates(mut self, physical_fps: u32, render_fps: u32) -> Self {
        self.physical_fps = physical_fps;
        self.render_fps = render_fps;
        self
    }

    /// Builder: set worker count and the multithreading switch.
    pub fn with_parallelism(mut self, parallelism: usize, multithreading: bool) -> Self {
        self.parallelism = parallelism;
        self.multithreading = multithreading;
        self
    }

    pub fn physical_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.physical_fps.max(1)
    }

    pub fn render_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.render_fps.max(1)
    }
}

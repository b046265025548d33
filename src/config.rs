use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::functions::{EvalContext, FunctionId};
use crate::projection::{PlaneParams, SphereParams};
use crate::renderer::{ColorParams, ViewMode};
use crate::scene::{ColorSource, Scene};
use crate::streamline::{FieldMode, TraceParams};

pub const DEFAULT_PATH: &str = "phasefield.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub color: ColorParams,
    pub function: FunctionId,
    pub coloring: ColorSource,
    pub streamlines: StreamlineConfig,
    pub zeta_continuation: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub target_fps: usize,
    pub sampling_stride: usize,
    pub view: ViewMode,
    pub pixels_per_unit: f64,
    pub sphere_radius_fraction: f64,
    pub rot_x: f64,
    pub rot_y: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamlineConfig {
    pub enabled: bool,
    pub field_mode: FieldMode,
    pub step_size: f64,
    pub max_length: usize,
    pub seed_density: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            color: ColorParams::default(),
            function: FunctionId::default(),
            coloring: ColorSource::Function,
            streamlines: StreamlineConfig::default(),
            zeta_continuation: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 30,
            sampling_stride: 1,
            view: ViewMode::Plane,
            pixels_per_unit: 100.0,
            sphere_radius_fraction: 0.45,
            rot_x: 0.4,
            rot_y: -0.6,
        }
    }
}

impl Default for StreamlineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field_mode: FieldMode::Direct,
            step_size: 0.02,
            max_length: 200,
            seed_density: 12,
        }
    }
}

impl Config {
    /// Per-frame context for the renderers and the tracer.
    pub fn scene(&self) -> Scene {
        Scene {
            function: self.function.clone(),
            source: self.coloring,
            color: self.color,
            eval: EvalContext { zeta_continuation: self.zeta_continuation },
            field_mode: self.streamlines.field_mode,
            sampling_stride: self.display.sampling_stride.max(1),
        }
    }

    pub fn trace_params(&self) -> TraceParams {
        TraceParams {
            step_size: self.streamlines.step_size,
            max_length: self.streamlines.max_length,
        }
    }

    pub fn plane_params(&self) -> PlaneParams {
        PlaneParams::centered(self.display.width, self.display.height, self.display.pixels_per_unit)
    }

    pub fn sphere_params(&self) -> SphereParams {
        SphereParams::fit(
            self.display.width,
            self.display.height,
            self.display.sphere_radius_fraction,
            self.display.rot_x,
            self.display.rot_y,
        )
    }
}

/// Read and parse a config file.
pub fn try_load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load `path`, or `phasefield.yaml` in the working directory when `None`.
/// Any failure falls back to defaults with a warning; a missing default file is silent.
pub fn load(path: Option<&Path>) -> Config {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_PATH));
    if !explicit && !path.exists() {
        return Config::default();
    }
    match try_load(path) {
        Ok(cfg) => {
            info!(path = %path.display(), "loaded config");
            cfg
        }
        Err(e) => {
            warn!("{e}; using defaults");
            Config::default()
        }
    }
}

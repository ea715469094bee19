//! Argument types shared across CLI commands.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use covergen::config::{config_file_path, ConfigFile, DecodePolicy};
use covergen::cover::Strategy;
use covergen::scheduler::SchedulePolicy;

use crate::error::CliError;

/// Tile coverage strategy selection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum StrategyArg {
    /// Tiles the geometry actually reaches
    Exact,
    /// Every tile of the bounding box (faster, superset of exact)
    Bbox,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Exact => Strategy::Exact,
            StrategyArg::Bbox => Strategy::Bbox,
        }
    }
}

/// Zoom scheduling selection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ScheduleArg {
    /// One work item per geometry, zooms in ascending order
    Sequential,
    /// One work item per (geometry, zoom)
    Parallel,
}

impl From<ScheduleArg> for SchedulePolicy {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Sequential => SchedulePolicy::Sequential,
            ScheduleArg::Parallel => SchedulePolicy::ParallelPerZoom,
        }
    }
}

/// Handling of rows whose geometry cannot be decoded.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum DecodePolicyArg {
    /// Log the row and continue
    Skip,
    /// Abort the run
    Fail,
}

impl From<DecodePolicyArg> for DecodePolicy {
    fn from(arg: DecodePolicyArg) -> Self {
        match arg {
            DecodePolicyArg::Skip => DecodePolicy::Skip,
            DecodePolicyArg::Fail => DecodePolicy::Fail,
        }
    }
}

/// The config file path: `--config` if given, else `~/.covergen/config.ini`.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Loads the config file, falling back to defaults when it is missing.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(cli_path))?)
}

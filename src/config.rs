//! Hierarchical configuration tree.
//!
//! The core only requires a handful of well-known keys; the rest of a
//! driver's config tree is opaque to it. Backed by `toml` + `serde`.

use serde::Deserialize;
use std::path::Path;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecompMethod {
    MetisKway,
    ParmetisKway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rearranger {
    Box,
    Subset,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MovementWeightType {
    Fixed,
    Uniform,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecompConfig {
    /// Number of halo rings; must be >= 1.
    pub halo_width: u32,
    pub decomp_method: DecompMethod,
}

impl Default for DecompConfig {
    fn default() -> Self {
        Self {
            halo_width: 1,
            decomp_method: DecompMethod::MetisKway,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IoConfig {
    #[serde(default = "default_io_format")]
    pub io_default_format: String,
    #[serde(default = "default_io_tasks")]
    pub io_tasks: u32,
    #[serde(default = "default_io_stride")]
    pub io_stride: u32,
    #[serde(default)]
    pub io_base_task: u32,
    #[serde(default = "default_rearranger")]
    pub io_rearranger: Rearranger,
}

fn default_io_format() -> String {
    "hdf5".to_string()
}
fn default_io_tasks() -> u32 {
    1
}
fn default_io_stride() -> u32 {
    1
}
fn default_rearranger() -> Rearranger {
    Rearranger::Box
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            io_default_format: default_io_format(),
            io_tasks: default_io_tasks(),
            io_stride: default_io_stride(),
            io_base_task: 0,
            io_rearranger: default_rearranger(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertCoordConfig {
    pub movement_weight_type: MovementWeightType,
}

impl Default for VertCoordConfig {
    fn default() -> Self {
        Self {
            movement_weight_type: MovementWeightType::Uniform,
        }
    }
}

/// Top-level config tree. Driver-specific groups beyond the three the
/// core reads are simply absent from this struct and ignored by serde.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decomp: DecompConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub vert_coord: VertCoordConfig,
}

impl Config {
    /// Load and validate a config tree from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Config> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| CoreError::InvalidArgument {
            message: format!("could not read config {:?}: {e}", path.as_ref()),
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> CoreResult<Config> {
        let cfg: Config = toml::from_str(text).map_err(|e| CoreError::InvalidArgument {
            message: format!("invalid config: {e}"),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.decomp.halo_width < 1 {
            return Err(CoreError::InvalidArgument {
                message: "Decomp.HaloWidth must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let text = r#"
            [decomp]
            halo_width = 2
            decomp_method = "metisKway"

            [vert_coord]
            movement_weight_type = "Uniform"
        "#;
        let cfg = Config::parse(text).unwrap();
        assert_eq!(cfg.decomp.halo_width, 2);
        assert_eq!(cfg.decomp.decomp_method, DecompMethod::MetisKway);
        assert_eq!(cfg.io.io_tasks, 1);
    }

    #[test]
    fn rejects_zero_halo_width() {
        let text = r#"
            [decomp]
            halo_width = 0
            decomp_method = "metisKway"

            [vert_coord]
            movement_weight_type = "Fixed"
        "#;
        assert!(Config::parse(text).is_err());
    }
}

//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. BUSFLOW_CONFIG environment variable
//! 3. Default: config/dev.toml
//!
//! Every section is optional; missing keys fall back to the defaults below.

use crate::domain::types::TypeCodes;
use crate::io::egress::OutputFormat;
use crate::io::ingest::{InputFormat, InputSettings};
use crate::services::clusterer::DEFAULT_RADIUS_KM;
use crate::services::grouping::{GroupingKind, StopGrouping};
use crate::services::overlay::{DisplayMode, HeatmapStyle, ViewSettings};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";
pub const CONFIG_ENV_VAR: &str = "BUSFLOW_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: PathBuf,
    /// `auto` picks the workbook reader for .xlsx/.xls/.ods paths
    #[serde(default)]
    pub format: InputFormat,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_section_column")]
    pub section_column: String,
    #[serde(default = "default_type_column")]
    pub type_column: String,
    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,
    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,
    /// Source sheet stores longitude under the latitude header and vice versa
    #[serde(default)]
    pub swap_coordinates: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            format: InputFormat::default(),
            delimiter: default_delimiter(),
            section_column: default_section_column(),
            type_column: default_type_column(),
            latitude_column: default_latitude_column(),
            longitude_column: default_longitude_column(),
            swap_coordinates: false,
        }
    }
}

fn default_input_path() -> PathBuf {
    PathBuf::from("data/transactions.csv")
}

fn default_delimiter() -> char {
    ','
}

fn default_section_column() -> String {
    "Seccion".to_string()
}

fn default_type_column() -> String {
    "Tipo Trx".to_string()
}

fn default_latitude_column() -> String {
    "Latitud".to_string()
}

fn default_longitude_column() -> String {
    "Longitud".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodesConfig {
    #[serde(default = "default_boarding_code")]
    pub boarding: i32,
    #[serde(default = "default_alighting_code")]
    pub alighting: i32,
}

impl Default for CodesConfig {
    fn default() -> Self {
        Self { boarding: default_boarding_code(), alighting: default_alighting_code() }
    }
}

fn default_boarding_code() -> i32 {
    627
}

fn default_alighting_code() -> i32 {
    624
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default)]
    pub grouping: GroupingKind,
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self { grouping: GroupingKind::default(), radius_km: default_radius_km() }
    }
}

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_heatmap_radius")]
    pub heatmap_radius: u32,
    #[serde(default = "default_heatmap_opacity")]
    pub heatmap_opacity: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            zoom: default_zoom(),
            heatmap_radius: default_heatmap_radius(),
            heatmap_opacity: default_heatmap_opacity(),
        }
    }
}

fn default_zoom() -> u8 {
    13
}

fn default_heatmap_radius() -> u32 {
    60
}

fn default_heatmap_opacity() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: default_output_path(), format: OutputFormat::default() }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("out/overlay.geojson")
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub codes: CodesConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    input: InputSettings,
    input_path: PathBuf,
    type_codes: TypeCodes,
    grouping_kind: GroupingKind,
    radius_km: f64,
    view: ViewSettings,
    output_path: PathBuf,
    output_format: OutputFormat,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    /// Determine config file path: command line value, then environment, then default
    pub fn resolve_config_path(cli: Option<&str>) -> String {
        if let Some(path) = cli {
            return path.to_string();
        }

        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => path,
            _ => DEFAULT_CONFIG_PATH.to_string(),
        }
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let input = InputSettings {
            format: toml_config.input.format,
            delimiter: toml_config.input.delimiter,
            section_column: toml_config.input.section_column,
            type_column: toml_config.input.type_column,
            latitude_column: toml_config.input.latitude_column,
            longitude_column: toml_config.input.longitude_column,
            swap_coordinates: toml_config.input.swap_coordinates,
        };
        let view = ViewSettings {
            display_mode: toml_config.view.display_mode,
            zoom: toml_config.view.zoom,
            heatmap: HeatmapStyle {
                radius: toml_config.view.heatmap_radius,
                opacity: toml_config.view.heatmap_opacity,
            },
        };

        Self {
            input,
            input_path: toml_config.input.path,
            type_codes: TypeCodes::new(toml_config.codes.boarding, toml_config.codes.alighting),
            grouping_kind: toml_config.clustering.grouping,
            radius_km: toml_config.clustering.radius_km,
            view,
            output_path: toml_config.output.path,
            output_format: toml_config.output.format,
            config_file,
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).context("Failed to parse config")?;
        let config = Self::from_toml(toml_config, "inline".to_string());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = Self::from_toml(toml_config, path.display().to_string());
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(config_file = %path, error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            bail!("radius_km must be a finite non-negative number, got {}", self.radius_km);
        }
        if self.type_codes.boarding == self.type_codes.alighting {
            bail!("boarding and alighting codes must differ, both are {}", self.type_codes.boarding);
        }
        if self.view.zoom > 22 {
            bail!("zoom must be within 0..=22, got {}", self.view.zoom);
        }
        if !(0.0..=1.0).contains(&self.view.heatmap.opacity) {
            bail!("heatmap_opacity must be within 0..=1, got {}", self.view.heatmap.opacity);
        }
        if !self.input.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.input.delimiter);
        }
        Ok(())
    }

    // Getters
    pub fn input_settings(&self) -> &InputSettings {
        &self.input
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn type_codes(&self) -> TypeCodes {
        self.type_codes
    }

    pub fn grouping_kind(&self) -> GroupingKind {
        self.grouping_kind
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn grouping(&self) -> StopGrouping {
        StopGrouping::from_kind(self.grouping_kind, self.radius_km)
    }

    pub fn view_settings(&self) -> &ViewSettings {
        &self.view
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.view.display_mode
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    // Overrides applied from the command line
    pub fn with_input_path(mut self, path: PathBuf) -> Self {
        self.input_path = path;
        self
    }

    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_grouping_kind(mut self, kind: GroupingKind) -> Self {
        self.grouping_kind = kind;
        self
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.view.display_mode = mode;
        self
    }

    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input.format = format;
        self
    }

    pub fn with_swap_coordinates(mut self, swap: bool) -> Self {
        self.input.swap_coordinates = swap;
        self
    }
}

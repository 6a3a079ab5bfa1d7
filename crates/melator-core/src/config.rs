// Configuration loading and parsing (melator.toml).
//
// Every empirical constant the engine uses (trend thresholds, scoring
// weights, the attempt ceiling) lives here as a named field whose default
// matches the published behavior. Missing sections fall back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name looked up under `config/` (and copied from `defaults/`).
pub const CONFIG_FILE_NAME: &str = "melator.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub data: DataConfig,
    pub generator: GeneratorConfig,
    pub analysis: AnalysisConfig,
    pub pulse: PulseConfig,
}

/// Raw deserialization target for the entire melator.toml file.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    data: DataConfig,
    #[serde(default)]
    generator: GeneratorConfig,
    #[serde(default)]
    analysis: AnalysisConfig,
    #[serde(default)]
    pulse: PulseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path of the draw history CSV, relative to the working directory.
    pub draws_csv: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            draws_csv: "data/draws.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Ceiling on rejection-sampling attempts per generation call.
    pub max_attempts: u32,
    /// How many attempts run between checks of the cancellation flag.
    pub cancel_check_interval: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_attempts: 150_000,
            cancel_check_interval: 1_024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of most recent draws used for recent frequency and trend.
    pub recent_window: usize,
    /// Multiplier applied to recent frequency when weighting the pool.
    pub pool_recent_weight: f64,
    /// Half-width of the gap ideal range around the mean gap.
    pub gap_margin: f64,
    /// How many decade signatures count as "common".
    pub top_decade_patterns: usize,
    pub trend: TrendConfig,
    pub scoring: ScoringConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            recent_window: 100,
            pool_recent_weight: 1.5,
            gap_margin: 2.0,
            top_decade_patterns: 5,
            trend: TrendConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Predictive index thresholds and composite-score weights.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub ascending_threshold: f64,
    pub descending_threshold: f64,
    pub recent_frequency_weight: f64,
    pub slope_weight: f64,
    pub cold_streak_weight: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            ascending_threshold: 0.015,
            descending_threshold: -0.015,
            recent_frequency_weight: 0.5,
            slope_weight: 20.0,
            cold_streak_weight: 0.25,
        }
    }
}

/// Points and thresholds used by the combination analyzer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub sum_ideal_points: u32,
    pub sum_acceptable_points: u32,
    /// Occurrence percentage above which a pattern is "Very Common".
    pub very_common_percent: f64,
    /// Occurrence percentage above which a pattern is "Common".
    pub common_percent: f64,
    pub very_common_points: u32,
    pub common_points: u32,
    pub decade_common_points: u32,
    pub gap_ideal_points: u32,
    pub strong_threshold: u32,
    pub balanced_threshold: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            sum_ideal_points: 3,
            sum_acceptable_points: 1,
            very_common_percent: 25.0,
            common_percent: 10.0,
            very_common_points: 2,
            common_points: 1,
            decade_common_points: 2,
            gap_ideal_points: 2,
            strong_threshold: 9,
            balanced_threshold: 6,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Community pulse endpoint. Pulse is disabled when absent or empty.
    pub endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config from TOML text.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        data: file.data,
        generator: file.generator,
        analysis: file.analysis,
        pulse: file.pulse,
    };

    validate(&config)?;
    Ok(config)
}

/// Load and validate configuration from `config/melator.toml` relative to
/// `base_dir`. Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Make sure `config/melator.toml` exists, seeding it from
/// `defaults/melator.toml` when it does not. Returns the path written, or
/// `None` when a config was already in place.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE_NAME);
    if target.is_file() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither config/{CONFIG_FILE_NAME} nor defaults/{CONFIG_FILE_NAME} found in {}",
                base_dir.display()
            ),
        });
    }

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
    })?;
    info!(path = %target.display(), "seeded config from defaults");
    Ok(Some(target))
}

/// Load config relative to `base_dir`, seeding `config/` from `defaults/`
/// on first run.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.draws_csv.trim().is_empty() {
        return Err(invalid("data.draws_csv", "must not be empty"));
    }

    let generator = &config.generator;
    let counts: &[(&str, u32)] = &[
        ("generator.max_attempts", generator.max_attempts),
        (
            "generator.cancel_check_interval",
            generator.cancel_check_interval,
        ),
    ];
    for (name, val) in counts {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    let analysis = &config.analysis;
    if analysis.recent_window == 0 {
        return Err(invalid("analysis.recent_window", "must be > 0"));
    }
    if analysis.top_decade_patterns == 0 {
        return Err(invalid("analysis.top_decade_patterns", "must be > 0"));
    }
    let non_negative: &[(&str, f64)] = &[
        ("analysis.pool_recent_weight", analysis.pool_recent_weight),
        ("analysis.gap_margin", analysis.gap_margin),
    ];
    for (name, val) in non_negative {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    let trend = &analysis.trend;
    if trend.descending_threshold > trend.ascending_threshold {
        return Err(invalid(
            "analysis.trend.descending_threshold",
            format!(
                "must not exceed ascending_threshold ({} > {})",
                trend.descending_threshold, trend.ascending_threshold
            ),
        ));
    }

    let scoring = &analysis.scoring;
    if scoring.common_percent > scoring.very_common_percent {
        return Err(invalid(
            "analysis.scoring.common_percent",
            "must not exceed very_common_percent",
        ));
    }
    if scoring.balanced_threshold > scoring.strong_threshold {
        return Err(invalid(
            "analysis.scoring.balanced_threshold",
            "must not exceed strong_threshold",
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: the workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("../../defaults").exists() {
            cwd.join("../..")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    #[test]
    fn default_file_matches_builtin_defaults() {
        let root = project_root();
        let path = root.join("defaults").join(CONFIG_FILE_NAME);
        let text = fs::read_to_string(&path).unwrap();
        let config = parse_config(&text, &path).expect("defaults should parse");

        assert_eq!(config.generator.max_attempts, 150_000);
        assert_eq!(config.analysis.recent_window, 100);
        assert!((config.analysis.pool_recent_weight - 1.5).abs() < f64::EPSILON);
        assert!((config.analysis.gap_margin - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.analysis.top_decade_patterns, 5);
        assert!((config.analysis.trend.ascending_threshold - 0.015).abs() < f64::EPSILON);
        assert!((config.analysis.trend.slope_weight - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.analysis.scoring.sum_ideal_points, 3);
        assert_eq!(config.analysis.scoring.strong_threshold, 9);
        assert_eq!(config.analysis.scoring.balanced_threshold, 6);
        assert!(config.pulse.endpoint.is_none());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("", Path::new("inline.toml")).unwrap();
        assert_eq!(config.generator.max_attempts, 150_000);
        assert_eq!(config.generator.cancel_check_interval, 1_024);
        assert_eq!(config.data.draws_csv, "data/draws.csv");
        assert!((config.analysis.trend.cold_streak_weight - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let text = "[analysis.scoring]\nstrong_threshold = 10\n";
        let config = parse_config(text, Path::new("inline.toml")).unwrap();
        assert_eq!(config.analysis.scoring.strong_threshold, 10);
        assert_eq!(config.analysis.scoring.balanced_threshold, 6);
        assert_eq!(config.analysis.recent_window, 100);
    }

    #[test]
    fn pulse_endpoint_is_read() {
        let text = "[pulse]\nendpoint = \"https://pulse.example.test/record\"\n";
        let config = parse_config(text, Path::new("inline.toml")).unwrap();
        assert_eq!(
            config.pulse.endpoint.as_deref(),
            Some("https://pulse.example.test/record")
        );
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let text = "[generator]\nmax_attempts = 0\n";
        let err = parse_config(text, Path::new("inline.toml")).unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "generator.max_attempts");
            }
            other => panic!("expected ValidationError, got: {other:?}"),
        }
    }

    #[test]
    fn rejects_inverted_trend_thresholds() {
        let text = "[analysis.trend]\nascending_threshold = -0.1\ndescending_threshold = 0.1\n";
        let err = parse_config(text, Path::new("inline.toml")).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "analysis.trend.descending_threshold"),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn rejects_negative_pool_weight() {
        let text = "[analysis]\npool_recent_weight = -1.0\n";
        let err = parse_config(text, Path::new("inline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn rejects_inverted_recommendation_thresholds() {
        let text = "[analysis.scoring]\nstrong_threshold = 4\nbalanced_threshold = 6\n";
        let err = parse_config(text, Path::new("inline.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let err = parse_config("[generator\nmax_attempts = ", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = temp_dir("melator_config_missing");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn first_run_seeds_config_from_defaults() {
        let tmp = temp_dir("melator_config_copy");
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join(CONFIG_FILE_NAME), "[generator]\nmax_attempts = 10\n").unwrap();

        let copied = ensure_config_file(&tmp).unwrap();
        assert_eq!(copied, Some(tmp.join("config").join(CONFIG_FILE_NAME)));

        let config = load_config(&tmp).unwrap();
        assert_eq!(config.generator.max_attempts, 10);
    }

    #[test]
    fn existing_config_is_left_alone() {
        let tmp = temp_dir("melator_config_existing");
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE_NAME), "[generator]\nmax_attempts = 10\n").unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE_NAME), "[generator]\nmax_attempts = 20\n").unwrap();

        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        assert_eq!(load_config_from(&tmp).unwrap().generator.max_attempts, 20);
    }

    #[test]
    fn existing_config_needs_no_defaults() {
        let tmp = temp_dir("melator_config_no_defaults");
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE_NAME), "").unwrap();
        assert!(load_config(&tmp).is_ok());
    }

    #[test]
    fn missing_config_and_defaults_is_an_error() {
        let tmp = temp_dir("melator_config_nothing");
        let err = ensure_config_file(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::DefaultsCopyError { .. }));

        // an empty config/ directory is not enough either
        fs::create_dir_all(tmp.join("config")).unwrap();
        assert!(matches!(
            load_config(&tmp).unwrap_err(),
            ConfigError::DefaultsCopyError { .. }
        ));
    }
}

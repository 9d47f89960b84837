use crate::error::{Result, SplitterError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Options controlling one splitting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingOptions {
    /// Collapse exact duplicates and resolve near-duplicate/overlap conflicts
    pub enable_deduplication: bool,

    /// Similarity at or above which two chunks are near-duplicates (0..=1)
    pub deduplication_threshold: f64,

    /// Conflict resolution policy
    pub merge_strategy: MergeStrategy,

    /// Span overlap ratio at or above which two chunks conflict (0..=1)
    pub max_overlap_ratio: f64,

    /// Minimum number of lines per chunk
    pub min_lines: usize,

    /// Minimum number of characters per chunk (after trimming)
    pub min_chars: usize,

    /// Maximum number of characters per chunk (after trimming)
    pub max_chars: usize,

    /// Complexity scoring settings
    pub complexity: ComplexityConfig,

    /// Per-file processing budget
    pub budget: ProcessingBudget,

    /// Per-construct validation thresholds (language profiles may override)
    pub thresholds: ConstructThresholds,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            enable_deduplication: true,
            deduplication_threshold: 0.8,
            merge_strategy: MergeStrategy::Conservative,
            max_overlap_ratio: 0.3,
            min_lines: 1,
            min_chars: 1,
            max_chars: 3000,
            complexity: ComplexityConfig::default(),
            budget: ProcessingBudget::default(),
            thresholds: ConstructThresholds::default(),
        }
    }
}

impl ChunkingOptions {
    /// Stricter floors and more eager near-duplicate detection
    pub fn strict() -> Self {
        Self {
            deduplication_threshold: 0.7,
            max_overlap_ratio: 0.2,
            min_chars: 20,
            thresholds: ConstructThresholds {
                function_min_body_chars: 8,
                ..ConstructThresholds::default()
            },
            ..Default::default()
        }
    }

    /// Smaller chunks for embedding models with short context windows
    pub fn for_embeddings() -> Self {
        Self {
            max_chars: 1500,
            ..Default::default()
        }
    }

    /// Parse options from JSON or TOML text, then validate them
    pub fn from_str_any(text: &str) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(json_err) => {
                let toml_value: toml::Value = toml::from_str(text).map_err(|toml_err| {
                    SplitterError::ConfigFormat(format!(
                        "options are not valid JSON ({json_err}) or TOML ({toml_err})"
                    ))
                })?;
                serde_json::to_value(toml_value).map_err(|err| {
                    SplitterError::ConfigFormat(format!("failed to convert TOML options: {err}"))
                })?
            }
        };

        let options: Self = serde_json::from_value(value)
            .map_err(|err| SplitterError::invalid_config(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON or TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_str_any(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("deduplication_threshold", self.deduplication_threshold)?;
        check_unit_interval("max_overlap_ratio", self.max_overlap_ratio)?;

        if self.min_lines == 0 {
            return Err(SplitterError::invalid_config("min_lines must be >= 1"));
        }

        if self.max_chars == 0 {
            return Err(SplitterError::invalid_config("max_chars must be > 0"));
        }

        if self.min_chars > self.max_chars {
            return Err(SplitterError::invalid_config(format!(
                "min_chars ({}) cannot exceed max_chars ({})",
                self.min_chars, self.max_chars
            )));
        }

        self.complexity.validate()?;
        self.budget.validate()?;
        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SplitterError::invalid_config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_weight(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SplitterError::invalid_config(format!(
            "{name} must be a non-negative finite number, got {value}"
        )))
    }
}

/// How conflicting (near-duplicate or heavily overlapping) chunks are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Drop a contained chunk in favour of its container; otherwise keep both
    #[default]
    #[serde(alias = "Conservative")]
    Conservative,

    /// Like Conservative for containment, but union-merge partially overlapping
    /// or adjacent near-duplicates into one chunk
    #[serde(alias = "Aggressive")]
    Aggressive,
}

impl MergeStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }
}

impl FromStr for MergeStrategy {
    type Err = SplitterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(SplitterError::invalid_config(format!(
                "unknown merge strategy '{other}' (expected 'conservative' or 'aggressive')"
            ))),
        }
    }
}

/// Weights for the complexity calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplexityConfig {
    /// Use indentation/bracket depth analysis where the language supports it
    pub enable_nesting_analysis: bool,

    /// Score added per indentation level (indent-structured languages)
    pub python_indent_weight: f64,

    /// Score added per bracket nesting level (brace-delimited languages)
    pub nesting_depth_weight: f64,

    /// Columns per indentation level; a tab counts as one full level
    pub indent_unit: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            enable_nesting_analysis: true,
            python_indent_weight: 2.0,
            nesting_depth_weight: 1.5,
            indent_unit: 4,
        }
    }
}

impl ComplexityConfig {
    fn validate(&self) -> Result<()> {
        check_weight("complexity.python_indent_weight", self.python_indent_weight)?;
        check_weight("complexity.nesting_depth_weight", self.nesting_depth_weight)?;
        if self.indent_unit == 0 {
            return Err(SplitterError::invalid_config(
                "complexity.indent_unit must be > 0",
            ));
        }
        Ok(())
    }
}

/// Limits applied to a single file before and during the AST pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingBudget {
    /// Wall-clock deadline for parse + extract + coordinate
    pub timeout_ms: u64,

    /// Larger files skip the AST pipeline
    pub max_file_bytes: usize,

    /// More candidates than this skip the coordinator's AST run
    pub max_candidates: usize,

    /// Chunks ending this many lines before a candidate's start are still compared with it
    pub comparison_window_lines: usize,

    /// Upper bound on retained chunks compared with each candidate
    pub max_active_comparisons: usize,
}

impl Default for ProcessingBudget {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_file_bytes: 2 * 1024 * 1024,
            max_candidates: 4_000,
            comparison_window_lines: 1,
            max_active_comparisons: 64,
        }
    }
}

impl ProcessingBudget {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(SplitterError::invalid_config("budget.timeout_ms must be > 0"));
        }
        if self.max_candidates == 0 {
            return Err(SplitterError::invalid_config(
                "budget.max_candidates must be > 0",
            ));
        }
        if self.max_active_comparisons == 0 {
            return Err(SplitterError::invalid_config(
                "budget.max_active_comparisons must be > 0",
            ));
        }
        Ok(())
    }
}

/// Structural thresholds used by the per-construct validators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstructThresholds {
    pub function_min_lines: usize,
    /// Non-whitespace, non-comment characters required inside a function body
    pub function_min_body_chars: usize,
    pub class_min_lines: usize,
    pub namespace_min_lines: usize,
    pub template_min_lines: usize,
    pub import_max_lines: usize,
    /// Deepest subtree a generic (fallback) chunk may cover
    pub max_nesting_level: usize,
}

impl Default for ConstructThresholds {
    fn default() -> Self {
        Self {
            function_min_lines: 1,
            function_min_body_chars: 1,
            class_min_lines: 1,
            namespace_min_lines: 1,
            template_min_lines: 1,
            import_max_lines: 50,
            max_nesting_level: 24,
        }
    }
}

impl ConstructThresholds {
    /// Apply per-language overrides on top of these thresholds
    #[must_use]
    pub fn with_overrides(self, overrides: &ThresholdOverrides) -> Self {
        Self {
            function_min_lines: overrides
                .function_min_lines
                .unwrap_or(self.function_min_lines),
            function_min_body_chars: overrides
                .function_min_body_chars
                .unwrap_or(self.function_min_body_chars),
            class_min_lines: overrides.class_min_lines.unwrap_or(self.class_min_lines),
            namespace_min_lines: overrides
                .namespace_min_lines
                .unwrap_or(self.namespace_min_lines),
            template_min_lines: overrides
                .template_min_lines
                .unwrap_or(self.template_min_lines),
            import_max_lines: overrides.import_max_lines.unwrap_or(self.import_max_lines),
            max_nesting_level: overrides
                .max_nesting_level
                .unwrap_or(self.max_nesting_level),
        }
    }
}

/// Partial thresholds supplied by a language profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThresholdOverrides {
    pub function_min_lines: Option<usize>,
    pub function_min_body_chars: Option<usize>,
    pub class_min_lines: Option<usize>,
    pub namespace_min_lines: Option<usize>,
    pub template_min_lines: Option<usize>,
    pub import_max_lines: Option<usize>,
    pub max_nesting_level: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let options = ChunkingOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.enable_deduplication);
        assert_eq!(options.merge_strategy, MergeStrategy::Conservative);
        assert_eq!(options.max_chars, 3000);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(ChunkingOptions::strict().validate().is_ok());
        assert!(ChunkingOptions::for_embeddings().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut options = ChunkingOptions {
            deduplication_threshold: 1.5,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        options.deduplication_threshold = f64::NAN;
        assert!(options.validate().is_err());

        options.deduplication_threshold = 0.8;
        options.max_overlap_ratio = -0.1;
        assert!(options.validate().is_err());

        options.max_overlap_ratio = 0.3;
        options.min_chars = 10;
        options.max_chars = 5;
        assert!(options.validate().is_err());

        options.max_chars = 0;
        options.min_chars = 0;
        assert!(options.validate().is_err());

        options.max_chars = 100;
        options.complexity.indent_unit = 0;
        assert!(options.validate().is_err());

        options.complexity.indent_unit = 2;
        options.complexity.nesting_depth_weight = -1.0;
        assert!(options.validate().is_err());

        options.complexity.nesting_depth_weight = 1.0;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn merge_strategy_parses_case_insensitively() {
        assert_eq!(
            "Aggressive".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::Aggressive
        );
        assert_eq!(
            " conservative ".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::Conservative
        );
        assert!(matches!(
            "greedy".parse::<MergeStrategy>(),
            Err(SplitterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn parses_toml_options() {
        let text = r#"
merge_strategy = "aggressive"
deduplication_threshold = 0.9

[budget]
timeout_ms = 250

[thresholds]
function_min_body_chars = 3
"#;
        let options = ChunkingOptions::from_str_any(text).unwrap();
        assert_eq!(options.merge_strategy, MergeStrategy::Aggressive);
        assert!((options.deduplication_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(options.budget.timeout_ms, 250);
        assert_eq!(options.thresholds.function_min_body_chars, 3);
        assert_eq!(options.max_chars, 3000);
    }

    #[test]
    fn parses_json_options() {
        let options =
            ChunkingOptions::from_str_any(r#"{"enable_deduplication": false, "max_chars": 800}"#)
                .unwrap();
        assert!(!options.enable_deduplication);
        assert_eq!(options.max_chars, 800);
    }

    #[test]
    fn rejects_unknown_merge_strategy_and_fields() {
        let err = ChunkingOptions::from_str_any(r#"merge_strategy = "greedy""#).unwrap_err();
        assert!(matches!(err, SplitterError::InvalidConfig(_)), "{err}");

        let err = ChunkingOptions::from_str_any(r#"{"max_charz": 10}"#).unwrap_err();
        assert!(matches!(err, SplitterError::InvalidConfig(_)), "{err}");

        let err = ChunkingOptions::from_str_any("max_overlap_ratio = 2.0").unwrap_err();
        assert!(matches!(err, SplitterError::InvalidConfig(_)), "{err}");

        let err = ChunkingOptions::from_str_any("this is = = not config").unwrap_err();
        assert!(matches!(err, SplitterError::ConfigFormat(_)), "{err}");
    }

    #[test]
    fn loads_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitter.toml");
        std::fs::write(&path, "min_chars = 5\n").unwrap();

        let options = ChunkingOptions::load(&path).unwrap();
        assert_eq!(options.min_chars, 5);

        let missing = ChunkingOptions::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(SplitterError::IoError(_))));
    }

    #[test]
    fn threshold_overrides_apply_selectively() {
        let base = ConstructThresholds::default();
        let merged = base.with_overrides(&ThresholdOverrides {
            import_max_lines: Some(5),
            ..Default::default()
        });
        assert_eq!(merged.import_max_lines, 5);
        assert_eq!(merged.function_min_lines, base.function_min_lines);
    }
}

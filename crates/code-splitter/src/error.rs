use crate::types::DegradeReason;
use thiserror::Error;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitterError>;

/// Errors that can occur while splitting a source unit
#[derive(Error, Debug)]
pub enum SplitterError {
    /// Invalid configuration (threshold out of range, unknown merge strategy, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be decoded as JSON or TOML
    #[error("Unreadable configuration: {0}")]
    ConfigFormat(String),

    /// The parser produced no tree at all
    #[error("Parse error: {0}")]
    ParseError(String),

    /// No grammar or profile is registered for the language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// The per-file processing deadline expired
    #[error("Processing deadline exceeded during {stage}")]
    Timeout { stage: &'static str },

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SplitterError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// Fallback reason when the splitter should degrade instead of failing
    #[must_use]
    pub const fn degrade_reason(&self) -> Option<DegradeReason> {
        match self {
            Self::ParseError(_) | Self::TreeSitterError(_) => Some(DegradeReason::ParseFailure),
            Self::UnsupportedLanguage(_) => Some(DegradeReason::UnsupportedGrammar),
            Self::Timeout { .. } => Some(DegradeReason::Timeout),
            Self::InvalidConfig(_) | Self::ConfigFormat(_) | Self::IoError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pipeline_failures_degrade() {
        assert_eq!(
            SplitterError::parse("bad").degrade_reason(),
            Some(DegradeReason::ParseFailure)
        );
        assert_eq!(
            SplitterError::unsupported_language("cobol").degrade_reason(),
            Some(DegradeReason::UnsupportedGrammar)
        );
        assert_eq!(
            SplitterError::Timeout { stage: "parse" }.degrade_reason(),
            Some(DegradeReason::Timeout)
        );
        assert!(SplitterError::invalid_config("min_lines")
            .degrade_reason()
            .is_none());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(SplitterError::from(io).degrade_reason().is_none());
    }
}

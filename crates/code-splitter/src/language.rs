use crate::error::{Result, SplitterError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Unknown,
}

/// How nesting is expressed in a language's source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingStyle {
    /// Blocks are expressed through indentation
    Indent,
    /// Blocks are delimited by brackets
    Bracket,
    /// No reliable depth signal
    None,
}

/// Comment syntax used when separating code from commentary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: Option<(&'static str, &'static str)>,
}

impl CommentSyntax {
    pub const NONE: Self = Self {
        line: &[],
        block: None,
    };
    const C_LIKE: Self = Self {
        line: &["//"],
        block: Some(("/*", "*/")),
    };
    const HASH: Self = Self {
        line: &["#"],
        block: None,
    };
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" | "pyi" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Resolve a language tag such as `"rust"`, `"py"` or `"c++"`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "rust" => Language::Rust,
            "python" | "python3" => Language::Python,
            "javascript" | "ecmascript" | "node" => Language::JavaScript,
            "typescript" => Language::TypeScript,
            "golang" => Language::Go,
            "c++" | "cplusplus" => Language::Cpp,
            "c#" | "csharp" => Language::CSharp,
            "ruby" => Language::Ruby,
            "kotlin" => Language::Kotlin,
            other => Self::from_extension(other),
        }
    }

    /// Resolve from a tag first and fall back to the path extension
    pub fn resolve(tag: &str, path: &str) -> Self {
        match Self::from_tag(tag) {
            Language::Unknown => Self::from_path(path),
            language => language,
        }
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }

    /// Check if this language is supported for AST parsing
    pub fn supports_ast(self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::Python
                | Language::JavaScript
                | Language::TypeScript
                | Language::Go
                | Language::C
                | Language::Cpp
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Go => Ok(tree_sitter_go::LANGUAGE.into()),
            Language::C => Ok(tree_sitter_c::LANGUAGE.into()),
            Language::Cpp => Ok(tree_sitter_cpp::LANGUAGE.into()),
            _ => Err(SplitterError::unsupported_language(self.as_str())),
        }
    }

    /// Comment syntax for this language
    pub fn comment_syntax(self) -> CommentSyntax {
        match self {
            Language::Rust
            | Language::JavaScript
            | Language::TypeScript
            | Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Swift
            | Language::Kotlin => CommentSyntax::C_LIKE,
            Language::Python | Language::Ruby => CommentSyntax::HASH,
            Language::Unknown => CommentSyntax::NONE,
        }
    }

    /// Whether declarations are normally closed by `;`
    pub fn terminates_statements(self) -> bool {
        !matches!(
            self,
            Language::Python
                | Language::Go
                | Language::Ruby
                | Language::Swift
                | Language::Kotlin
                | Language::Unknown
        )
    }

    /// Whether nesting is indentation- or bracket-structured
    pub fn nesting_style(self) -> NestingStyle {
        match self {
            Language::Python => NestingStyle::Indent,
            Language::Ruby | Language::Unknown => NestingStyle::None,
            _ => NestingStyle::Bracket,
        }
    }
}

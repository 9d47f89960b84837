//! # Context Code Splitter
//!
//! Splits source files into semantically meaningful, deduplicated chunks for indexing,
//! retrieval and embedding.
//!
//! ## Philosophy
//!
//! Chunks follow syntactic boundaries (functions, classes, namespaces, imports) whenever
//! the syntax tree allows it, and every non-blank line still ends up in some chunk:
//! - Lines no construct claims are grouped into generic chunks
//! - Files without a usable tree degrade to paragraph splitting instead of failing
//! - Nothing reaches the output without passing structural validation
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit
//!     │
//!     ├──> Routing (language tag / extension, file-type sniffing)
//!     │    └─> documents ──> paragraph splitter ─────────────┐
//!     │                                                      │
//!     ├──> Tree-sitter parsing → SyntaxTree (deadline)       │
//!     │    └─> no tree / timeout / budget ──> fallback ──────┤
//!     │                                                      │
//!     ├──> Boundary extraction (construct registry)          │
//!     │    └─> CandidateChunk[] with full line coverage      │
//!     │                                                      ▼
//!     └──> Coordinator
//!          ├─> Validate (location, base rules, per-construct checks)
//!          ├─> Content id + complexity
//!          ├─> Exact dedup, windowed conflict sweep (conservative / aggressive)
//!          └─> ChunkSet { chunks, stats, mode, degraded }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_code_splitter::{split, ChunkingOptions, ConstructKind};
//!
//! let code = r#"
//! use std::collections::HashMap;
//!
//! fn count_words(text: &str) -> HashMap<&str, usize> {
//!     let mut counts = HashMap::new();
//!     for word in text.split_whitespace() {
//!         *counts.entry(word).or_insert(0) += 1;
//!     }
//!     counts
//! }
//! "#;
//!
//! let set = split(code, "rust", "src/words.rs", &ChunkingOptions::default()).unwrap();
//! assert!(!set.is_degraded());
//! assert!(set
//!     .chunks()
//!     .iter()
//!     .any(|chunk| chunk.construct_kind() == ConstructKind::Function));
//! for chunk in set.chunks() {
//!     println!(
//!         "{} lines {}-{} [{}]",
//!         chunk.construct_kind().as_str(),
//!         chunk.start_line(),
//!         chunk.end_line(),
//!         &chunk.id()[..12]
//!     );
//! }
//! ```

pub mod complexity;
mod config;
pub mod coordinator;
mod error;
pub mod extractor;
pub mod file_type;
pub mod identity;
mod language;
pub mod lexical;
mod limits;
mod lines;
pub mod profile;
pub mod similarity;
mod splitter;
pub mod syntax;
pub mod text_split;
mod types;
pub mod validate;

pub use config::{
    ChunkingOptions, ComplexityConfig, ConstructThresholds, MergeStrategy, ProcessingBudget,
    ThresholdOverrides,
};
pub use error::{Result, SplitterError};
pub use language::{CommentSyntax, Language, NestingStyle};
pub use limits::{splitter_worker_limit, Deadline};
pub use profile::{ConstructClassifier, ConstructRegistry, LanguageProfile};
pub use splitter::{split, Splitter};
pub use syntax::{NodeId, SyntaxParser, SyntaxTree, TreeSitterParser};
pub use types::{
    CandidateChunk, Chunk, ChunkSet, ChunkSetStats, ComplexityMethod, ComplexityProfile,
    ConstructKind, DegradeReason, SourceUnit, Span, SplitMode, ValidationDetails,
    ValidationOutcome,
};

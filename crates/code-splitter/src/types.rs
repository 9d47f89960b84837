use crate::config::ChunkingOptions;
use crate::syntax::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// Category of a semantically meaningful source unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructKind {
    /// Function, method or procedure
    Function,
    /// Class, struct, enum, trait, interface or impl block
    Class,
    /// Module or namespace
    Namespace,
    /// Template or macro definition
    Template,
    /// Import/use/include statement
    Import,
    /// Fallback grouping of lines not claimed by a recognized construct
    Generic,
}

impl ConstructKind {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Namespace => "namespace",
            Self::Template => "template",
            Self::Import => "import",
            Self::Generic => "generic",
        }
    }

    #[must_use]
    pub const fn is_generic(self) -> bool {
        matches!(self, Self::Generic)
    }
}

/// Inclusive, 1-indexed line span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Get the number of lines in this span
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if span contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Check if this span fully contains another
    #[must_use]
    pub const fn contains(&self, other: &Span) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }

    /// Number of lines shared by both spans
    #[must_use]
    pub fn overlap_lines(&self, other: &Span) -> usize {
        let start = self.start_line.max(other.start_line);
        let end = self.end_line.min(other.end_line);
        if end < start {
            0
        } else {
            end - start + 1
        }
    }

    /// Fraction of the longer span covered by the shorter one, in `[0, 1]`
    #[must_use]
    pub fn overlap_ratio(&self, other: &Span) -> f64 {
        let longest = self.line_count().max(other.line_count());
        if longest == 0 {
            return 0.0;
        }
        self.overlap_lines(other) as f64 / longest as f64
    }

    /// Smallest span covering both
    #[must_use]
    pub fn union(&self, other: &Span) -> Span {
        Span::new(
            self.start_line.min(other.start_line),
            self.end_line.max(other.end_line),
        )
    }
}

/// A raw chunk emitted by extraction, before validation and scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateChunk {
    pub construct_kind: ConstructKind,
    pub span: Span,
    /// Byte range of `text` within the source
    pub byte_range: Range<usize>,
    pub text: String,
    /// Syntax nodes consumed by this candidate (empty for text-mode candidates)
    pub originating_node_ids: Vec<NodeId>,
}

impl CandidateChunk {
    pub fn new(
        construct_kind: ConstructKind,
        span: Span,
        byte_range: Range<usize>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            construct_kind,
            span,
            byte_range,
            text: text.into(),
            originating_node_ids: Vec::new(),
        }
    }

    /// Builder: set originating node ids
    #[must_use]
    pub fn with_nodes(mut self, ids: Vec<NodeId>) -> Self {
        self.originating_node_ids = ids;
        self
    }

    /// Whether this candidate's bytes fully contain the other's
    #[must_use]
    pub fn contains(&self, other: &CandidateChunk) -> bool {
        self.byte_range.start <= other.byte_range.start
            && other.byte_range.end <= self.byte_range.end
    }
}

/// Measurements gathered while validating a candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetails {
    pub line_count: usize,
    /// Character count of the trimmed text
    pub size: usize,
    pub non_whitespace: usize,
}

/// Result of a structural validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub details: ValidationDetails,
}

impl ValidationOutcome {
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// First error message, used as the rejection reason
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

/// How a complexity score was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityMethod {
    Indent,
    Bracket,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityProfile {
    pub score: f64,
    pub max_depth: usize,
    pub method: ComplexityMethod,
}

/// A validated, scored and identified chunk; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    id: String,
    construct_kind: ConstructKind,
    start_line: usize,
    end_line: usize,
    byte_range: Range<usize>,
    text: String,
    complexity: ComplexityProfile,
    originating_node_ids: Vec<NodeId>,
}

impl Chunk {
    pub(crate) fn freeze(
        candidate: CandidateChunk,
        id: String,
        complexity: ComplexityProfile,
    ) -> Self {
        Self {
            id,
            construct_kind: candidate.construct_kind,
            start_line: candidate.span.start_line,
            end_line: candidate.span.end_line,
            byte_range: candidate.byte_range,
            text: candidate.text,
            complexity,
            originating_node_ids: candidate.originating_node_ids,
        }
    }

    /// Content-addressed identity
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn construct_kind(&self) -> ConstructKind {
        self.construct_kind
    }

    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.start_line
    }

    #[must_use]
    pub const fn end_line(&self) -> usize {
        self.end_line
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start_line, self.end_line)
    }

    /// Byte range of the text within the source
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.byte_range.clone()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn complexity(&self) -> &ComplexityProfile {
        &self.complexity
    }

    #[must_use]
    pub const fn complexity_score(&self) -> f64 {
        self.complexity.score
    }

    #[must_use]
    pub fn originating_node_ids(&self) -> &[NodeId] {
        &self.originating_node_ids
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.span().line_count()
    }
}

/// Counters describing one coordinator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSetStats {
    pub total_candidates: usize,
    /// Candidates dropped by validation
    pub rejected: usize,
    /// Rejection reason -> count
    pub rejection_reasons: BTreeMap<String, usize>,
    /// Candidates dropped because their content id was already present
    pub duplicates_removed: usize,
    /// Conflicts resolved by dropping a contained chunk or union-merging a pair
    pub merged_count: usize,
    /// Pairwise conflict checks performed
    pub comparisons: usize,
}

impl ChunkSetStats {
    pub(crate) fn add_rejection(&mut self, reason: &str) {
        self.rejected += 1;
        *self
            .rejection_reasons
            .entry(reason.to_string())
            .or_insert(0) += 1;
    }
}

impl std::fmt::Display for ChunkSetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Candidates: {} | Rejected: {} | Duplicates: {} | Merged: {} | Comparisons: {}",
            self.total_candidates,
            self.rejected,
            self.duplicates_removed,
            self.merged_count,
            self.comparisons
        )
    }
}

/// Which path produced a chunk set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Syntax-tree extraction
    Ast,
    /// Non-code document split by sections and paragraphs
    PlainText,
    /// Coarse line/paragraph grouping after the AST pipeline was abandoned
    Fallback,
}

/// Why the AST pipeline was abandoned for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    ParseFailure,
    UnsupportedGrammar,
    Timeout,
    FileTooLarge,
    CandidateBudget,
}

/// Final ordered chunks for one source unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSet {
    pub path: String,
    pub language: String,
    pub mode: SplitMode,
    pub degraded: Option<DegradeReason>,
    chunks: Vec<Chunk>,
    pub stats: ChunkSetStats,
}

impl ChunkSet {
    pub(crate) fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        mode: SplitMode,
        chunks: Vec<Chunk>,
        stats: ChunkSetStats,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            mode,
            degraded: None,
            chunks,
            stats,
        }
    }

    #[must_use]
    pub(crate) fn degraded_by(mut self, reason: DegradeReason) -> Self {
        self.degraded = Some(reason);
        self
    }

    /// Chunks ordered by start line
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Hand the chunks over to a downstream consumer
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Immutable input to one splitting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub content: String,
    /// Language tag such as `"rust"` or `"py"`; may be empty
    pub language: String,
    pub path: String,
    pub options: ChunkingOptions,
}

impl SourceUnit {
    pub fn new(
        content: impl Into<String>,
        language: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            language: language.into(),
            path: path.into(),
            options: ChunkingOptions::default(),
        }
    }

    /// Builder: set options
    #[must_use]
    pub fn with_options(mut self, options: ChunkingOptions) -> Self {
        self.options = options;
        self
    }
}

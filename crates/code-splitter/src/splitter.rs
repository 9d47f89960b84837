use crate::config::ChunkingOptions;
use crate::coordinator::ChunkingCoordinator;
use crate::error::Result;
use crate::extractor::BoundaryExtractor;
use crate::file_type::{detect_file_type, FileType};
use crate::language::Language;
use crate::limits::{splitter_worker_limit, Deadline};
use crate::profile::{ConstructClassifier, ConstructRegistry};
use crate::syntax::{SyntaxParser, SyntaxTree, TreeSitterParser};
use crate::text_split::split_text;
use crate::types::{CandidateChunk, ChunkSet, DegradeReason, SourceUnit, SplitMode};
use log::{debug, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Split one source text with the built-in language profiles
pub fn split(
    content: &str,
    language: &str,
    path: &str,
    options: &ChunkingOptions,
) -> Result<ChunkSet> {
    Splitter::new(options.clone())?.split_str(content, language, path)
}

/// Result of the AST pipeline when it did not fail outright
enum AstOutcome {
    Split(ChunkSet),
    Degraded(DegradeReason),
}

/// Main splitter interface: routes each source unit to the AST pipeline, the plain-text
/// splitter or the coarse fallback
#[derive(Debug)]
pub struct Splitter {
    options: ChunkingOptions,
    registry: ConstructRegistry,
}

impl Splitter {
    /// Create a splitter with the built-in construct registry
    pub fn new(options: ChunkingOptions) -> Result<Self> {
        Self::with_registry(options, ConstructRegistry::builtin())
    }

    pub fn with_registry(options: ChunkingOptions, registry: ConstructRegistry) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, registry })
    }

    #[must_use]
    pub fn options(&self) -> &ChunkingOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &ConstructRegistry {
        &self.registry
    }

    /// Split a string using this splitter's options
    pub fn split_str(&self, content: &str, language: &str, path: &str) -> Result<ChunkSet> {
        let unit = SourceUnit::new(content, language, path).with_options(self.options.clone());
        self.split_unit(&unit)
    }

    /// Split one unit with a fresh tree-sitter parser and the unit's own options
    pub fn split_unit(&self, unit: &SourceUnit) -> Result<ChunkSet> {
        self.split_with_parser(unit, &mut TreeSitterParser::new())
    }

    /// Split one unit, obtaining its syntax tree from `parser`
    pub fn split_with_parser(
        &self,
        unit: &SourceUnit,
        parser: &mut dyn SyntaxParser,
    ) -> Result<ChunkSet> {
        unit.options.validate()?;
        let language = Language::resolve(&unit.language, &unit.path);
        let file_type = detect_file_type(&unit.path, language, &unit.content);

        if unit.content.trim().is_empty() {
            let mode = if file_type.is_code() {
                SplitMode::Ast
            } else {
                SplitMode::PlainText
            };
            return Ok(ChunkSet::new(
                &unit.path,
                language.as_str(),
                mode,
                Vec::new(),
                Default::default(),
            ));
        }

        if !file_type.is_code() {
            debug!(
                "{}: routed to plain-text splitting as {}",
                unit.path,
                file_type.as_str()
            );
            return self.split_plain(unit, language, file_type, SplitMode::PlainText);
        }

        let budget = &unit.options.budget;
        if unit.content.len() > budget.max_file_bytes {
            return self.degrade(unit, language, DegradeReason::FileTooLarge);
        }
        if !language.supports_ast() || !self.registry.supports(language) {
            return self.degrade(unit, language, DegradeReason::UnsupportedGrammar);
        }

        let deadline = Deadline::after(budget.timeout());
        let attempt = parser
            .parse(language, &unit.content, &deadline)
            .and_then(|tree| self.run_ast(unit, language, &tree, &deadline));
        self.settle(unit, language, attempt)
    }

    /// Split one unit from a tree the caller already owns
    pub fn split_tree(&self, unit: &SourceUnit, tree: &SyntaxTree) -> Result<ChunkSet> {
        unit.options.validate()?;
        let language = Language::resolve(&unit.language, &unit.path);
        let deadline = Deadline::after(unit.options.budget.timeout());
        let attempt = self.run_ast(unit, language, tree, &deadline);
        self.settle(unit, language, attempt)
    }

    /// Split many units on a rayon pool sized by `splitter_worker_limit`, one parser per
    /// worker.
    ///
    /// Results come back in input order.
    pub fn split_batch(&self, units: &[SourceUnit]) -> Vec<Result<ChunkSet>> {
        let workers = splitter_worker_limit().min(units.len());
        if workers <= 1 {
            return self.split_sequential(units);
        }

        let pool = match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool,
            Err(err) => {
                warn!("batch thread pool unavailable, splitting sequentially: {err}");
                return self.split_sequential(units);
            }
        };
        debug!("splitting {} units on {workers} workers", units.len());
        pool.install(|| {
            units
                .par_iter()
                .map_init(TreeSitterParser::new, |parser, unit| {
                    self.split_with_parser(unit, parser)
                })
                .collect()
        })
    }

    fn split_sequential(&self, units: &[SourceUnit]) -> Vec<Result<ChunkSet>> {
        let mut parser = TreeSitterParser::new();
        units
            .iter()
            .map(|unit| self.split_with_parser(unit, &mut parser))
            .collect()
    }

    fn run_ast(
        &self,
        unit: &SourceUnit,
        language: Language,
        tree: &SyntaxTree,
        deadline: &Deadline,
    ) -> Result<AstOutcome> {
        let options = &unit.options;
        if tree.has_errors() {
            debug!("{}: syntax tree has error nodes", unit.path);
        }

        let candidates = BoundaryExtractor::new(&self.registry, language, options.max_chars)
            .extract(tree, &unit.content, deadline)?;
        if candidates.len() > options.budget.max_candidates {
            debug!(
                "{}: {} candidates exceed the budget of {}",
                unit.path,
                candidates.len(),
                options.budget.max_candidates
            );
            return Ok(AstOutcome::Degraded(DegradeReason::CandidateBudget));
        }

        let thresholds = options
            .thresholds
            .with_overrides(&self.registry.threshold_overrides(language));
        let coordinator = ChunkingCoordinator::new(options, language, thresholds)?;
        let (chunks, stats) =
            coordinator.coordinate(candidates, &unit.content, Some(tree), deadline)?;
        debug!(
            "{}: {} chunks in {:?} ({stats})",
            unit.path,
            chunks.len(),
            deadline.elapsed()
        );
        Ok(AstOutcome::Split(ChunkSet::new(
            &unit.path,
            language.as_str(),
            SplitMode::Ast,
            chunks,
            stats,
        )))
    }

    /// Turn recoverable AST failures into a degraded fallback split
    fn settle(
        &self,
        unit: &SourceUnit,
        language: Language,
        attempt: Result<AstOutcome>,
    ) -> Result<ChunkSet> {
        let reason = match attempt {
            Ok(AstOutcome::Split(set)) => return Ok(set),
            Ok(AstOutcome::Degraded(reason)) => reason,
            Err(err) => match err.degrade_reason() {
                Some(reason) => {
                    debug!("{}: {err}", unit.path);
                    reason
                }
                None => return Err(err),
            },
        };
        self.degrade(unit, language, reason)
    }

    fn degrade(
        &self,
        unit: &SourceUnit,
        language: Language,
        reason: DegradeReason,
    ) -> Result<ChunkSet> {
        warn!(
            "{}: falling back to coarse splitting ({reason:?})",
            unit.path
        );
        Ok(self
            .split_plain(unit, language, FileType::Code, SplitMode::Fallback)?
            .degraded_by(reason))
    }

    /// Paragraph split followed by the regular coordinator, without a deadline
    fn split_plain(
        &self,
        unit: &SourceUnit,
        language: Language,
        file_type: FileType,
        mode: SplitMode,
    ) -> Result<ChunkSet> {
        let options = &unit.options;
        let candidates: Vec<CandidateChunk> =
            split_text(&unit.content, file_type, options.max_chars);
        let coordinator = ChunkingCoordinator::new(options, language, options.thresholds)?;
        let (chunks, stats) =
            coordinator.coordinate(candidates, &unit.content, None, &Deadline::unbounded())?;
        Ok(ChunkSet::new(
            &unit.path,
            language.as_str(),
            mode,
            chunks,
            stats,
        ))
    }
}

//! Chunking coordinator.
//!
//! Turns the raw candidates of one source unit into final chunks:
//!
//! ```text
//! candidates ─▶ validate ─▶ id + complexity ─▶ exact dedup ─▶ conflict sweep ─▶ exact dedup ─▶ chunks
//!                  │                                              │
//!                  └─ rejected (counted by reason)                └─ contained dropped / unions merged
//! ```
//!
//! The conflict sweep visits candidates by `(start asc, end desc, traversal order)` and only
//! compares each one with retained chunks ending within `comparison_window_lines` of its
//! start, capped at `max_active_comparisons`, so large files stay far from quadratic.

use crate::complexity::{calculate_code_complexity_with_language, compare_scores, MoreComplex};
use crate::config::{ChunkingOptions, ConstructThresholds, MergeStrategy};
use crate::error::Result;
use crate::identity::content_id;
use crate::language::Language;
use crate::lexical::Lexicon;
use crate::limits::Deadline;
use crate::lines::LineIndex;
use crate::similarity::SimilarityDetector;
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{
    CandidateChunk, Chunk, ChunkSetStats, ComplexityProfile, ConstructKind, Span,
};
use crate::validate::{
    is_valid_construct, validate_base, validate_location, validate_nesting_level, BaseRules,
};
use log::{trace, warn};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub const REASON_INTERNAL_FAULT: &str = "internal validator fault";
pub const REASON_NESTING: &str = "nesting too deep";

/// A validated candidate with its identity and score
#[derive(Debug, Clone)]
struct Scored {
    order: usize,
    candidate: CandidateChunk,
    id: String,
    complexity: ComplexityProfile,
}

impl Scored {
    fn span(&self) -> Span {
        self.candidate.span
    }

    fn sweep_key(&self) -> (usize, std::cmp::Reverse<usize>, usize) {
        (
            self.candidate.span.start_line,
            std::cmp::Reverse(self.candidate.span.end_line),
            self.order,
        )
    }

    /// Tie-break: constructs beat generic runs, then higher complexity, then earlier order
    fn outranks(&self, other: &Scored) -> bool {
        let mine = self.candidate.construct_kind.is_generic();
        let theirs = other.candidate.construct_kind.is_generic();
        if mine != theirs {
            return theirs;
        }
        match compare_scores(self.complexity.score, other.complexity.score).more_complex {
            MoreComplex::Content1 => true,
            MoreComplex::Content2 => false,
            MoreComplex::Equal => self.order < other.order,
        }
    }
}

enum Outcome {
    /// Keep both chunks
    Coexist,
    /// Drop the incoming chunk
    DropIncoming,
    /// Drop the retained chunk and keep comparing the incoming one
    DropRetained,
    /// Replace both with their union and compare it again
    Merge(Box<Scored>),
}

/// Validates, scores, deduplicates and merges the candidates of one source unit
pub struct ChunkingCoordinator<'a> {
    options: &'a ChunkingOptions,
    language: Language,
    thresholds: ConstructThresholds,
    lexicon: Lexicon,
    detector: SimilarityDetector,
}

impl<'a> ChunkingCoordinator<'a> {
    /// `thresholds` are the per-construct thresholds after language overrides
    pub fn new(
        options: &'a ChunkingOptions,
        language: Language,
        thresholds: ConstructThresholds,
    ) -> Result<Self> {
        Ok(Self {
            options,
            language,
            thresholds,
            lexicon: Lexicon::for_language(language),
            detector: SimilarityDetector::new(options.deduplication_threshold)?,
        })
    }

    /// Run the pipeline; `tree` enables the nesting check for generic chunks
    pub fn coordinate(
        &self,
        candidates: Vec<CandidateChunk>,
        source: &str,
        tree: Option<&SyntaxTree>,
        deadline: &Deadline,
    ) -> Result<(Vec<Chunk>, ChunkSetStats)> {
        let lines = LineIndex::new(source);
        let mut stats = ChunkSetStats {
            total_candidates: candidates.len(),
            ..Default::default()
        };

        let mut scored = Vec::with_capacity(candidates.len());
        for (order, candidate) in candidates.into_iter().enumerate() {
            deadline.check("validate")?;
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.evaluate(order, candidate, lines.line_count(), tree)
            }));
            match result {
                Ok(Ok(entry)) => scored.push(entry),
                Ok(Err(reason)) => {
                    trace!("candidate #{order} rejected: {reason}");
                    stats.add_rejection(&reason);
                }
                Err(_) => {
                    warn!("candidate #{order} rejected after a validator fault");
                    stats.add_rejection(REASON_INTERNAL_FAULT);
                }
            }
        }

        scored.sort_by_key(Scored::sweep_key);

        if self.options.enable_deduplication {
            scored = Self::collapse_exact(scored, &mut stats);
            deadline.check("coordinate")?;
            scored = self.sweep(scored, &lines, &mut stats, deadline)?;
            scored.sort_by_key(Scored::sweep_key);
            scored = Self::collapse_exact(scored, &mut stats);
        }

        scored.sort_by_key(|entry| (entry.candidate.span.start_line, entry.order));
        let chunks = scored
            .into_iter()
            .map(|entry| Chunk::freeze(entry.candidate, entry.id, entry.complexity))
            .collect();
        Ok((chunks, stats))
    }

    /// Validate one candidate and attach its identity and complexity
    fn evaluate(
        &self,
        order: usize,
        candidate: CandidateChunk,
        total_lines: usize,
        tree: Option<&SyntaxTree>,
    ) -> std::result::Result<Scored, String> {
        let location = validate_location(candidate.span, total_lines);
        if let Some(reason) = location.reason() {
            return Err(reason.to_string());
        }

        let base = validate_base(
            &candidate.text,
            candidate.span,
            BaseRules::from(self.options),
            &self.lexicon,
        );
        if let Some(reason) = base.reason() {
            return Err(reason.to_string());
        }

        if candidate.construct_kind.is_generic() {
            if let Some(tree) = tree {
                if !self.generic_nesting_ok(tree, &candidate.originating_node_ids) {
                    return Err(REASON_NESTING.to_string());
                }
            }
        } else if !is_valid_construct(
            candidate.construct_kind,
            &candidate.text,
            candidate.span,
            &self.thresholds,
            self.language,
        ) {
            return Err(format!(
                "invalid {} structure",
                candidate.construct_kind.as_str()
            ));
        }

        Ok(self.score(order, candidate))
    }

    fn score(&self, order: usize, candidate: CandidateChunk) -> Scored {
        let complexity = calculate_code_complexity_with_language(
            &candidate.text,
            self.language,
            &self.options.complexity,
        );
        Scored {
            order,
            id: content_id(&candidate.text),
            candidate,
            complexity,
        }
    }

    /// Apply the nesting bound to the top-most nodes of a generic run
    fn generic_nesting_ok(&self, tree: &SyntaxTree, ids: &[NodeId]) -> bool {
        let members: HashSet<NodeId> = ids.iter().copied().collect();
        ids.iter()
            .filter(|&&id| {
                tree.get(id)
                    .and_then(|node| node.parent)
                    .map_or(true, |parent| !members.contains(&parent))
            })
            .all(|&id| validate_nesting_level(tree, id, self.thresholds.max_nesting_level))
    }

    /// Keep the first chunk per content id (input must be in sweep order)
    fn collapse_exact(entries: Vec<Scored>, stats: &mut ChunkSetStats) -> Vec<Scored> {
        let mut seen = HashSet::new();
        let before = entries.len();
        let kept: Vec<Scored> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.id.clone()))
            .collect();
        stats.duplicates_removed += before - kept.len();
        kept
    }

    fn sweep(
        &self,
        entries: Vec<Scored>,
        lines: &LineIndex<'_>,
        stats: &mut ChunkSetStats,
        deadline: &Deadline,
    ) -> Result<Vec<Scored>> {
        let window = self.options.budget.comparison_window_lines;
        let cap = self.options.budget.max_active_comparisons;
        let mut kept: Vec<Option<Scored>> = Vec::with_capacity(entries.len());
        let mut active: Vec<usize> = Vec::new();

        for entry in entries {
            deadline.check("coordinate")?;
            let mut incoming = entry;
            let start = incoming.span().start_line;
            active.retain(|&ix| {
                kept[ix]
                    .as_ref()
                    .is_some_and(|retained| retained.span().end_line + window >= start)
            });

            let mut survives = true;
            'compare: loop {
                let recent: Vec<usize> = active.iter().rev().take(cap).copied().collect();
                for ix in recent {
                    let Some(retained) = kept[ix].as_ref() else {
                        continue;
                    };
                    stats.comparisons += 1;
                    match self.resolve(retained, &incoming, lines) {
                        Outcome::Coexist => {}
                        Outcome::DropIncoming => {
                            stats.merged_count += 1;
                            survives = false;
                            break 'compare;
                        }
                        Outcome::DropRetained => {
                            stats.merged_count += 1;
                            kept[ix] = None;
                        }
                        Outcome::Merge(union) => {
                            stats.merged_count += 1;
                            kept[ix] = None;
                            incoming = *union;
                            active = Self::reopen(&kept, incoming.span().start_line, window, cap);
                            continue 'compare;
                        }
                    }
                }
                break;
            }

            if survives {
                active.push(kept.len());
                kept.push(Some(incoming));
            }
            active.retain(|&ix| kept[ix].is_some());
        }

        Ok(kept.into_iter().flatten().collect())
    }

    /// Active set for a union that grew backwards: the most recent `cap` retained chunks
    /// that end within `window` lines of its new start, closed ones included
    fn reopen(kept: &[Option<Scored>], start: usize, window: usize, cap: usize) -> Vec<usize> {
        let mut active: Vec<usize> = kept
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(ix, slot)| slot.as_ref().map(|retained| (ix, retained)))
            .take(cap)
            .filter(|(_, retained)| retained.span().end_line + window >= start)
            .map(|(ix, _)| ix)
            .collect();
        active.reverse();
        active
    }

    /// Decide what happens to a conflicting pair
    fn resolve(&self, retained: &Scored, incoming: &Scored, lines: &LineIndex<'_>) -> Outcome {
        let ratio = retained.span().overlap_ratio(&incoming.span());
        let conflict = ratio >= self.options.max_overlap_ratio
            || self
                .detector
                .is_similar(&retained.candidate.text, &incoming.candidate.text);
        if !conflict {
            return Outcome::Coexist;
        }

        let keeps_incoming = retained.candidate.contains(&incoming.candidate);
        let contained_by_incoming = incoming.candidate.contains(&retained.candidate);
        match (keeps_incoming, contained_by_incoming) {
            (true, true) => {
                if retained.outranks(incoming) {
                    Outcome::DropIncoming
                } else {
                    Outcome::DropRetained
                }
            }
            (true, false) => Outcome::DropIncoming,
            (false, true) => Outcome::DropRetained,
            (false, false) => match self.options.merge_strategy {
                MergeStrategy::Conservative => Outcome::Coexist,
                MergeStrategy::Aggressive => self
                    .union(retained, incoming, lines)
                    .map_or(Outcome::Coexist, |union| Outcome::Merge(Box::new(union))),
            },
        }
    }

    /// Whole-line union of two chunks, if it still passes the base validation
    fn union(&self, a: &Scored, b: &Scored, lines: &LineIndex<'_>) -> Option<Scored> {
        let span = a.span().union(&b.span());
        let (byte_range, text) = lines.slice(span.start_line, span.end_line);
        let rules = BaseRules::from(self.options);
        if !validate_base(text, span, rules, &self.lexicon).is_valid {
            trace!(
                "union of lines {}-{} rejected; keeping both chunks",
                span.start_line,
                span.end_line
            );
            return None;
        }

        let winner = if a.outranks(b) { a } else { b };
        let mut nodes: Vec<NodeId> = a
            .candidate
            .originating_node_ids
            .iter()
            .chain(&b.candidate.originating_node_ids)
            .copied()
            .collect();
        nodes.sort_unstable();
        nodes.dedup();

        let kind: ConstructKind = winner.candidate.construct_kind;
        let candidate = CandidateChunk::new(kind, span, byte_range, text).with_nodes(nodes);
        Some(self.score(a.order.min(b.order), candidate))
    }
}

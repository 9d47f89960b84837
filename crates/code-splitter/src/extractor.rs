//! Boundary extractor.
//!
//! Walks a [`SyntaxTree`] depth-first and turns every classified construct into a
//! [`CandidateChunk`]. Each node belongs to its innermost enclosing construct, so no node id
//! is recorded by two candidates. Lines not covered by any construct are grouped into
//! `Generic` candidates, which keeps every non-blank line of the source claimed.

use crate::error::Result;
use crate::language::Language;
use crate::limits::Deadline;
use crate::lines::LineIndex;
use crate::profile::ConstructClassifier;
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{CandidateChunk, ConstructKind, Span};
use log::trace;
use std::ops::Range;

/// Nodes visited between deadline checks
const DEADLINE_STRIDE: usize = 256;

struct Draft {
    kind: ConstructKind,
    span: Span,
    byte_range: Range<usize>,
    text: String,
    owned: Vec<NodeId>,
}

/// Emits raw candidates for one syntax tree
pub struct BoundaryExtractor<'a> {
    classifier: &'a dyn ConstructClassifier,
    language: Language,
    max_chars: usize,
}

impl<'a> BoundaryExtractor<'a> {
    /// Constructs larger than `max_chars` are not emitted whole; their inner constructs
    /// and remaining lines are emitted instead.
    pub fn new(classifier: &'a dyn ConstructClassifier, language: Language, max_chars: usize) -> Self {
        Self {
            classifier,
            language,
            max_chars,
        }
    }

    /// Candidates in source order (ties keep traversal order, so containers come first)
    pub fn extract(
        &self,
        tree: &SyntaxTree,
        source: &str,
        deadline: &Deadline,
    ) -> Result<Vec<CandidateChunk>> {
        let lines = LineIndex::new(source);
        let root = tree.root();
        let mut owner: Vec<Option<usize>> = vec![None; tree.len()];
        let mut wrapped = vec![false; tree.len()];
        let mut drafts: Vec<Draft> = Vec::new();

        let mut stack = vec![root];
        let mut visited = 0usize;
        while let Some(id) = stack.pop() {
            visited += 1;
            if visited % DEADLINE_STRIDE == 0 {
                deadline.check("extract")?;
            }

            let node = tree.node(id);
            let mut own = node.parent.and_then(|parent| owner[parent.0]);

            if id != root && !wrapped[id.0] && node.is_named && !node.is_error {
                if let Some((kind, inner)) = self.construct_at(tree, id) {
                    if let Some(inner) = inner {
                        wrapped[inner.0] = true;
                    }
                    if let Some((draft, trivia)) = self.draft(tree, source, &lines, id, kind) {
                        let index = drafts.len();
                        for trivia_id in trivia {
                            owner[trivia_id.0] = Some(index);
                            for descendant in tree.descendants(trivia_id) {
                                owner[descendant.0] = Some(index);
                            }
                        }
                        drafts.push(draft);
                        own = Some(index);
                    }
                }
            }

            owner[id.0] = own;
            stack.extend(node.children.iter().rev().copied());
        }

        for (ix, slot) in owner.iter().enumerate() {
            if let Some(draft) = slot.and_then(|index| drafts.get_mut(index)) {
                draft.owned.push(NodeId(ix));
            }
        }

        let total_lines = lines.line_count();
        let mut claimed = vec![false; total_lines + 1];
        for draft in &drafts {
            let end = draft.span.end_line.min(total_lines);
            for line in draft.span.start_line.max(1)..=end {
                claimed[line] = true;
            }
        }

        let construct_count = drafts.len();
        let mut candidates: Vec<CandidateChunk> = drafts
            .into_iter()
            .map(|draft| {
                CandidateChunk::new(draft.kind, draft.span, draft.byte_range, draft.text)
                    .with_nodes(draft.owned)
            })
            .collect();

        let pieces = self.generic_pieces(&lines, &claimed);
        let mut piece_nodes: Vec<Vec<NodeId>> = vec![Vec::new(); pieces.len()];
        for (ix, slot) in owner.iter().enumerate() {
            if slot.is_some() || ix == root.0 {
                continue;
            }
            let node = tree.node(NodeId(ix));
            let (start, end) = (node.start_line(), node.end_line());
            let at = pieces.partition_point(|piece| piece.start_line <= start);
            if let Some(piece_ix) = at.checked_sub(1) {
                if end <= pieces[piece_ix].end_line {
                    piece_nodes[piece_ix].push(NodeId(ix));
                }
            }
        }

        for (span, nodes) in pieces.into_iter().zip(piece_nodes) {
            let (range, text) = lines.slice(span.start_line, span.end_line);
            candidates.push(
                CandidateChunk::new(ConstructKind::Generic, span, range, text).with_nodes(nodes),
            );
        }

        trace!(
            "extracted {} constructs and {} generic runs ({} nodes)",
            construct_count,
            candidates.len() - construct_count,
            tree.len()
        );

        candidates.sort_by_key(|candidate| candidate.span.start_line);
        Ok(candidates)
    }

    /// Construct kind of `id`, plus the inner node when `id` only wraps a construct
    fn construct_at(&self, tree: &SyntaxTree, id: NodeId) -> Option<(ConstructKind, Option<NodeId>)> {
        let node = tree.node(id);
        if let Some(kind) = self.classifier.classify(self.language, &node.kind) {
            return Some((kind, None));
        }
        if !self.classifier.is_wrapper(self.language, &node.kind) {
            return None;
        }

        let mut payload = node.children.iter().copied().filter(|&child| {
            let child = tree.node(child);
            child.is_named && !self.classifier.is_leading_trivia(self.language, &child.kind)
        });
        let inner = payload.next()?;
        if payload.next().is_some() {
            return None;
        }
        let kind = self
            .classifier
            .classify(self.language, &tree.node(inner).kind)?;
        Some((kind, Some(inner)))
    }

    /// Comments/attributes directly above `id`, nearest first, with no blank line in between
    fn leading_trivia(&self, tree: &SyntaxTree, id: NodeId) -> Vec<NodeId> {
        let node = tree.node(id);
        let Some(parent) = node.parent else {
            return Vec::new();
        };
        let siblings = &tree.node(parent).children;
        let Some(position) = siblings.iter().position(|&sibling| sibling == id) else {
            return Vec::new();
        };

        let mut trivia = Vec::new();
        let mut top_line = node.start_line();
        for ix in (0..position).rev() {
            let candidate = tree.node(siblings[ix]);
            if !candidate.is_named
                || candidate.is_error
                || !self
                    .classifier
                    .is_leading_trivia(self.language, &candidate.kind)
                || candidate.end_line() + 1 < top_line
            {
                break;
            }
            // a trailing comment on the previous item's last line stays with that item
            if ix > 0 && tree.node(siblings[ix - 1]).end_line() >= candidate.start_line() {
                break;
            }
            top_line = candidate.start_line();
            trivia.push(siblings[ix]);
        }
        trivia
    }

    fn draft(
        &self,
        tree: &SyntaxTree,
        source: &str,
        lines: &LineIndex<'_>,
        id: NodeId,
        kind: ConstructKind,
    ) -> Option<(Draft, Vec<NodeId>)> {
        let node = tree.node(id);
        let trivia = self.leading_trivia(tree, id);

        let first = trivia.last().map_or(node, |&top| tree.node(top));
        let start_line = first.start_line();
        let mut start_byte = first.byte_range.start;
        let line_start = lines.line_range(start_line).start;
        if line_start <= start_byte
            && source
                .get(line_start..start_byte)
                .is_some_and(|indent| indent.trim().is_empty())
        {
            start_byte = line_start;
        }
        let end_byte = node.byte_range.end.max(start_byte);

        let text = source.get(start_byte..end_byte)?;
        if text.trim().chars().count() > self.max_chars {
            trace!(
                "{} at line {} exceeds max_chars; emitting its parts instead",
                node.kind,
                start_line
            );
            return None;
        }

        let span = Span::new(start_line, node.end_line().max(start_line));
        Some((
            Draft {
                kind,
                span,
                byte_range: start_byte..end_byte,
                text: text.to_string(),
                owned: Vec::new(),
            },
            trivia,
        ))
    }

    /// Unclaimed, non-blank line runs, split to fit `max_chars`
    fn generic_pieces(&self, lines: &LineIndex<'_>, claimed: &[bool]) -> Vec<Span> {
        let mut pieces = Vec::new();
        let mut current: Option<(usize, usize, usize)> = None; // (start, last non-blank, chars)

        let mut flush = |current: &mut Option<(usize, usize, usize)>| {
            if let Some((start, last, _)) = current.take() {
                pieces.push(Span::new(start, last));
            }
        };

        for line in 1..claimed.len() {
            if claimed[line] {
                flush(&mut current);
                continue;
            }
            let text = lines.line(line);
            if text.trim().is_empty() {
                if let Some((_, _, chars)) = current.as_mut() {
                    *chars += 1;
                }
                continue;
            }
            let width = text.chars().count() + 1;
            if let Some((_, _, chars)) = current {
                if chars + width > self.max_chars {
                    flush(&mut current);
                }
            }
            current = Some(match current {
                Some((start, _, chars)) => (start, line, chars + width),
                None => (line, line, width),
            });
        }
        flush(&mut current);
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ConstructRegistry;
    use crate::syntax::{Position, SyntaxNode, SyntaxParser, TreeSitterParser};
    use pretty_assertions::assert_eq;

    fn extract(language: Language, code: &str) -> Vec<CandidateChunk> {
        extract_with(language, code, 3000)
    }

    fn extract_with(language: Language, code: &str, max_chars: usize) -> Vec<CandidateChunk> {
        let deadline = Deadline::unbounded();
        let tree = TreeSitterParser::new()
            .parse(language, code, &deadline)
            .unwrap();
        let registry = ConstructRegistry::builtin();
        BoundaryExtractor::new(&registry, language, max_chars)
            .extract(&tree, code, &deadline)
            .unwrap()
    }

    fn summary(candidates: &[CandidateChunk]) -> Vec<(ConstructKind, usize, usize)> {
        candidates
            .iter()
            .map(|c| (c.construct_kind, c.span.start_line, c.span.end_line))
            .collect()
    }

    #[test]
    fn extracts_rust_items_with_nested_methods() {
        let code = r#"use std::fmt;

/// A point.
#[derive(Debug)]
struct Point {
    x: i32,
}

impl Point {
    fn norm(&self) -> i32 {
        self.x.abs()
    }
}
"#;
        let candidates = extract(Language::Rust, code);
        assert_eq!(
            summary(&candidates),
            vec![
                (ConstructKind::Import, 1, 1),
                (ConstructKind::Class, 3, 7),
                (ConstructKind::Class, 9, 13),
                (ConstructKind::Function, 10, 12),
            ]
        );
        assert!(candidates[1].text.starts_with("/// A point."));
        assert!(candidates[3].text.starts_with("    fn norm"));
    }

    #[test]
    fn node_ids_are_never_shared() {
        let code = "mod a {\n    fn b() { c(); }\n}\nlet_me = 1;\n";
        let candidates = extract(Language::Rust, code);
        let mut seen = std::collections::HashSet::new();
        for candidate in &candidates {
            for id in &candidate.originating_node_ids {
                assert!(seen.insert(*id), "{id:?} claimed twice");
            }
        }
    }

    #[test]
    fn unclaimed_lines_become_generic_runs() {
        let code = "import os\n\nx = 1\ny = 2\n\ndef f():\n    return x\n\nprint(f())\n";
        let candidates = extract(Language::Python, code);
        assert_eq!(
            summary(&candidates),
            vec![
                (ConstructKind::Import, 1, 1),
                (ConstructKind::Generic, 3, 4),
                (ConstructKind::Function, 6, 7),
                (ConstructKind::Generic, 9, 9),
            ]
        );
        assert_eq!(candidates[1].text, "x = 1\ny = 2");
        assert!(!candidates[1].originating_node_ids.is_empty());
    }

    #[test]
    fn decorated_python_function_is_one_construct() {
        let code = "@app.get(\"/\")\ndef root():\n    return {\"ok\": True}\n";
        let candidates = extract(Language::Python, code);
        assert_eq!(summary(&candidates), vec![(ConstructKind::Function, 1, 3)]);
        assert!(candidates[0].text.starts_with("@app.get"));
    }

    #[test]
    fn exported_js_function_includes_export() {
        let code = "// adds\nexport function add(a, b) {\n  return a + b;\n}\n";
        let candidates = extract(Language::JavaScript, code);
        assert_eq!(summary(&candidates), vec![(ConstructKind::Function, 1, 4)]);
        assert!(candidates[0].text.contains("export function add"));
    }

    #[test]
    fn trailing_comment_stays_with_previous_line() {
        let code = "use a::b; // why\nfn f() { g(); }\n";
        let candidates = extract(Language::Rust, code);
        assert_eq!(
            summary(&candidates),
            vec![(ConstructKind::Import, 1, 1), (ConstructKind::Function, 2, 2)]
        );
        assert_eq!(candidates[1].text, "fn f() { g(); }");
    }

    #[test]
    fn oversized_construct_is_emitted_in_parts() {
        let body: String = (0..20).map(|i| format!("    fn f{i}() {{ g(); }}\n")).collect();
        let code = format!("impl A {{\n{body}}}\n");
        let candidates = extract_with(Language::Rust, &code, 200);
        assert!(candidates
            .iter()
            .all(|c| c.construct_kind != ConstructKind::Class));
        let functions = candidates
            .iter()
            .filter(|c| c.construct_kind == ConstructKind::Function)
            .count();
        assert_eq!(functions, 20);
        let first = &candidates[0];
        assert_eq!(first.construct_kind, ConstructKind::Generic);
        assert_eq!(first.text, "impl A {");
    }

    #[test]
    fn script_without_constructs_is_fully_covered() {
        let code = "a = 1\n\nb = 2\nprint(a + b)\n";
        let candidates = extract(Language::Python, code);
        assert_eq!(
            summary(&candidates),
            vec![(ConstructKind::Generic, 1, 4)]
        );
    }

    #[test]
    fn long_generic_runs_are_split() {
        let code: String = (0..10).map(|i| format!("x{i} = {i}\n")).collect();
        let candidates = extract_with(Language::Python, &code, 20);
        assert!(candidates.len() > 1);
        for candidate in &candidates {
            assert!(candidate.text.trim().chars().count() <= 20);
        }
        let covered: usize = candidates.iter().map(|c| c.span.line_count()).sum();
        assert_eq!(covered, 10);
    }

    #[test]
    fn expired_deadline_aborts_large_walks() {
        let code: String = (0..200).map(|i| format!("fn f{i}() {{ g(); }}\n")).collect();
        let deadline = Deadline::unbounded();
        let tree = TreeSitterParser::new()
            .parse(Language::Rust, &code, &deadline)
            .unwrap();
        let registry = ConstructRegistry::builtin();
        let expired = Deadline::after(std::time::Duration::ZERO);
        let result = BoundaryExtractor::new(&registry, Language::Rust, 3000)
            .extract(&tree, &code, &expired);
        assert!(result.is_err());
    }

    #[test]
    fn works_with_hand_built_trees_and_closures() {
        let source = "alpha\nbeta\ngamma\n";
        let mut tree = SyntaxTree::new(SyntaxNode::new(
            "doc",
            Position::new(1, 0),
            Position::new(4, 0),
            0..source.len(),
        ));
        tree.add_child(
            tree.root(),
            SyntaxNode::new("block", Position::new(2, 0), Position::new(2, 4), 6..10),
        );
        let classify = |_: Language, kind: &str| {
            (kind == "block").then_some(ConstructKind::Function)
        };
        let candidates = BoundaryExtractor::new(&classify, Language::Unknown, 3000)
            .extract(&tree, source, &Deadline::unbounded())
            .unwrap();
        assert_eq!(
            summary(&candidates),
            vec![
                (ConstructKind::Generic, 1, 1),
                (ConstructKind::Function, 2, 2),
                (ConstructKind::Generic, 3, 3),
            ]
        );
        assert_eq!(candidates[1].text, "beta");
        assert_eq!(candidates[1].originating_node_ids, vec![NodeId(1)]);
    }
}

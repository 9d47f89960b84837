//! Paragraph splitter for documents and for code whose AST pipeline was abandoned.
//!
//! Lines are grouped into blocks separated by blank lines; fenced code blocks stay whole
//! and headings (markdown) or top-level keys (YAML) open a new section. Consecutive blocks
//! of one section are packed up to half of `max_chars`; blocks over `max_chars` are cut by
//! lines, and a single line over `max_chars` by characters.

use crate::file_type::FileType;
use crate::lines::LineIndex;
use crate::types::{CandidateChunk, ConstructKind, Span};
use regex::Regex;
use std::sync::OnceLock;

static MARKDOWN_HEADING: OnceLock<Regex> = OnceLock::new();
static YAML_SECTION: OnceLock<Regex> = OnceLock::new();

fn markdown_heading() -> &'static Regex {
    MARKDOWN_HEADING.get_or_init(|| {
        Regex::new(r"^#{1,6}(\s|$)").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

fn yaml_section() -> &'static Regex {
    YAML_SECTION.get_or_init(|| {
        Regex::new(r#"^(---\s*$|[A-Za-z0-9_"'][^:#]*:(\s|$))"#)
            .unwrap_or_else(|e| unreachable!("{e}"))
    })
}

#[derive(Debug, Clone, Copy)]
struct Block {
    start: usize,
    end: usize,
    opens_section: bool,
}

fn opens_section(line: &str, file_type: FileType) -> bool {
    match file_type {
        FileType::Markdown => markdown_heading().is_match(line),
        FileType::Yaml => yaml_section().is_match(line),
        _ => false,
    }
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    ["```", "~~~"]
        .into_iter()
        .find(|marker| trimmed.starts_with(marker))
}

/// Split `source` into `Generic` candidates covering every non-blank line
#[must_use]
pub fn split_text(source: &str, file_type: FileType, max_chars: usize) -> Vec<CandidateChunk> {
    let lines = LineIndex::new(source);
    let max_chars = max_chars.max(1);
    let target = (max_chars / 2).max(1);
    let size = |start: usize, end: usize| lines.slice(start, end).1.trim().chars().count();

    let mut pieces: Vec<Span> = Vec::new();
    let mut open: Option<Span> = None;
    for block in blocks(&lines, file_type) {
        if size(block.start, block.end) > max_chars {
            pieces.extend(open.take());
            pieces.extend(split_by_lines(&lines, block, max_chars));
            continue;
        }
        open = match open {
            Some(span) if !block.opens_section && size(span.start_line, block.end) <= target => {
                Some(Span::new(span.start_line, block.end))
            }
            previous => {
                pieces.extend(previous);
                Some(Span::new(block.start, block.end))
            }
        };
    }
    pieces.extend(open);

    let mut candidates = Vec::with_capacity(pieces.len());
    for span in pieces {
        let (range, text) = lines.slice(span.start_line, span.end_line);
        if span.line_count() == 1 && text.trim().chars().count() > max_chars {
            candidates.extend(split_long_line(span.start_line, range.start, text, max_chars));
        } else {
            candidates.push(CandidateChunk::new(ConstructKind::Generic, span, range, text));
        }
    }
    candidates
}

fn blocks(lines: &LineIndex<'_>, file_type: FileType) -> Vec<Block> {
    let fences = !file_type.is_code();
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    let mut fence: Option<&'static str> = None;

    for line in 1..=lines.line_count() {
        let text = lines.line(line);
        if let Some(marker) = fence {
            if let Some(block) = current.as_mut() {
                block.end = line;
            }
            if text.trim_start().starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if lines.is_blank(line) {
            blocks.extend(current.take());
            continue;
        }

        let section = opens_section(text, file_type);
        match current.as_mut() {
            Some(block) if !section => block.end = line,
            _ => {
                blocks.extend(current.take());
                current = Some(Block {
                    start: line,
                    end: line,
                    opens_section: section,
                });
            }
        }
        if fences {
            fence = fence_marker(text);
        }
    }
    blocks.extend(current);
    blocks
}

/// Greedy line packing for a block larger than `max_chars`
fn split_by_lines(lines: &LineIndex<'_>, block: Block, max_chars: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = block.start;
    let mut chars = 0usize;
    for line in block.start..=block.end {
        let width = lines.line(line).chars().count() + 1;
        if line > start && chars + width > max_chars {
            spans.push(Span::new(start, line - 1));
            start = line;
            chars = 0;
        }
        chars += width;
    }
    spans.push(Span::new(start, block.end));
    spans
}

fn split_long_line(
    line: usize,
    offset: usize,
    text: &str,
    max_chars: usize,
) -> Vec<CandidateChunk> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(ix, _)| ix)
        .step_by(max_chars)
        .chain(std::iter::once(text.len()))
        .collect();
    boundaries
        .windows(2)
        .map(|pair| {
            CandidateChunk::new(
                ConstructKind::Generic,
                Span::new(line, line),
                offset + pair[0]..offset + pair[1],
                &text[pair[0]..pair[1]],
            )
        })
        .collect()
}

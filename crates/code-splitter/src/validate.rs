//! Structural validators.
//!
//! Every candidate passes [`validate_base`]; construct candidates additionally pass the
//! check for their [`ConstructKind`]. Validators never fail or panic: malformed input is
//! simply invalid.

use crate::config::{ChunkingOptions, ConstructThresholds};
use crate::language::{Language, NestingStyle};
use crate::lexical::{code_only, has_meaningful_content, strip_comments, Lexicon};
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{ConstructKind, Span, ValidationDetails, ValidationOutcome};
use std::panic::{catch_unwind, AssertUnwindSafe};

pub const REASON_BLANK: &str = "blank content";
pub const REASON_NOT_MEANINGFUL: &str = "no meaningful content";
pub const REASON_TOO_FEW_LINES: &str = "too few lines";
pub const REASON_TOO_SHORT: &str = "below min_chars";
pub const REASON_TOO_LONG: &str = "above max_chars";

/// The universal size floor applied to every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRules {
    pub min_lines: usize,
    pub min_chars: usize,
    pub max_chars: usize,
}

impl From<&ChunkingOptions> for BaseRules {
    fn from(options: &ChunkingOptions) -> Self {
        Self {
            min_lines: options.min_lines,
            min_chars: options.min_chars,
            max_chars: options.max_chars,
        }
    }
}

/// Span sanity: `1 <= start <= end <= total_lines`
#[must_use]
pub fn validate_location(span: Span, total_lines: usize) -> ValidationOutcome {
    let mut outcome = ValidationOutcome {
        is_valid: true,
        ..Default::default()
    };
    if span.start_line < 1 {
        outcome.error("start line before line 1");
    }
    if span.end_line < span.start_line {
        outcome.error("end line before start line");
    }
    if span.end_line > total_lines {
        outcome.error("end line past end of source");
    }
    outcome
}

/// Line count, size bounds and non-blank content
#[must_use]
pub fn validate_base(
    text: &str,
    span: Span,
    rules: BaseRules,
    lexicon: &Lexicon,
) -> ValidationOutcome {
    let trimmed = text.trim();
    let size = trimmed.chars().count();
    let line_count = span.line_count();
    let mut outcome = ValidationOutcome {
        is_valid: true,
        details: ValidationDetails {
            line_count,
            size,
            non_whitespace: trimmed.chars().filter(|c| !c.is_whitespace()).count(),
        },
        ..Default::default()
    };

    if trimmed.is_empty() {
        outcome.error(REASON_BLANK);
        return outcome;
    }
    if !has_meaningful_content(trimmed, lexicon) {
        outcome.error(REASON_NOT_MEANINGFUL);
    }
    if line_count < rules.min_lines {
        outcome.error(REASON_TOO_FEW_LINES);
    }
    if size < rules.min_chars {
        outcome.error(REASON_TOO_SHORT);
    }
    if size > rules.max_chars {
        outcome.error(REASON_TOO_LONG);
    }

    if size * 10 > rules.max_chars * 9 && size <= rules.max_chars {
        outcome.warn("size is within 10% of max_chars");
    }
    if text
        .lines()
        .last()
        .is_some_and(|line| line.trim().is_empty())
    {
        outcome.warn("trailing whitespace-only lines");
    }
    outcome
}

/// Brackets `()[]{}` balance once literals and comments are masked out
fn is_balanced(code: &str) -> bool {
    let mut stack = Vec::new();
    for c in code.chars() {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

/// Byte range strictly between the first `{` and its matching `}`
fn brace_body(code: &str) -> Option<(usize, usize)> {
    let open = code.find('{')?;
    let mut depth = 0usize;
    for (offset, c) in code[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open + 1, open + offset));
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset just past the signature-ending `:` (outside brackets)
fn indent_body_start(code: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in code.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some(offset + 1),
            _ => {}
        }
    }
    None
}

fn count_non_whitespace(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

fn ends_with_semicolon(code: &str) -> bool {
    code.trim_end().ends_with(';')
}

/// A function needs enough lines and a body that is more than a signature
#[must_use]
pub fn is_valid_function(
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    if span.line_count() < thresholds.function_min_lines {
        return false;
    }
    let lexicon = Lexicon::for_language(language);
    let code = code_only(text, &lexicon);
    let stripped = strip_comments(text, &lexicon);

    let body = match language.nesting_style() {
        NestingStyle::Indent => indent_body_start(&code).and_then(|start| stripped.get(start..)),
        NestingStyle::Bracket | NestingStyle::None => {
            brace_body(&code).and_then(|(start, end)| stripped.get(start..end))
        }
    };
    body.is_some_and(|body| {
        let needed = thresholds.function_min_body_chars.max(1);
        count_non_whitespace(body) >= needed
    })
}

/// A class needs balanced delimiters and either a body or a complete declaration
#[must_use]
pub fn is_valid_class(
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    if span.line_count() < thresholds.class_min_lines {
        return false;
    }
    let code = code_only(text, &Lexicon::for_language(language));
    if !is_balanced(&code) {
        return false;
    }
    let has_body = match language.nesting_style() {
        NestingStyle::Indent => code.contains(':'),
        _ => code.contains('{'),
    };
    has_body || ends_with_semicolon(&code) || !language.terminates_statements()
}

/// A namespace needs a non-empty body or a `;` declaration (`mod name;`)
#[must_use]
pub fn is_valid_namespace(
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    if span.line_count() < thresholds.namespace_min_lines {
        return false;
    }
    let lexicon = Lexicon::for_language(language);
    let code = code_only(text, &lexicon);
    if !is_balanced(&code) {
        return false;
    }
    if let Some((start, end)) = brace_body(&code) {
        let stripped = strip_comments(text, &lexicon);
        return stripped
            .get(start..end)
            .is_some_and(|body| body.chars().any(char::is_alphanumeric));
    }
    ends_with_semicolon(&code)
}

/// Templates and macros need a body or a declaration
#[must_use]
pub fn is_valid_template(
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    if span.line_count() < thresholds.template_min_lines {
        return false;
    }
    let code = code_only(text, &Lexicon::for_language(language));
    is_balanced(&code) && (code.contains(&['{', '(', '['][..]) || ends_with_semicolon(&code))
}

/// Imports must be short, balanced and name something
#[must_use]
pub fn is_valid_import(
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    if span.line_count() > thresholds.import_max_lines {
        return false;
    }
    let lexicon = Lexicon::for_language(language);
    let code = code_only(text, &lexicon);
    is_balanced(&code) && code.chars().any(char::is_alphabetic)
}

/// Dispatch to the validator for `kind`; generic chunks have no construct rules.
///
/// Any internal fault is reported as invalid.
#[must_use]
pub fn is_valid_construct(
    kind: ConstructKind,
    text: &str,
    span: Span,
    thresholds: &ConstructThresholds,
    language: Language,
) -> bool {
    let check = || match kind {
        ConstructKind::Function => is_valid_function(text, span, thresholds, language),
        ConstructKind::Class => is_valid_class(text, span, thresholds, language),
        ConstructKind::Namespace => is_valid_namespace(text, span, thresholds, language),
        ConstructKind::Template => is_valid_template(text, span, thresholds, language),
        ConstructKind::Import => is_valid_import(text, span, thresholds, language),
        ConstructKind::Generic => true,
    };
    catch_unwind(AssertUnwindSafe(check)).unwrap_or(false)
}

/// Reject subtrees with more than `max_level` nested blocks
#[must_use]
pub fn validate_nesting_level(tree: &SyntaxTree, node: NodeId, max_level: usize) -> bool {
    tree.get(node).is_some() && tree.nesting_depth(node) <= max_level
}

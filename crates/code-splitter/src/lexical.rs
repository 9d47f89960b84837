//! Lightweight lexical scanner.
//!
//! Splits text into code, comment and literal segments without a grammar, so validators and
//! the complexity calculator can ignore brackets and keywords that only appear inside
//! strings or comments. Unterminated constructs run to the end of the line (single-line
//! strings) or the end of the text (block comments, multi-line strings).

use crate::language::{CommentSyntax, Language};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Comment,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub range: Range<usize>,
}

/// Literal and comment rules for one language
#[derive(Debug, Clone, Copy)]
pub struct Lexicon {
    comments: CommentSyntax,
    nested_block_comments: bool,
    quotes: &'static [u8],
    multiline_quotes: &'static [u8],
    triple_quotes: bool,
    char_literals: bool,
    raw_strings: bool,
}

impl Lexicon {
    #[must_use]
    pub fn for_language(language: Language) -> Self {
        let base = Self {
            comments: language.comment_syntax(),
            nested_block_comments: false,
            quotes: b"\"",
            multiline_quotes: b"",
            triple_quotes: false,
            char_literals: true,
            raw_strings: false,
        };
        match language {
            Language::Rust => Self {
                nested_block_comments: true,
                raw_strings: true,
                ..base
            },
            Language::Python => Self {
                quotes: b"\"'",
                triple_quotes: true,
                char_literals: false,
                ..base
            },
            Language::Ruby => Self {
                quotes: b"\"'",
                char_literals: false,
                ..base
            },
            Language::JavaScript | Language::TypeScript => Self {
                quotes: b"\"'",
                multiline_quotes: b"`",
                char_literals: false,
                ..base
            },
            Language::Go => Self {
                multiline_quotes: b"`",
                ..base
            },
            Language::Kotlin | Language::Swift => Self {
                triple_quotes: true,
                ..base
            },
            Language::Unknown => Self {
                quotes: b"",
                char_literals: false,
                ..base
            },
            _ => base,
        }
    }
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Byte index just past the end of the current line (the newline itself is excluded)
fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset)
}

fn find_sub(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

struct Scanner<'a> {
    bytes: &'a [u8],
    lexicon: &'a Lexicon,
}

impl Scanner<'_> {
    /// End of a comment starting at `i`, if one does
    fn comment_end(&self, i: usize) -> Option<usize> {
        let rest = &self.bytes[i..];
        if self
            .lexicon
            .comments
            .line
            .iter()
            .any(|prefix| rest.starts_with(prefix.as_bytes()))
        {
            return Some(line_end(self.bytes, i));
        }

        let (open, close) = self.lexicon.comments.block?;
        let (open, close) = (open.as_bytes(), close.as_bytes());
        if !rest.starts_with(open) {
            return None;
        }
        let mut depth = 1usize;
        let mut j = i + open.len();
        while j < self.bytes.len() {
            if self.bytes[j..].starts_with(close) {
                depth -= 1;
                j += close.len();
                if depth == 0 {
                    return Some(j);
                }
            } else if self.lexicon.nested_block_comments && self.bytes[j..].starts_with(open) {
                depth += 1;
                j += open.len();
            } else {
                j += 1;
            }
        }
        Some(self.bytes.len())
    }

    /// End of a string or char literal starting at `i`, if one does
    fn literal_end(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        let byte = bytes[i];

        if self.lexicon.raw_strings {
            if let Some(end) = self.raw_string_end(i) {
                return Some(end);
            }
        }

        if self.lexicon.triple_quotes && (byte == b'"' || byte == b'\'') {
            let fence = [byte; 3];
            if bytes[i..].starts_with(&fence) {
                return Some(
                    find_sub(bytes, i + 3, &fence).map_or(bytes.len(), |close| close + 3),
                );
            }
        }

        if self.lexicon.multiline_quotes.contains(&byte) {
            return Some(self.quoted_end(i, byte, true));
        }

        if byte == b'\'' && self.lexicon.char_literals {
            return self.char_literal_end(i);
        }

        if self.lexicon.quotes.contains(&byte) {
            return Some(self.quoted_end(i, byte, false));
        }

        None
    }

    fn quoted_end(&self, i: usize, quote: u8, multiline: bool) -> usize {
        let bytes = self.bytes;
        let mut j = i + 1;
        while j < bytes.len() {
            match bytes[j] {
                b'\\' => j += 2,
                b'\n' if !multiline => return j,
                b if b == quote => return j + 1,
                _ => j += 1,
            }
        }
        bytes.len()
    }

    /// `'x'`, `'\n'`, `'\u{1F600}'`; anything else (lifetimes, labels) is code
    fn char_literal_end(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        let next = *bytes.get(i + 1)?;
        if next == b'\\' {
            let limit = (i + 12).min(bytes.len());
            return (i + 3..limit)
                .find(|&j| bytes[j] == b'\'')
                .filter(|&j| !bytes[i..j].contains(&b'\n'))
                .map(|j| j + 1);
        }
        if next == b'\'' || next == b'\n' {
            return None;
        }
        let width = utf8_width(next);
        (bytes.get(i + 1 + width) == Some(&b'\'')).then_some(i + 2 + width)
    }

    /// `r"..."`, `r#"..."#`, `br"..."`
    fn raw_string_end(&self, i: usize) -> Option<usize> {
        let bytes = self.bytes;
        let start = if bytes[i] == b'b' && bytes.get(i + 1) == Some(&b'r') {
            i + 1
        } else {
            i
        };
        if bytes[start] != b'r' || (i > 0 && is_ident_byte(bytes[i - 1])) {
            return None;
        }
        let mut j = start + 1;
        while bytes.get(j) == Some(&b'#') {
            j += 1;
        }
        if bytes.get(j) != Some(&b'"') {
            return None;
        }
        let hashes = j - start - 1;
        let mut closing = vec![b'"'];
        closing.extend(std::iter::repeat(b'#').take(hashes));
        Some(find_sub(bytes, j + 1, &closing).map_or(bytes.len(), |close| close + closing.len()))
    }
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// Split `text` into contiguous code, comment and literal segments
#[must_use]
pub fn segments(text: &str, lexicon: &Lexicon) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let scanner = Scanner { bytes, lexicon };
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let special = scanner
            .comment_end(i)
            .map(|end| (SegmentKind::Comment, end))
            .or_else(|| {
                scanner
                    .literal_end(i)
                    .map(|end| (SegmentKind::Literal, end))
            });

        let Some((kind, end)) = special else {
            i += 1;
            continue;
        };

        if code_start < i {
            out.push(Segment {
                kind: SegmentKind::Code,
                range: code_start..i,
            });
        }
        let end = end.min(bytes.len()).max(i + 1);
        out.push(Segment { kind, range: i..end });
        i = end;
        code_start = end;
    }

    if code_start < bytes.len() {
        out.push(Segment {
            kind: SegmentKind::Code,
            range: code_start..bytes.len(),
        });
    }
    out
}

/// Replace every char but newlines with spaces, keeping byte offsets aligned
fn blank_out(out: &mut String, piece: &str) {
    for c in piece.chars() {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
    }
}

fn segment_str<'a>(text: &'a str, segment: &Segment) -> &'a str {
    text.get(segment.range.clone()).unwrap_or("")
}

/// Text with comments blanked out; literals are kept
#[must_use]
pub fn strip_comments(text: &str, lexicon: &Lexicon) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text, lexicon) {
        let piece = segment_str(text, &segment);
        if segment.kind == SegmentKind::Comment {
            blank_out(&mut out, piece);
        } else {
            out.push_str(piece);
        }
    }
    out
}

/// Text with comments and literal contents blanked out; line structure is preserved
#[must_use]
pub fn code_only(text: &str, lexicon: &Lexicon) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text, lexicon) {
        let piece = segment_str(text, &segment);
        if segment.kind == SegmentKind::Code {
            out.push_str(piece);
        } else {
            blank_out(&mut out, piece);
        }
    }
    out
}

/// Whether anything alphanumeric remains once comments are removed
#[must_use]
pub fn has_meaningful_content(text: &str, lexicon: &Lexicon) -> bool {
    strip_comments(text, lexicon)
        .chars()
        .any(char::is_alphanumeric)
}

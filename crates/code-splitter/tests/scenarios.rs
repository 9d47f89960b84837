use context_code_splitter::coordinator::{ChunkingCoordinator, REASON_NESTING};
use context_code_splitter::extractor::BoundaryExtractor;
use context_code_splitter::similarity::similarity;
use context_code_splitter::{
    split, CandidateChunk, ChunkSet, ChunkingOptions, ConstructKind, ConstructRegistry, Deadline,
    Language, MergeStrategy, Result, SourceUnit, Span, SplitMode, Splitter, SyntaxParser,
    SyntaxTree, TreeSitterParser,
};
use pretty_assertions::assert_eq;

const MIXED_RUST: &str = r#"use std::collections::HashMap;
use std::fmt;

/// A cache keyed by name.
pub struct Registry {
    entries: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn insert(&mut self, name: &str, value: usize) {
        if value > 0 {
            self.entries.insert(name.to_string(), value);
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries", self.entries.len())
    }
}

const LIMIT: usize = 16;
static NAME: &str = "registry";

fn main() {
    let mut registry = Registry::new();
    registry.insert(NAME, LIMIT);
    println!("{registry}");
}
"#;

fn split_default(content: &str, language: &str, path: &str) -> ChunkSet {
    split(content, language, path, &ChunkingOptions::default()).expect("split")
}

/// Whole-line candidate over `start..=end` (1-based)
fn line_candidate(source: &str, kind: ConstructKind, start: usize, end: usize) -> CandidateChunk {
    let mut offset = 0;
    let mut range = None;
    for (ix, line) in source.split_inclusive('\n').enumerate() {
        let n = ix + 1;
        let body = line.trim_end_matches('\n');
        if n == start {
            range = Some(offset..offset + body.len());
        }
        if n == end {
            range = range.map(|r| r.start..offset + body.len());
        }
        offset += line.len();
    }
    let range = range.expect("lines in source");
    CandidateChunk::new(kind, Span::new(start, end), range.clone(), &source[range])
}

#[test]
fn struct_then_function_yields_two_distinct_chunks() {
    let code = "struct Point {\n    x: f64,\n    y: f64,\n}\n\nfn distance(a: &Point, b: &Point) -> f64 {\n    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()\n}\n";
    let set = split_default(code, "rust", "geometry.rs");

    assert_eq!(set.mode, SplitMode::Ast);
    let chunks = set.chunks();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].construct_kind(), ConstructKind::Class);
    assert_eq!((chunks[0].start_line(), chunks[0].end_line()), (1, 4));
    assert_eq!(chunks[1].construct_kind(), ConstructKind::Function);
    assert_eq!((chunks[1].start_line(), chunks[1].end_line()), (6, 8));
    assert_ne!(chunks[0].id(), chunks[1].id());
    assert!(similarity(chunks[0].text(), chunks[1].text()) < 0.5);
}

#[test]
fn container_wins_over_trimmed_variants() {
    let source: String = (1..=12)
        .map(|i| format!("    total += weight_{i} * sample_{i};\n"))
        .collect();
    let options = ChunkingOptions::default();
    let coordinator =
        ChunkingCoordinator::new(&options, Language::Rust, options.thresholds).unwrap();

    for (start, end) in [(1, 11), (2, 12)] {
        let candidates = vec![
            line_candidate(&source, ConstructKind::Generic, 1, 12),
            line_candidate(&source, ConstructKind::Generic, start, end),
        ];
        let (chunks, stats) = coordinator
            .coordinate(candidates, &source, None, &Deadline::unbounded())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line(), chunks[0].end_line()), (1, 12));
        assert_eq!(stats.merged_count, 1);
    }
}

#[test]
fn trimmed_variants_alone_union_into_the_container_when_aggressive() {
    let source: String = (1..=12)
        .map(|i| format!("    total += weight_{i} * sample_{i};\n"))
        .collect();
    let options = ChunkingOptions {
        merge_strategy: MergeStrategy::Aggressive,
        ..Default::default()
    };
    let coordinator =
        ChunkingCoordinator::new(&options, Language::Rust, options.thresholds).unwrap();
    let candidates = vec![
        line_candidate(&source, ConstructKind::Generic, 1, 11),
        line_candidate(&source, ConstructKind::Generic, 2, 12),
    ];
    let (chunks, stats) = coordinator
        .coordinate(candidates, &source, None, &Deadline::unbounded())
        .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!((chunks[0].start_line(), chunks[0].end_line()), (1, 12));
    assert_eq!(chunks[0].text(), source.trim_end());
    assert_eq!(stats.merged_count, 1);
}

struct RecordingParser {
    calls: usize,
}

impl SyntaxParser for RecordingParser {
    fn parse(&mut self, language: Language, content: &str, deadline: &Deadline) -> Result<SyntaxTree> {
        self.calls += 1;
        TreeSitterParser::new().parse(language, content, deadline)
    }
}

#[test]
fn markdown_never_reaches_the_parser() {
    let doc = "# Install\n\nRun `cargo install`.\n\n## Usage\n\n```rust\nfn main() {}\n```\n";
    let splitter = Splitter::new(ChunkingOptions::default()).unwrap();
    let mut parser = RecordingParser { calls: 0 };

    let set = splitter
        .split_with_parser(&SourceUnit::new(doc, "", "README.md"), &mut parser)
        .unwrap();
    assert_eq!(set.mode, SplitMode::PlainText);
    assert!(!set.is_empty());
    assert!(set
        .chunks()
        .iter()
        .all(|c| c.construct_kind() == ConstructKind::Generic));
    assert_eq!(parser.calls, 0);

    splitter
        .split_with_parser(&SourceUnit::new("fn main() { go(); }\n", "rust", "main.rs"), &mut parser)
        .unwrap();
    assert_eq!(parser.calls, 1);
}

#[test]
fn trivial_inputs_never_produce_chunks() {
    let punctuation = ["}", "{", ";", "", "   ", "\n\n"];
    for input in punctuation {
        for (language, path) in [("rust", "a.rs"), ("", "notes.txt"), ("c", "a.c")] {
            let set = split_default(input, language, path);
            assert!(set.is_empty(), "{input:?} as {path} produced {:?}", set.chunks());
        }
    }

    let comments = [
        ("// only a comment", "a.rs"),
        ("/* block */\n// line\n", "a.c"),
        ("/** doc */\n", "a.ts"),
        ("# just a comment\n", "a.py"),
    ];
    for (input, path) in comments {
        let set = split_default(input, "", path);
        assert!(set.is_empty(), "{input:?} as {path} produced {:?}", set.chunks());
    }
}

#[test]
fn minimal_constructs_produce_exactly_one_chunk() {
    let cases = [
        ("fn answer() -> u32 { 42 }", "a.rs"),
        ("def answer():\n    return 42\n", "a.py"),
        ("function answer() { return 42; }", "a.js"),
        ("func answer() int { return 42 }\n", "a.go"),
        ("int answer(void) { return 42; }", "a.c"),
    ];
    for (code, path) in cases {
        let set = split_default(code, "", path);
        assert_eq!(set.len(), 1, "{path}: {:?}", set.chunks());
        assert_eq!(set.chunks()[0].construct_kind(), ConstructKind::Function, "{path}");
    }
}

#[test]
fn splitting_is_idempotent() {
    let first = split_default(MIXED_RUST, "rust", "registry.rs");
    let second = split_default(MIXED_RUST, "rust", "registry.rs");
    assert_eq!(first, second);
    assert!(first.len() >= 4);
}

#[test]
fn candidates_cover_every_non_blank_line() {
    let python = "import sys\n\nCONFIG = {\n    'a': 1,\n}\n\n@cache\ndef load(path):\n    return open(path).read()\n\nif __name__ == '__main__':\n    load(sys.argv[1])\n";
    let javascript = "const fs = require('fs');\n\nexport function read(p) {\n  return fs.readFileSync(p);\n}\n\nclass Box {\n  open() { return 1; }\n}\n\nread('x');\n";
    let cases = [
        (Language::Rust, MIXED_RUST),
        (Language::Python, python),
        (Language::JavaScript, javascript),
    ];
    let registry = ConstructRegistry::builtin();

    for (language, source) in cases {
        for max_chars in [3000, 120] {
            let deadline = Deadline::unbounded();
            let tree = TreeSitterParser::new()
                .parse(language, source, &deadline)
                .unwrap();
            let candidates = BoundaryExtractor::new(&registry, language, max_chars)
                .extract(&tree, source, &deadline)
                .unwrap();
            for (ix, line) in source.lines().enumerate() {
                let n = ix + 1;
                if line.trim().is_empty() {
                    continue;
                }
                assert!(
                    candidates.iter().any(|c| c.span.contains_line(n)),
                    "{language:?} (max_chars {max_chars}): line {n} {line:?} not covered"
                );
            }
        }
    }
}

#[test]
fn no_contained_near_duplicates_survive() {
    let code = "fn handle_a() { dispatch(1); }\nfn handle_b() { dispatch(2); }\n\nmod inner {\n    fn handle_c() { dispatch(3); }\n}\n\nfn handle_d() {\n    dispatch(4);\n}\n";
    for strategy in [MergeStrategy::Conservative, MergeStrategy::Aggressive] {
        let options = ChunkingOptions {
            merge_strategy: strategy,
            ..Default::default()
        };
        let set = split(code, "rust", "handlers.rs", &options).unwrap();
        let chunks = set.chunks();
        for (i, a) in chunks.iter().enumerate() {
            for b in &chunks[i + 1..] {
                let similar = similarity(a.text(), b.text()) >= options.deduplication_threshold;
                let overlapping = a.span().overlap_ratio(&b.span()) >= options.max_overlap_ratio;
                let (ra, rb) = (a.byte_range(), b.byte_range());
                let nested = (ra.start <= rb.start && rb.end <= ra.end)
                    || (rb.start <= ra.start && ra.end <= rb.end);
                assert!(
                    !(similar && overlapping && nested),
                    "{strategy:?}: {:?} and {:?} should have been resolved",
                    a.span(),
                    b.span()
                );
            }
        }
    }
}

#[test]
fn broken_syntax_still_yields_valid_constructs() {
    let code = "fn ok() {\n    run();\n}\n\nfn broken(a: u8 {\n    let x = ;\n";
    let set = split_default(code, "rust", "broken.rs");

    assert_eq!(set.mode, SplitMode::Ast);
    assert!(!set.is_degraded());
    let ok = set
        .chunks()
        .iter()
        .find(|c| c.text().starts_with("fn ok()"))
        .expect("intact function survives");
    assert_eq!(ok.construct_kind(), ConstructKind::Function);
    assert_eq!((ok.start_line(), ok.end_line()), (1, 3));
}

#[test]
fn aggressive_merges_adjacent_near_duplicates() {
    let code = "fn handler_one() { process(1); }\nfn handler_two() { process(2); }\n";

    let conservative = split_default(code, "rust", "handlers.rs");
    assert_eq!(conservative.len(), 2);
    assert_eq!(conservative.stats.merged_count, 0);

    let options = ChunkingOptions {
        merge_strategy: MergeStrategy::Aggressive,
        ..Default::default()
    };
    let aggressive = split(code, "rust", "handlers.rs", &options).unwrap();
    assert_eq!(aggressive.len(), 1);
    assert_eq!(aggressive.stats.merged_count, 1);
    let merged = &aggressive.chunks()[0];
    assert_eq!((merged.start_line(), merged.end_line()), (1, 2));
    assert_eq!(merged.construct_kind(), ConstructKind::Function);
    assert_eq!(merged.text(), code.trim_end());
}

#[test]
fn stats_account_for_every_candidate() {
    let set = split_default(MIXED_RUST, "rust", "registry.rs");
    let stats = &set.stats;
    assert!(stats.total_candidates >= set.len());
    assert_eq!(
        stats.rejected,
        stats.rejection_reasons.values().sum::<usize>()
    );
    assert!(
        stats.total_candidates
            >= set.len() + stats.rejected + stats.duplicates_removed
    );
}

const DEEP_SCRIPT: &str = r#"import sys

if __name__ == '__main__':
    for path in sys.argv[1:]:
        with open(path) as handle:
            for line in handle:
                if line.strip():
                    if not line.startswith('#'):
                        try:
                            print(int(line.split(',')[0].strip()) * 2)
                        except ValueError:
                            pass
"#;

fn split_with_nesting_bound(max_nesting_level: usize) -> ChunkSet {
    let mut options = ChunkingOptions::default();
    options.thresholds.max_nesting_level = max_nesting_level;
    split(DEEP_SCRIPT, "python", "scale.py", &options).expect("split")
}

fn covered(set: &ChunkSet, line: usize) -> bool {
    set.chunks()
        .iter()
        .any(|chunk| chunk.start_line() <= line && line <= chunk.end_line())
}

#[test]
fn deeply_nested_script_body_is_kept_with_default_bound() {
    let set = split_default(DEEP_SCRIPT, "python", "scale.py");
    assert_eq!(set.degraded, None);
    assert!(!set.stats.rejection_reasons.contains_key(REASON_NESTING));
    for line in (1..=12).filter(|&n| n != 2) {
        assert!(covered(&set, line), "line {line} uncovered");
    }
    let body = set
        .chunks()
        .iter()
        .find(|chunk| chunk.construct_kind() == ConstructKind::Generic)
        .expect("script body chunk");
    assert_eq!((body.start_line(), body.end_line()), (3, 12));
}

#[test]
fn nesting_bound_counts_blocks() {
    // seven nested bodies: if, for, with, for, if, if, try
    let at_bound = split_with_nesting_bound(7);
    assert!(covered(&at_bound, 10));
    assert_eq!(at_bound.stats.rejected, 0);

    let over = split_with_nesting_bound(6);
    assert_eq!(over.stats.rejection_reasons.get(REASON_NESTING), Some(&1));
    assert!(covered(&over, 1));
    assert!((3..=12).all(|line| !covered(&over, line)));
    assert_eq!(over.len(), 1);
}

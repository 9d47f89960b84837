use crate::config::ComplexityConfig;
use crate::language::{Language, NestingStyle};
use crate::lexical::{code_only, Lexicon};
use crate::types::{ComplexityMethod, ComplexityProfile};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const EQUAL_EPSILON: f64 = 1e-9;

fn branch_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:if|else|elif|for|while|loop|match|switch|case|catch|except|try|when)\b|&&|\|\||\?",
        )
        .unwrap_or_else(|e| unreachable!("{e}"))
    })
}

/// Size and branching score shared by every method
fn base_score(code: &str, raw: &str) -> f64 {
    let non_blank = raw.lines().filter(|line| !line.trim().is_empty()).count();
    let branches = branch_pattern().find_iter(code).count();
    let chars = raw.trim().chars().count();
    non_blank as f64 + 2.0 * branches as f64 + chars as f64 / 200.0
}

fn indent_width(line: &str, unit: usize) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { unit } else { 1 })
        .sum()
}

/// Deepest indentation level relative to the least-indented code line
fn max_indent_depth(code: &str, unit: usize) -> usize {
    let widths: Vec<usize> = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line, unit))
        .collect();
    let Some(&min) = widths.iter().min() else {
        return 0;
    };
    widths
        .iter()
        .map(|width| (width - min) / unit.max(1))
        .max()
        .unwrap_or(0)
}

/// `(max nesting depth, total bracket count)` over `{([` pairs
fn bracket_stats(code: &str) -> (usize, usize) {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut total = 0usize;
    for c in code.chars() {
        match c {
            '{' | '(' | '[' => {
                depth += 1;
                total += 1;
                max_depth = max_depth.max(depth);
            }
            '}' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                total += 1;
            }
            _ => {}
        }
    }
    (max_depth, total)
}

fn generic_with(text: &str, lexicon: &Lexicon) -> ComplexityProfile {
    let code = code_only(text, lexicon);
    ComplexityProfile {
        score: base_score(&code, text),
        max_depth: 0,
        method: ComplexityMethod::Generic,
    }
}

fn indent_with(text: &str, lexicon: &Lexicon, config: &ComplexityConfig) -> ComplexityProfile {
    let code = code_only(text, lexicon);
    let depth = max_indent_depth(&code, config.indent_unit);
    ComplexityProfile {
        score: base_score(&code, text) + depth as f64 * config.python_indent_weight,
        max_depth: depth,
        method: ComplexityMethod::Indent,
    }
}

fn bracket_with(text: &str, lexicon: &Lexicon, config: &ComplexityConfig) -> ComplexityProfile {
    let code = code_only(text, lexicon);
    let (depth, _total) = bracket_stats(&code);
    ComplexityProfile {
        score: base_score(&code, text) + depth as f64 * config.nesting_depth_weight,
        max_depth: depth,
        method: ComplexityMethod::Bracket,
    }
}

/// Size/structure score with no depth analysis
#[must_use]
pub fn calculate_code_complexity(text: &str) -> ComplexityProfile {
    generic_with(text, &Lexicon::for_language(Language::Unknown))
}

/// Base score plus `max indentation depth * python_indent_weight`
#[must_use]
pub fn calculate_indent_based_complexity(
    text: &str,
    config: &ComplexityConfig,
) -> ComplexityProfile {
    indent_with(text, &Lexicon::for_language(Language::Python), config)
}

/// Base score plus `max bracket depth * nesting_depth_weight`
#[must_use]
pub fn calculate_bracket_based_complexity(
    text: &str,
    config: &ComplexityConfig,
) -> ComplexityProfile {
    bracket_with(text, &Lexicon::for_language(Language::Unknown), config)
}

/// Pick the method for `language`, or the generic one when nesting analysis is off
#[must_use]
pub fn calculate_code_complexity_with_language(
    text: &str,
    language: Language,
    config: &ComplexityConfig,
) -> ComplexityProfile {
    let lexicon = Lexicon::for_language(language);
    if !config.enable_nesting_analysis {
        return generic_with(text, &lexicon);
    }
    match language.nesting_style() {
        NestingStyle::Indent => indent_with(text, &lexicon, config),
        NestingStyle::Bracket => bracket_with(text, &lexicon, config),
        NestingStyle::None => generic_with(text, &lexicon),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoreComplex {
    Content1,
    Content2,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityComparison {
    pub more_complex: MoreComplex,
    /// Absolute score difference
    pub difference: f64,
    pub scores: (f64, f64),
}

#[must_use]
pub fn compare_scores(first: f64, second: f64) -> ComplexityComparison {
    let difference = (first - second).abs();
    let more_complex = if difference <= EQUAL_EPSILON {
        MoreComplex::Equal
    } else if first > second {
        MoreComplex::Content1
    } else {
        MoreComplex::Content2
    };
    ComplexityComparison {
        more_complex,
        difference,
        scores: (first, second),
    }
}

#[must_use]
pub fn compare_complexity(
    first: &str,
    second: &str,
    language: Language,
    config: &ComplexityConfig,
) -> ComplexityComparison {
    compare_scores(
        calculate_code_complexity_with_language(first, language, config).score,
        calculate_code_complexity_with_language(second, language, config).score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> ComplexityConfig {
        ComplexityConfig::default()
    }

    #[test]
    fn generic_counts_lines_and_branches() {
        let plain = calculate_code_complexity("a\nb\n\nc");
        assert_eq!(plain.method, ComplexityMethod::Generic);
        assert!((plain.score - (3.0 + 6.0 / 200.0)).abs() < 1e-9);

        let branchy = calculate_code_complexity("if a && b {\n}");
        assert!(branchy.score > 2.0 + 2.0 * 2.0);
    }

    #[test]
    fn keywords_inside_strings_do_not_count() {
        let quoted = calculate_code_complexity_with_language(
            "let s = \"if while for\";",
            Language::Rust,
            &config(),
        );
        let bare = calculate_code_complexity_with_language(
            "let s = \"aa bbbbb ccc\";",
            Language::Rust,
            &config(),
        );
        assert!((quoted.score - bare.score).abs() < 1e-9);
    }

    #[test]
    fn indent_depth_is_relative_to_chunk() {
        let method = "    def f(self):\n        if x:\n            return 1\n";
        let profile = calculate_indent_based_complexity(method, &config());
        assert_eq!(profile.max_depth, 2);
        assert_eq!(profile.method, ComplexityMethod::Indent);

        let tabs = "def f():\n\tif x:\n\t\treturn 1\n";
        assert_eq!(calculate_indent_based_complexity(tabs, &config()).max_depth, 2);
    }

    #[test]
    fn bracket_depth_ignores_literals() {
        let profile = calculate_code_complexity_with_language(
            "fn a() { let s = \"{{{{\"; if x { y(); } }",
            Language::Rust,
            &config(),
        );
        assert_eq!(profile.method, ComplexityMethod::Bracket);
        assert_eq!(profile.max_depth, 3);
    }

    #[test]
    fn dispatch_per_language() {
        let cfg = config();
        let text = "x";
        assert_eq!(
            calculate_code_complexity_with_language(text, Language::Python, &cfg).method,
            ComplexityMethod::Indent
        );
        assert_eq!(
            calculate_code_complexity_with_language(text, Language::Go, &cfg).method,
            ComplexityMethod::Bracket
        );
        assert_eq!(
            calculate_code_complexity_with_language(text, Language::Ruby, &cfg).method,
            ComplexityMethod::Generic
        );
        let off = ComplexityConfig {
            enable_nesting_analysis: false,
            ..cfg
        };
        assert_eq!(
            calculate_code_complexity_with_language(text, Language::Rust, &off).method,
            ComplexityMethod::Generic
        );
    }

    #[test]
    fn comparison_reports_winner() {
        let cfg = config();
        let simple = "fn a() { b(); }";
        let nested = "fn a() { if x { if y { b(); } } }";
        let result = compare_complexity(simple, nested, Language::Rust, &cfg);
        assert_eq!(result.more_complex, MoreComplex::Content2);
        assert!(result.difference > 0.0);
        assert!((result.scores.1 - result.scores.0 - result.difference).abs() < 1e-9);

        let same = compare_complexity(simple, simple, Language::Rust, &cfg);
        assert_eq!(same.more_complex, MoreComplex::Equal);
        assert_eq!(compare_scores(2.0, 1.0).more_complex, MoreComplex::Content1);
    }

    fn nested_braces(depth: usize) -> String {
        // every level adds exactly one line and one `{`/`}` pair
        let mut text = String::new();
        for level in 0..depth {
            text.push_str(&format!("{}x{{\n", " ".repeat(level)));
        }
        for level in (0..depth).rev() {
            text.push_str(&format!("{}}}\n", " ".repeat(level)));
        }
        text
    }

    fn nested_python(depth: usize, width: usize) -> String {
        // same line count and char budget regardless of depth
        let mut text = String::new();
        for level in 0..width {
            let indent = level.min(depth) * 4;
            text.push_str(&" ".repeat(indent));
            text.push_str("x = 1\n");
        }
        text
    }

    proptest! {
        #[test]
        fn indent_score_grows_with_depth(depth in 0usize..6) {
            let cfg = config();
            let shallow = calculate_indent_based_complexity(&nested_python(depth, 8), &cfg);
            let deeper = calculate_indent_based_complexity(&nested_python(depth + 1, 8), &cfg);
            prop_assert!(deeper.score > shallow.score);
        }

        #[test]
        fn bracket_score_grows_with_depth(depth in 1usize..8) {
            let cfg = config();
            // same lines and brackets: split pairs sequentially vs nested
            let nested = nested_braces(depth + 1);
            let flat = format!("{}{}", nested_braces(depth), "x{\n}\n");
            let deeper = calculate_bracket_based_complexity(&nested, &cfg);
            let shallower = calculate_bracket_based_complexity(&flat, &cfg);
            prop_assert_eq!(deeper.max_depth, depth + 1);
            prop_assert_eq!(shallower.max_depth, depth);
            prop_assert!(deeper.score > shallower.score);
        }

        #[test]
        fn scores_are_finite_and_non_negative(text in ".{0,200}") {
            let profile = calculate_code_complexity_with_language(&text, Language::Rust, &config());
            prop_assert!(profile.score.is_finite());
            prop_assert!(profile.score >= 0.0);
        }
    }
}

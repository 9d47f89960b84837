use crate::language::Language;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Coarse classification used to route a file to AST or plain-text splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Code,
    Markdown,
    Json,
    Yaml,
    Xml,
    PlainText,
}

impl FileType {
    #[must_use]
    pub const fn is_code(self) -> bool {
        matches!(self, Self::Code)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
            Self::PlainText => "text",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" | "mdx" => Some(Self::Markdown),
            "json" | "jsonc" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "xml" | "html" | "htm" | "svg" | "xhtml" => Some(Self::Xml),
            "txt" | "text" | "log" | "rst" | "adoc" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Decide between code and document handling for one file.
///
/// Document extensions win, then a recognised code language, then content sniffing.
#[must_use]
pub fn detect_file_type(path: &str, language: Language, content: &str) -> FileType {
    let by_extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(FileType::from_extension);
    if let Some(file_type) = by_extension {
        return file_type;
    }

    if language != Language::Unknown {
        return FileType::Code;
    }

    if has_json_structure(content) {
        FileType::Json
    } else if has_xml_structure(content) {
        FileType::Xml
    } else if has_markdown_structure(content) {
        FileType::Markdown
    } else if has_yaml_structure(content) {
        FileType::Yaml
    } else {
        FileType::PlainText
    }
}

#[must_use]
pub fn has_json_structure(content: &str) -> bool {
    let trimmed = content.trim();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

fn xml_open_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^<([A-Za-z][\w:.-]*)[^>]*>").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

#[must_use]
pub fn has_xml_structure(content: &str) -> bool {
    let trimmed = content.trim_start();
    if trimmed.starts_with("<?xml") {
        return true;
    }
    xml_open_tag()
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .is_some_and(|name| trimmed.contains(&format!("</{}>", name.as_str())))
}

struct MarkdownPatterns {
    heading: Regex,
    fence: Regex,
    list: Regex,
    link: Regex,
    emphasis: Regex,
}

fn markdown_patterns() -> &'static MarkdownPatterns {
    static PATTERNS: OnceLock<MarkdownPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).unwrap_or_else(|e| unreachable!("{e}"));
        MarkdownPatterns {
            heading: compile(r"(?m)^#{1,6}\s+\S"),
            fence: compile(r"(?m)^(```|~~~)"),
            list: compile(r"(?m)^\s*([-*+]|\d+\.)\s+\S"),
            link: compile(r"\[[^\]\n]+\]\([^)\n]+\)"),
            emphasis: compile(r"\*\*[^*\n]+\*\*|__[^_\n]+__"),
        }
    })
}

#[must_use]
pub fn has_markdown_structure(content: &str) -> bool {
    let patterns = markdown_patterns();
    if patterns.heading.is_match(content) || patterns.fence.is_match(content) {
        return true;
    }
    let markers = patterns.list.find_iter(content).count()
        + patterns.link.find_iter(content).count()
        + patterns.emphasis.find_iter(content).count();
    markers >= 2
}

fn yaml_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][\w.-]*\s*:(\s|$)|-\s+\S)").unwrap_or_else(|e| unreachable!("{e}"))
    })
}

#[must_use]
pub fn has_yaml_structure(content: &str) -> bool {
    let mut lines = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .peekable();

    if lines.peek().is_some_and(|first| first.trim() == "---") {
        return true;
    }

    let (total, matching) = lines.fold((0usize, 0usize), |(total, matching), line| {
        (total + 1, matching + usize::from(yaml_line().is_match(line)))
    });
    matching >= 2 && matching * 10 >= total * 6
}

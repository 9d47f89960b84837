//! Syntax-tree boundary.
//!
//! Parsers hand the splitter a [`SyntaxTree`]: an arena of read-only nodes addressed by
//! [`NodeId`], with child indices and a parent back-reference. Node text is never stored;
//! it is sliced from the original source by byte range when needed.

use crate::error::{Result, SplitterError};
use crate::language::Language;
use crate::limits::Deadline;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tree_sitter::Parser;

/// Index of a node inside its [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Body and literal node kinds of the bundled grammars
const BLOCK_KINDS: &[&str] = &[
    "block",
    "statement_block",
    "compound_statement",
    "declaration_list",
    "field_declaration_list",
    "enum_variant_list",
    "match_block",
    "class_body",
    "interface_body",
    "enum_body",
    "object_type",
    "switch_body",
    "object",
    "array",
    "dictionary",
    "list",
    "literal_value",
    "initializer_list",
    "token_tree",
];

/// 1-based line, 0-based byte column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: String,
    pub is_named: bool,
    pub is_error: bool,
    pub start: Position,
    pub end: Position,
    pub byte_range: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl SyntaxNode {
    /// Named node with no parent or children yet
    pub fn new(
        kind: impl Into<String>,
        start: Position,
        end: Position,
        byte_range: Range<usize>,
    ) -> Self {
        Self {
            kind: kind.into(),
            is_named: true,
            is_error: false,
            start,
            end,
            byte_range,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Whether this node is a body or literal block that opens one nesting level
    #[must_use]
    pub fn opens_block(&self) -> bool {
        BLOCK_KINDS.contains(&self.kind.as_str())
    }

    /// Line the node starts on
    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.start.line
    }

    /// Last line holding any of the node's bytes
    ///
    /// A node ending at column 0 of a later row (trailing newline) ends on the previous line.
    #[must_use]
    pub const fn end_line(&self) -> usize {
        if self.end.column == 0 && self.end.line > self.start.line {
            self.end.line - 1
        } else {
            self.end.line
        }
    }
}

/// Arena-backed syntax tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Start a hand-built tree from its root
    pub fn new(mut root: SyntaxNode) -> Self {
        root.parent = None;
        root.children.clear();
        Self { nodes: vec![root] }
    }

    /// Append `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Convert a tree-sitter tree with an iterative cursor walk
    pub fn from_tree_sitter(tree: &tree_sitter::Tree) -> Self {
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut ancestors: Vec<NodeId> = Vec::new();
        let mut cursor = tree.walk();

        loop {
            let node = cursor.node();
            let id = NodeId(nodes.len());
            let parent = ancestors.last().copied();
            let start = node.start_position();
            let end = node.end_position();
            nodes.push(SyntaxNode {
                kind: node.kind().to_string(),
                is_named: node.is_named(),
                is_error: node.is_error() || node.is_missing(),
                start: Position::new(start.row + 1, start.column),
                end: Position::new(end.row + 1, end.column),
                byte_range: node.byte_range(),
                parent,
                children: Vec::new(),
            });
            if let Some(parent) = parent {
                nodes[parent.0].children.push(id);
            }

            if cursor.goto_first_child() {
                ancestors.push(id);
                continue;
            }

            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Self { nodes };
                }
                ancestors.pop();
            }
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id; ids always come from this tree
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.0)
    }

    /// Source text covered by a node, or `""` if its range is not valid for `source`
    #[must_use]
    pub fn node_text<'a>(&self, id: NodeId, source: &'a str) -> &'a str {
        self.get(id)
            .and_then(|node| source.get(node.byte_range.clone()))
            .unwrap_or("")
    }

    /// Most block nodes on any downward path from `id`, counting `id` itself.
    ///
    /// Expressions, argument lists and other inline nodes add no level.
    #[must_use]
    pub fn nesting_depth(&self, id: NodeId) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(id, 0usize)];
        while let Some((current, level)) = stack.pop() {
            let node = self.node(current);
            let level = level + usize::from(node.opens_block());
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|&child| (child, level)));
        }
        deepest
    }

    /// All descendants of `id` (excluding `id`) in pre-order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev().copied());
        }
        out
    }

    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = &self.node(parent).children;
        let index = siblings.iter().position(|&sibling| sibling == id)?;
        index.checked_sub(1).map(|prev| siblings[prev])
    }

    /// Whether any node in the tree is an error or missing node
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.nodes.iter().any(|node| node.is_error)
    }
}

/// Produces syntax trees for source text
pub trait SyntaxParser {
    /// Parse `content`; fails with `ParseError` when no tree can be produced at all
    fn parse(&mut self, language: Language, content: &str, deadline: &Deadline)
        -> Result<SyntaxTree>;
}

/// Tree-sitter backed parser; one instance per thread
pub struct TreeSitterParser {
    parser: Parser,
    current: Option<Language>,
}

impl TreeSitterParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            current: None,
        }
    }

    fn ensure_language(&mut self, language: Language) -> Result<()> {
        if self.current == Some(language) {
            return Ok(());
        }
        if !language.supports_ast() {
            return Err(SplitterError::unsupported_language(language.as_str()));
        }
        let ts_language = language.tree_sitter_language()?;
        self.parser
            .set_language(&ts_language)
            .map_err(|e| SplitterError::tree_sitter(format!("Failed to set language: {e}")))?;
        self.current = Some(language);
        Ok(())
    }
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxParser for TreeSitterParser {
    fn parse(
        &mut self,
        language: Language,
        content: &str,
        deadline: &Deadline,
    ) -> Result<SyntaxTree> {
        self.ensure_language(language)?;
        deadline.check("parse")?;

        let micros = deadline
            .remaining()
            .map_or(0, |left| u64::try_from(left.as_micros()).unwrap_or(u64::MAX).max(1));
        self.parser.set_timeout_micros(micros);

        let tree = self.parser.parse(content, None);
        self.parser.reset();

        match tree {
            Some(tree) => Ok(SyntaxTree::from_tree_sitter(&tree)),
            None if deadline.is_expired() => Err(SplitterError::Timeout { stage: "parse" }),
            None => Err(SplitterError::parse(format!(
                "{} parser produced no tree",
                language.as_str()
            ))),
        }
    }
}

//! Tree-sitter Python parser

use crate::error::ParseError;
use tree_sitter::{Node, Parser, Tree};

/// A tree-sitter parser configured for Python. Not `Sync`: keep one per
/// thread.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse `source`, rejecting trees that contain syntax errors.
    ///
    /// The grammar also accepts a few Python 2 forms and bare `:=`
    /// statements; those are rejected as well, since Python 3 would not
    /// load the file.
    pub fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        let tree = self.parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();
        let invalid = if root.has_error() {
            Some(first_error(root).unwrap_or(root))
        } else {
            first_legacy_construct(root, source.as_bytes())
        };
        if let Some(node) = invalid {
            let at = node.start_position();
            return Err(ParseError::Syntax {
                line: at.row + 1,
                column: at.column + 1,
            });
        }
        Ok(tree)
    }
}

/// Depth-first search for the first error or missing node.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// First node, in source order, that parses but is not Python 3.
fn first_legacy_construct<'t>(root: Node<'t>, source: &[u8]) -> Option<Node<'t>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_legacy_construct(node, source) {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn is_legacy_construct(node: Node, source: &[u8]) -> bool {
    match node.kind() {
        // `print >>f, x` is still a valid (if useless) Python 3 expression.
        "print_statement" => !has_chevron(node),
        "exec_statement" => true,
        // Backtick repr is lexed as a string delimiter.
        "string_start" => node.utf8_text(source).is_ok_and(|text| text.ends_with('`')),
        // `:=` needs parentheses at statement level and on an assignment's
        // right-hand side.
        "named_expression" => node.parent().is_some_and(|parent| {
            matches!(
                parent.kind(),
                "expression_statement" | "assignment" | "augmented_assignment"
            )
        }),
        _ => false,
    }
}

fn has_chevron(node: Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|child| child.kind() == "chevron")
}

//! Import statement extraction from Python syntax trees

use tree_sitter::{Node, Tree};

/// One import statement, reduced to the names it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatement {
    /// `import a.b, c as d` yields `["a.b", "c"]`.
    Import { names: Vec<String> },
    /// `from ..pkg.mod import x, y as z`: level 2, module `pkg.mod`,
    /// names `["x", "y"]`. A wildcard import has no names.
    From {
        level: usize,
        module: Option<String>,
        names: Vec<String>,
    },
}

/// Collect every import statement in the tree, in source order, including
/// imports nested in functions, classes and conditionals.
pub fn collect_imports(tree: &Tree, source: &[u8]) -> Vec<ImportStatement> {
    let mut imports = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                let names = name_fields(node, source);
                if !names.is_empty() {
                    imports.push(ImportStatement::Import { names });
                }
            }
            "import_from_statement" => {
                if let Some(statement) = from_import(node, source) {
                    imports.push(statement);
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    imports
}

fn from_import(node: Node, source: &[u8]) -> Option<ImportStatement> {
    let module_node = node.child_by_field_name("module_name")?;
    let (level, module) = if module_node.kind() == "relative_import" {
        relative_module(module_node, source)
    } else {
        (0, dotted_name(module_node, source))
    };
    if level == 0 && module.is_none() {
        return None;
    }

    Some(ImportStatement::From {
        level,
        module,
        names: name_fields(node, source),
    })
}

/// `..pkg.mod` becomes `(2, Some("pkg.mod"))`, a bare `.` becomes `(1, None)`.
fn relative_module(node: Node, source: &[u8]) -> (usize, Option<String>) {
    let mut level = 0;
    let mut module = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => {
                level = child
                    .utf8_text(source)
                    .map_or(0, |dots| dots.chars().filter(|c| *c == '.').count());
            }
            "dotted_name" => module = dotted_name(child, source),
            _ => {}
        }
    }
    (level, module)
}

/// The `name` fields of an import statement, with aliases stripped.
fn name_fields(node: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    node.children_by_field_name("name", &mut cursor)
        .filter_map(|child| {
            let target = if child.kind() == "aliased_import" {
                child.child_by_field_name("name")?
            } else {
                child
            };
            dotted_name(target, source)
        })
        .collect()
}

/// Source text of a dotted name with any interior whitespace removed.
fn dotted_name(node: Node, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let name: String = text.split('.').map(str::trim).collect::<Vec<_>>().join(".");
    if name.is_empty() { None } else { Some(name) }
}

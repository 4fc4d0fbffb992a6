//! Python import statement decoding.
//!
//! Decodes `import`, `from ... import` and `from __future__ import`
//! statements into one [`ImportSpec`] per imported name, including the local
//! name each import binds and the origin that binding stands for.

use crate::ingest::render::node_text;
use crate::record::ImportType;
use tree_sitter::Node;

/// Root modules treated as standard library.
pub const STDLIB_MODULES: &[&str] = &[
    "abc",
    "argparse",
    "ast",
    "asyncio",
    "base64",
    "collections",
    "concurrent",
    "contextlib",
    "copy",
    "csv",
    "dataclasses",
    "datetime",
    "enum",
    "functools",
    "glob",
    "hashlib",
    "heapq",
    "inspect",
    "io",
    "itertools",
    "json",
    "logging",
    "math",
    "multiprocessing",
    "os",
    "pathlib",
    "pickle",
    "random",
    "re",
    "shutil",
    "socket",
    "sqlite3",
    "string",
    "subprocess",
    "sys",
    "tempfile",
    "threading",
    "time",
    "typing",
    "unittest",
    "urllib",
    "uuid",
    "warnings",
];

/// Whether the root of a dotted module name is on the allow-list.
pub fn is_stdlib_module(module: &str) -> bool {
    let root = module.split('.').next().unwrap_or("");
    STDLIB_MODULES.contains(&root)
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Imported name as written (`os.path` in `import os.path`, `path` in
    /// `from os import path`).
    pub name: String,
    /// Source module (empty for `from . import x`).
    pub module: String,
    /// Module-qualified name.
    pub full_name: String,
    /// Alias given with `as`.
    pub alias: Option<String>,
    /// Statement form.
    pub import_type: ImportType,
    /// Number of leading dots of a relative import.
    pub level: usize,
    /// Local name the statement binds (`None` for `*`).
    pub bound_name: Option<String>,
    /// What the bound name refers to.
    pub origin: String,
    /// Statement line (1-based).
    pub lineno: usize,
}

impl ImportSpec {
    /// Relative import (`from . import x`).
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }

    /// Absolute import of an allow-listed module.
    pub fn is_stdlib(&self) -> bool {
        !self.is_relative() && !self.module.is_empty() && is_stdlib_module(&self.module)
    }
}

/// Decode an import statement node. Other node kinds yield nothing.
pub fn parse_import(node: Node, source: &[u8]) -> Vec<ImportSpec> {
    match node.kind() {
        "import_statement" => parse_direct(node, source),
        "import_from_statement" => parse_from(node, source, None),
        "future_import_statement" => parse_from(node, source, Some("__future__")),
        _ => Vec::new(),
    }
}

/// `import a.b`, `import a.b as c`, `import a, b`
fn parse_direct(node: Node, source: &[u8]) -> Vec<ImportSpec> {
    let lineno = node.start_position().row + 1;
    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        let (target, alias) = match child.kind() {
            "dotted_name" => (node_text(child, source).to_string(), None),
            "aliased_import" => match aliased_parts(child, source) {
                Some(parts) => parts,
                None => continue,
            },
            _ => continue,
        };
        // `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`
        let (bound_name, origin) = match &alias {
            Some(alias) => (alias.clone(), target.clone()),
            None => {
                let root = target.split('.').next().unwrap_or(&target).to_string();
                (root.clone(), root)
            }
        };
        specs.push(ImportSpec {
            name: target.clone(),
            module: target.clone(),
            full_name: target,
            alias,
            import_type: ImportType::Direct,
            level: 0,
            bound_name: Some(bound_name),
            origin,
            lineno,
        });
    }
    specs
}

/// `from m import a`, `from m import a as b`, `from . import a`, `from m import *`
fn parse_from(node: Node, source: &[u8], fixed_module: Option<&str>) -> Vec<ImportSpec> {
    let lineno = node.start_position().row + 1;
    let (module, level) = match fixed_module {
        Some(module) => (module.to_string(), 0),
        None => match node.child_by_field_name("module_name") {
            Some(module_node) if module_node.kind() == "relative_import" => {
                relative_parts(module_node, source)
            }
            Some(module_node) => (node_text(module_node, source).to_string(), 0),
            None => (String::new(), 0),
        },
    };
    let qualify = |name: &str| {
        if module.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", module, name)
        }
    };

    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let (name, alias) = match child.kind() {
            "wildcard_import" => ("*".to_string(), None),
            "dotted_name" | "aliased_import" if !is_module_field(node, child) => {
                if child.kind() == "dotted_name" {
                    (node_text(child, source).to_string(), None)
                } else {
                    match aliased_parts(child, source) {
                        Some(parts) => parts,
                        None => continue,
                    }
                }
            }
            _ => continue,
        };
        let full_name = qualify(&name);
        let bound_name = if name == "*" {
            None
        } else {
            Some(alias.clone().unwrap_or_else(|| name.clone()))
        };
        specs.push(ImportSpec {
            name,
            module: module.clone(),
            full_name: full_name.clone(),
            alias,
            import_type: ImportType::From,
            level,
            bound_name,
            origin: full_name,
            lineno,
        });
    }
    specs
}

fn is_module_field(statement: Node, child: Node) -> bool {
    statement
        .child_by_field_name("module_name")
        .map(|module| module.id() == child.id())
        .unwrap_or(false)
}

/// Split `name as alias` into its two parts.
fn aliased_parts(node: Node, source: &[u8]) -> Option<(String, Option<String>)> {
    let name = node.child_by_field_name("name")?;
    let alias = node
        .child_by_field_name("alias")
        .map(|alias| node_text(alias, source).to_string());
    Some((node_text(name, source).to_string(), alias))
}

/// Dots and optional module of a `relative_import` node.
fn relative_parts(node: Node, source: &[u8]) -> (String, usize) {
    let mut level = 0;
    let mut module = String::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => level = node_text(child, source).matches('.').count(),
            "dotted_name" => module = node_text(child, source).to_string(),
            _ => {}
        }
    }
    (module, level)
}

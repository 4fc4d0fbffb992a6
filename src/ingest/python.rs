//! Python tree extractor.
//!
//! Walks one parsed unit depth-first in a single pre-order pass while
//! keeping a lexical scope stack (module, class, function). Definitions are
//! attached to the innermost scope. Name resolution is syntactic only: a
//! flat table of names defined earlier in the unit (latest definition wins)
//! and an alias table filled from import statements.

use super::imports::{parse_import, ImportSpec};
use super::metrics::compute_metrics;
use super::render::{node_text, render, truncate};
use super::{path_id, relative_path, SourceText, UnitRecords};
use crate::identity::{content_hash, stable_id};
use crate::record::{
    ClassNode, DecoratorInfo, DecoratorNode, Edge, EdgeKind, FileNode, FunctionNode,
    ImportNode, Node, ParameterInfo, ParameterKind, ParameterNode, VariableNode,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tree_sitter::Node as SyntaxNode;

/// Deepest syntax nesting the extractor descends into.
pub const MAX_TRAVERSAL_DEPTH: usize = 512;

/// Literal values longer than this are cut.
const MAX_VALUE_CHARS: usize = 100;

/// Base or metaclass names that mark a class as abstract.
const ABSTRACT_BASES: &[&str] = &["ABC", "abc.ABC", "ABCMeta", "abc.ABCMeta"];

const EMBEDDING_PENDING: &str = "pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
    Function,
}

#[derive(Debug, Clone)]
struct Scope {
    id: String,
    kind: ScopeKind,
    name: String,
}

/// Traversal stopped at [`MAX_TRAVERSAL_DEPTH`].
#[derive(Debug)]
struct DepthExceeded {
    line: usize,
}

/// Extracts records from one Python unit.
///
/// The extractor owns the scope stack and name tables for the duration of
/// one pass; [`PythonExtractor::extract`] consumes it.
pub struct PythonExtractor<'a> {
    path: &'a Path,
    relpath: String,
    text: &'a str,
    lines: SourceText,
    file_id: String,
    scopes: Vec<Scope>,
    imports: HashMap<String, String>,
    defined_names: HashMap<String, String>,
    records: UnitRecords,
}

impl<'a> PythonExtractor<'a> {
    /// Prepare an extractor for `path`, a file below `repo_root`.
    pub fn new(repo_root: &Path, path: &'a Path, text: &'a str) -> Self {
        Self {
            path,
            relpath: relative_path(repo_root, path),
            text,
            lines: SourceText::new(text),
            file_id: path_id(path),
            scopes: Vec::new(),
            imports: HashMap::new(),
            defined_names: HashMap::new(),
            records: UnitRecords::default(),
        }
    }

    /// Walk the tree rooted at `root` and return everything emitted.
    ///
    /// The File node is always emitted first. A traversal fault stops the
    /// walk but keeps the records emitted so far.
    pub fn extract(mut self, root: SyntaxNode) -> UnitRecords {
        self.record_file();
        if let Err(fault) = self.visit_children(root, 0) {
            self.records.fault = Some(format!(
                "nesting deeper than {} at line {}",
                MAX_TRAVERSAL_DEPTH, fault.line
            ));
        }
        self.records
    }

    fn src(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn scope(&self) -> &Scope {
        // The module scope is pushed first and never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_function(&self) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.kind == ScopeKind::Function)
            .map(|s| s.id.clone())
    }

    fn qualified_name(&self, name: &str) -> String {
        let mut parts: Vec<&str> = self
            .scopes
            .iter()
            .filter(|s| s.kind != ScopeKind::Module)
            .map(|s| s.name.as_str())
            .collect();
        parts.push(name);
        parts.join(".")
    }

    fn record_file(&mut self) {
        let module = self
            .relpath
            .strip_suffix(".py")
            .unwrap_or(&self.relpath)
            .replace('/', ".");
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        self.records.nodes.push(Node::File(FileNode {
            id: self.file_id.clone(),
            name,
            path: self.path.to_string_lossy().into_owned(),
            relpath: self.relpath.clone(),
            embedding_semantics: Some(format!("File {} (module {})", self.relpath, module)),
            module,
            extension,
            sha: content_hash(self.text),
            lines_of_code: self.lines.line_count(),
            size_bytes: self.text.len(),
            language: "python".to_string(),
            encoding: "utf-8".to_string(),
            embedding_status: Some(EMBEDDING_PENDING.to_string()),
            embedding_timestamp: None,
        }));

        self.scopes.push(Scope {
            id: self.file_id.clone(),
            kind: ScopeKind::Module,
            name: String::new(),
        });
    }

    fn visit(&mut self, node: SyntaxNode, depth: usize) -> Result<(), DepthExceeded> {
        if depth > MAX_TRAVERSAL_DEPTH {
            return Err(DepthExceeded {
                line: node.start_position().row + 1,
            });
        }

        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.record_imports(node);
                return Ok(());
            }
            "decorated_definition" => return self.visit_decorated(node, depth),
            "class_definition" => return self.visit_class(node, &[], depth),
            "function_definition" => return self.visit_function(node, &[], depth),
            "assignment" => self.record_assignment(node),
            "call" => self.record_call(node),
            "raise_statement" => self.record_raise(node),
            "return_statement" => self.record_return(node),
            _ => {}
        }
        self.visit_children(node, depth)
    }

    fn visit_children(&mut self, node: SyntaxNode, depth: usize) -> Result<(), DepthExceeded> {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }

    fn visit_decorated(&mut self, node: SyntaxNode, depth: usize) -> Result<(), DepthExceeded> {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.push(child);
                // Decorator expressions are evaluated in the enclosing scope.
                self.visit_children(child, depth + 1)?;
            }
        }

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "class_definition" => {
                self.visit_class(def, &decorators, depth + 1)
            }
            Some(def) if def.kind() == "function_definition" => {
                self.visit_function(def, &decorators, depth + 1)
            }
            Some(def) => self.visit(def, depth + 1),
            None => Ok(()),
        }
    }

    // ---- imports ----

    fn record_imports(&mut self, node: SyntaxNode) {
        for spec in parse_import(node, self.src()) {
            self.record_import(spec);
        }
    }

    fn record_import(&mut self, spec: ImportSpec) {
        let lineno = spec.lineno.to_string();
        let id = stable_id(&[
            self.file_id.as_str(),
            "import",
            spec.full_name.as_str(),
            lineno.as_str(),
        ]);
        if let Some(bound) = &spec.bound_name {
            self.imports.insert(bound.clone(), spec.origin.clone());
        }

        self.records.nodes.push(Node::Import(ImportNode {
            id: id.clone(),
            is_relative: spec.is_relative(),
            is_stdlib: spec.is_stdlib(),
            name: spec.name,
            module: spec.module,
            full_name: spec.full_name,
            alias: spec.alias,
            import_type: spec.import_type,
            level: spec.level,
            lineno: spec.lineno,
        }));
        self.records.edges.push(
            Edge::resolved(EdgeKind::Imports, &self.file_id, &id).with_lineno(spec.lineno),
        );
        self.records.stats.imports += 1;
    }

    // ---- classes ----

    fn visit_class(
        &mut self,
        node: SyntaxNode,
        decorators: &[SyntaxNode],
        depth: usize,
    ) -> Result<(), DepthExceeded> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node, depth);
        };
        let src = self.src();
        let name = node_text(name_node, src).to_string();
        let lineno = node.start_position().row + 1;
        let id = stable_id(&[
            self.file_id.as_str(),
            "class",
            name.as_str(),
            lineno.to_string().as_str(),
        ]);
        let parent = self.scope().id.clone();

        let mut bases = Vec::new();
        let mut metaclass = None;
        let superclasses = node.child_by_field_name("superclasses");
        if let Some(args) = superclasses {
            let mut cursor = args.walk();
            for arg in args.named_children(&mut cursor) {
                match arg.kind() {
                    "comment" => {}
                    "keyword_argument" => {
                        let is_meta = arg
                            .child_by_field_name("name")
                            .map(|n| node_text(n, src) == "metaclass")
                            .unwrap_or(false);
                        if is_meta {
                            metaclass = arg.child_by_field_name("value").and_then(|v| render(v, src));
                        }
                    }
                    _ => bases.extend(render(arg, src)),
                }
            }
        }
        let is_abstract = bases
            .iter()
            .chain(metaclass.iter())
            .any(|b| ABSTRACT_BASES.contains(&b.as_str()));

        let decorator_names: Vec<String> = decorators
            .iter()
            .filter_map(|d| decode_decorator(*d, src).map(|(info, _)| info.name))
            .collect();

        let body = node.child_by_field_name("body");
        let (num_methods, num_class_vars) = body.map(count_members).unwrap_or((0, 0));
        let docstring = body.and_then(|b| docstring_of(b, src));

        self.defined_names.insert(name.clone(), id.clone());
        self.records.nodes.push(Node::Class(ClassNode {
            id: id.clone(),
            qualified_name: self.qualified_name(&name),
            is_private: name.starts_with('_'),
            name: name.clone(),
            lineno,
            end_lineno: node.end_position().row + 1,
            docstring,
            snippet: self.lines.snippet(node.start_byte(), node.end_byte()),
            bases: bases.clone(),
            decorators: decorator_names,
            num_methods,
            num_class_vars,
            is_abstract,
        }));
        self.records.edges.push(
            Edge::resolved(EdgeKind::Defines, &parent, &id).with_relationship("contains_class"),
        );

        for base in bases {
            let edge = match self.defined_names.get(&base) {
                Some(base_id) => Edge {
                    base_name: Some(base.clone()),
                    ..Edge::resolved(EdgeKind::Inherits, &id, base_id)
                },
                None => Edge {
                    inferred: Some(true),
                    ..Edge::external(EdgeKind::Inherits, &id, &base)
                },
            };
            self.records.edges.push(edge);
        }
        self.records.stats.classes += 1;

        if let Some(args) = superclasses {
            self.visit_children(args, depth + 1)?;
        }
        self.scopes.push(Scope {
            id,
            kind: ScopeKind::Class,
            name,
        });
        let result = match body {
            Some(body) => self.visit_children(body, depth + 1),
            None => Ok(()),
        };
        self.scopes.pop();
        result
    }

    // ---- functions ----

    fn visit_function(
        &mut self,
        node: SyntaxNode,
        decorators: &[SyntaxNode],
        depth: usize,
    ) -> Result<(), DepthExceeded> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node, depth);
        };
        let src = self.src();
        let name = node_text(name_node, src).to_string();
        let lineno = node.start_position().row + 1;
        let id = stable_id(&[
            self.file_id.as_str(),
            "function",
            name.as_str(),
            lineno.to_string().as_str(),
        ]);
        let parent = self.scope().id.clone();
        // Nested functions inside a method stay methods of the enclosing class.
        let is_method = self.scopes.iter().any(|s| s.kind == ScopeKind::Class);

        let is_async = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == "async");
            found
        };
        let decoded: Vec<(DecoratorInfo, usize)> = decorators
            .iter()
            .filter_map(|d| decode_decorator(*d, src))
            .collect();

        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| decode_parameters(p, src))
            .unwrap_or_default();
        let num_positional = parameters
            .iter()
            .filter(|p| matches!(p.kind, ParameterKind::Positional | ParameterKind::PositionalOnly))
            .count();
        let return_type = node
            .child_by_field_name("return_type")
            .and_then(|r| render(r, src));
        let body = node.child_by_field_name("body");
        let docstring = body.and_then(|b| docstring_of(b, src));
        let metrics = compute_metrics(node, num_positional, decorators.len(), docstring.is_some());
        let qualified_name = self.qualified_name(&name);

        let embedding_semantics =
            semantic_text(&qualified_name, &parameters, return_type.as_deref(), docstring.as_deref());

        self.defined_names.insert(name.clone(), id.clone());

        // Decorator nodes precede the Decorates edges that reference them.
        let mut decorates = Vec::new();
        for (info, dec_line) in &decoded {
            let dec_id = stable_id(&[
                self.file_id.as_str(),
                "decorator",
                info.name.as_str(),
                dec_line.to_string().as_str(),
            ]);
            self.records.nodes.push(Node::Decorator(DecoratorNode {
                id: dec_id.clone(),
                name: info.name.clone(),
                lineno: *dec_line,
                args: info.args.clone(),
                kwargs: info.kwargs.clone(),
            }));
            self.records.stats.decorators += 1;
            decorates.push(Edge::resolved(EdgeKind::Decorates, &dec_id, &id).with_lineno(lineno));
        }

        let function = FunctionNode {
            id: id.clone(),
            qualified_name,
            is_async,
            is_method,
            is_static: has_decorator(&decoded, &["staticmethod"]),
            is_class_method: has_decorator(&decoded, &["classmethod"]),
            is_property: has_decorator(&decoded, &["property"]),
            is_abstract: has_decorator(&decoded, &["abstractmethod", "abc.abstractmethod"]),
            is_private: name.starts_with('_') && !name.starts_with("__"),
            is_magic: name.len() > 4 && name.starts_with("__") && name.ends_with("__"),
            decorators: decoded.iter().map(|(d, _)| d.name.clone()).collect(),
            decorator_details: decoded.iter().map(|(d, _)| d.clone()).collect(),
            parameters: parameters.clone(),
            return_type,
            lineno,
            end_lineno: node.end_position().row + 1,
            docstring,
            snippet: self.lines.snippet(node.start_byte(), node.end_byte()),
            metrics,
            embedding_semantics: Some(embedding_semantics),
            embedding_status: Some(EMBEDDING_PENDING.to_string()),
            embedding_timestamp: None,
            name: name.clone(),
        };
        if is_method {
            self.records.nodes.push(Node::Method(function));
            self.records.stats.methods += 1;
        } else {
            self.records.nodes.push(Node::Function(function));
            self.records.stats.functions += 1;
        }
        self.records.edges.push(
            Edge::resolved(EdgeKind::Defines, &parent, &id).with_relationship(if is_method {
                "contains_method"
            } else {
                "contains_function"
            }),
        );

        for param in &parameters {
            let param_id = stable_id(&[id.as_str(), "param", param.name.as_str()]);
            self.records.nodes.push(Node::Parameter(ParameterNode {
                id: param_id.clone(),
                name: param.name.clone(),
                param_type: param.param_type.clone(),
                kind: param.kind,
                default: param.default.clone(),
                position: param.position,
            }));
            self.records.edges.push(Edge {
                position: Some(param.position),
                ..Edge::resolved(EdgeKind::HasParameter, &id, &param_id)
            });
        }
        self.records.edges.extend(decorates);

        self.scopes.push(Scope {
            id,
            kind: ScopeKind::Function,
            name,
        });
        let mut result = Ok(());
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            // Name and return annotation hold no facts.
            if child.id() == name_node.id() || child.kind() == "type" {
                continue;
            }
            result = self.visit(child, depth + 1);
            if result.is_err() {
                break;
            }
        }
        self.scopes.pop();
        result
    }

    // ---- statements and expressions ----

    fn record_assignment(&mut self, node: SyntaxNode) {
        // `a = b = 1` nests; the outermost assignment handles every target.
        if node.parent().map(|p| p.kind() == "assignment").unwrap_or(false) {
            return;
        }
        let src = self.src();
        let mut targets = Vec::new();
        let mut value = node.child_by_field_name("right");
        targets.extend(node.child_by_field_name("left"));
        while let Some(inner) = value.filter(|v| v.kind() == "assignment") {
            targets.extend(inner.child_by_field_name("left"));
            value = inner.child_by_field_name("right");
        }
        let Some(value) = value else {
            // Bare annotation, nothing is bound.
            return;
        };
        let annotation = node.child_by_field_name("type").and_then(|t| render(t, src));
        let (value_type, rendered) = classify_value(value, src);

        let scope = self.scope().clone();
        let is_global = scope.kind == ScopeKind::Module;
        let lineno = node.start_position().row + 1;

        for target in targets.into_iter().filter(|t| t.kind() == "identifier") {
            let name = node_text(target, src).to_string();
            let id = stable_id(&[
                scope.id.as_str(),
                "var",
                name.as_str(),
                lineno.to_string().as_str(),
            ]);
            self.records.nodes.push(Node::Variable(VariableNode {
                id: id.clone(),
                is_constant: is_constant_name(&name),
                is_private: name.starts_with('_'),
                name: name.clone(),
                value: rendered.clone(),
                value_type: value_type.clone(),
                annotation: annotation.clone(),
                lineno,
                is_global,
                scope: if is_global { "global" } else { "local" }.to_string(),
            }));
            self.records.edges.push(
                Edge::resolved(EdgeKind::Defines, &scope.id, &id)
                    .with_relationship("defines_variable"),
            );
            self.defined_names.insert(name, id);
            self.records.stats.variables += 1;
        }
    }

    fn record_call(&mut self, node: SyntaxNode) {
        let src = self.src();
        let Some(callee) = node
            .child_by_field_name("function")
            .and_then(|f| callee_name(f, src))
        else {
            return;
        };

        let first = callee.split('.').next().unwrap_or(&callee);
        let resolved_name = self.imports.get(first).map(|origin| {
            let rest = &callee[first.len()..];
            format!("{}{}", origin, rest)
        });
        let target_id = self.defined_names.get(first).cloned();
        let (num_args, num_kwargs) = node
            .child_by_field_name("arguments")
            .map(count_arguments)
            .unwrap_or((0, 0));

        let caller = self.scope().id.clone();
        self.records.edges.push(Edge {
            to_id: target_id.clone(),
            lineno: Some(node.start_position().row + 1),
            resolved_name: resolved_name.filter(|r| *r != callee),
            num_args: Some(num_args),
            num_kwargs: Some(num_kwargs),
            inferred: Some(target_id.is_none()),
            ..Edge::external(EdgeKind::Calls, &caller, &callee)
        });
        self.records.stats.calls += 1;
    }

    fn record_raise(&mut self, node: SyntaxNode) {
        let Some(function) = self.current_function() else {
            return;
        };
        let cause = node.child_by_field_name("cause");
        let mut cursor = node.walk();
        let raised = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment" && Some(*c) != cause);
        if let Some(text) = raised.and_then(|r| render(r, self.src())) {
            self.records.edges.push(
                Edge::external(EdgeKind::Raises, &function, &text)
                    .with_lineno(node.start_position().row + 1),
            );
        }
    }

    fn record_return(&mut self, node: SyntaxNode) {
        let Some(function) = self.current_function() else {
            return;
        };
        let mut cursor = node.walk();
        let value = node.named_children(&mut cursor).find(|c| c.kind() != "comment");
        if let Some(text) = value.and_then(|v| render(v, self.src())) {
            self.records.edges.push(
                Edge::external(EdgeKind::Returns, &function, &text)
                    .with_lineno(node.start_position().row + 1),
            );
        }
    }
}

fn has_decorator(decoded: &[(DecoratorInfo, usize)], wanted: &[&str]) -> bool {
    decoded.iter().any(|(d, _)| wanted.contains(&d.name.as_str()))
}

/// Dotted text of an identifier or attribute chain. Non-name links in the
/// chain are dropped (`a().b` gives `b`).
fn dotted_name(node: SyntaxNode, src: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" => {
                parts.push(node_text(current, src));
                break;
            }
            "attribute" => {
                if let Some(attr) = current.child_by_field_name("attribute") {
                    parts.push(node_text(attr, src));
                }
                match current.child_by_field_name("object") {
                    Some(object) => current = object,
                    None => break,
                }
            }
            _ => break,
        }
    }
    parts.reverse();
    parts.join(".")
}

fn callee_name(function: SyntaxNode, src: &[u8]) -> Option<String> {
    let name = match function.kind() {
        "identifier" | "attribute" => dotted_name(function, src),
        _ => return None,
    };
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Positional and keyword argument counts. `**kw` counts as a keyword.
fn count_arguments(arguments: SyntaxNode) -> (usize, usize) {
    if arguments.kind() != "argument_list" {
        // Bare generator argument: `f(x for x in xs)`.
        return (1, 0);
    }
    let mut args = 0;
    let mut kwargs = 0;
    let mut cursor = arguments.walk();
    for arg in arguments.named_children(&mut cursor) {
        match arg.kind() {
            "comment" => {}
            "keyword_argument" | "dictionary_splat" => kwargs += 1,
            _ => args += 1,
        }
    }
    (args, kwargs)
}

/// Decode a `decorator` node into its name, call arguments and line.
fn decode_decorator(decorator: SyntaxNode, src: &[u8]) -> Option<(DecoratorInfo, usize)> {
    let mut cursor = decorator.walk();
    let expr = decorator
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    let mut args = Vec::new();
    let mut kwargs = BTreeMap::new();

    let name = match expr.kind() {
        "identifier" => node_text(expr, src).to_string(),
        "call" => {
            let function = expr.child_by_field_name("function")?;
            let name = callee_name(function, src)?;
            if let Some(arguments) = expr.child_by_field_name("arguments") {
                let mut cursor = arguments.walk();
                for arg in arguments.named_children(&mut cursor) {
                    match arg.kind() {
                        "comment" | "dictionary_splat" => {}
                        "keyword_argument" => {
                            let key = arg.child_by_field_name("name").map(|n| node_text(n, src));
                            let value = arg.child_by_field_name("value").and_then(|v| render(v, src));
                            if let (Some(key), Some(value)) = (key, value) {
                                kwargs.insert(key.to_string(), value);
                            }
                        }
                        _ => args.extend(render(arg, src)),
                    }
                }
            }
            name
        }
        _ => render(expr, src)?,
    };
    Some((
        DecoratorInfo { name, args, kwargs },
        decorator.start_position().row + 1,
    ))
}

/// Decode a `parameters` node.
fn decode_parameters(parameters: SyntaxNode, src: &[u8]) -> Vec<ParameterInfo> {
    let mut params: Vec<ParameterInfo> = Vec::new();
    let mut keyword_only = false;

    let mut cursor = parameters.walk();
    for param in parameters.named_children(&mut cursor) {
        let plain = if keyword_only {
            ParameterKind::KeywordOnly
        } else {
            ParameterKind::Positional
        };
        let (name, kind, param_type, default) = match param.kind() {
            "identifier" => (node_text(param, src).to_string(), plain, None, None),
            "default_parameter" => (
                field_text(param, "name", src),
                plain,
                None,
                param.child_by_field_name("value").and_then(|v| render(v, src)),
            ),
            "typed_default_parameter" => (
                field_text(param, "name", src),
                plain,
                param.child_by_field_name("type").and_then(|t| render(t, src)),
                param.child_by_field_name("value").and_then(|v| render(v, src)),
            ),
            "typed_parameter" => {
                let param_type = param.child_by_field_name("type").and_then(|t| render(t, src));
                let mut inner_cursor = param.walk();
                let Some(inner) = param
                    .named_children(&mut inner_cursor)
                    .find(|c| c.kind() != "type" && c.kind() != "comment")
                else {
                    continue;
                };
                match inner.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        (splat_name(inner, src), ParameterKind::Vararg, param_type, None)
                    }
                    "dictionary_splat_pattern" => {
                        (splat_name(inner, src), ParameterKind::Kwarg, param_type, None)
                    }
                    _ => (node_text(inner, src).to_string(), plain, param_type, None),
                }
            }
            "list_splat_pattern" => {
                keyword_only = true;
                (splat_name(param, src), ParameterKind::Vararg, None, None)
            }
            "dictionary_splat_pattern" => {
                (splat_name(param, src), ParameterKind::Kwarg, None, None)
            }
            "keyword_separator" => {
                keyword_only = true;
                continue;
            }
            "positional_separator" => {
                for earlier in params.iter_mut() {
                    if earlier.kind == ParameterKind::Positional {
                        earlier.kind = ParameterKind::PositionalOnly;
                    }
                }
                continue;
            }
            _ => continue,
        };
        if name.is_empty() {
            continue;
        }
        params.push(ParameterInfo {
            name,
            param_type,
            kind,
            default,
            position: params.len(),
        });
    }
    params
}

fn field_text(node: SyntaxNode, field: &str, src: &[u8]) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, src).to_string())
        .unwrap_or_default()
}

fn splat_name(splat: SyntaxNode, src: &[u8]) -> String {
    let mut cursor = splat.walk();
    let name = splat
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier")
        .map(|n| node_text(n, src).to_string())
        .unwrap_or_default();
    name
}

/// Functions and plain assignments directly in a class body.
fn count_members(body: SyntaxNode) -> (usize, usize) {
    let mut methods = 0;
    let mut vars = 0;
    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        match stmt.kind() {
            "function_definition" => methods += 1,
            "decorated_definition" => {
                let is_function = stmt
                    .child_by_field_name("definition")
                    .map(|d| d.kind() == "function_definition")
                    .unwrap_or(false);
                if is_function {
                    methods += 1;
                }
            }
            "expression_statement" => {
                let is_plain_assignment = stmt
                    .named_child(0)
                    .map(|e| e.kind() == "assignment" && e.child_by_field_name("type").is_none())
                    .unwrap_or(false);
                if is_plain_assignment {
                    vars += 1;
                }
            }
            _ => {}
        }
    }
    (methods, vars)
}

/// Leading string statement of a body, cleaned like `inspect.cleandoc`.
fn docstring_of(body: SyntaxNode, src: &[u8]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let string = first.named_child(0)?;
    let (prefix, content) = string_literal(string, src)?;
    if prefix.contains(['b', 'B']) {
        return None;
    }
    Some(clean_doc(&content))
}

/// Prefix and raw content of a string literal without interpolation.
fn string_literal(node: SyntaxNode, src: &[u8]) -> Option<(String, String)> {
    match node.kind() {
        "string" => {
            let mut prefix = String::new();
            let mut content = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                match part.kind() {
                    "string_start" => {
                        prefix = node_text(part, src)
                            .trim_end_matches(['"', '\''])
                            .to_string();
                    }
                    "string_content" => content.push_str(node_text(part, src)),
                    "interpolation" => return None,
                    _ => {}
                }
            }
            if prefix.contains(['f', 'F']) {
                return None;
            }
            Some((prefix, content))
        }
        "concatenated_string" => {
            let mut prefix = String::new();
            let mut content = String::new();
            let mut cursor = node.walk();
            for part in node.named_children(&mut cursor) {
                if part.kind() == "comment" {
                    continue;
                }
                let (p, c) = string_literal(part, src)?;
                prefix.push_str(&p);
                content.push_str(&c);
            }
            Some((prefix, content))
        }
        _ => None,
    }
}

fn clean_doc(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let mut lines: Vec<&str> = expanded.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    if let Some(first) = lines.first() {
        cleaned.push(first.trim_start().to_string());
    }
    for line in lines.drain(..).skip(1) {
        cleaned.push(line.get(margin..).unwrap_or("").trim_end().to_string());
    }
    while cleaned.first().map(|l| l.trim().is_empty()).unwrap_or(false) {
        cleaned.remove(0);
    }
    while cleaned.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// Literal type and value text, or `complex` and the rendered expression.
fn classify_value(value: SyntaxNode, src: &[u8]) -> (String, Option<String>) {
    let literal = |type_name: &str, text: &str| -> (String, Option<String>) {
        (type_name.to_string(), Some(truncate(text, MAX_VALUE_CHARS)))
    };
    match value.kind() {
        "integer" => literal("int", node_text(value, src)),
        "float" => literal("float", node_text(value, src)),
        "true" => literal("bool", "True"),
        "false" => literal("bool", "False"),
        "none" => literal("NoneType", "None"),
        "ellipsis" => literal("ellipsis", "Ellipsis"),
        "string" | "concatenated_string" => match string_literal(value, src) {
            Some((prefix, content)) if prefix.contains(['b', 'B']) => literal("bytes", content.as_str()),
            Some((_, content)) => literal("str", content.as_str()),
            None => ("complex".to_string(), render(value, src)),
        },
        _ => ("complex".to_string(), render(value, src)),
    }
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_alphabetic()) && !name.chars().any(|c| c.is_lowercase())
}

/// Text handed to the embedding collaborator: signature plus docstring.
fn semantic_text(
    qualified_name: &str,
    parameters: &[ParameterInfo],
    return_type: Option<&str>,
    docstring: Option<&str>,
) -> String {
    let params: Vec<String> = parameters
        .iter()
        .map(|p| {
            let mut text = match p.kind {
                ParameterKind::Vararg => format!("*{}", p.name),
                ParameterKind::Kwarg => format!("**{}", p.name),
                _ => p.name.clone(),
            };
            if let Some(t) = &p.param_type {
                text.push_str(": ");
                text.push_str(t);
            }
            if let Some(d) = &p.default {
                text.push('=');
                text.push_str(d);
            }
            text
        })
        .collect();
    let mut text = format!("def {}({})", qualified_name, params.join(", "));
    if let Some(ret) = return_type {
        text.push_str(" -> ");
        text.push_str(ret);
    }
    if let Some(doc) = docstring.filter(|d| !d.is_empty()) {
        text.push('\n');
        text.push_str(doc);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_doc_strips_common_margin() {
        let raw = "Summary.\n\n    Detail line.\n      Indented.\n    ";
        assert_eq!(clean_doc(raw), "Summary.\n\nDetail line.\n  Indented.");
    }

    #[test]
    fn test_constant_names() {
        assert!(is_constant_name("MAX_SIZE"));
        assert!(is_constant_name("A1"));
        assert!(!is_constant_name("Max"));
        assert!(!is_constant_name("_"));
    }

    #[test]
    fn test_semantic_text_includes_signature_and_doc() {
        let params = vec![ParameterInfo {
            name: "args".into(),
            param_type: None,
            kind: ParameterKind::Vararg,
            default: None,
            position: 0,
        }];
        assert_eq!(
            semantic_text("C.run", &params, Some("int"), Some("Run it.")),
            "def C.run(*args) -> int\nRun it."
        );
    }
}

//! Node and edge records produced by extraction.
//!
//! Records are plain data: the extractor builds them, the sink serializes
//! them as one JSON object per line, and the loader reads them back as
//! generic property maps. Every node carries a `type` tag and a stable `id`;
//! every edge carries a `type`, a `from_id`, and either a resolved `to_id`
//! or a free-text `to_name`.

pub mod sink;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

/// Kinds of graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// Repository root.
    Repository,
    /// Directory below the root.
    Directory,
    /// Source file (one extraction unit).
    File,
    /// Class definition.
    Class,
    /// Function defined outside a class body.
    Function,
    /// Function defined directly in a class body.
    Method,
    /// Assigned name.
    Variable,
    /// Function parameter.
    Parameter,
    /// One imported name.
    Import,
    /// Decorator applied to a function.
    Decorator,
}

impl NodeKind {
    /// All kinds, structural kinds first.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Repository,
        NodeKind::Directory,
        NodeKind::File,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Method,
        NodeKind::Variable,
        NodeKind::Parameter,
        NodeKind::Decorator,
        NodeKind::Import,
    ];

    /// Convert to the label used in records and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Repository => "Repository",
            NodeKind::Directory => "Directory",
            NodeKind::File => "File",
            NodeKind::Class => "Class",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::Variable => "Variable",
            NodeKind::Parameter => "Parameter",
            NodeKind::Import => "Import",
            NodeKind::Decorator => "Decorator",
        }
    }

    /// Parse a record label.
    pub fn from_label(label: &str) -> Option<Self> {
        NodeKind::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

/// Kinds of graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Structural containment (repository/directory → directory/file).
    Contains,
    /// File → Import.
    Imports,
    /// Scope → defined class/function/variable.
    Defines,
    /// Scope → called name.
    Calls,
    /// Class → base class.
    Inherits,
    /// Reserved for name usage facts.
    Uses,
    /// Decorator → function.
    Decorates,
    /// Function → returned expression.
    Returns,
    /// Function → raised expression.
    Raises,
    /// Function → Parameter.
    HasParameter,
}

impl EdgeKind {
    /// Convert to the relationship type used in records and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Imports => "IMPORTS",
            EdgeKind::Defines => "DEFINES",
            EdgeKind::Calls => "CALLS",
            EdgeKind::Inherits => "INHERITS",
            EdgeKind::Uses => "USES",
            EdgeKind::Decorates => "DECORATES",
            EdgeKind::Returns => "RETURNS",
            EdgeKind::Raises => "RAISES",
            EdgeKind::HasParameter => "HAS_PARAMETER",
        }
    }
}

/// A typed node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// Repository root.
    Repository(RepositoryNode),
    /// Directory.
    Directory(DirectoryNode),
    /// Source file.
    File(FileNode),
    /// Class definition.
    Class(ClassNode),
    /// Module-level or nested function.
    Function(FunctionNode),
    /// Function defined in a class body.
    Method(FunctionNode),
    /// Assigned name.
    Variable(VariableNode),
    /// Function parameter.
    Parameter(ParameterNode),
    /// Imported name.
    Import(ImportNode),
    /// Function decorator.
    Decorator(DecoratorNode),
}

impl Node {
    /// Stable identifier of the node.
    pub fn id(&self) -> &str {
        match self {
            Node::Repository(n) => &n.id,
            Node::Directory(n) => &n.id,
            Node::File(n) => &n.id,
            Node::Class(n) => &n.id,
            Node::Function(n) | Node::Method(n) => &n.id,
            Node::Variable(n) => &n.id,
            Node::Parameter(n) => &n.id,
            Node::Import(n) => &n.id,
            Node::Decorator(n) => &n.id,
        }
    }

    /// Kind of the node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Repository(_) => NodeKind::Repository,
            Node::Directory(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
            Node::Class(_) => NodeKind::Class,
            Node::Function(_) => NodeKind::Function,
            Node::Method(_) => NodeKind::Method,
            Node::Variable(_) => NodeKind::Variable,
            Node::Parameter(_) => NodeKind::Parameter,
            Node::Import(_) => NodeKind::Import,
            Node::Decorator(_) => NodeKind::Decorator,
        }
    }

    /// Display name of the node.
    pub fn name(&self) -> &str {
        match self {
            Node::Repository(n) => &n.name,
            Node::Directory(n) => &n.name,
            Node::File(n) => &n.name,
            Node::Class(n) => &n.name,
            Node::Function(n) | Node::Method(n) => &n.name,
            Node::Variable(n) => &n.name,
            Node::Parameter(n) => &n.name,
            Node::Import(n) => &n.name,
            Node::Decorator(n) => &n.name,
        }
    }
}

/// Repository root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryNode {
    /// Stable identifier (digest of the root path).
    pub id: String,
    /// Root directory name.
    pub name: String,
    /// Root path as given to the walker.
    pub path: String,
}

/// Directory node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Stable identifier (digest of the directory path).
    pub id: String,
    /// Directory name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Path relative to the repository root.
    pub relpath: String,
}

/// Source file node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Stable identifier (digest of the file path).
    pub id: String,
    /// File name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Path relative to the repository root.
    pub relpath: String,
    /// Dotted module name derived from `relpath`.
    pub module: String,
    /// File extension including the dot.
    pub extension: String,
    /// Digest of the full text.
    pub sha: String,
    /// Logical line count.
    pub lines_of_code: usize,
    /// Size of the UTF-8 text in bytes.
    pub size_bytes: usize,
    /// Source language.
    pub language: String,
    /// Text encoding.
    pub encoding: String,
    /// Text to be embedded by the embedding collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_semantics: Option<String>,
    /// Embedding lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_status: Option<String>,
    /// Time the embedding was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_timestamp: Option<String>,
}

/// Class definition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    /// Stable identifier.
    pub id: String,
    /// Class name.
    pub name: String,
    /// Dotted name including enclosing classes/functions.
    pub qualified_name: String,
    /// First line (1-based).
    pub lineno: usize,
    /// Last line (1-based).
    pub end_lineno: usize,
    /// Leading documentation string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Bounded source snippet.
    pub snippet: String,
    /// Rendered base-class expressions.
    pub bases: Vec<String>,
    /// Decorator names.
    pub decorators: Vec<String>,
    /// Functions defined directly in the body.
    pub num_methods: usize,
    /// Plain assignments directly in the body.
    pub num_class_vars: usize,
    /// Leading underscore.
    pub is_private: bool,
    /// Derives from a known abstract base.
    pub is_abstract: bool,
}

/// Function or method node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNode {
    /// Stable identifier.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Dotted name including enclosing classes/functions.
    pub qualified_name: String,
    /// Declared with `async def`.
    pub is_async: bool,
    /// Defined directly in a class body.
    pub is_method: bool,
    /// Decorated with `staticmethod`.
    pub is_static: bool,
    /// Decorated with `classmethod`.
    pub is_class_method: bool,
    /// Decorated with `property`.
    pub is_property: bool,
    /// Decorated with `abstractmethod`.
    pub is_abstract: bool,
    /// Single leading underscore.
    pub is_private: bool,
    /// Dunder name.
    pub is_magic: bool,
    /// Decorator names in source order.
    pub decorators: Vec<String>,
    /// Decorators with rendered call arguments.
    pub decorator_details: Vec<DecoratorInfo>,
    /// Parameter list.
    pub parameters: Vec<ParameterInfo>,
    /// Rendered return annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// First line (1-based).
    pub lineno: usize,
    /// Last line (1-based).
    pub end_lineno: usize,
    /// Leading documentation string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Bounded source snippet.
    pub snippet: String,
    /// Computed metrics.
    pub metrics: CodeMetrics,
    /// Text to be embedded by the embedding collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_semantics: Option<String>,
    /// Embedding lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_status: Option<String>,
    /// Time the embedding was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_timestamp: Option<String>,
}

/// A decorator as written on a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorInfo {
    /// Decorator name (dotted for attribute access).
    pub name: String,
    /// Rendered positional arguments when the decorator is invoked.
    pub args: Vec<String>,
    /// Rendered keyword arguments when the decorator is invoked.
    pub kwargs: BTreeMap<String, String>,
}

/// Parameter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Before a `/` separator.
    PositionalOnly,
    /// Ordinary positional-or-keyword.
    Positional,
    /// `*args`.
    Vararg,
    /// After `*` or `*args`.
    KeywordOnly,
    /// `**kwargs`.
    Kwarg,
}

/// A parameter as written in a function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name.
    pub name: String,
    /// Rendered annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    /// Parameter kind.
    pub kind: ParameterKind,
    /// Rendered default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Index in the signature.
    pub position: usize,
}

/// Per-function metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMetrics {
    /// `end_lineno - lineno + 1`.
    pub lines_of_code: usize,
    /// McCabe cyclomatic complexity.
    pub complexity: usize,
    /// Positional parameter count.
    pub num_parameters: usize,
    /// Return statements in the subtree.
    pub num_returns: usize,
    /// Conditional statements and expressions in the subtree.
    pub num_branches: usize,
    /// Loops in the subtree.
    pub num_loops: usize,
    /// Body starts with a string literal.
    pub has_docstring: bool,
    /// Decorator count.
    pub num_decorators: usize,
    /// Deepest nesting of control-flow constructs.
    pub max_nesting_depth: usize,
}

/// Assigned-name node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNode {
    /// Stable identifier.
    pub id: String,
    /// Variable name.
    pub name: String,
    /// Literal value text, or rendered expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Literal type name, or `complex`.
    pub value_type: String,
    /// Rendered annotation for annotated assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Assignment line (1-based).
    pub lineno: usize,
    /// Assigned at module level.
    pub is_global: bool,
    /// All-uppercase name.
    pub is_constant: bool,
    /// Leading underscore.
    pub is_private: bool,
    /// `global` or `local`.
    pub scope: String,
}

/// Function parameter node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterNode {
    /// Stable identifier.
    pub id: String,
    /// Parameter name.
    pub name: String,
    /// Rendered annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    /// Parameter kind.
    pub kind: ParameterKind,
    /// Rendered default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Index in the signature.
    pub position: usize,
}

/// `import x` versus `from x import y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// `import a.b [as c]`.
    Direct,
    /// `from a import b [as c]`.
    From,
}

/// Imported-name node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportNode {
    /// Stable identifier.
    pub id: String,
    /// Imported name (`path` in `from os import path`).
    pub name: String,
    /// Source module (`os`), empty for bare relative imports.
    pub module: String,
    /// Module-qualified name (`os.path`).
    pub full_name: String,
    /// Local alias given with `as`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Statement form.
    pub import_type: ImportType,
    /// Number of leading dots.
    pub level: usize,
    /// `level > 0`.
    pub is_relative: bool,
    /// Statement line (1-based).
    pub lineno: usize,
    /// Root module is on the standard-library allow-list.
    pub is_stdlib: bool,
}

/// Decorator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorNode {
    /// Stable identifier.
    pub id: String,
    /// Decorator name.
    pub name: String,
    /// Decorator line (1-based).
    pub lineno: usize,
    /// Rendered positional arguments.
    pub args: Vec<String>,
    /// Rendered keyword arguments.
    pub kwargs: BTreeMap<String, String>,
}

/// A typed edge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Relationship type.
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// Source node id.
    pub from_id: String,
    /// Resolved destination node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_id: Option<String>,
    /// Free-text destination when unresolved (or the raw callee text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    /// Finer-grained relationship label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    /// Source line of the fact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<usize>,
    /// Parameter position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Base-class text of a resolved inheritance edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    /// Callee rewritten through the import table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_name: Option<String>,
    /// Positional argument count of a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_args: Option<usize>,
    /// Keyword argument count of a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_kwargs: Option<usize>,
    /// Target could not be attached to a node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred: Option<bool>,
}

impl Edge {
    fn bare(kind: EdgeKind, from_id: &str) -> Self {
        Self {
            kind,
            from_id: from_id.to_string(),
            to_id: None,
            to_name: None,
            relationship: None,
            lineno: None,
            position: None,
            base_name: None,
            resolved_name: None,
            num_args: None,
            num_kwargs: None,
            inferred: None,
        }
    }

    /// Edge between two known node ids.
    pub fn resolved(kind: EdgeKind, from_id: &str, to_id: &str) -> Self {
        Self {
            to_id: Some(to_id.to_string()),
            ..Self::bare(kind, from_id)
        }
    }

    /// Edge whose target is only known by name.
    pub fn external(kind: EdgeKind, from_id: &str, to_name: &str) -> Self {
        Self {
            to_name: Some(to_name.to_string()),
            ..Self::bare(kind, from_id)
        }
    }

    /// Attach a relationship label.
    pub fn with_relationship(mut self, relationship: &str) -> Self {
        self.relationship = Some(relationship.to_string());
        self
    }

    /// Attach a source line.
    pub fn with_lineno(mut self, lineno: usize) -> Self {
        self.lineno = Some(lineno);
        self
    }
}

/// Per-unit and per-run extraction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Function nodes.
    pub functions: usize,
    /// Method nodes.
    pub methods: usize,
    /// Class nodes.
    pub classes: usize,
    /// Import nodes.
    pub imports: usize,
    /// Calls edges.
    pub calls: usize,
    /// Variable nodes.
    pub variables: usize,
    /// Decorator nodes.
    pub decorators: usize,
}

impl AddAssign for UnitStats {
    fn add_assign(&mut self, other: Self) {
        self.functions += other.functions;
        self.methods += other.methods;
        self.classes += other.classes;
        self.imports += other.imports;
        self.calls += other.calls;
        self.variables += other.variables;
        self.decorators += other.decorators;
    }
}

/// Summary written once per run as `stats.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Repository root path.
    pub repository: String,
    /// Repository directory name.
    pub repository_name: String,
    /// Identifier of this run.
    pub run_id: String,
    /// Source files discovered.
    pub total_files: usize,
    /// Source files that produced records.
    pub files_processed: usize,
    /// Source files skipped as unreadable or unparsable.
    pub files_with_errors: usize,
    /// Directories below the root.
    pub total_directories: usize,
    /// Function nodes.
    pub total_functions: usize,
    /// Method nodes.
    pub total_methods: usize,
    /// Class nodes.
    pub total_classes: usize,
    /// Import nodes.
    pub total_imports: usize,
    /// Calls edges.
    pub total_calls: usize,
    /// Variable nodes.
    pub total_variables: usize,
    /// Decorator nodes.
    pub total_decorators: usize,
    /// RFC 3339 time of the analysis.
    pub analysis_timestamp: String,
}

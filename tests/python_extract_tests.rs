//! Python extraction tests.
//!
//! Run whole units through `extract_source` and check the emitted node and
//! edge records.

use repograph::ingest::{extract_source, parse_python, UnitOutcome, UnitRecords};
use repograph::record::{Edge, EdgeKind, Node, ParameterKind};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "/repo";
    const UNIT: &str = "/repo/pkg/mod.py";

    fn extract(source: &str) -> UnitRecords {
        match extract_source(Path::new(REPO), Path::new(UNIT), source.as_bytes()) {
            UnitOutcome::Extracted(records) => records,
            UnitOutcome::Failed { reason, .. } => panic!("extraction failed: {}", reason),
        }
    }

    fn edges_of(records: &UnitRecords, kind: EdgeKind) -> Vec<&Edge> {
        records.edges.iter().filter(|e| e.kind == kind).collect()
    }

    fn count_definitions(source: &str) -> usize {
        let tree = parse_python(Path::new(UNIT), source).expect("Failed to parse");
        let mut stack = vec![tree.root_node()];
        let mut count = 0;
        while let Some(node) = stack.pop() {
            if node.kind() == "function_definition" {
                count += 1;
            }
            let mut cursor = node.walk();
            stack.extend(node.named_children(&mut cursor));
        }
        count
    }

    #[test]
    fn test_inheritance_method_parameters_and_return() {
        let source = "class A:\n    pass\n\nclass B(A):\n    def f(x, y=1):\n        return x+y\n";
        let records = extract(source);

        let classes: HashMap<&str, &str> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Class(c) => Some((c.name.as_str(), c.id.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(classes.len(), 2);
        let (a_id, b_id) = (classes["A"], classes["B"]);

        let inherits = edges_of(&records, EdgeKind::Inherits);
        assert_eq!(inherits.len(), 1);
        assert_eq!(inherits[0].from_id, b_id);
        assert_eq!(inherits[0].to_id.as_deref(), Some(a_id));
        assert_eq!(inherits[0].base_name.as_deref(), Some("A"));

        let methods: Vec<_> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Method(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(methods.len(), 1);
        let f = methods[0];
        assert_eq!(f.name, "f");
        assert_eq!(f.qualified_name, "B.f");
        assert!(f.is_method);
        assert!(!records.nodes.iter().any(|n| matches!(n, Node::Function(_))));

        let params: Vec<_> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Parameter(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "x");
        assert_eq!(params[0].kind, ParameterKind::Positional);
        assert_eq!(params[0].default, None);
        assert_eq!(params[1].name, "y");
        assert_eq!(params[1].kind, ParameterKind::Positional);
        assert_eq!(params[1].default.as_deref(), Some("1"));

        let has_param = edges_of(&records, EdgeKind::HasParameter);
        assert_eq!(has_param.len(), 2);
        assert!(has_param.iter().all(|e| e.from_id == f.id));
        assert_eq!(has_param[1].position, Some(1));

        let returns = edges_of(&records, EdgeKind::Returns);
        assert_eq!(returns.len(), 1);
        assert_eq!(returns[0].from_id, f.id);
        assert_eq!(returns[0].to_name.as_deref(), Some("x + y"));
        assert!(returns[0].to_id.is_none());
    }

    #[test]
    fn test_function_and_method_count_matches_definitions() {
        let source = r#"
import functools

def top(a, *args, key=None, **kw):
    def inner():
        return 1
    return inner

async def fetch(url):
    await other(url)

class Service:
    @staticmethod
    def build():
        pass

    @functools.lru_cache(maxsize=2)
    def cached(self, n):
        handler = lambda v: v
        return handler(n)

    class Nested:
        def deep(self):
            def deeper():
                pass
"#;
        let records = extract(source);
        let functions = records.stats.functions;
        let methods = records.stats.methods;
        assert_eq!(functions + methods, count_definitions(source));
        assert_eq!(methods, 4);
        assert_eq!(functions, 3);

        let fetch = records
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Function(f) if f.name == "fetch" => Some(f),
                _ => None,
            })
            .unwrap();
        assert!(fetch.is_async);
    }

    #[test]
    fn test_defines_sources_are_emitted_before_targets() {
        let source = r#"
LIMIT = 10

class Outer:
    size = 3

    def method(self):
        local = 1

        def helper():
            value = 2
        return local

def free():
    pass
"#;
        let records = extract(source);
        let position: HashMap<&str, usize> = records
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id(), i))
            .collect();

        let defines = edges_of(&records, EdgeKind::Defines);
        assert!(!defines.is_empty());
        for edge in defines {
            let from = position
                .get(edge.from_id.as_str())
                .unwrap_or_else(|| panic!("dangling Defines source {}", edge.from_id));
            let to = position[edge.to_id.as_deref().unwrap()];
            assert!(*from < to, "source emitted after target");
        }
    }

    #[test]
    fn test_fact_edges_carry_id_or_name() {
        let source = r#"
import os

class Base:
    pass

class Child(Base, mixins.Thing):
    def run(self):
        helper()
        os.getcwd()
        if self.bad:
            raise ValueError("bad")
        return Child()

def helper():
    pass
"#;
        let records = extract(source);
        let ids: HashSet<&str> = records.nodes.iter().map(|n| n.id()).collect();
        for edge in &records.edges {
            if matches!(
                edge.kind,
                EdgeKind::Calls | EdgeKind::Raises | EdgeKind::Returns | EdgeKind::Inherits
            ) {
                match &edge.to_id {
                    Some(to_id) => assert!(ids.contains(to_id.as_str())),
                    None => assert!(edge.to_name.is_some()),
                }
            }
        }

        let inherits = edges_of(&records, EdgeKind::Inherits);
        assert_eq!(inherits.len(), 2);
        assert!(inherits[0].to_id.is_some());
        assert_eq!(inherits[1].to_name.as_deref(), Some("mixins.Thing"));
        assert_eq!(inherits[1].inferred, Some(true));

        let raises = edges_of(&records, EdgeKind::Raises);
        assert_eq!(raises.len(), 1);
        assert_eq!(raises[0].to_name.as_deref(), Some("ValueError(\"bad\")"));
    }

    #[test]
    fn test_calls_resolve_through_import_alias() {
        let source = "from os import path as p\n\ndef g():\n    return p.join(\"a\", \"b\", sep=1)\n";
        let records = extract(source);

        let calls = edges_of(&records, EdgeKind::Calls);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to_name.as_deref(), Some("p.join"));
        assert_eq!(calls[0].resolved_name.as_deref(), Some("os.path.join"));
        assert_eq!(calls[0].num_args, Some(2));
        assert_eq!(calls[0].num_kwargs, Some(1));
        assert_eq!(calls[0].lineno, Some(4));
        assert!(calls[0].to_id.is_none());
        assert_eq!(records.stats.calls, 1);
    }

    #[test]
    fn test_call_to_earlier_definition_is_direct() {
        let source = "def helper():\n    pass\n\nhelper()\n";
        let records = extract(source);
        let helper_id = records
            .nodes
            .iter()
            .find(|n| n.name() == "helper")
            .map(|n| n.id().to_string())
            .unwrap();
        let calls = edges_of(&records, EdgeKind::Calls);
        assert_eq!(calls[0].to_id.as_deref(), Some(helper_id.as_str()));
        assert_eq!(calls[0].inferred, Some(false));
    }

    #[test]
    fn test_attribute_call_resolves_leading_name() {
        let source = "class A:\n    pass\n\nA.create()\nobj = A()\nobj.run()\n";
        let records = extract(source);
        let id_of = |name: &str| {
            records
                .nodes
                .iter()
                .find(|n| n.name() == name)
                .map(|n| n.id().to_string())
                .unwrap()
        };
        let class_id = id_of("A");
        let obj_id = id_of("obj");

        let calls = edges_of(&records, EdgeKind::Calls);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].to_name.as_deref(), Some("A.create"));
        assert_eq!(calls[0].to_id.as_deref(), Some(class_id.as_str()));
        assert_eq!(calls[0].inferred, Some(false));
        assert_eq!(calls[1].to_id.as_deref(), Some(class_id.as_str()));
        assert_eq!(calls[2].to_name.as_deref(), Some("obj.run"));
        assert_eq!(calls[2].to_id.as_deref(), Some(obj_id.as_str()));
    }

    #[test]
    fn test_function_nested_in_method_is_a_method() {
        let source = "class C:\n    def m(self):\n        def inner():\n            pass\n";
        let records = extract(source);
        let methods: Vec<(&str, &str)> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Method(f) => Some((f.name.as_str(), f.qualified_name.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(methods, vec![("m", "C.m"), ("inner", "C.m.inner")]);
        assert_eq!(records.stats.functions, 0);
    }

    #[test]
    fn test_decorators_and_flags() {
        let source = r#"
import abc

class Shape(abc.ABC):
    @property
    def area(self):
        """Area of the shape."""
        return 0

    @classmethod
    def unit(cls):
        return cls()

    @abc.abstractmethod
    def draw(self):
        pass

    def __repr__(self):
        return "Shape"

    def _hidden(self):
        pass
"#;
        let records = extract(source);
        let shape = records
            .nodes
            .iter()
            .find_map(|n| match n {
                Node::Class(c) => Some(c),
                _ => None,
            })
            .unwrap();
        assert!(shape.is_abstract);
        assert_eq!(shape.num_methods, 5);

        let method = |name: &str| {
            records
                .nodes
                .iter()
                .find_map(|n| match n {
                    Node::Method(m) if m.name == name => Some(m.clone()),
                    _ => None,
                })
                .unwrap()
        };
        let area = method("area");
        assert!(area.is_property);
        assert_eq!(area.docstring.as_deref(), Some("Area of the shape."));
        assert!(area.metrics.has_docstring);
        assert!(method("unit").is_class_method);
        assert!(method("draw").is_abstract);
        assert!(method("__repr__").is_magic);
        assert!(!method("__repr__").is_private);
        assert!(method("_hidden").is_private);

        let decorators: Vec<_> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Decorator(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(decorators.len(), 3);
        assert_eq!(records.stats.decorators, 3);

        let decorates = edges_of(&records, EdgeKind::Decorates);
        assert_eq!(decorates.len(), 3);
        assert_eq!(decorates[0].from_id, decorators[0].id);
        assert_eq!(decorates[0].to_id.as_deref(), Some(area.id.as_str()));
    }

    #[test]
    fn test_variables() {
        let source = "MAX_SIZE: int = 10\nname = 'repo'\nraw = b'\\x00'\na = b = None\ncount: int\n\ndef f():\n    items = [1, 2]\n";
        let records = extract(source);
        let vars: Vec<_> = records
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Variable(v) => Some(v),
                _ => None,
            })
            .collect();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["MAX_SIZE", "name", "raw", "a", "b", "items"]);

        assert!(vars[0].is_constant);
        assert_eq!(vars[0].annotation.as_deref(), Some("int"));
        assert_eq!(vars[0].value_type, "int");
        assert_eq!(vars[0].value.as_deref(), Some("10"));
        assert_eq!(vars[1].value_type, "str");
        assert_eq!(vars[1].value.as_deref(), Some("repo"));
        assert_eq!(vars[2].value_type, "bytes");
        assert_eq!(vars[3].value_type, "NoneType");
        assert!(vars[3].is_global);
        assert_eq!(vars[5].scope, "local");
        assert_eq!(vars[5].value_type, "complex");
        assert_eq!(vars[5].value.as_deref(), Some("[1, 2]"));
    }

    #[test]
    fn test_file_node_comes_first() {
        let records = extract("\u{feff}x = 1\n");
        match &records.nodes[0] {
            Node::File(file) => {
                assert_eq!(file.relpath, "pkg/mod.py");
                assert_eq!(file.module, "pkg.mod");
                assert_eq!(file.extension, ".py");
                assert_eq!(file.lines_of_code, 1);
                assert_eq!(file.embedding_status.as_deref(), Some("pending"));
            }
            other => panic!("expected File node, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_ids_are_stable_across_runs() {
        let source = "class A:\n    def f(self):\n        pass\n";
        let first: Vec<String> = extract(source).nodes.iter().map(|n| n.id().to_string()).collect();
        let second: Vec<String> = extract(source).nodes.iter().map(|n| n.id().to_string()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_deep_nesting_keeps_partial_records() {
        let mut source = String::from("def outer():\n    pass\n\nx = ");
        source.push_str(&"(".repeat(600));
        source.push('1');
        source.push_str(&")".repeat(600));
        source.push('\n');
        let records = extract(&source);
        assert!(records.fault.as_deref().unwrap().starts_with("nesting deeper than 512"));
        assert_eq!(records.stats.functions, 1);
    }
}

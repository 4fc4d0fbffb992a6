//! Per-function code metrics.
//!
//! All counts are taken over the whole definition subtree, nested
//! definitions included. Traversal uses an explicit work stack, so deeply
//! nested source cannot exhaust the call stack here.

use crate::record::CodeMetrics;
use tree_sitter::Node;

/// Kinds that add one independent path.
const DECISION_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "except_group_clause",
    "with_statement",
    "assert_statement",
];

/// Kinds that open a deeper nesting level. An `elif` counts as an `if`
/// nested in the preceding branch.
const NESTING_KINDS: &[&str] = &[
    "for_statement",
    "while_statement",
    "if_statement",
    "elif_clause",
    "with_statement",
    "try_statement",
];

/// Compute metrics for a `function_definition` node.
///
/// Parameter, decorator and docstring facts come from the caller, which has
/// already decoded them.
pub fn compute_metrics(
    definition: Node,
    num_parameters: usize,
    num_decorators: usize,
    has_docstring: bool,
) -> CodeMetrics {
    let lines_of_code = definition.end_position().row - definition.start_position().row + 1;

    let mut complexity = 1;
    let mut num_returns = 0;
    let mut num_branches = 0;
    let mut num_loops = 0;
    let mut max_nesting_depth = 0;

    let mut stack = vec![(definition, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let kind = node.kind();

        if DECISION_KINDS.contains(&kind) {
            complexity += 1;
        }
        // Binary in the grammar: `a and b and c` is two operator nodes,
        // i.e. operand count minus one.
        if kind == "boolean_operator" {
            complexity += 1;
        }
        match kind {
            "return_statement" => num_returns += 1,
            "if_statement" | "elif_clause" | "conditional_expression" => num_branches += 1,
            "for_statement" | "while_statement" => num_loops += 1,
            _ => {}
        }
        max_nesting_depth = max_nesting_depth.max(depth);

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let child_depth = if NESTING_KINDS.contains(&child.kind()) {
                depth + 1
            } else {
                depth
            };
            stack.push((child, child_depth));
        }
    }

    CodeMetrics {
        lines_of_code,
        complexity,
        num_parameters,
        num_returns,
        num_branches,
        num_loops,
        has_docstring,
        num_decorators,
        max_nesting_depth,
    }
}

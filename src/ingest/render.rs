//! Best-effort rendering of expressions to bounded text.
//!
//! Rendering normalizes spacing around operators and separators so that
//! `x+y` and `x + y` produce the same text. Unknown constructs fall back to
//! their source text with whitespace collapsed. Rendering never fails; an
//! empty rendering is reported as absent.

use tree_sitter::Node;

/// Maximum rendered length in characters.
pub const MAX_RENDER_LEN: usize = 200;

const MAX_RENDER_DEPTH: usize = 64;

/// Render an expression node to at most [`MAX_RENDER_LEN`] characters.
pub fn render(node: Node, source: &[u8]) -> Option<String> {
    let mut out = String::new();
    write_expr(node, source, &mut out, 0);
    let out = out.trim();
    if out.is_empty() {
        None
    } else {
        Some(truncate(out, MAX_RENDER_LEN))
    }
}

/// Source text of a node, or an empty string if it is not valid UTF-8.
pub fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Keep the first `max_chars` characters.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

fn collapse(node: Node, source: &[u8], out: &mut String) {
    let text = node_text(node, source);
    let mut first = true;
    for word in text.split_whitespace() {
        if !first {
            out.push(' ');
        }
        out.push_str(word);
        first = false;
    }
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn write_joined(items: &[Node], source: &[u8], out: &mut String, depth: usize) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write_expr(*item, source, out, depth + 1);
    }
}

fn write_expr(node: Node, source: &[u8], out: &mut String, depth: usize) {
    if depth > MAX_RENDER_DEPTH {
        collapse(node, source, out);
        return;
    }

    match node.kind() {
        "identifier" | "integer" | "float" | "true" | "false" | "none" | "ellipsis"
        | "string" | "concatenated_string" => out.push_str(node_text(node, source)),
        "attribute" => {
            match (
                node.child_by_field_name("object"),
                node.child_by_field_name("attribute"),
            ) {
                (Some(object), Some(attribute)) => {
                    write_expr(object, source, out, depth + 1);
                    out.push('.');
                    out.push_str(node_text(attribute, source));
                }
                _ => collapse(node, source, out),
            }
        }
        "call" => match (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) {
            (Some(function), Some(arguments)) => {
                write_expr(function, source, out, depth + 1);
                if arguments.kind() == "argument_list" {
                    out.push('(');
                    write_joined(&named_children(arguments), source, out, depth);
                    out.push(')');
                } else {
                    write_expr(arguments, source, out, depth + 1);
                }
            }
            _ => collapse(node, source, out),
        },
        "keyword_argument" => match (
            node.child_by_field_name("name"),
            node.child_by_field_name("value"),
        ) {
            (Some(name), Some(value)) => {
                out.push_str(node_text(name, source));
                out.push('=');
                write_expr(value, source, out, depth + 1);
            }
            _ => collapse(node, source, out),
        },
        "list_splat" | "list_splat_pattern" => {
            out.push('*');
            write_children_inline(node, source, out, depth);
        }
        "dictionary_splat" | "dictionary_splat_pattern" => {
            out.push_str("**");
            write_children_inline(node, source, out, depth);
        }
        "binary_operator" | "boolean_operator" => match (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) {
            (Some(left), Some(operator), Some(right)) => {
                write_expr(left, source, out, depth + 1);
                out.push(' ');
                out.push_str(node_text(operator, source));
                out.push(' ');
                write_expr(right, source, out, depth + 1);
            }
            _ => collapse(node, source, out),
        },
        "comparison_operator" => {
            let mut cursor = node.walk();
            let mut first = true;
            for child in node.children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                if !first {
                    out.push(' ');
                }
                if child.is_named() {
                    write_expr(child, source, out, depth + 1);
                } else {
                    // `not in` / `is not` arrive as single aliased tokens
                    out.push_str(child.kind());
                }
                first = false;
            }
        }
        "not_operator" => {
            out.push_str("not ");
            write_children_inline(node, source, out, depth);
        }
        "unary_operator" => match (
            node.child_by_field_name("operator"),
            node.child_by_field_name("argument"),
        ) {
            (Some(operator), Some(argument)) => {
                out.push_str(node_text(operator, source));
                write_expr(argument, source, out, depth + 1);
            }
            _ => collapse(node, source, out),
        },
        "await" => {
            out.push_str("await ");
            write_children_inline(node, source, out, depth);
        }
        "parenthesized_expression" => {
            out.push('(');
            write_children_inline(node, source, out, depth);
            out.push(')');
        }
        "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
            let items = named_children(node);
            out.push('(');
            write_joined(&items, source, out, depth);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        "list" | "list_pattern" => {
            out.push('[');
            write_joined(&named_children(node), source, out, depth);
            out.push(']');
        }
        "set" => {
            out.push('{');
            write_joined(&named_children(node), source, out, depth);
            out.push('}');
        }
        "dictionary" => {
            out.push('{');
            write_joined(&named_children(node), source, out, depth);
            out.push('}');
        }
        "pair" => match (
            node.child_by_field_name("key"),
            node.child_by_field_name("value"),
        ) {
            (Some(key), Some(value)) => {
                write_expr(key, source, out, depth + 1);
                out.push_str(": ");
                write_expr(value, source, out, depth + 1);
            }
            _ => collapse(node, source, out),
        },
        "subscript" => match node.child_by_field_name("value") {
            Some(value) => {
                write_expr(value, source, out, depth + 1);
                let mut cursor = node.walk();
                let subscripts: Vec<Node> = node
                    .children_by_field_name("subscript", &mut cursor)
                    .collect();
                out.push('[');
                write_joined(&subscripts, source, out, depth);
                out.push(']');
            }
            None => collapse(node, source, out),
        },
        "slice" => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if child.is_named() {
                    write_expr(child, source, out, depth + 1);
                } else {
                    out.push_str(node_text(child, source));
                }
            }
        }
        "conditional_expression" => {
            let parts = named_children(node);
            if parts.len() == 3 {
                write_expr(parts[0], source, out, depth + 1);
                out.push_str(" if ");
                write_expr(parts[1], source, out, depth + 1);
                out.push_str(" else ");
                write_expr(parts[2], source, out, depth + 1);
            } else {
                collapse(node, source, out);
            }
        }
        "type" => write_children_inline(node, source, out, depth),
        _ => collapse(node, source, out),
    }
}

fn write_children_inline(node: Node, source: &[u8], out: &mut String, depth: usize) {
    for child in named_children(node) {
        write_expr(child, source, out, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_first_expression(code: &str) -> Option<String> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .unwrap();
        let tree = parser.parse(code, None).unwrap();
        let statement = tree.root_node().named_child(0).unwrap();
        let expression = statement.named_child(0).unwrap();
        render(expression, code.as_bytes())
    }

    #[test]
    fn test_operator_spacing_is_normalized() {
        assert_eq!(render_first_expression("x+y\n").as_deref(), Some("x + y"));
        assert_eq!(
            render_first_expression("a  and(b or   c)\n").as_deref(),
            Some("a and (b or c)")
        );
    }

    #[test]
    fn test_calls_and_subscripts() {
        assert_eq!(
            render_first_expression("os.path.join(a,b, sep = '/')\n").as_deref(),
            Some("os.path.join(a, b, sep='/')")
        );
        assert_eq!(
            render_first_expression("Dict[str,int]\n").as_deref(),
            Some("Dict[str, int]")
        );
        assert_eq!(render_first_expression("-1\n").as_deref(), Some("-1"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}

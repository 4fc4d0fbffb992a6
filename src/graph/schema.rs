//! Store schema and statement text.
//!
//! Labels and relationship types cannot be statement parameters, so they
//! are spliced into the text here, quoted when they are not plain
//! identifiers. Everything else travels as the `$batch` parameter.

use super::WriteMode;
use crate::record::NodeKind;

/// Nodes deleted per clearing statement.
pub const CLEAR_CHUNK: usize = 10_000;

/// Default number of records per insert statement.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Lookup indexes created next to the id constraints.
pub const INDEXED_PROPERTIES: &[(&str, &str)] = &[
    ("File", "name"),
    ("Class", "name"),
    ("Function", "name"),
    ("Method", "name"),
];

/// Count every node.
pub const COUNT_NODES: &str = "MATCH (n) RETURN count(n) AS count";

/// Liveness probe.
pub const PING: &str = "RETURN 1 AS count";

/// Insertion rank of a label: structural kinds first, unknown labels last.
pub fn label_rank(label: &str) -> usize {
    NodeKind::ALL
        .iter()
        .position(|k| k.as_str() == label)
        .unwrap_or(NodeKind::ALL.len())
}

/// Quote a label or relationship type unless it is a plain identifier.
pub fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Uniqueness constraint on `label.id`.
pub fn unique_id_statement(label: &str) -> String {
    format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
        quote_identifier(&format!("{}_id", label.to_lowercase())),
        quote_identifier(label)
    )
}

/// Lookup index on `label.property`.
pub fn index_statement(label: &str, property: &str) -> String {
    format!(
        "CREATE INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{})",
        quote_identifier(&format!("{}_{}", label.to_lowercase(), property)),
        quote_identifier(label),
        quote_identifier(property)
    )
}

/// Delete one chunk of nodes and report how many went.
pub fn delete_nodes_statement(limit: usize) -> String {
    format!(
        "MATCH (n) WITH n LIMIT {} DETACH DELETE n RETURN count(*) AS count",
        limit
    )
}

/// Insert `$batch` rows as nodes labelled `label`.
pub fn insert_nodes_statement(label: &str, mode: WriteMode) -> String {
    let label = quote_identifier(label);
    match mode {
        WriteMode::Create => format!(
            "UNWIND $batch AS row CREATE (n:{}) SET n = row RETURN count(n) AS count",
            label
        ),
        WriteMode::Merge => format!(
            "UNWIND $batch AS row MERGE (n:{} {{id: row.id}}) SET n += row RETURN count(n) AS count",
            label
        ),
    }
}

/// Insert `$batch` rows (`from`, `to`, `properties`) as relationships.
pub fn insert_edges_statement(rel_type: &str, mode: WriteMode) -> String {
    let rel_type = quote_identifier(rel_type);
    let (verb, assign) = match mode {
        WriteMode::Create => ("CREATE", "="),
        WriteMode::Merge => ("MERGE", "+="),
    };
    format!(
        "UNWIND $batch AS edge \
         MATCH (a {{id: edge.from}}) \
         MATCH (b {{id: edge.to}}) \
         {} (a)-[r:{}]->(b) \
         SET r {} edge.properties \
         RETURN count(r) AS count",
        verb, rel_type, assign
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_labels_rank_first() {
        assert!(label_rank("Repository") < label_rank("File"));
        assert!(label_rank("File") < label_rank("Import"));
        assert_eq!(label_rank("Unknown"), NodeKind::ALL.len());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("HAS_PARAMETER"), "HAS_PARAMETER");
        assert_eq!(quote_identifier("odd label"), "`odd label`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            unique_id_statement("Class"),
            "CREATE CONSTRAINT class_id IF NOT EXISTS FOR (n:Class) REQUIRE n.id IS UNIQUE"
        );
        assert!(insert_nodes_statement("File", WriteMode::Merge).contains("MERGE (n:File {id: row.id})"));
        let edges = insert_edges_statement("CALLS", WriteMode::Create);
        assert!(edges.contains("CREATE (a)-[r:CALLS]->(b)"));
        assert!(edges.contains("SET r = edge.properties"));
    }
}

//! Networked graph store over the Bolt protocol.
//!
//! The driver is asynchronous; the pipeline is not. The store owns a small
//! runtime and blocks on each round trip, so statements run strictly one
//! after another on a single session.

use super::schema;
use super::{EdgeRow, GraphStore, Properties, WriteMode};
use crate::config::StoreConfig;
use crate::error::{RepoGraphError, Result};
use log::{debug, info};
use neo4rs::{query, BoltList, BoltMap, BoltString, BoltType, Graph, Query};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

/// [`GraphStore`] backed by a Neo4j server.
pub struct Neo4jStore {
    runtime: Runtime,
    graph: Graph,
    uri: String,
}

impl Neo4jStore {
    /// Open a session and prove it with a round trip.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let connection_error = |message: String| RepoGraphError::StoreConnection {
            uri: config.uri.clone(),
            message,
        };

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| connection_error(e.to_string()))?;
        let graph = runtime
            .block_on(Graph::new(&config.uri, &config.username, &config.password))
            .map_err(|e| connection_error(e.to_string()))?;

        let mut store = Self {
            runtime,
            graph,
            uri: config.uri.clone(),
        };
        store.ping()?;
        info!("connected to graph store at {}", store.uri);
        Ok(store)
    }

    fn run(&self, statement: Query) -> Result<()> {
        self.runtime
            .block_on(self.graph.run(statement))
            .map_err(|e| RepoGraphError::Statement(e.to_string()))
    }

    /// Run a statement and sum its `count` column.
    fn fetch_count(&self, statement: Query) -> Result<u64> {
        let graph = &self.graph;
        self.runtime.block_on(async {
            let mut stream = graph
                .execute(statement)
                .await
                .map_err(|e| RepoGraphError::Statement(e.to_string()))?;
            let mut total: i64 = 0;
            while let Some(row) = stream
                .next()
                .await
                .map_err(|e| RepoGraphError::Statement(e.to_string()))?
            {
                total += row
                    .get::<i64>("count")
                    .map_err(|e| RepoGraphError::Statement(e.to_string()))?;
            }
            Ok::<u64, RepoGraphError>(total.max(0) as u64)
        })
    }
}

impl Drop for Neo4jStore {
    fn drop(&mut self) {
        debug!("closing graph store session at {}", self.uri);
    }
}

fn scalar_to_bolt(key: &str, value: &Value) -> Result<BoltType> {
    match value {
        Value::Bool(b) => Ok(BoltType::from(*b)),
        Value::String(s) => Ok(BoltType::from(s.as_str())),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(BoltType::from(i)),
            (None, Some(f)) if !n.is_u64() => Ok(BoltType::from(f)),
            _ => Err(RepoGraphError::Statement(format!(
                "property '{}' is out of integer range: {}",
                key, n
            ))),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => Err(RepoGraphError::Statement(
            format!("property '{}' is not a scalar", key),
        )),
    }
}

fn properties_to_bolt(properties: &Properties) -> Result<BoltType> {
    let mut map = BoltMap::new();
    for (key, value) in properties {
        if value.is_null() {
            continue;
        }
        map.put(BoltString::from(key.as_str()), scalar_to_bolt(key, value)?);
    }
    Ok(BoltType::Map(map))
}

fn edge_to_bolt(row: &EdgeRow) -> Result<BoltType> {
    let mut map = BoltMap::new();
    map.put(BoltString::from("from"), BoltType::from(row.from_id.as_str()));
    map.put(BoltString::from("to"), BoltType::from(row.to_id.as_str()));
    map.put(BoltString::from("properties"), properties_to_bolt(&row.properties)?);
    Ok(BoltType::Map(map))
}

impl GraphStore for Neo4jStore {
    fn ping(&mut self) -> Result<()> {
        self.fetch_count(query(schema::PING))
            .map(|_| ())
            .map_err(|e| RepoGraphError::StoreConnection {
                uri: self.uri.clone(),
                message: e.to_string(),
            })
    }

    fn count_nodes(&mut self) -> Result<u64> {
        self.fetch_count(query(schema::COUNT_NODES))
    }

    fn delete_nodes(&mut self, limit: usize) -> Result<u64> {
        self.fetch_count(query(&schema::delete_nodes_statement(limit)))
    }

    fn ensure_unique_id(&mut self, label: &str) -> Result<()> {
        self.run(query(&schema::unique_id_statement(label)))
    }

    fn ensure_index(&mut self, label: &str, property: &str) -> Result<()> {
        self.run(query(&schema::index_statement(label, property)))
    }

    fn insert_nodes(&mut self, label: &str, rows: &[Properties], mode: WriteMode) -> Result<usize> {
        let mut batch = BoltList::new();
        for row in rows {
            batch.push(properties_to_bolt(row)?);
        }
        let statement =
            query(&schema::insert_nodes_statement(label, mode)).param("batch", BoltType::List(batch));
        self.fetch_count(statement).map(|n| n as usize)
    }

    fn insert_edges(&mut self, rel_type: &str, rows: &[EdgeRow], mode: WriteMode) -> Result<usize> {
        let mut batch = BoltList::new();
        for row in rows {
            batch.push(edge_to_bolt(row)?);
        }
        let statement = query(&schema::insert_edges_statement(rel_type, mode))
            .param("batch", BoltType::List(batch));
        self.fetch_count(statement).map(|n| n as usize)
    }
}

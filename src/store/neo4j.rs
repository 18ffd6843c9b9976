//! Neo4jHttp: backend for a Neo4j server
//!
//! Talks to the transactional HTTP endpoint
//! (`POST {url}/db/{database}/tx/commit`) with basic auth. Each call is one
//! statement in its own transaction; bulk operations use `UNWIND`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::{EdgeSpec, GraphBackend, StoreError, StoreResult};
use crate::config::Neo4jConfig;
use crate::graph::{
    Edge, EdgeId, EdgeType, Label, Node, NodeId, PropertyMap, PropertyValue,
};

pub struct Neo4jHttp {
    endpoint: String,
    username: String,
    password: String,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jHttp {
    pub fn new(config: &Neo4jConfig) -> Self {
        Self {
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            username: config.username.clone(),
            password: config.password.clone(),
            http_client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one statement and return its rows
    async fn run(&self, statement: &str, parameters: Value) -> StoreResult<Vec<Vec<Value>>> {
        debug!("Cypher: {}", statement);
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::InvalidResponse(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let reply: TxResponse = response.json().await?;
        rows(reply)
    }
}

fn rows(reply: TxResponse) -> StoreResult<Vec<Vec<Value>>> {
    if let Some(error) = reply.errors.into_iter().next() {
        return Err(StoreError::Neo4j {
            code: error.code,
            message: error.message,
        });
    }
    Ok(reply
        .results
        .into_iter()
        .flat_map(|result| result.data)
        .map(|data| data.row)
        .collect())
}

/// Backtick-quote a property key
fn quote(key: &str) -> String {
    format!("`{}`", key.replace('`', "``"))
}

fn checked(name: &str, is_identifier: bool) -> StoreResult<&str> {
    if is_identifier {
        Ok(name)
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn checked_label(label: &Label) -> StoreResult<&str> {
    checked(label.as_str(), label.is_identifier())
}

fn checked_type(edge_type: &EdgeType) -> StoreResult<&str> {
    checked(edge_type.as_str(), edge_type.is_identifier())
}

fn to_params(properties: &PropertyMap) -> Value {
    Value::Object(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<String, Value>>(),
    )
}

fn from_params(value: &Value) -> PropertyMap {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
            .collect(),
        _ => PropertyMap::new(),
    }
}

fn id_at(row: &[Value], idx: usize) -> StoreResult<u64> {
    row.get(idx)
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::InvalidResponse(format!("expected an id in column {}", idx)))
}

/// `{`k`: <prefix>.`k`, ...}` for every key of `keys`
fn pattern<'a>(keys: impl IntoIterator<Item = &'a String>, prefix: &str) -> String {
    let pairs: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{}: {}.{}", quote(k), prefix, quote(k)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

fn merge_node_statement(label: &str, key: &PropertyMap) -> String {
    format!(
        "MERGE (n:{} {}) ON CREATE SET n += $props RETURN id(n)",
        label,
        pattern(key.keys(), "$key")
    )
}

fn merge_edges_statement(edge_type: &str, keys: &[String]) -> String {
    format!(
        "UNWIND $rows AS row \
         MATCH (a) WHERE id(a) = row.source \
         MATCH (b) WHERE id(b) = row.target \
         MERGE (a)-[r:{} {}]->(b) RETURN count(r)",
        edge_type,
        pattern(keys, "row.props")
    )
}

#[async_trait]
impl GraphBackend for Neo4jHttp {
    async fn create_node(&self, label: &Label, properties: PropertyMap) -> StoreResult<NodeId> {
        let ids = self.create_nodes(label, vec![properties]).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("CREATE returned no id".to_string()))
    }

    async fn create_nodes(&self, label: &Label, rows: Vec<PropertyMap>) -> StoreResult<Vec<NodeId>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let statement = format!(
            "UNWIND $rows AS row CREATE (n:{}) SET n = row RETURN id(n)",
            checked_label(label)?
        );
        let params = json!({ "rows": rows.iter().map(to_params).collect::<Vec<_>>() });
        self.run(&statement, params)
            .await?
            .iter()
            .map(|row| id_at(row, 0).map(NodeId::new))
            .collect()
    }

    async fn merge_node(
        &self,
        label: &Label,
        key: PropertyMap,
        properties: PropertyMap,
    ) -> StoreResult<NodeId> {
        let statement = merge_node_statement(checked_label(label)?, &key);
        let params = json!({ "key": to_params(&key), "props": to_params(&properties) });
        let rows = self.run(&statement, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::InvalidResponse("MERGE returned no id".to_string()))?;
        Ok(NodeId::new(id_at(row, 0)?))
    }

    async fn match_nodes(&self, label: &Label) -> StoreResult<Vec<Node>> {
        let statement = format!(
            "MATCH (n:{}) RETURN id(n), properties(n)",
            checked_label(label)?
        );
        self.run(&statement, json!({}))
            .await?
            .iter()
            .map(|row| {
                let id = id_at(row, 0)?;
                let properties = row.get(1).map(from_params).unwrap_or_default();
                Ok(Node::new(NodeId::new(id), label.clone(), properties))
            })
            .collect()
    }

    async fn match_edges(&self, edge_type: &EdgeType) -> StoreResult<Vec<Edge>> {
        let statement = format!(
            "MATCH (a)-[r:{}]->(b) RETURN id(r), id(a), id(b), properties(r)",
            checked_type(edge_type)?
        );
        self.run(&statement, json!({}))
            .await?
            .iter()
            .map(|row| {
                Ok(Edge::new(
                    EdgeId::new(id_at(row, 0)?),
                    NodeId::new(id_at(row, 1)?),
                    NodeId::new(id_at(row, 2)?),
                    edge_type.clone(),
                    row.get(3).map(from_params).unwrap_or_default(),
                ))
            })
            .collect()
    }

    async fn merge_edge(
        &self,
        source: NodeId,
        target: NodeId,
        edge_type: &EdgeType,
        properties: PropertyMap,
    ) -> StoreResult<bool> {
        let written = self
            .merge_edges(edge_type, vec![EdgeSpec::new(source, target, properties)])
            .await?;
        Ok(written > 0)
    }

    /// Rows are grouped by property key set, one statement per group
    ///
    /// The server does not report whether MERGE matched or created, so the
    /// count is of edges written.
    async fn merge_edges(&self, edge_type: &EdgeType, edges: Vec<EdgeSpec>) -> StoreResult<usize> {
        let name = checked_type(edge_type)?;
        let mut groups: BTreeMap<Vec<String>, Vec<Value>> = BTreeMap::new();
        for edge in &edges {
            let keys: Vec<String> = edge.properties.keys().cloned().collect();
            groups.entry(keys).or_default().push(json!({
                "source": edge.source.as_u64(),
                "target": edge.target.as_u64(),
                "props": to_params(&edge.properties),
            }));
        }

        let mut written = 0;
        for (keys, rows) in groups {
            let statement = merge_edges_statement(name, &keys);
            let result = self.run(&statement, json!({ "rows": rows })).await?;
            if let Some(row) = result.first() {
                written += id_at(row, 0)? as usize;
            }
        }
        Ok(written)
    }

    async fn delete_edge(&self, id: EdgeId) -> StoreResult<()> {
        self.run(
            "MATCH ()-[r]->() WHERE id(r) = $id DELETE r",
            json!({ "id": id.as_u64() }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_endpoint() {
        let config = Neo4jConfig {
            url: "http://db:7474/".to_string(),
            database: "forensics".to_string(),
            ..Default::default()
        };
        assert_eq!(Neo4jHttp::new(&config).endpoint(), "http://db:7474/db/forensics/tx/commit");
    }

    #[test]
    fn test_statements() {
        let key = props! { "computer" => "WS01", "fullpath" => r"C:\a.dll" };
        assert_eq!(
            merge_node_statement("File", &key),
            "MERGE (n:File {`computer`: $key.`computer`, `fullpath`: $key.`fullpath`}) \
             ON CREATE SET n += $props RETURN id(n)"
        );
        let statement = merge_edges_statement("LOAD", &["timestamp".to_string()]);
        assert!(statement.contains("MERGE (a)-[r:LOAD {`timestamp`: row.props.`timestamp`}]->(b)"));
        assert_eq!(quote("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        assert!(matches!(
            checked_label(&Label::new("Process) DETACH DELETE (x")),
            Err(StoreError::InvalidName(_))
        ));
        assert!(checked_type(&EdgeType::new("MEMORY_ACCESS")).is_ok());
    }

    #[test]
    fn test_response_rows_and_errors() {
        let ok: TxResponse = serde_json::from_value(json!({
            "results": [{ "columns": ["id(n)"], "data": [{ "row": [5], "meta": [] }, { "row": [6] }] }],
            "errors": []
        }))
        .unwrap();
        let data = rows(ok).unwrap();
        assert_eq!(id_at(&data[1], 0).unwrap(), 6);

        let failed: TxResponse = serde_json::from_value(json!({
            "results": [],
            "errors": [{ "code": "Neo.ClientError.Statement.SyntaxError", "message": "bad" }]
        }))
        .unwrap();
        assert!(matches!(rows(failed), Err(StoreError::Neo4j { .. })));
    }

    #[test]
    fn test_property_params() {
        let props = props! { "pid" => 4i64, "evidence" => vec!["x".to_string()] };
        let value = to_params(&props);
        assert_eq!(value, json!({ "pid": 4, "evidence": ["x"] }));
        assert_eq!(from_params(&value), props);
    }
}

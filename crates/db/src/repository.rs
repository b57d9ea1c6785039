//! Repository pattern for graph reads

use crate::queries::{FACT_EXPANSION, GRAPH_STATS, VECTOR_SEARCH};
use crate::{DbError, GraphStore, Result};
use sec_graphrag_core::{DocumentChunk, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Clauses that modify the graph
const WRITE_KEYWORDS: [&str; 8] = [
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "FOREACH",
];

/// `apoc` namespaces and procedures that can write, beyond names containing a write keyword
const APOC_WRITE_SEGMENTS: [&str; 8] = [
    "REFACTOR", "PERIODIC", "TRIGGER", "DO", "DOIT", "RUNWRITE", "RUNMANY", "RUNSCHEMA",
];

/// Counts reported by [`GraphRepository::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub companies: u64,
    pub managers: u64,
    pub documents: u64,
    pub nodes: u64,
    pub relationships: u64,
}

/// Read-only access to the SEC graph
#[derive(Clone)]
pub struct GraphRepository {
    store: Arc<dyn GraphStore>,
}

impl GraphRepository {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    // ==========================================
    // VECTOR OPERATIONS
    // ==========================================

    /// Nearest chunks to `embedding` in the named vector index
    #[instrument(skip(self, embedding))]
    pub async fn vector_search(&self, index: &str, k: usize, embedding: Vec<f32>) -> Result<Vec<DocumentChunk>> {
        let rows = self
            .store
            .query(VECTOR_SEARCH, json!({"index": index, "k": k, "embedding": embedding}))
            .await?;

        let chunks: Vec<DocumentChunk> = rows.iter().map(DocumentChunk::from_record).collect();
        debug!("Vector search returned {} chunks", chunks.len());
        Ok(chunks)
    }

    // ==========================================
    // GRAPH OPERATIONS
    // ==========================================

    /// Fact lines reachable from the given chunks
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn retrieve_facts(&self, chunks: &[DocumentChunk]) -> Result<Vec<String>> {
        let chunk_ids: Vec<&str> = chunks.iter().filter_map(DocumentChunk::id).collect();
        if chunk_ids.is_empty() {
            debug!("No chunk ids to expand from");
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .query(FACT_EXPANSION, json!({"chunkIds": chunk_ids}))
            .await?;

        // Rows whose endpoints lack the rendered property come back as null
        let facts: Vec<String> = rows
            .into_iter()
            .filter_map(|mut row| match row.remove("fact") {
                Some(Value::String(fact)) => Some(fact),
                _ => None,
            })
            .collect();

        debug!("Expanded {} facts", facts.len());
        Ok(facts)
    }

    /// Run ad-hoc Cypher, refusing anything that writes
    #[instrument(skip(self))]
    pub async fn run_read_query(&self, cypher: &str) -> Result<Vec<Record>> {
        ensure_read_only(cypher)?;
        self.store.query_read(cypher, json!({})).await
    }

    /// Node and relationship counts
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<GraphStats> {
        let rows = self.store.query(GRAPH_STATS, json!({})).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::QueryFailed("graph stats returned no rows".into()))?;

        let count = |key: &str| row.get(key).and_then(Value::as_u64).unwrap_or(0);
        Ok(GraphStats {
            companies: count("companies"),
            managers: count("managers"),
            documents: count("documents"),
            nodes: count("nodes"),
            relationships: count("relationships"),
        })
    }
}

/// Reject Cypher containing write clauses outside of string literals and comments.
///
/// Property access such as `c.set` is not a clause. Dotted `apoc.*` names are
/// rejected when any segment names a write, since their statements usually
/// travel inside string literals; `CALL dbms.*` is rejected outright.
pub fn ensure_read_only(cypher: &str) -> Result<()> {
    let names = tokenize(&strip_literals(cypher));

    for (i, name) in names.iter().enumerate() {
        let head = name[0].as_str();
        let next = names.get(i + 1).map(|next| next[0].as_str());
        let prev = i.checked_sub(1).map(|prev| names[prev][0].as_str());

        let rejected = WRITE_KEYWORDS.contains(&head)
            || (head == "LOAD" && next == Some("CSV"))
            || (head == "DBMS" && name.len() > 1 && prev == Some("CALL"))
            || (head == "APOC" && name[1..].iter().any(|segment| is_apoc_write(segment)));
        if rejected {
            return Err(DbError::WriteRejected(name.join(".")));
        }
    }

    Ok(())
}

fn is_apoc_write(segment: &str) -> bool {
    APOC_WRITE_SEGMENTS.contains(&segment)
        || WRITE_KEYWORDS.iter().any(|keyword| segment.contains(keyword))
}

/// Blank out comments, quoted strings and backtick-quoted identifiers
fn strip_literals(cypher: &str) -> String {
    let mut out = String::with_capacity(cypher.len());
    let mut chars = cypher.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '/' if chars.peek() == Some(&'/') => {
                // Line comment runs to the newline, which is kept
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut star = false;
                for c in chars.by_ref() {
                    if star && c == '/' {
                        break;
                    }
                    star = c == '*';
                }
                out.push(' ');
            }
            '\'' | '"' | '`' => {
                let mut escaped = false;
                for c in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' && ch != '`' {
                        escaped = true;
                    } else if c == ch {
                        break;
                    }
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }

    out
}

/// Uppercased names, each split into its dotted segments: `c.set` -> `["C", "SET"]`
fn tokenize(cypher: &str) -> Vec<Vec<String>> {
    cypher
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .map(|word| {
            word.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_ascii_uppercase)
                .collect::<Vec<_>>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every query and replays canned rows
    #[derive(Default)]
    struct FakeStore {
        rows: Vec<Record>,
        calls: Mutex<Vec<(String, Value)>>,
        read_only_calls: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn with_rows(rows: Vec<Value>) -> Self {
            Self {
                rows: rows
                    .into_iter()
                    .filter_map(|row| row.as_object().cloned())
                    .collect(),
                calls: Mutex::new(Vec::new()),
                read_only_calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        async fn query(&self, cypher: &str, params: Value) -> Result<Vec<Record>> {
            self.calls.lock().unwrap().push((cypher.to_string(), params));
            Ok(self.rows.clone())
        }

        async fn query_read(&self, cypher: &str, params: Value) -> Result<Vec<Record>> {
            self.read_only_calls.lock().unwrap().push(cypher.to_string());
            self.query(cypher, params).await
        }
    }

    #[tokio::test]
    async fn test_vector_search_maps_rows() {
        let store = Arc::new(FakeStore::with_rows(vec![json!({
            "text": "Apple designs phones",
            "score": 0.9,
            "metadata": {"id": "c1", "text": null, "embedding": null}
        })]));
        let repo = GraphRepository::new(store.clone());

        let chunks = repo.vector_search("vector", 10, vec![0.1, 0.2]).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id(), Some("c1"));

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, VECTOR_SEARCH);
        assert_eq!(calls[0].1["index"], json!("vector"));
        assert_eq!(calls[0].1["k"], json!(10));
        assert_eq!(calls[0].1["embedding"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_facts_passes_chunk_ids() {
        let store = Arc::new(FakeStore::with_rows(vec![
            json!({"fact": "BLACKROCK - OWNS -> APPLE"}),
            json!({"fact": null}),
            json!({"fact": "APPLE - HAS_DOCUMENT -> 10-K"}),
        ]));
        let repo = GraphRepository::new(store.clone());
        let chunks = vec![
            DocumentChunk::new("a").with_metadata("id", "c1"),
            DocumentChunk::new("b"),
            DocumentChunk::new("c").with_metadata("id", "c3"),
        ];

        let facts = repo.retrieve_facts(&chunks).await.unwrap();
        assert_eq!(facts, ["BLACKROCK - OWNS -> APPLE", "APPLE - HAS_DOCUMENT -> 10-K"]);

        let calls = store.calls();
        assert_eq!(calls[0].0, FACT_EXPANSION);
        assert_eq!(calls[0].1, json!({"chunkIds": ["c1", "c3"]}));
    }

    #[tokio::test]
    async fn test_retrieve_facts_without_ids_skips_query() {
        let store = Arc::new(FakeStore::default());
        let repo = GraphRepository::new(store.clone());

        let facts = repo.retrieve_facts(&[DocumentChunk::new("no id")]).await.unwrap();
        assert!(facts.is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_read_query_rejects_writes() {
        let store = Arc::new(FakeStore::default());
        let repo = GraphRepository::new(store.clone());

        let err = repo.run_read_query("MATCH (n) DETACH DELETE n").await.unwrap_err();
        assert!(matches!(err, DbError::WriteRejected(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_read_query_uses_read_mode() {
        let store = Arc::new(FakeStore::with_rows(vec![json!({"name": "APPLE INC"})]));
        let repo = GraphRepository::new(store.clone());

        let rows = repo
            .run_read_query("MATCH (c:Company) RETURN c.companyName AS name")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            *store.read_only_calls.lock().unwrap(),
            ["MATCH (c:Company) RETURN c.companyName AS name"]
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let store = Arc::new(FakeStore::with_rows(vec![json!({
            "companies": 12, "managers": 340, "documents": 12, "nodes": 900, "relationships": 4200
        })]));
        let repo = GraphRepository::new(store);

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.managers, 340);
        assert_eq!(stats.relationships, 4200);
    }

    #[tokio::test]
    async fn test_stats_without_rows() {
        let repo = GraphRepository::new(Arc::new(FakeStore::default()));
        assert!(matches!(repo.stats().await, Err(DbError::QueryFailed(_))));
    }

    #[test]
    fn test_read_only_accepts_reads() {
        assert!(ensure_read_only("MATCH (m:Manager)-[:OWNS]->(c:Company) RETURN m.managerName LIMIT 10").is_ok());
        assert!(ensure_read_only("MATCH (c:Company) WHERE c.companyName = 'CREATE LABS' RETURN c").is_ok());
        assert!(ensure_read_only("MATCH (n) RETURN n SKIP 5 LIMIT 5 // offset").is_ok());
        assert!(ensure_read_only("MATCH (n:`Set`) RETURN n").is_ok());
        assert!(ensure_read_only("MATCH (c:Company) RETURN c.set AS s").is_ok());
        assert!(ensure_read_only("MATCH (d:Document) RETURN d.create, d.delete").is_ok());
        assert!(ensure_read_only("MATCH (n) // it's a read\nRETURN n").is_ok());
        assert!(ensure_read_only("/* don't CREATE anything */ MATCH (n) RETURN n").is_ok());
        assert!(ensure_read_only("CALL apoc.meta.schema() YIELD value RETURN value").is_ok());
        assert!(ensure_read_only("CALL apoc.cypher.run('MATCH (n) RETURN count(n)', {})").is_ok());
        assert!(ensure_read_only("RETURN 'a // b' AS s").is_ok());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        for cypher in [
            "CREATE (n:Company {name: 'x'})",
            "merge (m:Manager {managerName: 'y'})",
            "MATCH (n) SET n.flag = true",
            "MATCH (n) REMOVE n.flag",
            "DROP INDEX vector",
            "LOAD CSV FROM 'file:///x.csv' AS row RETURN row",
            "CALL dbms.security.createUser('x', 'y')",
            "CALL apoc.refactor.rename.label('Company', 'Issuer')",
            "CALL apoc.periodic.iterate('MATCH (n) RETURN n', 'DETACH DELETE n', {})",
            "CALL apoc.cypher.doIt('CREATE (n:Pwn)', {}) YIELD value RETURN value",
            "CALL apoc.cypher.runWrite('MATCH (n) DETACH DELETE n', {})",
            "CALL apoc.cypher.runMany('CREATE (n); CREATE (m);', {})",
            "CALL apoc.create.node(['Company'], {})",
            "MATCH (n) CALL apoc.nodes.delete(n, 10) YIELD value RETURN value",
            "MATCH (n) // it's gone\nDETACH DELETE n",
            "MATCH (n) /* ' */ SET n.flag = true",
            "MATCH (c:Company) SET c.set = 1",
        ] {
            assert!(
                matches!(ensure_read_only(cypher), Err(DbError::WriteRejected(_))),
                "{}",
                cypher
            );
        }
    }
}

//! Cypher issued against the SEC knowledge graph
//!
//! Graph shape:
//! `(:Manager)-[:OWNS]->(:Company)-[:HAS_DOCUMENT]->(:Document)<-[:PART_OF]-(chunk)-[:HAS_ENTITY]->(entity)`

/// Top-k chunks from the vector index, with the chunk's remaining
/// properties as metadata. Text and embedding are nulled out of the map.
pub const VECTOR_SEARCH: &str = r#"
CALL db.index.vector.queryNodes($index, $k, $embedding) YIELD node, score
RETURN node.text AS text, score, node {.*, text: Null, embedding: Null} AS metadata
ORDER BY score DESC
"#;

/// Facts around a set of chunks.
///
/// The first half walks from the entities a chunk mentions out over 1-5
/// hops of anything but `HAS_ENTITY`. The second half walks from the
/// chunk's document back to its owner, then 1-2 hops of anything but
/// `HAS_DOCUMENT`. Each distinct relationship becomes one line.
pub const FACT_EXPANSION: &str = r#"
UNWIND $chunkIds AS chunkId
MATCH (chunk {id: chunkId})-[:HAS_ENTITY]->()-[rl:!HAS_ENTITY]-{1,5}()
UNWIND rl AS r
WITH DISTINCT r
MATCH (n)-[r]->(m)
RETURN n.id + ' - ' + type(r) + ' -> ' + m.id AS fact ORDER BY fact
UNION ALL
UNWIND $chunkIds AS chunkId
MATCH (chunk {id: chunkId})-[:PART_OF]->(:Document)<-[:HAS_DOCUMENT]-()-[rl:!HAS_DOCUMENT]-{1,2}()
UNWIND rl AS r
WITH DISTINCT r
MATCH (n)-[r]->(m)
RETURN n.info + ' - ' + r.info + ' -> ' + m.info AS fact ORDER BY fact
"#;

/// Node and relationship counts
pub const GRAPH_STATS: &str = r#"
CALL { MATCH (c:Company) RETURN count(c) AS companies }
CALL { MATCH (m:Manager) RETURN count(m) AS managers }
CALL { MATCH (d:Document) RETURN count(d) AS documents }
CALL { MATCH (n) RETURN count(n) AS nodes }
CALL { MATCH ()-[r]->() RETURN count(r) AS relationships }
RETURN companies, managers, documents, nodes, relationships
"#;

//! SQLite document-collection sink
//!
//! Every collection (`nodes_gene`, `edges_transcribed_to`, …) is a table of
//! JSON documents with the lookup columns pulled out. A `collections` table
//! tracks what exists so the database can be inspected or cleared later.

use super::sink::{Record, Sink, SinkResult};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Columns that may be indexed
const INDEXABLE: [&str; 3] = ["id", "source_id", "target_id"];

/// Table name for a collection: lowercase ASCII letters, digits and `_`.
fn table_name(collection: &str) -> String {
    collection
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct SqliteSink {
    conn: Connection,
    known: HashSet<String>,
}

impl SqliteSink {
    fn init_schema(conn: &Connection) -> SinkResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn load_known(conn: &Connection) -> SinkResult<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT name FROM collections")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(names)
    }

    pub fn open(path: impl AsRef<Path>) -> SinkResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        let known = Self::load_known(&conn)?;

        Ok(Self { conn, known })
    }

    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn,
            known: HashSet::new(),
        })
    }

    /// Create the collection table unless it is already known. The caller
    /// records `table` in `known` once the creating statement is committed.
    fn create_collection(conn: &Connection, known: &HashSet<String>, table: &str) -> SinkResult<bool> {
        if known.contains(table) {
            return Ok(false);
        }
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                adapter TEXT NOT NULL,
                id TEXT,
                source_id TEXT,
                target_id TEXT,
                document TEXT NOT NULL
            );
            "#
        ))?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
            params![table, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(true)
    }

    /// Drop every collection.
    pub fn clear(&mut self) -> SinkResult<()> {
        let tables = Self::load_known(&self.conn)?;
        let tx = self.conn.transaction()?;
        for table in &tables {
            tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}";"#, table))?;
        }
        tx.execute("DELETE FROM collections", [])?;
        tx.commit()?;

        self.known.clear();
        info!(dropped = tables.len(), "Cleared document collections");
        Ok(())
    }

    /// Document count per collection
    pub fn collection_counts(&self) -> SinkResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for table in Self::load_known(&self.conn)? {
            let count: i64 = self
                .conn
                .query_row(&format!(r#"SELECT COUNT(*) FROM "{}""#, table), [], |row| row.get(0))?;
            counts.insert(table, count as usize);
        }
        Ok(counts)
    }

    /// Stored documents of a collection, in insertion order
    pub fn documents(&self, collection: &str) -> SinkResult<Vec<serde_json::Value>> {
        let table = table_name(collection);
        if !self.known.contains(&table) {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare(&format!(r#"SELECT document FROM "{}" ORDER BY seq"#, table))?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let documents = raw
            .iter()
            .map(|text| serde_json::from_str(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}

impl Sink for SqliteSink {
    fn ensure_index(&mut self, collection: &str, field: &str) -> SinkResult<()> {
        if !INDEXABLE.contains(&field) {
            debug!(collection, field, "Field is not indexable, skipping");
            return Ok(());
        }
        let table = table_name(collection);
        if Self::create_collection(&self.conn, &self.known, &table)? {
            self.known.insert(table.clone());
        }
        self.conn.execute_batch(&format!(
            r#"CREATE INDEX IF NOT EXISTS "idx_{table}_{field}" ON "{table}"({field});"#
        ))?;
        Ok(())
    }

    fn insert_batch(&mut self, adapter: &str, collection: &str, records: Vec<Record>) -> SinkResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = table_name(collection);
        let tx = self.conn.transaction()?;
        let created = Self::create_collection(&tx, &self.known, &table)?;
        {
            let mut stmt = tx.prepare(&format!(
                r#"INSERT INTO "{}" (adapter, id, source_id, target_id, document) VALUES (?1, ?2, ?3, ?4, ?5)"#,
                table
            ))?;
            for record in &records {
                let document = serde_json::to_string(&record.to_document())?;
                let (id, source_id, target_id) = match record {
                    Record::Node(node) => (Some(node.id.as_str()), None, None),
                    Record::Edge(edge) => (None, Some(edge.source_id.as_str()), Some(edge.target_id.as_str())),
                };
                stmt.execute(params![adapter, id, source_id, target_id, document])?;
            }
        }
        tx.commit()?;
        if created {
            self.known.insert(table.clone());
        }

        info!(adapter, collection = %table, count = records.len(), "Inserted documents");
        Ok(())
    }
}

//! SQLite FTS5 passage index, the bundled similarity-search backend.

use std::collections::HashSet;
use std::path::Path;

use rag_core::{CHUNK_OVERLAP, CHUNK_SIZE, Candidate, Timestamp, chunk_text};
use rusqlite::{Connection, OpenFlags, params};

use crate::error::{Result, StoreError};
use crate::schema;

pub struct PassageIndex {
    conn: Connection,
}

/// Writes staged inside one transaction; see [`PassageIndex::batch`].
pub struct Batch<'a> {
    conn: &'a Connection,
}

impl Batch<'_> {
    /// Remove every passage.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM passages; DELETE FROM sources;")?;
        Ok(())
    }

    /// Chunk `text` and store it under `source`, replacing any earlier
    /// version. Returns the number of chunks stored.
    pub fn add_document(&self, source: &str, text: &str) -> Result<usize> {
        let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
        self.conn
            .execute("DELETE FROM passages WHERE source = ?1", [source])?;
        let mut stmt = self
            .conn
            .prepare("INSERT INTO passages (source, chunk_no, content) VALUES (?1, ?2, ?3)")?;
        for (i, chunk) in chunks.iter().enumerate() {
            stmt.execute(params![source, i as i64, chunk])?;
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO sources (path, chunk_count, indexed_at) VALUES (?1, ?2, ?3)",
            params![source, chunks.len() as i64, Timestamp::now().to_iso8601()],
        )?;
        Ok(chunks.len())
    }

    pub fn remove_source(&self, source: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM passages WHERE source = ?1", [source])?;
        self.conn
            .execute("DELETE FROM sources WHERE path = ?1", [source])?;
        Ok(())
    }
}

/// FTS5 match expression OR-ing every distinct word of `question`.
/// `None` when the question has nothing searchable.
pub fn match_expression(question: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| seen.insert(w.clone()))
        .map(|w| format!("\"{w}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

impl PassageIndex {
    /// Open an existing index. Fails with `IndexUnavailable` when the file
    /// is absent, unreadable or not an index.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StoreError::IndexUnavailable(format!(
                "no index at {}",
                path.display()
            )));
        }
        let unavailable =
            |e: rusqlite::Error| StoreError::IndexUnavailable(format!("{}: {e}", path.display()));
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(unavailable)?;
        if !schema::is_initialized(&conn).map_err(|e| match e {
            StoreError::Sqlite(e) => unavailable(e),
            other => other,
        })? {
            return Err(StoreError::IndexUnavailable(format!(
                "{} is not a passage index",
                path.display()
            )));
        }
        Ok(Self { conn })
    }

    /// Open or create an index for writing.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Run `work` in a single transaction. It commits when `work` returns
    /// `Ok`; on error nothing it wrote is kept.
    pub fn batch<T>(&self, work: impl FnOnce(&Batch<'_>) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = work(&Batch { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    pub fn clear(&self) -> Result<()> {
        self.batch(|b| b.clear())
    }

    pub fn add_document(&self, source: &str, text: &str) -> Result<usize> {
        self.batch(|b| b.add_document(source, text))
    }

    pub fn remove_source(&self, source: &str) -> Result<()> {
        self.batch(|b| b.remove_source(source))
    }

    pub fn indexed_sources(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM sources")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = HashSet::new();
        for row in rows {
            out.insert(row?);
        }
        Ok(out)
    }

    pub fn passage_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Up to `pool` passages ranked by bm25, best first.
    pub fn search(&self, question: &str, pool: usize) -> Result<Vec<Candidate>> {
        let Some(expr) = match_expression(question) else {
            return Ok(Vec::new());
        };
        let unavailable = |e: rusqlite::Error| StoreError::IndexUnavailable(e.to_string());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT source, content FROM passages
                 WHERE passages MATCH ?1
                 ORDER BY bm25(passages), rowid
                 LIMIT ?2",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map(params![expr, pool as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(unavailable)?;

        let mut candidates = Vec::new();
        for (rank, row) in rows.enumerate() {
            let (source, content) = row.map_err(unavailable)?;
            candidates.push(Candidate::new(source, content, rank));
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PassageIndex {
        let index = PassageIndex::open_in_memory().unwrap();
        index
            .add_document("specs/auth.md", "Tokens expire after one hour. Refresh tokens last a week.")
            .unwrap();
        index
            .add_document("notes/lunch.md", "We ordered pizza for the team lunch.")
            .unwrap();
        index
    }

    #[test]
    fn test_match_expression() {
        assert_eq!(
            match_expression("How do tokens expire? tokens!").as_deref(),
            Some("\"how\" OR \"do\" OR \"tokens\" OR \"expire\"")
        );
        assert_eq!(match_expression("?! --"), None);
    }

    #[test]
    fn test_search_ranks_relevant_first() {
        let hits = index().search("when do tokens expire", 10).unwrap();
        assert_eq!(hits[0].source, "specs/auth.md");
        assert_eq!(hits[0].rank, 0);
        assert!(hits.iter().all(|c| c.source != "notes/lunch.md"));
    }

    #[test]
    fn test_search_respects_pool() {
        let index = PassageIndex::open_in_memory().unwrap();
        for i in 0..5 {
            index.add_document(&format!("d{i}.md"), "shared word").unwrap();
        }
        assert_eq!(index.search("shared", 3).unwrap().len(), 3);
    }

    #[test]
    fn test_unsearchable_question_is_empty() {
        assert!(index().search("???", 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_document_replaces() {
        let index = index();
        index.add_document("specs/auth.md", "Completely different text.").unwrap();
        assert!(index.search("tokens", 5).unwrap().is_empty());
        assert_eq!(index.indexed_sources().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_source() {
        let index = index();
        index.remove_source("notes/lunch.md").unwrap();
        assert_eq!(index.passage_count().unwrap(), 1);
        assert!(!index.indexed_sources().unwrap().contains("notes/lunch.md"));
    }

    #[test]
    fn test_failed_batch_keeps_previous_contents() {
        let index = index();
        let result = index.batch(|b| {
            b.clear()?;
            b.add_document("specs/new.md", "Replacement text about rotation.")?;
            Err::<(), _>(StoreError::InvalidData("interrupted".into()))
        });
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(index.indexed_sources().unwrap().len(), 2);
        assert_eq!(index.search("tokens", 5).unwrap()[0].source, "specs/auth.md");
        assert!(index.search("rotation", 5).unwrap().is_empty());
    }

    #[test]
    fn test_batch_commits_together() {
        let index = index();
        let chunks = index
            .batch(|b| {
                b.remove_source("notes/lunch.md")?;
                b.add_document("notes/dinner.md", "Soup for dinner.")
            })
            .unwrap();
        assert_eq!(chunks, 1);
        let sources = index.indexed_sources().unwrap();
        assert!(sources.contains("notes/dinner.md"));
        assert!(!sources.contains("notes/lunch.md"));
    }

    #[test]
    fn test_open_missing_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PassageIndex::open(&dir.path().join("missing.db")),
            Err(StoreError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_open_foreign_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        std::fs::write(&path, "definitely not sqlite").unwrap();
        assert!(matches!(
            PassageIndex::open(&path),
            Err(StoreError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn test_create_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        PassageIndex::create(&path)
            .unwrap()
            .add_document("a.md", "alpha")
            .unwrap();
        let reopened = PassageIndex::open(&path).unwrap();
        assert_eq!(reopened.search("alpha", 5).unwrap().len(), 1);
    }
}

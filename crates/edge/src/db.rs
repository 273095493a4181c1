//! db.rs: the SQLite store behind the index.
//!
//! One FTS5 virtual table holds everything; BM25 ranking comes for free
//! via `ORDER BY rank`. All writers funnel through `exec_batch`, which
//! wraps its statements in a single `BEGIN IMMEDIATE … COMMIT` and rolls
//! back on the first error. Readers are snapshot-consistent under WAL.

use crate::{Error, Result};
use domain::doc::Document;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// PRAGMA cache_size applied to every connection, in pages.
pub const DEFAULT_CACHE_PAGES: i64 = 2000;

const CREATE_DOCUMENTS: &str = "\
CREATE VIRTUAL TABLE IF NOT EXISTS documents USING fts5 (
    uri, title, type, body, fingerprint UNINDEXED,
    tokenize = 'porter unicode61'
)";

/// A statement parameter. Batches travel as `(sql, binds)` pairs, so
/// the values need one common type covering the SQLite storage classes.
#[derive(Debug, Clone)]
pub enum Bind {
    Text(String),
    Integer(i64),
    Real(f64),
    Blob(Vec<u8>),
    Null,
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    binds: Vec<Bind>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for b in binds {
        query = match b {
            Bind::Text(s) => query.bind(s),
            Bind::Integer(i) => query.bind(i),
            Bind::Real(r) => query.bind(r),
            Bind::Blob(b) => query.bind(b),
            Bind::Null => {
                let none: Option<i32> = None;
                query.bind(none)
            }
        };
    }
    query
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `sqlite_url` and apply
    /// the schema. Accepts a bare path or a `sqlite://`-prefixed URL.
    pub async fn open(sqlite_url: &str) -> Result<Self> {
        Self::open_with_cache(sqlite_url, DEFAULT_CACHE_PAGES).await
    }

    pub async fn open_with_cache(sqlite_url: &str, cache_pages: i64) -> Result<Self> {
        let filename = sqlite_url.strip_prefix("sqlite://").unwrap_or(sqlite_url);

        if let Some(parent) = Path::new(filename).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::from_str(filename)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", cache_pages.to_string());

        let pool = SqlitePoolOptions::new()
            .min_connections(0)
            .max_connections(8) // SQLite likes small pools
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Idempotent schema creation.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_DOCUMENTS).execute(&self.pool).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Write path
    // ─────────────────────────────────────────────────────────────────

    /// Run every statement inside one IMMEDIATE transaction. The first
    /// failing statement aborts the whole batch, so either all of it
    /// persists or none of it does. Returns the summed rows affected.
    pub async fn exec_batch(&self, statements: Vec<(String, Vec<Bind>)>) -> Result<usize> {
        let mut conn = self.pool.acquire().await?;
        let mut total = 0usize;

        // IMMEDIATE claims the write lock at BEGIN, not at first write.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        for (sql, binds) in statements {
            let query = bind_all(sqlx::query(&sql), binds);
            match query.execute(&mut *conn).await {
                Ok(res) => total += res.rows_affected() as usize,
                Err(e) => {
                    // Report the statement failure, not the rollback's,
                    // which may itself fail on a dead connection.
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    return Err(Error::Store(e));
                }
            }
        }

        if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(Error::Store(e));
        }

        Ok(total)
    }

    async fn exec_one(&self, sql: &str, binds: Vec<Bind>) -> Result<usize> {
        self.exec_batch(vec![(sql.to_owned(), binds)]).await
    }

    // ─────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────

    pub async fn fetch_all(&self, sql: &str, binds: Vec<Bind>) -> Result<Vec<SqliteRow>> {
        let query = bind_all(sqlx::query(sql), binds);
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn contains(&self, uri: &str) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM documents WHERE uri = ?)")
            .bind(uri)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    /// `None`: no row for this uri. `Some(None)`: a row without a
    /// fingerprint (web entries). `Some(Some(_))`: an indexed file.
    pub async fn fingerprint_of(&self, uri: &str) -> Result<Option<Option<String>>> {
        let row = sqlx::query("SELECT fingerprint FROM documents WHERE uri = ?")
            .bind(uri)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Option<String>, _>("fingerprint")?)),
            None => Ok(None),
        }
    }

    pub async fn count_documents(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?)
    }

    // ─────────────────────────────────────────────────────────────────
    // Document rows
    // ─────────────────────────────────────────────────────────────────

    /// Insert a document, replacing any row that already carries its
    /// uri. FTS5 tables enforce no UNIQUE constraint, so the delete in
    /// the same transaction is what keeps `uri` unique even when two
    /// feeds race on the same entry.
    pub async fn insert_document(&self, doc: &Document) -> Result<()> {
        self.exec_batch(vec![
            (
                "DELETE FROM documents WHERE uri = ?".to_owned(),
                vec![Bind::Text(doc.uri.clone())],
            ),
            (
                "INSERT INTO documents (uri, title, type, body, fingerprint) VALUES (?, ?, ?, ?, ?)"
                    .to_owned(),
                vec![
                    Bind::Text(doc.uri.clone()),
                    Bind::Text(doc.title.clone()),
                    Bind::Text(doc.kind.to_string()),
                    Bind::Text(doc.body.clone()),
                    match &doc.fingerprint {
                        Some(fp) => Bind::Text(fp.clone()),
                        None => Bind::Null,
                    },
                ],
            ),
        ])
        .await?;
        Ok(())
    }

    /// Refresh a changed file in place.
    pub async fn update_document(&self, uri: &str, body: &str, fingerprint: &str) -> Result<()> {
        self.exec_one(
            "UPDATE documents SET body = ?, fingerprint = ? WHERE uri = ?",
            vec![
                Bind::Text(body.to_owned()),
                Bind::Text(fingerprint.to_owned()),
                Bind::Text(uri.to_owned()),
            ],
        )
        .await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────

    /// Drop everything and recreate the schema.
    pub async fn purge(&self) -> Result<()> {
        self.exec_one("DROP TABLE IF EXISTS documents", vec![]).await?;
        self.init().await
    }

    /// Reclaim unused pages. VACUUM cannot run inside a transaction, so
    /// this goes straight to a pooled connection in autocommit mode.
    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    /// Regenerate the FTS auxiliary structures from the stored rows.
    pub async fn rebuild_fts(&self) -> Result<()> {
        self.exec_one("INSERT INTO documents(documents) VALUES('rebuild')", vec![])
            .await?;
        Ok(())
    }

    /// Trigger a WAL checkpoint (useful after big ingestion bursts).
    pub async fn checkpoint_wal(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::doc::DocKind;
    use tempfile::tempdir;

    async fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempdir().expect("tempdir");
        let url = dir.path().join("db.sqlite3").to_string_lossy().into_owned();
        let store = Store::open(&url).await.expect("open store");
        (dir, store)
    }

    fn doc(uri: &str, body: &str) -> Document {
        Document::new(uri, "doc", DocKind::Plain)
            .with_body(body)
            .with_fingerprint("fp-1")
    }

    #[tokio::test]
    async fn open_accepts_sqlite_url_prefix_and_is_idempotent() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("db.sqlite3");
        let url = format!("sqlite://{}", path.to_string_lossy());

        let first = Store::open(&url).await.expect("first open");
        first.init().await.expect("re-init");
        drop(first);

        // Second open against the bare path sees the same database.
        let second = Store::open(&path.to_string_lossy()).await.expect("second open");
        assert_eq!(second.count_documents().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn insert_then_lookup_round_trips() {
        let (_dir, store) = temp_store().await;

        store.insert_document(&doc("/tmp/a.txt", "hello")).await.expect("insert");

        assert!(store.contains("/tmp/a.txt").await.expect("contains"));
        assert!(!store.contains("/tmp/b.txt").await.expect("contains"));

        let fp = store.fingerprint_of("/tmp/a.txt").await.expect("fingerprint");
        assert_eq!(fp, Some(Some("fp-1".to_owned())));

        let missing = store.fingerprint_of("/tmp/b.txt").await.expect("fingerprint");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn web_documents_have_no_fingerprint() {
        let (_dir, store) = temp_store().await;

        let web = Document::new("https://a.example/p", "p", DocKind::Web).with_body("body");
        store.insert_document(&web).await.expect("insert");

        let fp = store.fingerprint_of("https://a.example/p").await.expect("fingerprint");
        assert_eq!(fp, Some(None));
    }

    #[tokio::test]
    async fn reinserting_the_same_uri_keeps_one_row() {
        let (_dir, store) = temp_store().await;

        store.insert_document(&doc("/tmp/a.txt", "v1")).await.expect("insert");
        store.insert_document(&doc("/tmp/a.txt", "v2")).await.expect("reinsert");

        assert_eq!(store.count_documents().await.expect("count"), 1);

        let rows = store
            .fetch_all("SELECT body FROM documents WHERE uri = ?", vec![Bind::Text("/tmp/a.txt".into())])
            .await
            .expect("fetch");
        let body: String = rows[0].try_get("body").expect("body");
        assert_eq!(body, "v2");
    }

    #[tokio::test]
    async fn update_document_changes_body_and_fingerprint() {
        let (_dir, store) = temp_store().await;

        store.insert_document(&doc("/tmp/a.txt", "old")).await.expect("insert");
        store
            .update_document("/tmp/a.txt", "new", "fp-2")
            .await
            .expect("update");

        let fp = store.fingerprint_of("/tmp/a.txt").await.expect("fingerprint");
        assert_eq!(fp, Some(Some("fp-2".to_owned())));
        assert_eq!(store.count_documents().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn exec_batch_error_rolls_back() {
        let (_dir, store) = temp_store().await;

        // First statement ok, second invalid: the whole batch must
        // vanish, leaving no partial row behind.
        let res = store
            .exec_batch(vec![
                (
                    "INSERT INTO documents (uri, title, type, body) VALUES (?, ?, ?, ?)".to_owned(),
                    vec![
                        Bind::Text("/tmp/x".into()),
                        Bind::Text("x".into()),
                        Bind::Text("text/plain".into()),
                        Bind::Text("body".into()),
                    ],
                ),
                ("INSERT INTO no_such_table VALUES (1)".to_owned(), vec![]),
            ])
            .await;

        assert!(matches!(res, Err(Error::Store(_))));
        assert_eq!(store.count_documents().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn purge_empties_and_reinits() {
        let (_dir, store) = temp_store().await;

        store.insert_document(&doc("/tmp/a.txt", "hello")).await.expect("insert");
        store.purge().await.expect("purge");

        assert_eq!(store.count_documents().await.expect("count"), 0);

        // Schema is live again immediately.
        store.insert_document(&doc("/tmp/b.txt", "world")).await.expect("insert");
        assert_eq!(store.count_documents().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn maintenance_operations_run_clean() {
        let (_dir, store) = temp_store().await;

        store.insert_document(&doc("/tmp/a.txt", "hello")).await.expect("insert");
        store.rebuild_fts().await.expect("rebuild");
        store.vacuum().await.expect("vacuum");
        store.checkpoint_wal().await.expect("checkpoint");

        assert!(store.contains("/tmp/a.txt").await.expect("contains"));
    }

    #[tokio::test]
    async fn concurrent_write_bursts_result_in_expected_counts() {
        let (_dir, store) = temp_store().await;

        let burst = |start: i64, n: i64| {
            let store = store.clone();
            async move {
                store
                    .exec_batch(
                        (0..n)
                            .map(|k| {
                                (
                                    "INSERT INTO documents (uri, title, type, body) VALUES (?, ?, ?, ?)"
                                        .to_owned(),
                                    vec![
                                        Bind::Text(format!("/tmp/{}.txt", start + k)),
                                        Bind::Text("t".into()),
                                        Bind::Text("text/plain".into()),
                                        Bind::Text("body".into()),
                                    ],
                                )
                            })
                            .collect(),
                    )
                    .await
            }
        };

        let (r1, r2, r3) = tokio::join!(burst(1, 50), burst(101, 50), burst(201, 50));
        assert_eq!(r1.expect("burst 1"), 50);
        assert_eq!(r2.expect("burst 2"), 50);
        assert_eq!(r3.expect("burst 3"), 50);

        assert_eq!(store.count_documents().await.expect("count"), 150);
    }
}

// crates/edge/src/query.rs

use crate::db::{Bind, Store};
use crate::{Error, Result};
use domain::doc::SearchHit;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Display-sized body prefix carried on every hit.
pub const SNIPPET_CHARS: usize = 300;

const SEARCH_SQL: &str = "\
SELECT uri, title, type, body FROM documents \
WHERE documents MATCH ? ORDER BY rank, rowid LIMIT ?";

/// Ranked full-text search.
///
/// The query string is forwarded verbatim as the FTS5 MATCH expression,
/// so the full MATCH syntax is live and a malformed expression surfaces
/// as `Error::Query`. Results come back
/// BM25-best-first (`rank` ascending), ties broken by insertion order.
/// A non-positive `limit` means no limit.
pub async fn search(store: &Store, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
    let limit = if limit <= 0 { -1 } else { limit };

    let rows = store
        .fetch_all(
            SEARCH_SQL,
            vec![Bind::Text(query.to_owned()), Bind::Integer(limit)],
        )
        .await
        .map_err(|e| match e {
            // The only statement here is the MATCH; database-level
            // failures on it are malformed query syntax.
            Error::Store(sqlx::Error::Database(db)) => Error::Query(db.message().to_owned()),
            other => other,
        })?;

    rows.into_iter().map(hit_from_row).collect()
}

fn hit_from_row(row: SqliteRow) -> Result<SearchHit> {
    let uri: String = row.try_get("uri")?;
    let title: String = row.try_get("title")?;
    let kind: String = row.try_get("type")?;
    let body: String = row.try_get("body")?;

    Ok(SearchHit {
        uri,
        title,
        kind: kind.parse()?,
        snippet: snippet(&body),
    })
}

/// First `SNIPPET_CHARS` characters of the body, char-boundary safe.
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => body[..idx].to_owned(),
        None => body.to_owned(),
    }
}

// crates/edge/src/index.rs
//
// The ingestion pipeline: file ingestion runs to completion before feed
// ingestion starts, and the run ends with an FTS rebuild. Failures are
// contained at the unit level (one bad file or entry never sinks the
// batch) while store failures abort and surface.

use crate::db::Store;
use crate::feeds::{self, FeedClient};
use crate::fs::{filter, scan};
use crate::{Error, Result};
use domain::doc::{DocKind, Document};
use domain::setting::Settings;
use extract::Extraction;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::io;
use std::path::{Path, PathBuf};
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How one unit of work ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Indexed,
    Updated,
    Skipped,
}

/// Per-status counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IndexReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Indexed => self.indexed += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: IndexReport) {
        self.indexed += other.indexed;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.indexed + self.updated + self.skipped + self.failed
    }
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} indexed, {} updated, {} skipped, {} failed",
            self.indexed, self.updated, self.skipped, self.failed
        )
    }
}

/// Default worker cap: half the available cores, at least one.
pub fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() / 2)
        .unwrap_or(1)
        .max(1)
}

/// SHA-256 hex digest of the raw bytes at `path`.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;

    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

pub struct Indexer {
    store: Store,
}

impl Indexer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The full run: files to completion, then feeds, then the FTS
    /// rebuild that keeps the auxiliary structures tight.
    #[tracing::instrument(skip_all)]
    pub async fn index_all(
        &self,
        settings: &Settings,
        max_workers: usize,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let mut report = self
            .index_files(
                &settings.files.include,
                &settings.files.exclude,
                max_workers,
                cancel,
            )
            .await?;

        report.merge(self.index_feeds(&settings.feeds.urls, cancel).await?);

        self.store.rebuild_fts().await?;
        self.store.checkpoint_wal().await?;
        Ok(report)
    }

    /// Index every file under the include directories, bounded at
    /// `max_workers` concurrent pipelines.
    #[tracing::instrument(skip_all)]
    pub async fn index_files(
        &self,
        include: &[PathBuf],
        exclude: &[String],
        max_workers: usize,
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let patterns = filter::compile_patterns(exclude)?;

        // Collect the work list up front, deduplicated across include
        // dirs (and across symlink aliases) by canonical path.
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();
        for dir in include {
            let dir = dir.clone();
            let patterns = patterns.clone();
            let (found, scan_report) =
                task::spawn_blocking(move || scan::list_files(&dir, &patterns)).await??;

            for err in &scan_report.errors {
                warn!("[Err] scan: {err}");
            }
            files.extend(found);
        }

        let max_workers = max_workers.max(1);
        let mut report = IndexReport::default();

        let mut outcomes = futures::stream::iter(files.into_iter().map(|path| {
            let store = self.store.clone();
            let cancel = cancel.clone();
            async move {
                let outcome = process_file(store, &path, &cancel).await;
                (path, outcome)
            }
        }))
        .buffer_unordered(max_workers);

        // The stream is always drained: cancellation short-circuits
        // pipelines at their entry check, so in-flight transactions
        // finish instead of being dropped mid-write.
        while let Some((path, outcome)) = outcomes.next().await {
            match outcome {
                Ok(Some(outcome)) => {
                    report.record(outcome);
                    match outcome {
                        Outcome::Indexed => info!("[Ok] indexed '{}'", path.display()),
                        Outcome::Updated => info!("[Update] reindexed '{}'", path.display()),
                        Outcome::Skipped => info!("[Skip] already indexed '{}'", path.display()),
                    }
                }
                Ok(None) => {} // cancelled before this file started
                Err(Error::Store(e)) => return Err(Error::Store(e)),
                Err(e) => {
                    report.failed += 1;
                    warn!("[Err] '{}': {e}", path.display());
                }
            }
        }

        Ok(report)
    }

    /// Fetch and index the configured feeds, one task per feed.
    #[tracing::instrument(skip_all)]
    pub async fn index_feeds(
        &self,
        urls: &[String],
        cancel: &CancellationToken,
    ) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        if urls.is_empty() {
            return Ok(report);
        }

        let client = FeedClient::new(feeds::MAX_IN_FLIGHT_REQUESTS, feeds::FETCH_TIMEOUT)?;

        let tasks: Vec<_> = urls
            .iter()
            .map(|url| {
                tokio::spawn(process_feed(
                    self.store.clone(),
                    client.clone(),
                    url.clone(),
                    cancel.clone(),
                ))
            })
            .collect();

        for task in tasks {
            report.merge(task.await??);
        }

        Ok(report)
    }
}

/// One pass over one file: classify, fingerprint, dedup-check, then
/// extract and write. Returns `None` when cancellation pre-empted it.
async fn process_file(
    store: Store,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<Option<Outcome>> {
    if cancel.is_cancelled() {
        return Ok(None);
    }

    let kind = filter::classify(path)?;

    let digest = {
        let path = path.to_path_buf();
        task::spawn_blocking(move || file_digest(&path)).await??
    };

    let uri = path.to_string_lossy().into_owned();

    match store.fingerprint_of(&uri).await? {
        Some(existing) if existing.as_deref() == Some(digest.as_str()) => Ok(Some(Outcome::Skipped)),
        Some(_) => {
            let extraction = extract_blocking(path.to_path_buf(), kind).await?;
            store.update_document(&uri, &extraction.body, &digest).await?;
            Ok(Some(Outcome::Updated))
        }
        None => {
            let extraction = extract_blocking(path.to_path_buf(), kind).await?;
            let doc = Document::new(uri, extraction.title, kind)
                .with_body(extraction.body)
                .with_fingerprint(digest)
                .with_metadata(extraction.metadata);
            store.insert_document(&doc).await?;
            Ok(Some(Outcome::Indexed))
        }
    }
}

async fn extract_blocking(path: PathBuf, kind: DocKind) -> Result<Extraction> {
    Ok(task::spawn_blocking(move || extract::extract(&path, kind)).await??)
}

/// One feed: fetch the document, then walk its entries in the
/// publisher's order. Fetch and parse failures are contained here;
/// store failures propagate.
async fn process_feed(
    store: Store,
    client: FeedClient,
    url: String,
    cancel: CancellationToken,
) -> Result<IndexReport> {
    let mut report = IndexReport::default();

    let entries = match client.fetch_feed(&url, &cancel).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("[Err] feed '{url}': {e}");
            report.failed += 1;
            return Ok(report);
        }
    };

    for entry in entries {
        if cancel.is_cancelled() {
            break;
        }

        if store.contains(&entry.link).await? {
            info!("[Skip] already indexed '{}'", entry.link);
            report.skipped += 1;
            continue;
        }

        let body = match client.fetch_post(&entry.link, &cancel).await {
            Ok(body) => body,
            Err(e) => {
                warn!("[Err] post '{}': {e}", entry.link);
                report.failed += 1;
                continue;
            }
        };

        let doc = Document::new(entry.link.clone(), entry.display_title(), DocKind::Web)
            .with_body(body)
            .with_metadata(entry.metadata());
        store.insert_document(&doc).await?;

        info!("[Ok] indexed '{}'", entry.link);
        report.indexed += 1;
    }

    Ok(report)
}

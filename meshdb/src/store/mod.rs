//! Store - a persistent, per-scope, bucketed key/value index.
//!
//! Uses an embedded DuckDB file as the ordered map. Every entity is stored as
//! JSON under its [`Indexable::key`], and keys are scanned in byte order so
//! prefix scans behave like a cursor seek.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use duckdb::{params, AccessMode, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::selector::{Selector, Target};
use crate::{Error, Result};

/// Bucket holding the full device records.
pub const DEVICES_BUCKET: &str = "bucket:devices.full";

/// Every index file ends with this; nothing else is ever erased.
pub const INDEX_SUFFIX: &str = ".index.duckdb";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS buckets (
    name VARCHAR PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS items (
    bucket VARCHAR NOT NULL,
    key VARCHAR NOT NULL,
    value VARCHAR NOT NULL,
    PRIMARY KEY (bucket, key)
);
"#;

/// An entity that can live in the index.
///
/// The key must be unique per bucket and sort meaningfully: prefix scans seek
/// on it.
pub trait Indexable: Serialize + DeserializeOwned {
    fn key(&self) -> &str;
}

/// How a search picks its rows. Exactly one strategy per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Direct lookup of each key, in the given order. Every key must exist.
    Keys(Vec<String>),
    /// Full scan for [`Target::All`], otherwise one prefix scan per prefix.
    Select(Selector),
}

impl From<Selector> for Query {
    fn from(selector: Selector) -> Self {
        Self::Select(selector)
    }
}

/// Deterministic file name for a scope: readable part plus a digest so that
/// distinct scopes never collide after sanitizing.
pub fn file_name(scope: &str) -> String {
    let readable: String = scope
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@' => c,
            _ => '_',
        })
        .take(48)
        .collect();
    let digest = blake3::hash(scope.as_bytes()).to_hex();
    format!("{}-{}{}", readable, &digest[..12], INDEX_SUFFIX)
}

/// A typed index for one scope (one tailnet).
pub struct Store<T> {
    scope: String,
    dir: PathBuf,
    conn: Option<Connection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Indexable> Store<T> {
    /// Describe the store; nothing touches the filesystem until [`open`](Self::open).
    pub fn new(scope: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            scope: scope.into(),
            dir: dir.into(),
            conn: None,
            _marker: PhantomData,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Path to the backing DuckDB file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(file_name(&self.scope))
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// True when the backing file exists and is younger than `ttl`. A zero
    /// ttl is never fresh.
    pub fn exists(&self, ttl: Duration) -> Result<bool> {
        let meta = match fs::metadata(self.path()) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let age = SystemTime::now()
            .duration_since(meta.modified()?)
            .unwrap_or_default();
        Ok(age < ttl)
    }

    /// Open read-write, creating the file and schema if needed. No-op when
    /// already open.
    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;
        let conn = Connection::open(self.path())?;
        conn.execute_batch(SCHEMA)?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Open an existing file without write access, so reading never bumps
    /// its modification time. No-op when already open.
    pub fn open_read_only(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let config = duckdb::Config::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(self.path(), config)?;
        self.conn = Some(conn);
        Ok(())
    }

    /// Release the handle (and the file lock). No-op when closed.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| Error::from(e))?;
        }
        Ok(())
    }

    /// Delete the backing file outright. Closes the handle first.
    pub fn erase(&mut self) -> Result<()> {
        self.close()?;

        let path = self.path();
        self.check_owned(&path)?;

        remove_if_exists(&path)?;
        remove_if_exists(&wal_path(&path))?;
        tracing::debug!(file = %path.display(), "erased index");
        Ok(())
    }

    /// Only files in our directory carrying the index suffix may be deleted.
    fn check_owned(&self, path: &Path) -> Result<()> {
        let in_dir = path.parent() == Some(self.dir.as_path());
        let suffixed = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(INDEX_SUFFIX));
        if in_dir && suffixed {
            Ok(())
        } else {
            Err(Error::InvalidPath(path.to_path_buf()))
        }
    }

    fn conn(&mut self) -> Result<&mut Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::Storage("index is not open".to_string()))
    }

    /// Upsert every item under its key in one write transaction.
    pub fn index_items(&mut self, bucket: &str, items: &[T]) -> Result<usize> {
        let tx = self.conn()?.transaction()?;

        tx.execute("INSERT OR IGNORE INTO buckets VALUES (?)", params![bucket])?;
        {
            let mut stmt = tx.prepare("INSERT OR REPLACE INTO items VALUES (?, ?, ?)")?;
            for item in items {
                let encoded = serde_json::to_string(item)?;
                stmt.execute(params![bucket, item.key(), encoded])?;
            }
        }

        tx.commit()?;
        tracing::debug!(bucket, count = items.len(), "indexed items");
        Ok(items.len())
    }

    /// True once `bucket` has been indexed, even with zero items.
    pub fn has_bucket(&mut self, bucket: &str) -> Result<bool> {
        bucket_known(self.conn()?, bucket)
    }

    /// Run a query inside a read transaction.
    ///
    /// Prefix scans are not deduplicated: overlapping prefixes return the
    /// same entity once per matching prefix.
    pub fn search(&mut self, bucket: &str, query: &Query) -> Result<Vec<T>> {
        let tx = self.conn()?.transaction()?;

        if !bucket_known(&tx, bucket)? {
            return Err(Error::NotFound(format!("bucket {bucket}")));
        }

        let items = match query {
            Query::Keys(keys) => lookup_keys(&tx, bucket, keys)?,
            Query::Select(selector) => match &selector.target {
                Target::All => scan_all(&tx, bucket)?,
                Target::Prefixes(prefixes) => scan_prefixes(&tx, bucket, prefixes)?,
            },
        };

        tx.rollback()?;
        Ok(items)
    }
}

impl<T> Drop for Store<T> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
        }
    }
}

fn bucket_known(conn: &Connection, bucket: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM buckets WHERE name = ?",
        params![bucket],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn lookup_keys<T: DeserializeOwned>(
    conn: &Connection,
    bucket: &str,
    keys: &[String],
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare("SELECT value FROM items WHERE bucket = ? AND key = ?")?;
    let mut items = Vec::with_capacity(keys.len());

    for key in keys {
        let value: String = match stmt.query_row(params![bucket, key], |row| row.get(0)) {
            Ok(v) => v,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(Error::NotFound(format!("key {key} in {bucket}")));
            }
            Err(e) => return Err(e.into()),
        };
        items.push(serde_json::from_str(&value)?);
    }

    Ok(items)
}

fn scan_all<T: DeserializeOwned>(conn: &Connection, bucket: &str) -> Result<Vec<T>> {
    let mut stmt = conn.prepare("SELECT value FROM items WHERE bucket = ? ORDER BY key")?;
    let mut rows = stmt.query(params![bucket])?;

    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        items.push(serde_json::from_str(&value)?);
    }
    Ok(items)
}

/// Seek to the first key >= prefix and walk forward while keys still carry
/// the prefix. One pass per prefix, in order.
fn scan_prefixes<T: DeserializeOwned>(
    conn: &Connection,
    bucket: &str,
    prefixes: &[String],
) -> Result<Vec<T>> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM items WHERE bucket = ? AND key >= ? ORDER BY key")?;

    let mut items = Vec::new();
    for prefix in prefixes {
        let mut rows = stmt.query(params![bucket, prefix])?;
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            if !key.starts_with(prefix.as_str()) {
                break;
            }
            let value: String = row.get(1)?;
            items.push(serde_json::from_str(&value)?);
        }
    }
    Ok(items)
}

fn wal_path(path: &Path) -> PathBuf {
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    PathBuf::from(wal)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

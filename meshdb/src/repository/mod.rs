//! Cached repository - answers queries from the index, rebuilding it from
//! the source when it is stale.
//!
//! Both paths end in the same [`Store::search`], so a cache hit and a cache
//! miss return identical results for the same query.

use std::time::{Duration, Instant};

use crate::source::Source;
use crate::store::{Query, Store, DEVICES_BUCKET};
use crate::{Error, Result};

/// What the last call cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    /// Time spent searching a fresh index.
    pub cache_latency: Option<Duration>,
    /// Time spent in the source during a rebuild.
    pub source_latency: Option<Duration>,
    pub cache_hit: bool,
}

pub struct CachedRepository<S: Source> {
    source: S,
    store: Store<S::Item>,
    bucket: String,
    ttl: Duration,
    force_refresh: bool,
    timings: Timings,
}

impl<S: Source> CachedRepository<S> {
    pub fn new(source: S, store: Store<S::Item>, ttl: Duration) -> Self {
        Self {
            source,
            store,
            bucket: DEVICES_BUCKET.to_string(),
            ttl,
            force_refresh: false,
            timings: Timings::default(),
        }
    }

    /// Ignore the index and rebuild on every call.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &Store<S::Item> {
        &self.store
    }

    /// Answer `query`, from the index when fresh, otherwise after a rebuild.
    /// A fresh index that was never populated or cannot be read is rebuilt
    /// too. The store is closed again on every path.
    pub fn search(&mut self, query: impl Into<Query>) -> Result<Vec<S::Item>> {
        let query = query.into();
        self.timings = Timings::default();

        let fresh = !self.force_refresh && self.store.exists(self.ttl)?;
        tracing::debug!(scope = self.store.scope(), fresh, "searching index");

        if fresh {
            match self.search_fresh(&query) {
                Ok(Some(items)) => return Ok(items),
                Ok(None) => tracing::debug!("index was never populated; rebuilding"),
                Err(e @ (Error::DuckDb(_) | Error::Json(_))) => {
                    tracing::debug!(error = %e, "index unreadable; rebuilding");
                }
                Err(e) => return Err(e),
            }
        }
        self.rebuild(&query)
    }

    /// `None` when the index holds no bucket to search.
    fn search_fresh(&mut self, query: &Query) -> Result<Option<Vec<S::Item>>> {
        let start = Instant::now();
        self.store.open_read_only()?;
        let result = self.search_populated(query);
        let result = self.finish(result)?;

        if result.is_some() {
            self.timings.cache_hit = true;
            self.timings.cache_latency = Some(start.elapsed());
        }
        Ok(result)
    }

    fn search_populated(&mut self, query: &Query) -> Result<Option<Vec<S::Item>>> {
        if !self.store.has_bucket(&self.bucket)? {
            return Ok(None);
        }
        self.store.search(&self.bucket, query).map(Some)
    }

    fn rebuild(&mut self, query: &Query) -> Result<Vec<S::Item>> {
        self.store.erase()?;
        self.store.open()?;

        if let Err(e) = self.populate() {
            let _ = self.store.close();
            // Leave nothing behind that would look fresh next time.
            if let Err(erase) = self.store.erase() {
                tracing::warn!(error = %erase, "failed to discard partial index");
            }
            return Err(e);
        }

        let result = self.store.search(&self.bucket, query);
        self.finish(result)
    }

    /// Fetch everything from the source and index it.
    fn populate(&mut self) -> Result<()> {
        let start = Instant::now();
        let items = self.source.fetch_all()?;
        self.timings.source_latency = Some(start.elapsed());

        self.store.index_items(&self.bucket, &items)?;
        Ok(())
    }

    /// Close the store, preferring the operation's error over a close error.
    fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        let closed = self.store.close();
        let value = result?;
        closed?;
        Ok(value)
    }
}

//! meshdb: query languages and a cached device index for tailnet inventories.
//!
//! Devices are fetched from a source, indexed by name in a per-tailnet
//! DuckDB file, selected by name prefix, then filtered on their attributes.

pub mod atomic;
pub mod config;
pub mod device;
pub mod error;
pub mod filter;
pub mod process;
pub mod repository;
pub mod selector;
pub mod source;
pub mod store;

pub use config::Config;
pub use device::{Device, EnrichedInfo};
pub use error::{Error, Result, SyntaxError};
pub use filter::{parse_filter, Expr, MatchMode};
pub use process::{dedup_by_key, parse_sort, process, ProcessOptions, SortSpec};
pub use repository::{CachedRepository, Timings};
pub use selector::{parse_selector, parse_slice, Selector, Slice, Target};
pub use source::{DeviceSource, FileSource, RemoteSource, Source, StatusCommand};
pub use store::{Indexable, Query, Store};

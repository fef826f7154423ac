//! Fetch and decode the Russian Post postal-index reference dataset.
//!
//! The publisher lists every snapshot on a catalog page. Each entry links a
//! full `PIndx` archive and an incremental `NPIndx` archive, both zips holding
//! a single cp866 dBase table. [`Client`] ties the pieces together:
//!
//! ```no_run
//! use pindx::{Client, Config};
//!
//! # fn main() -> pindx::Result<()> {
//! let client = Client::new(&Config::from_env()?)?;
//! let catalog = client.refresh_catalog()?;
//! if let Some(snapshot) = client.fetch_full_snapshot(&catalog, None)? {
//!     println!("{} offices as of {}", snapshot.records.len(), snapshot.date);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod catalog;
pub mod client;
pub mod config;
pub mod dbf;
pub mod error;
pub mod fetch;
pub mod record;
pub mod regions;

pub use catalog::{Catalog, CatalogEntry, SourceFile, UpdatePackage};
pub use client::{Client, Snapshot};
pub use config::Config;
pub use error::{DecodeError, Error, Result};
pub use record::{ChangeRecord, FullRecord, RecordKind};
pub use regions::RegionTable;

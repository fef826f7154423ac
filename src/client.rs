// src/client.rs

use chrono::NaiveDate;
use encoding_rs::Encoding;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::archive::extract_dbf;
use crate::catalog::{parse_catalog_page, Catalog, CatalogEntry, UpdatePackage};
use crate::config::Config;
use crate::dbf::DbfTable;
use crate::error::{Error, Result};
use crate::fetch::{zips::save_bytes, HttpTransport, Transport};
use crate::record::{decode_changes, decode_full, FullRecord};
use crate::regions::RegionTable;

/// Result of a full-snapshot download.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Date of the catalog entry the snapshot came from; the caller's next watermark.
    pub date: NaiveDate,
    pub records: Vec<FullRecord>,
    /// The archive held no `PIndx` table, so `records` is empty without the
    /// publisher having emptied the dataset.
    pub missing_member: bool,
}

/// Fetches the catalog and the archives it links to.
///
/// Holds no mutable state: every call fetches afresh, and the region table is
/// shared read-only.
pub struct Client<T = HttpTransport> {
    transport: T,
    catalog_url: Url,
    root: Url,
    encoding: &'static Encoding,
    regions: Arc<RegionTable>,
}

impl Client<HttpTransport> {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_transport(
            HttpTransport::new(cfg)?,
            cfg,
            Arc::new(RegionTable::russia()),
        )
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T, cfg: &Config, regions: Arc<RegionTable>) -> Result<Self> {
        Ok(Self {
            transport,
            catalog_url: cfg.catalog()?,
            root: cfg.root()?,
            encoding: cfg.file_encoding()?,
            regions,
        })
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Fetch and parse the catalog page. Never cached.
    #[instrument(level = "info", skip(self), fields(url = %self.catalog_url))]
    pub fn refresh_catalog(&self) -> Result<Catalog> {
        let resp = self.transport.get(self.catalog_url.as_str())?;
        let entries = parse_catalog_page(
            &resp.body,
            resp.content_type.as_deref(),
            self.catalog_url.as_str(),
            &self.root,
        )?;
        let catalog = Catalog::from_entries(entries);
        info!(
            entries = catalog.len(),
            last = ?catalog.last_modified(),
            "catalog refreshed"
        );
        Ok(catalog)
    }

    /// Download and decode the newest full snapshot.
    ///
    /// `Ok(None)` when `since` is given and nothing newer is published; no
    /// request is made in that case.
    #[instrument(level = "info", skip(self, catalog))]
    pub fn fetch_full_snapshot(
        &self,
        catalog: &Catalog,
        since: Option<NaiveDate>,
    ) -> Result<Option<Snapshot>> {
        let Some(entry) = self.latest_full(catalog, since)? else {
            return Ok(None);
        };

        let Some(dbf) = self.download_dbf(&entry.full.url)? else {
            return Ok(Some(Snapshot {
                date: entry.date,
                records: Vec::new(),
                missing_member: true,
            }));
        };

        let url = entry.full.url.as_str();
        let table = DbfTable::parse(&dbf, self.encoding).map_err(|e| e.in_payload(url))?;
        let records =
            decode_full(table.rows(), &self.regions).map_err(|e| Error::from(e).in_payload(url))?;
        if records.len() != entry.full.records as usize {
            debug!(
                declared = entry.full.records,
                decoded = records.len(),
                "record count differs from catalog"
            );
        }
        info!(records = records.len(), date = %entry.date, "full snapshot decoded");

        Ok(Some(Snapshot {
            date: entry.date,
            records,
            missing_member: false,
        }))
    }

    /// Download and decode an update package into `package.changes`.
    ///
    /// Returns the newest `updated_at` among the decoded rows, `None` when
    /// the package holds no rows.
    #[instrument(level = "info", skip(self, package), fields(date = %package.date, url = %package.url))]
    pub fn fetch_change_package(&self, package: &mut UpdatePackage) -> Result<Option<NaiveDate>> {
        let Some(dbf) = self.download_dbf(&package.url)? else {
            package.changes = Vec::new();
            return Ok(None);
        };

        let url = package.url.as_str();
        let table = DbfTable::parse(&dbf, self.encoding).map_err(|e| e.in_payload(url))?;
        package.changes = decode_changes(table.rows(), &self.regions)
            .map_err(|e| Error::from(e).in_payload(url))?;
        let watermark = package.changes.iter().map(|c| c.updated_at).max();
        info!(
            changes = package.changes.len(),
            watermark = ?watermark,
            "change package decoded"
        );
        Ok(watermark)
    }

    /// Save the newest full archive as downloaded. `Ok(None)` means no update
    /// since `since` and nothing was written.
    #[instrument(level = "info", skip(self, catalog, path), fields(path = %path.as_ref().display()))]
    pub fn save_full_zip(
        &self,
        catalog: &Catalog,
        path: impl AsRef<Path>,
        mode: u32,
        since: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>> {
        let Some(entry) = self.latest_full(catalog, since)? else {
            return Ok(None);
        };
        let resp = self.transport.get(&entry.full.url)?;
        save_bytes(path, &resp.body, mode)?;
        Ok(Some(entry.date))
    }

    /// Save the dbf table from the newest full archive.
    #[instrument(level = "info", skip(self, catalog, path), fields(path = %path.as_ref().display()))]
    pub fn save_full_dbf(
        &self,
        catalog: &Catalog,
        path: impl AsRef<Path>,
        mode: u32,
        since: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>> {
        let Some(entry) = self.latest_full(catalog, since)? else {
            return Ok(None);
        };
        let dbf = self.require_dbf(&entry.full.url)?;
        save_bytes(path, &dbf, mode)?;
        Ok(Some(entry.date))
    }

    #[instrument(level = "info", skip(self, package, path), fields(date = %package.date))]
    pub fn save_package_zip(
        &self,
        package: &UpdatePackage,
        path: impl AsRef<Path>,
        mode: u32,
    ) -> Result<NaiveDate> {
        let resp = self.transport.get(&package.url)?;
        save_bytes(path, &resp.body, mode)?;
        Ok(package.date)
    }

    #[instrument(level = "info", skip(self, package, path), fields(date = %package.date))]
    pub fn save_package_dbf(
        &self,
        package: &UpdatePackage,
        path: impl AsRef<Path>,
        mode: u32,
    ) -> Result<NaiveDate> {
        let dbf = self.require_dbf(&package.url)?;
        save_bytes(path, &dbf, mode)?;
        Ok(package.date)
    }

    /// Newest entry, or `None` when `since` is set and nothing is newer.
    fn latest_full<'c>(
        &self,
        catalog: &'c Catalog,
        since: Option<NaiveDate>,
    ) -> Result<Option<&'c CatalogEntry>> {
        if let Some(since) = since {
            if !catalog.has_update_since(since) {
                info!(%since, last = ?catalog.last_modified(), "no update");
                return Ok(None);
            }
        }
        catalog.most_recent().map(Some).ok_or(Error::EmptyCatalog)
    }

    fn download_dbf(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let resp = self.transport.get(url)?;
        if let Some(lm) = resp.last_modified {
            debug!(last_modified = %lm, "archive Last-Modified (not used as watermark)");
        }
        let dbf = extract_dbf(&resp.body).map_err(|e| e.in_payload(url))?;
        if dbf.is_none() {
            warn!(%url, "archive has no PIndx/NPIndx dbf member; treating as empty");
        }
        Ok(dbf)
    }

    fn require_dbf(&self, url: &str) -> Result<Vec<u8>> {
        self.download_dbf(url)?.ok_or_else(|| Error::MemberNotFound {
            url: url.to_string(),
        })
    }
}

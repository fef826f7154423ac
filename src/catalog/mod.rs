// src/catalog/mod.rs

pub mod page;

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::ChangeRecord;

pub use page::{parse_catalog_page, CatalogParser, HtmlTableParser, MarkdownTableParser};

/// A downloadable file referenced from the catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub url: String,
    /// Record count the publisher declares next to the link.
    pub records: u32,
}

/// One published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub date: NaiveDate,
    pub number: String,
    /// Incremental `NPIndx` archive.
    pub update: SourceFile,
    /// Full `PIndx` archive.
    pub full: SourceFile,
}

/// An incremental package, filled in by `Client::fetch_change_package`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatePackage {
    pub date: NaiveDate,
    pub url: String,
    pub records: u32,
    pub changes: Vec<ChangeRecord>,
}

impl From<&CatalogEntry> for UpdatePackage {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            date: entry.date,
            url: entry.update.url.clone(),
            records: entry.update.records,
            changes: Vec::new(),
        }
    }
}

/// Catalog entries in ascending date order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_entries(mut entries: Vec<CatalogEntry>) -> Self {
        // stable: entries published on the same day keep page order
        entries.sort_by_key(|e| e.date);
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn most_recent(&self) -> Option<&CatalogEntry> {
        self.entries.last()
    }

    /// Date of the newest snapshot.
    pub fn last_modified(&self) -> Option<NaiveDate> {
        self.most_recent().map(|e| e.date)
    }

    /// Strictly newer data than `since` exists. An empty catalog has nothing newer.
    pub fn has_update_since(&self, since: NaiveDate) -> bool {
        self.last_modified().is_some_and(|last| last > since)
    }

    /// Packages for every entry dated on or after `since`, oldest first.
    pub fn packages_since(&self, since: NaiveDate) -> Vec<UpdatePackage> {
        self.entries
            .iter()
            .filter(|e| e.date >= since)
            .map(UpdatePackage::from)
            .collect()
    }

    pub fn all_packages(&self) -> Vec<UpdatePackage> {
        self.entries.iter().map(UpdatePackage::from).collect()
    }

    pub fn find(&self, date: NaiveDate) -> Option<&CatalogEntry> {
        self.entries.iter().rev().find(|e| e.date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn entry(date: NaiveDate, n: u32) -> CatalogEntry {
        CatalogEntry {
            date,
            number: n.to_string(),
            update: SourceFile {
                url: format!("https://example.test/NPIndx{n}.zip"),
                records: n * 10,
            },
            full: SourceFile {
                url: format!("https://example.test/PIndx{n}.zip"),
                records: 42000,
            },
        }
    }

    fn sample() -> Catalog {
        // deliberately out of order
        Catalog::from_entries(vec![
            entry(d(2024, 3, 1), 3),
            entry(d(2024, 1, 1), 1),
            entry(d(2024, 2, 1), 2),
        ])
    }

    #[test]
    fn test_sorted_and_most_recent() {
        let c = sample();
        let dates: Vec<_> = c.entries().iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1)]);
        assert_eq!(c.most_recent().unwrap().number, "3");
        assert_eq!(c.last_modified(), Some(d(2024, 3, 1)));
        assert_eq!(c.find(d(2024, 2, 1)).unwrap().number, "2");
        assert!(c.find(d(2024, 2, 2)).is_none());
    }

    #[test]
    fn test_empty_catalog() {
        let c = Catalog::default();
        assert!(c.most_recent().is_none());
        assert!(!c.has_update_since(d(1970, 1, 1)));
        assert!(c.packages_since(d(1970, 1, 1)).is_empty());
    }

    #[test]
    fn test_has_update_since_is_strict_and_monotonic() {
        let c = sample();
        assert!(c.has_update_since(d(2024, 2, 29)));
        assert!(!c.has_update_since(d(2024, 3, 1)));
        assert!(!c.has_update_since(d(2024, 3, 2)));

        // once false, stays false for every later watermark
        let mut seen_false = false;
        let mut day = d(2023, 12, 1);
        while day < d(2024, 4, 1) {
            let has = c.has_update_since(day);
            assert!(!(seen_false && has), "not monotonic at {day}");
            seen_false |= !has;
            day = day.succ_opt().unwrap();
        }
        assert!(seen_false);
    }

    #[test]
    fn test_packages_since_is_inclusive_subsequence() {
        let c = sample();
        let p = c.packages_since(d(2024, 2, 1));
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].date, d(2024, 2, 1));
        assert_eq!(p[1].date, d(2024, 3, 1));
        assert_eq!(p[0].url, "https://example.test/NPIndx2.zip");
        assert_eq!(p[0].records, 20);
        assert!(p[0].changes.is_empty());

        assert_eq!(c.packages_since(d(2000, 1, 1)), c.all_packages());
        assert!(c.packages_since(d(2024, 3, 2)).is_empty());
    }
}

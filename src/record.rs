// src/record.rs

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::DecodeError;
use crate::regions::RegionTable;

/// Which table layout a row belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// `PIndx*.dbf`, the current state of every post office.
    Full,
    /// `NPIndx*.dbf`, rows changed since the previous snapshot.
    Change,
}

impl RecordKind {
    pub const fn field_count(self) -> usize {
        match self {
            RecordKind::Full => FullRecord::FIELDS,
            RecordKind::Change => ChangeRecord::FIELDS,
        }
    }

    /// Kind implied by an archive member name such as `NPIndx12.dbf`.
    pub fn from_member_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("npindx") {
            Some(RecordKind::Change)
        } else if lower.starts_with("pindx") {
            Some(RecordKind::Full)
        } else {
            None
        }
    }
}

/// One post office from the full snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullRecord {
    /// Postal index under the current indexing system.
    pub index: String,
    pub ops_name: String,
    pub ops_type: String,
    /// Index of the parent office in the subordination hierarchy.
    pub ops_sub: String,
    pub region: String,
    /// Autonomous okrug/oblast, set when `region` is empty for such subjects.
    pub autonomy: String,
    /// District.
    pub area: String,
    pub city: String,
    pub sub_city: String,
    pub updated_at: NaiveDate,
    /// Index before the current indexing system was introduced.
    pub old_index: String,
    pub region_code: u16,
}

/// One row of an incremental update package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub index: String,
    pub new_index: String,
    pub ops_name: String,
    pub ops_type: String,
    pub ops_sub: String,
    pub region: String,
    pub autonomy: String,
    pub area: String,
    pub city: String,
    pub sub_city: String,
    pub updated_at: NaiveDate,
    pub old_index: String,
    pub region_code: u16,
}

impl FullRecord {
    pub const FIELDS: usize = 11;

    /// Build from the 11 ordered columns of a `PIndx` row.
    pub fn from_row<S: AsRef<str>>(
        row: usize,
        fields: &[S],
        regions: &RegionTable,
    ) -> Result<Self, DecodeError> {
        check_count(row, fields.len(), Self::FIELDS)?;
        let f = |i: usize| fields[i].as_ref().to_string();
        let updated_at = parse_yyyymmdd(row, fields[9].as_ref())?;
        let region = f(4);
        let autonomy = f(5);
        let region_code = regions.resolve(&region, &autonomy);

        Ok(Self {
            index: f(0),
            ops_name: f(1),
            ops_type: f(2),
            ops_sub: f(3),
            region,
            autonomy,
            area: f(6),
            city: f(7),
            sub_city: f(8),
            updated_at,
            old_index: f(10),
            region_code,
        })
    }

    /// `updated_at` as it appears in the table.
    pub fn updated_at_raw(&self) -> String {
        format_yyyymmdd(self.updated_at)
    }
}

impl ChangeRecord {
    pub const FIELDS: usize = 12;

    /// Build from the 12 ordered columns of an `NPIndx` row.
    pub fn from_row<S: AsRef<str>>(
        row: usize,
        fields: &[S],
        regions: &RegionTable,
    ) -> Result<Self, DecodeError> {
        check_count(row, fields.len(), Self::FIELDS)?;
        let f = |i: usize| fields[i].as_ref().to_string();
        let updated_at = parse_yyyymmdd(row, fields[10].as_ref())?;
        let region = f(5);
        let autonomy = f(6);
        let region_code = regions.resolve(&region, &autonomy);

        Ok(Self {
            index: f(0),
            new_index: f(1),
            ops_name: f(2),
            ops_type: f(3),
            ops_sub: f(4),
            region,
            autonomy,
            area: f(7),
            city: f(8),
            sub_city: f(9),
            updated_at,
            old_index: f(11),
            region_code,
        })
    }

    pub fn updated_at_raw(&self) -> String {
        format_yyyymmdd(self.updated_at)
    }
}

/// Decode every `(row index, fields)` pair or fail on the first bad row.
pub fn decode_full<I, R>(rows: I, regions: &RegionTable) -> Result<Vec<FullRecord>, DecodeError>
where
    I: IntoIterator<Item = (usize, R)>,
    R: AsRef<[String]>,
{
    rows.into_iter()
        .map(|(i, r)| FullRecord::from_row(i, r.as_ref(), regions))
        .collect()
}

pub fn decode_changes<I, R>(
    rows: I,
    regions: &RegionTable,
) -> Result<Vec<ChangeRecord>, DecodeError>
where
    I: IntoIterator<Item = (usize, R)>,
    R: AsRef<[String]>,
{
    rows.into_iter()
        .map(|(i, r)| ChangeRecord::from_row(i, r.as_ref(), regions))
        .collect()
}

fn check_count(row: usize, actual: usize, expected: usize) -> Result<(), DecodeError> {
    if actual != expected {
        return Err(DecodeError::FieldCount {
            row,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Strict `YYYYMMDD`: exactly eight ASCII digits forming a real date.
pub fn parse_yyyymmdd(row: usize, raw: &str) -> Result<NaiveDate, DecodeError> {
    let s = raw.trim();
    let bad = || DecodeError::Date {
        row,
        value: raw.to_string(),
    };
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let year: i32 = s[0..4].parse().map_err(|_| bad())?;
    let month: u32 = s[4..6].parse().map_err(|_| bad())?;
    let day: u32 = s[6..8].parse().map_err(|_| bad())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
}

pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row(date: &str) -> Vec<String> {
        [
            "664000",
            "ИРКУТСК",
            "ПОЧТАМТ",
            "664700",
            "ИРКУТСКАЯ ОБЛАСТЬ",
            "",
            "",
            "ИРКУТСК",
            "",
            date,
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn change_row(date: &str) -> Vec<String> {
        [
            "628000",
            "628001",
            "ХАНТЫ-МАНСИЙСК 1",
            "ОПС",
            "628700",
            "",
            "ХАНТЫ-МАНСИЙСКИЙ-ЮГРА АВТОНОМНЫЙ ОКРУГ",
            "",
            "ХАНТЫ-МАНСИЙСК",
            "",
            date,
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_kind_from_member_name() {
        assert_eq!(RecordKind::from_member_name("PIndx07.dbf"), Some(RecordKind::Full));
        assert_eq!(RecordKind::from_member_name("npindx.DBF"), Some(RecordKind::Change));
        assert_eq!(RecordKind::from_member_name("readme.txt"), None);
        assert_eq!(RecordKind::Change.field_count(), 12);
    }

    #[test]
    fn test_full_record_fields() {
        let regions = RegionTable::russia();
        let r = FullRecord::from_row(0, &full_row("20240115"), &regions).unwrap();
        assert_eq!(r.index, "664000");
        assert_eq!(r.ops_sub, "664700");
        assert_eq!(r.city, "ИРКУТСК");
        assert_eq!(r.updated_at, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(r.region_code, 38);
    }

    #[test]
    fn test_change_record_fields() {
        let regions = RegionTable::russia();
        let r = ChangeRecord::from_row(3, &change_row("20231231"), &regions).unwrap();
        assert_eq!(r.index, "628000");
        assert_eq!(r.new_index, "628001");
        assert_eq!(r.ops_name, "ХАНТЫ-МАНСИЙСК 1");
        assert_eq!(r.region_code, 86);
        assert_eq!(r.updated_at_raw(), "20231231");
    }

    #[test]
    fn test_date_round_trip() {
        let regions = RegionTable::russia();
        for raw in ["20000101", "20160229", "20241231", "19991001"] {
            let r = FullRecord::from_row(0, &full_row(raw), &regions).unwrap();
            assert_eq!(r.updated_at_raw(), raw);
        }
    }

    #[test]
    fn test_wrong_field_count_reports_row() {
        let regions = RegionTable::russia();
        let mut short = full_row("20240115");
        short.pop();
        let err = FullRecord::from_row(7, &short, &regions).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FieldCount {
                row: 7,
                expected: 11,
                actual: 10
            }
        );

        let long = change_row("20240115")
            .into_iter()
            .chain(["extra".to_string()])
            .collect::<Vec<_>>();
        let err = ChangeRecord::from_row(42, &long, &regions).unwrap_err();
        assert_eq!(err.row(), 42);
        assert!(err.to_string().contains("expected 12 fields, got 13"));

        // a full row is not a change row
        let err = ChangeRecord::from_row(1, &full_row("20240115"), &regions).unwrap_err();
        assert!(matches!(err, DecodeError::FieldCount { actual: 11, .. }));
    }

    #[test]
    fn test_bad_dates_fail() {
        let regions = RegionTable::russia();
        for raw in ["", "2024011", "202401150", "2024-1-15", "20241301", "20240230", "abcdefgh"] {
            let err = FullRecord::from_row(5, &full_row(raw), &regions).unwrap_err();
            assert_eq!(
                err,
                DecodeError::Date {
                    row: 5,
                    value: raw.to_string()
                },
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let regions = RegionTable::russia();
        let rows = vec![
            (0, full_row("20240115")),
            (1, full_row("20240116")),
            (2, full_row("bad")),
            (3, full_row("20240117")),
        ];
        let err = decode_full(rows, &regions).unwrap_err();
        assert_eq!(err.row(), 2);

        let ok = decode_full(vec![(0, full_row("20240115"))], &regions).unwrap();
        assert_eq!(ok.len(), 1);
    }
}

use chrono::NaiveDate;
use encoding_rs::IBM866;
use pindx::archive::extract_dbf;
use pindx::dbf::DbfTable;
use pindx::record::decode_full;
use pindx::RegionTable;
use std::fs;
use std::path::Path;

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

#[test]
fn pindx_zip_extracts_and_decodes() {
    let dbf = extract_dbf(&fixture("PIndx1.zip"))
        .unwrap()
        .expect("PIndx1.dbf member");
    assert!(!dbf.is_empty());

    let table = DbfTable::parse(&dbf, IBM866).unwrap();
    assert_eq!(table.fields.len(), 11);
    assert_eq!(table.fields[9].kind, 'D');

    let records = decode_full(table.rows(), &RegionTable::russia()).unwrap();
    assert_eq!(records.len(), 3);

    let irkutsk = &records[0];
    assert_eq!(irkutsk.index, "664000");
    assert_eq!(irkutsk.ops_name, "ИРКУТСК");
    assert_eq!(irkutsk.region_code, 38);
    assert_eq!(irkutsk.updated_at, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

    // autonomy name stands in for the empty region
    assert_eq!(records[1].region, "");
    assert_eq!(records[1].region_code, 86);

    assert_eq!(records[2].region_code, 77);
    assert_eq!(records[2].old_index, "101");
    assert_eq!(records[2].updated_at_raw(), "20240201");
}

#[test]
fn zip_without_member_is_empty_not_error() {
    assert_eq!(extract_dbf(&fixture("no_member.zip")).unwrap(), None);
}

// src/dbf.rs

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::Encoding;
use tracing::{debug, trace};

use crate::error::{Error, Result};

const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const DESCRIPTOR_END: u8 = 0x0D;
const DELETED: u8 = b'*';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    /// dBase type letter: `C`, `D`, `N`, `L`, ...
    pub kind: char,
    pub length: usize,
    pub decimals: u8,
}

#[derive(Debug, Clone)]
pub struct DbfRecord {
    /// Physical position in the table, counting deleted records.
    pub index: usize,
    pub deleted: bool,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DbfTable {
    pub fields: Vec<DbfField>,
    pub records: Vec<DbfRecord>,
}

impl DbfTable {
    /// Parse a whole table held in memory, decoding text with `encoding`.
    pub fn parse(bytes: &[u8], encoding: &'static Encoding) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Dbf(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let num_records = LittleEndian::read_u32(&bytes[4..8]) as usize;
        let header_len = LittleEndian::read_u16(&bytes[8..10]) as usize;
        let record_len = LittleEndian::read_u16(&bytes[10..12]) as usize;
        trace!(num_records, header_len, record_len, "dbf header");

        if header_len < HEADER_LEN + 1 || header_len > bytes.len() {
            return Err(Error::Dbf(format!("header length {header_len} out of range")));
        }

        let fields = parse_fields(&bytes[..header_len], encoding)?;
        let width: usize = fields.iter().map(|f| f.length).sum::<usize>() + 1;
        if width > record_len {
            return Err(Error::Dbf(format!(
                "fields span {width} bytes but records are {record_len} bytes"
            )));
        }

        let data = &bytes[header_len..];
        let needed = num_records
            .checked_mul(record_len)
            .ok_or_else(|| Error::Dbf("record area size overflows".into()))?;
        if data.len() < needed {
            return Err(Error::Dbf(format!(
                "truncated: {num_records} records of {record_len} bytes need {needed} bytes, found {}",
                data.len()
            )));
        }

        let records = data
            .chunks_exact(record_len)
            .take(num_records)
            .enumerate()
            .map(|(index, raw)| {
                let mut pos = 1;
                let values = fields
                    .iter()
                    .map(|f| {
                        let cell = &raw[pos..pos + f.length];
                        pos += f.length;
                        decode_text(cell, encoding)
                    })
                    .collect();
                DbfRecord {
                    index,
                    deleted: raw[0] == DELETED,
                    values,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            fields = fields.len(),
            records = records.len(),
            "parsed dbf table"
        );
        Ok(Self { fields, records })
    }

    /// Live rows as `(physical index, values)`; deleted records are skipped.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[String])> + '_ {
        self.records
            .iter()
            .filter(|r| !r.deleted)
            .map(|r| (r.index, r.values.as_slice()))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

fn parse_fields(header: &[u8], encoding: &'static Encoding) -> Result<Vec<DbfField>> {
    let mut fields = Vec::new();
    let mut pos = HEADER_LEN;
    while pos < header.len() && header[pos] != DESCRIPTOR_END {
        let desc = header.get(pos..pos + DESCRIPTOR_LEN).ok_or_else(|| {
            Error::Dbf(format!("field descriptor at byte {pos} runs past the header"))
        })?;
        let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: decode_text(&desc[..name_end], encoding),
            kind: desc[11] as char,
            length: desc[16] as usize,
            decimals: desc[17],
        });
        pos += DESCRIPTOR_LEN;
    }
    if fields.is_empty() {
        return Err(Error::Dbf("table declares no fields".into()));
    }
    Ok(fields)
}

fn decode_text(raw: &[u8], encoding: &'static Encoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(raw);
    text.trim_matches(|c: char| c == ' ' || c == '\0').to_string()
}

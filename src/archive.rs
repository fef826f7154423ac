// src/archive.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use tracing::{debug, instrument};
use zip::ZipArchive;

use crate::error::Result;

const MAX_SIZE_HINT: u64 = 64 << 20;

static MEMBER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(PIndx|NPIndx)\d*\.dbf$").expect("member pattern is valid"));

/// Whether a zip entry name is one of the published post-index tables.
pub fn is_index_member(name: &str) -> bool {
    MEMBER_NAME.is_match(name)
}

/// Pull the `PIndx[N].dbf` / `NPIndx[N].dbf` member out of a zip held in memory.
///
/// `Ok(None)` means the container was readable but held no matching member.
/// Published archives have shipped without it, so this is not an error here;
/// callers decide what an absent table means for them.
#[instrument(level = "debug", skip(bytes), fields(len = bytes.len()))]
pub fn extract_dbf(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !is_index_member(&name) {
            debug!(name = %name, "skipping zip entry");
            continue;
        }

        let mut buf = Vec::with_capacity(size_hint(entry.size()));
        entry
            .read_to_end(&mut buf)
            .map_err(zip::result::ZipError::from)?;
        debug!(name = %name, size = buf.len(), "extracted member");
        return Ok(Some(buf));
    }

    Ok(None)
}

/// Capacity to reserve for a member; the declared size comes from the
/// archive header and is not trusted past `MAX_SIZE_HINT`.
fn size_hint(declared: u64) -> usize {
    declared.min(MAX_SIZE_HINT) as usize
}

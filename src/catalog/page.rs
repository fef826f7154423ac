// src/catalog/page.rs

use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;
use tracing::{debug, trace, warn};
use url::Url;

use super::{CatalogEntry, SourceFile};
use crate::error::{Error, Result};

static RECORD_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:[ \u{a0}]\d{3})+|\d+)\s*запис")
        .expect("record count pattern is valid")
});

static HEADER_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*"?([a-z0-9_.:-]+)"#).expect("charset pattern is valid")
});

static META_CHARSET: Lazy<regex::bytes::Regex> = Lazy::new(|| {
    regex::bytes::Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#)
        .expect("meta charset pattern is valid")
});

static MD_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\|\s*(\d{2}\.\d{2}\.\d{4})\s*\|([^|]*)\|([^|]*)\|([^|]*)\|")
        .expect("markdown row pattern is valid")
});

static MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").expect("markdown link pattern is valid"));

/// Turns one layout of the catalog page into entries.
///
/// An empty result means the layout was not recognised.
pub trait CatalogParser {
    fn name(&self) -> &'static str;
    fn parse(&self, page: &str, base: &Url) -> Vec<CatalogEntry>;
}

/// HTML table rows of the form `date | number | update link | full link`.
pub struct HtmlTableParser {
    row: Selector,
    link: Selector,
}

impl HtmlTableParser {
    pub fn new() -> Self {
        Self {
            row: Selector::parse("tr").expect("row selector should parse"),
            link: Selector::parse("a[href]").expect("link selector should parse"),
        }
    }

    fn source_file(&self, cell: ElementRef<'_>, base: &Url) -> Option<SourceFile> {
        let href = cell
            .select(&self.link)
            .filter_map(|a| a.value().attr("href"))
            .next()?;
        let url = base.join(href.trim()).ok()?;
        Some(SourceFile {
            url: url.to_string(),
            records: record_count(&cell_text(cell)),
        })
    }
}

impl Default for HtmlTableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogParser for HtmlTableParser {
    fn name(&self) -> &'static str {
        "html-table"
    }

    fn parse(&self, page: &str, base: &Url) -> Vec<CatalogEntry> {
        let doc = Html::parse_document(page);
        let mut entries = Vec::new();

        for tr in doc.select(&self.row) {
            // direct cells only; the page nests tables inside cells
            let cells: Vec<ElementRef> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "td")
                .collect();
            if cells.len() != 4 {
                continue;
            }

            let Some(date) = parse_ru_date(&cell_text(cells[0])) else {
                trace!(text = %cell_text(cells[0]), "row without a date, skipping");
                continue;
            };
            let (Some(update), Some(full)) = (
                self.source_file(cells[2], base),
                self.source_file(cells[3], base),
            ) else {
                warn!(%date, "catalog row is missing a link");
                continue;
            };

            entries.push(CatalogEntry {
                date,
                number: cell_text(cells[1]),
                update,
                full,
            });
        }

        entries
    }
}

/// Pipe-table rows: `| 01.02.2024 | 12 | [NPIndx](url) 345 записей | [PIndx](url) 42000 записей |`.
#[derive(Default)]
pub struct MarkdownTableParser;

impl MarkdownTableParser {
    fn source_file(cell: &str, base: &Url) -> Option<SourceFile> {
        let href = MD_LINK.captures(cell)?.get(1)?.as_str();
        let url = base.join(href).ok()?;
        Some(SourceFile {
            url: url.to_string(),
            records: record_count(cell),
        })
    }
}

impl CatalogParser for MarkdownTableParser {
    fn name(&self) -> &'static str {
        "markdown-table"
    }

    fn parse(&self, page: &str, base: &Url) -> Vec<CatalogEntry> {
        page.lines()
            .filter_map(|line| {
                let caps = MD_ROW.captures(line)?;
                let date = parse_ru_date(&caps[1])?;
                let update = Self::source_file(&caps[3], base)?;
                let full = Self::source_file(&caps[4], base)?;
                Some(CatalogEntry {
                    date,
                    number: caps[2].trim().to_string(),
                    update,
                    full,
                })
            })
            .collect()
    }
}

/// Parse a fetched catalog page with every known layout, first match wins.
///
/// The body is decoded with the charset from `content_type`, else from a
/// `<meta>` tag, else as UTF-8. `page_url` is only used for diagnostics;
/// links are resolved against `base`.
pub fn parse_catalog_page(
    page: &[u8],
    content_type: Option<&str>,
    page_url: &str,
    base: &Url,
) -> Result<Vec<CatalogEntry>> {
    let text = page_text(page, content_type);
    let html = HtmlTableParser::new();
    let parsers: [&dyn CatalogParser; 2] = [&html, &MarkdownTableParser];

    for parser in parsers {
        let entries = parser.parse(&text, base);
        if !entries.is_empty() {
            debug!(parser = parser.name(), entries = entries.len(), "parsed catalog page");
            return Ok(entries);
        }
        trace!(parser = parser.name(), "layout not recognised");
    }

    Err(Error::CatalogLayout {
        url: page_url.to_string(),
    })
}

/// Charset declared by the `Content-Type` header or the page's `<meta>` tag.
fn declared_encoding(page: &[u8], content_type: Option<&str>) -> Option<&'static Encoding> {
    let from_header = content_type
        .and_then(|ct| HEADER_CHARSET.captures(ct))
        .and_then(|c| Encoding::for_label(c[1].as_bytes()));
    from_header.or_else(|| {
        let head = &page[..page.len().min(4096)];
        META_CHARSET
            .captures(head)
            .and_then(|c| Encoding::for_label(&c[1]))
    })
}

/// Page body as text. A byte-order mark wins over any declaration.
fn page_text<'a>(page: &'a [u8], content_type: Option<&str>) -> Cow<'a, str> {
    let encoding = declared_encoding(page, content_type).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(page);
    if had_errors {
        warn!(encoding = used.name(), "catalog page has malformed bytes");
    }
    debug!(encoding = used.name(), "decoded catalog page");
    text
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_ru_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d.%m.%Y").ok()
}

/// Declared record count, `0` when the page omits it.
fn record_count(text: &str) -> u32 {
    RECORD_COUNT
        .captures(text)
        .and_then(|c| {
            c[1].chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .ok()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.pochta.ru").unwrap()
    }

    #[test]
    fn test_record_count() {
        assert_eq!(record_count("NPIndx 1520 записей"), 1520);
        assert_eq!(record_count("42 081 записи"), 42081);
        assert_eq!(record_count("1\u{a0}234 Записей"), 1234);
        assert_eq!(record_count("скачать"), 0);
        // a year in the link text is not a thousands group
        assert_eq!(record_count("Обновление 2024 312 записей"), 312);
        assert_eq!(record_count("справочник 2024 42 410 записей"), 42410);
    }

    #[test]
    fn test_html_row_with_year_before_count() {
        let page = r#"<table><tr>
              <td>05.02.2024</td><td>3</td>
              <td><a href="/NPIndx3.zip">Обновление 2024</a> 312 записей</td>
              <td><a href="/PIndx3.zip">Справочник</a> 42 410 записей</td>
            </tr></table>"#;
        let entries = HtmlTableParser::new().parse(page, &base());
        assert_eq!(entries[0].update.records, 312);
        assert_eq!(entries[0].full.records, 42410);
    }

    fn cp1251_page(meta: &str) -> Vec<u8> {
        let page = format!(
            r#"<html><head>{meta}</head><body><table><tr>
              <td>05.02.2024</td><td>3</td>
              <td><a href="/NPIndx3.zip">скачать</a> 312 записей</td>
              <td><a href="/PIndx3.zip">скачать</a> 42 410 записей</td>
            </tr></table></body></html>"#
        );
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1251.encode(&page);
        assert!(!unmappable);
        bytes.into_owned()
    }

    #[test]
    fn test_page_charset_from_meta() {
        for meta in [
            r#"<meta charset="windows-1251">"#,
            r#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251">"#,
        ] {
            let page = cp1251_page(meta);
            let entries = parse_catalog_page(&page, None, "https://www.pochta.ru/database/ops", &base()).unwrap();
            assert_eq!(entries[0].update.records, 312, "{meta}");
            assert_eq!(entries[0].full.records, 42410, "{meta}");
        }
    }

    #[test]
    fn test_page_charset_from_content_type() {
        let page = cp1251_page("");
        let entries = parse_catalog_page(
            &page,
            Some("text/html; charset=windows-1251"),
            "https://www.pochta.ru/database/ops",
            &base(),
        )
        .unwrap();
        assert_eq!(entries[0].full.records, 42410);

        // undeclared cp1251 falls back to UTF-8 and loses the counts
        let entries = parse_catalog_page(&page, None, "https://www.pochta.ru/database/ops", &base()).unwrap();
        assert_eq!(entries[0].full.records, 0);
    }

    #[test]
    fn test_page_text_defaults_to_utf8() {
        let page = "<p>42 410 записей</p>".as_bytes();
        assert_eq!(page_text(page, None), "<p>42 410 записей</p>");
        assert_eq!(page_text(page, Some("text/html")), "<p>42 410 записей</p>");
    }

    #[test]
    fn test_html_row_with_relative_links() {
        let page = r#"<table>
            <tr><td>Дата</td><td>№</td><td>Обновление</td><td>Справочник</td></tr>
            <tr>
              <td> 05.02.2024 </td>
              <td>3</td>
              <td><a href="/documents/10231/NPIndx3.zip">скачать</a> 312 записей</td>
              <td><a href="https://cdn.example.test/PIndx3.zip">скачать</a> 42 410 записей</td>
            </tr>
        </table>"#;
        let entries = HtmlTableParser::new().parse(page, &base());
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
        assert_eq!(e.number, "3");
        assert_eq!(e.update.url, "https://www.pochta.ru/documents/10231/NPIndx3.zip");
        assert_eq!(e.update.records, 312);
        assert_eq!(e.full.url, "https://cdn.example.test/PIndx3.zip");
        assert_eq!(e.full.records, 42410);
    }

    #[test]
    fn test_markdown_row() {
        let page = "| Дата | № | Обновление | Справочник |\n\
                    |---|---|---|---|\n\
                    | 01.03.2024 | 7 | [NPIndx](/upd/NPIndx7.zip) 15 записей | [PIndx](/full/PIndx7.zip) 42000 записей |\n";
        let entries = MarkdownTableParser.parse(page, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].number, "7");
        assert_eq!(entries[0].update.url, "https://www.pochta.ru/upd/NPIndx7.zip");
        assert_eq!(entries[0].full.records, 42000);
    }

    #[test]
    fn test_unrecognised_page_is_an_error() {
        let page = b"<html><body><p>Technical works</p></body></html>";
        let err = parse_catalog_page(page, None, "https://www.pochta.ru/database/ops", &base()).unwrap_err();
        match err {
            Error::CatalogLayout { url } => assert_eq!(url, "https://www.pochta.ru/database/ops"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

//! Bulk-file source: pre-parsed catalog exports.
//!
//! The whole parsed set is one very large "page" that the batch scheduler
//! slices; there is no pagination and no resume cursor — a file run is
//! all-or-nothing. Files are parsed eagerly at load time so a run never
//! stalls on disk mid-flight.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shopwarden_model::{Item, SessionKind};
use tracing::warn;

use crate::error::{PatrolError, Result};
use crate::source::{ItemPage, ItemSource, SourceDescriptor};

/// Text encoding of a bulk export. Storefront back-office exports still
/// ship as Shift_JIS more often than not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkEncoding {
    Utf8,
    #[default]
    ShiftJis,
}

impl BulkEncoding {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        match self {
            BulkEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|err| format!("invalid UTF-8: {err}")),
            BulkEncoding::ShiftJis => {
                let (decoded, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
                if had_errors {
                    Err("undecodable Shift_JIS byte sequence".to_string())
                } else {
                    Ok(decoded.into_owned())
                }
            }
        }
    }
}

impl std::str::FromStr for BulkEncoding {
    type Err = PatrolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(BulkEncoding::Utf8),
            "shift_jis" | "shift-jis" | "sjis" => Ok(BulkEncoding::ShiftJis),
            other => Err(PatrolError::Parse(format!("unknown encoding: {other}"))),
        }
    }
}

/// Bulk catalog export source: one materialized page.
#[derive(Debug)]
pub struct BulkFileSource {
    items: Vec<Item>,
    file_names: Vec<String>,
    warnings: Vec<String>,
}

impl BulkFileSource {
    /// Parse `paths` into items. `name_column` picks the header column that
    /// supplies the item name; when absent the header is searched for a
    /// column named like a product name. A file that fails to read, decode,
    /// or parse is skipped with a warning; the rest of the run continues.
    pub fn load(paths: &[PathBuf], encoding: BulkEncoding, name_column: Option<usize>) -> Self {
        let mut items = Vec::new();
        let mut file_names = Vec::new();
        let mut warnings = Vec::new();

        for path in paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match parse_file(path, encoding, name_column) {
                Ok(mut rows) => {
                    items.append(&mut rows);
                    file_names.push(file_name);
                }
                Err(err) => {
                    warn!(file = %file_name, error = %err, "skipping unreadable bulk file");
                    warnings.push(format!("{file_name}: {err}"));
                }
            }
        }

        Self {
            items,
            file_names,
            warnings,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[async_trait]
impl ItemSource for BulkFileSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            kind: SessionKind::BulkFile,
            target: self.file_names.join(","),
            shop_name: None,
        }
    }

    async fn next_page(&self, cursor: u32) -> Result<ItemPage> {
        // The whole set is a single page; anything past it is empty.
        if cursor > 0 {
            return Ok(ItemPage::default());
        }
        Ok(ItemPage {
            items: self.items.clone(),
            has_more: false,
            warnings: self.warnings.clone(),
        })
    }
}

fn parse_file(
    path: &Path,
    encoding: BulkEncoding,
    name_column: Option<usize>,
) -> std::result::Result<Vec<Item>, String> {
    let bytes = std::fs::read(path).map_err(|err| format!("read failed: {err}"))?;
    let text = encoding.decode(&bytes)?;
    parse_rows(&text, name_column, &path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
}

fn parse_rows(
    text: &str,
    name_column: Option<usize>,
    source_reference: &str,
) -> std::result::Result<Vec<Item>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let header = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(err)) => return Err(format!("unreadable header row: {err}")),
        None => return Err("file is empty".to_string()),
    };

    let name_idx = match name_column {
        Some(idx) => idx,
        None => detect_name_column(&header),
    };

    let mut items = Vec::new();
    for record in records {
        let record = record.map_err(|err| format!("unreadable row: {err}"))?;
        let name = record.get(name_idx).unwrap_or("").to_string();
        items.push(Item::bare(name, source_reference));
    }

    Ok(items)
}

/// Pick the header column that carries the product name; first column when
/// nothing matches, mirroring how operators lay these exports out.
fn detect_name_column(header: &csv::StringRecord) -> usize {
    header
        .iter()
        .position(|h| h.contains("商品名") || h.contains("Name"))
        .unwrap_or(0)
}

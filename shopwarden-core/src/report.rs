//! CSV export of patrol results.
//!
//! Output is BOM-prefixed UTF-8 so spreadsheet tools on operator machines
//! pick the encoding up without prompting.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use shopwarden_model::ScoredItem;

use crate::error::{PatrolError, Result};

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

const HEADER: [&str; 7] = [
    "name",
    "risk",
    "critical",
    "reason",
    "listing_url",
    "session_date",
    "operator",
];

/// Write results as CSV to an arbitrary writer (no BOM; see
/// [`export_csv`] for the file variant operators consume).
pub fn write_csv<W: Write>(
    writer: W,
    results: &[ScoredItem],
    operator: &str,
    session_date: DateTime<Utc>,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let date = session_date.format("%Y-%m-%d").to_string();

    csv_writer
        .write_record(HEADER)
        .map_err(csv_error)?;

    for scored in results {
        csv_writer
            .write_record([
                scored.item.name.as_str(),
                scored.verdict.risk_level.as_str(),
                if scored.verdict.is_critical { "critical" } else { "" },
                scored.verdict.reason.as_str(),
                scored.item.detail_url.as_deref().unwrap_or(""),
                date.as_str(),
                operator,
            ])
            .map_err(csv_error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Export results to a BOM-prefixed CSV file.
pub fn export_csv(
    path: &Path,
    results: &[ScoredItem],
    operator: &str,
    session_date: DateTime<Utc>,
) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(&BOM)?;
    write_csv(file, results, operator, session_date)
}

fn csv_error(err: csv::Error) -> PatrolError {
    PatrolError::Internal(format!("csv write failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopwarden_model::{Item, RiskLevel, Verdict};

    fn sample() -> Vec<ScoredItem> {
        vec![ScoredItem {
            item: Item {
                name: "parody \"brand\" tee".into(),
                image_url: None,
                source_reference: "https://shop".into(),
                detail_url: Some("https://shop/item/1".into()),
                price: Some(1980),
                shop_name: None,
            },
            verdict: Verdict::new(RiskLevel::High, true, "counterfeit logo"),
        }]
    }

    #[test]
    fn writes_header_and_quoted_rows() {
        let mut out = Vec::new();
        write_csv(&mut out, &sample(), "tanaka", Utc::now()).expect("write");
        let text = String::from_utf8(out).expect("utf8");

        let mut lines = text.lines();
        assert_eq!(
            lines.next().expect("header"),
            "name,risk,critical,reason,listing_url,session_date,operator"
        );
        let row = lines.next().expect("row");
        assert!(row.contains("\"parody \"\"brand\"\" tee\""));
        assert!(row.contains("high"));
        assert!(row.contains("critical"));
        assert!(row.contains("tanaka"));
    }

    #[test]
    fn exported_file_starts_with_a_bom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.csv");
        export_csv(&path, &sample(), "tanaka", Utc::now()).expect("export");

        let bytes = std::fs::read(&path).expect("read");
        assert_eq!(&bytes[..3], &BOM);
    }
}

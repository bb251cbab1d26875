//! Manifest export as JSON or CSV

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use keyward_fs::io;

use crate::error::Result;
use crate::manifest::KeyRecord;

const CSV_HEADER: [&str; 8] = [
    "name",
    "provider",
    "created_at",
    "resident",
    "application",
    "comment",
    "public_key_path",
    "private_key_path",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format '{other}' (expected json or csv)")),
        }
    }
}

/// Render `records` in `format`.
///
/// JSON is a list of records in manifest form; CSV has one header row and
/// one row per record.
pub fn render_export(records: &[KeyRecord], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            let mut out = serde_json::to_string_pretty(records)?;
            out.push('\n');
            Ok(out)
        }
        ExportFormat::Csv => Ok(render_csv(records)),
    }
}

/// Render and write atomically to `output`.
pub fn export_keys(records: &[KeyRecord], format: ExportFormat, output: &Path) -> Result<()> {
    let content = render_export(records, format)?;
    io::write_text(output, &content)?;
    tracing::info!(path = %output.display(), %format, keys = records.len(), "exported keys");
    Ok(())
}

fn render_csv(records: &[KeyRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER);
    for record in records {
        let created_at = record.created_at.to_rfc3339();
        let resident = record.is_resident().to_string();
        push_row(
            &mut out,
            [
                record.name.as_str(),
                record.provider().as_str(),
                created_at.as_str(),
                resident.as_str(),
                record.application().unwrap_or(""),
                record.comment.as_str(),
                record.public_key_path.as_str(),
                record.private_key_path.as_str(),
            ],
        );
    }
    out
}

fn push_row<const N: usize>(out: &mut String, fields: [&str; N]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(field));
    }
    out.push_str("\r\n");
}

/// Quote per RFC 4180 when the field contains a delimiter, quote or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

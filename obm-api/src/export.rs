//! CSV/JSON export building
//!
//! Exports are download attachments: CSV as UTF-8 with a BOM so spreadsheet
//! imports pick up the encoding, JSON pretty-printed.

use axum::http::{header, StatusCode};
use axum::response::Response;

/// UTF-8 byte order mark
const BOM: &str = "\u{FEFF}";

/// Quote a CSV field when it contains a separator, quote, or newline
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render header + rows as a CSV document
pub fn to_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::from(BOM);
    out.push_str(
        &headers
            .iter()
            .map(|h| csv_escape(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|f| csv_escape(f))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    out
}

/// Build a CSV download response
pub fn csv_response(filename: &str, body: String) -> Response {
    attachment_response(filename, "text/csv; charset=utf-8", body)
}

/// Build a pretty-printed JSON download response
pub fn json_response(filename: &str, value: &serde_json::Value) -> Response {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    attachment_response(filename, "application/json; charset=utf-8", body)
}

fn attachment_response(filename: &str, content_type: &str, body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body.into())
        .expect("Failed to build response")
}

//! Output formatting for CLI display.

use crate::model::LogRecord;
use crate::viewer::status_glyph;

/// One line per record: `<glyph> <KIND>  <id>  <timestamp>  <url>`.
pub(super) fn format_summary_line(record: &LogRecord) -> String {
    format!(
        "{} {:<6}  {}  {}  {}",
        status_glyph(record.status()),
        record.kind.as_str().to_uppercase(),
        record.id,
        record.timestamp,
        record.url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    use crate::model::CeremonyKind;

    #[test]
    fn summary_line_layout() {
        let mut record = LogRecord::pending(CeremonyKind::Get, "https://example.com/", Value::Null);
        record.id = "lx1abc-11111111".into();
        record.timestamp = "2024-05-01T12:00:00Z".parse().unwrap();
        let record = record.settled_err("NotAllowedError: denied");

        assert_eq!(
            format_summary_line(&record),
            "✗ GET     lx1abc-11111111  2024-05-01T12:00:00Z  https://example.com/"
        );
    }
}

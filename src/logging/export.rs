use crate::error::Result;
use crate::types::{iso_millis, ExportFormat, LogEntry};

const CSV_HEADERS: [&str; 6] = ["Timestamp", "Level", "Context", "Message", "Data", "URL"];

/// Renders entries in the requested format.
///
/// # Errors
///
/// Returns an error if an entry cannot be serialized.
pub fn render(entries: &[LogEntry], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(entries),
        ExportFormat::Csv => to_csv(entries),
    }
}

pub fn to_json(entries: &[LogEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Header row plus one row per entry, every cell wrapped in double quotes.
/// An empty set renders as an empty string.
pub fn to_csv(entries: &[LogEntry]) -> Result<String> {
    if entries.is_empty() {
        return Ok(String::new());
    }

    let mut rows = Vec::with_capacity(entries.len() + 1);
    rows.push(quote_row(CSV_HEADERS.iter().map(|h| h.to_string())));
    for entry in entries {
        let cells = [
            iso_millis::format(&entry.timestamp),
            entry.level.to_string(),
            entry.context.clone(),
            entry.message.clone(),
            serde_json::to_string(&entry.data)?,
            entry.url.clone(),
        ];
        rows.push(quote_row(cells.into_iter()));
    }
    Ok(rows.join("\n"))
}

fn quote_row(cells: impl Iterator<Item = String>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, LogData};
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn entry() -> LogEntry {
        let mut data = LogData::new();
        data.insert("plan".into(), json!("pro"));
        LogEntry {
            timestamp: DateTime::parse_from_rfc3339("2024-03-04T05:06:07.089Z")
                .unwrap()
                .with_timezone(&Utc),
            session_id: "session_test".into(),
            level: Level::Warn,
            context: "ROI".into(),
            message: "rate, capped".into(),
            data,
            error: None,
            url: "https://example.com/".into(),
            user_agent: String::new(),
        }
    }

    #[test]
    fn empty_csv_is_empty_string() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn csv_quotes_every_cell() {
        let csv = to_csv(&[entry()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#""Timestamp","Level","Context","Message","Data","URL""#
        );
        assert_eq!(
            lines[1],
            r#""2024-03-04T05:06:07.089Z","WARN","ROI","rate, capped","{"plan":"pro"}","https://example.com/""#
        );
    }

    #[test]
    fn json_export_parses_back() {
        let json = render(&[entry()], ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![entry()]);
    }
}

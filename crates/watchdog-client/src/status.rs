//! Status response rows.
//!
//! The status operation returns newline-delimited rows, each tab-separated.
//! The canonical row is `status\texpires\tname\treason`; rows with five or
//! more fields carry cumulative downtime (integer seconds) in the fourth
//! field with the reason following it. Rows with fewer than four fields are
//! a parse error. Rows are server-observed truth, distinct from the local
//! action records kept by the report engine.

use std::time::Duration;

use crate::error::{Result, WatchdogError};

/// Status value reported for a healthy, unexpired watchdog.
pub const STATUS_GOOD: &str = "KGOOD";

/// One watchdog as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Status code, e.g. `KGOOD`.
    pub status: String,
    /// Expiry timestamp text, passed through verbatim.
    pub expires: String,
    /// Full watchdog name.
    pub name: String,
    /// Cumulative downtime, when the service reports it.
    pub cum_downtime: Option<Duration>,
    /// Free-text reason, empty for healthy watchdogs.
    pub reason: String,
}

impl StatusRow {
    pub fn is_good(&self) -> bool {
        self.status == STATUS_GOOD
    }
}

/// Parse a status response body. Stops at end of input; no trailing
/// delimiter is required. Blank lines are ignored.
pub fn parse_status_body(body: &str) -> Result<Vec<StatusRow>> {
    let mut rows = Vec::new();
    for line in body.lines() {
        if line.is_empty() {
            continue;
        }
        rows.push(parse_row(line)?);
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Result<StatusRow> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(WatchdogError::parse(format!(
            "status row has {} fields, expected at least 4: {line:?}",
            fields.len()
        )));
    }
    let (cum_downtime, reason) = if fields.len() >= 5 {
        let secs: u64 = fields[3].parse().map_err(|_| {
            WatchdogError::parse(format!(
                "cumulative downtime {:?} is not integer seconds",
                fields[3]
            ))
        })?;
        (Some(Duration::from_secs(secs)), fields[4..].join("\t"))
    } else {
        (None, fields[3].to_string())
    };
    Ok(StatusRow {
        status: fields[0].to_string(),
        expires: fields[1].to_string(),
        name: fields[2].to_string(),
        cum_downtime,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_field_row_empty_reason() {
        let rows = parse_status_body("KGOOD\t2024-01-01T00:00:00Z\tsvc.service\t\n").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.status, "KGOOD");
        assert_eq!(row.expires, "2024-01-01T00:00:00Z");
        assert_eq!(row.name, "svc.service");
        assert_eq!(row.reason, "");
        assert_eq!(row.cum_downtime, None);
        assert!(row.is_good());
    }

    #[test]
    fn test_no_trailing_newline_required() {
        let rows = parse_status_body("KGOOD\tnever\tsvc.service\tok").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason, "ok");
    }

    #[test]
    fn test_five_field_row_carries_downtime() {
        let rows =
            parse_status_body("KEXPIRED\t2024-01-01T00:00:00Z\thost.sd.etcd\t3723\tnot observed\n")
                .unwrap();
        let row = &rows[0];
        assert_eq!(row.cum_downtime, Some(Duration::from_secs(3723)));
        assert_eq!(row.reason, "not observed");
        assert!(!row.is_good());
    }

    #[test]
    fn test_multiple_rows() {
        let body = "KGOOD\tt1\ta.b\t\nKFAULT\tt2\tc.d\t120\tonly up since 2024-01-01\n";
        let rows = parse_status_body(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "a.b");
        assert_eq!(rows[1].cum_downtime, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_short_row_is_parse_error() {
        let err = parse_status_body("KGOOD\tt1\n").unwrap_err();
        assert!(matches!(err, WatchdogError::Parse(_)));
    }

    #[test]
    fn test_bad_downtime_is_parse_error() {
        let err = parse_status_body("KGOOD\tt1\ta.b\tlots\tdown\n").unwrap_err();
        assert!(err.to_string().contains("integer seconds"));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let rows = parse_status_body("\nKGOOD\tt1\ta.b\t\n\n").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_tabs_in_reason_preserved() {
        let rows = parse_status_body("KFAULT\tt1\ta.b\t5\tdown\tsince\tnoon\n").unwrap();
        assert_eq!(rows[0].reason, "down\tsince\tnoon");
    }
}

//! Plugin output: the status line with performance data, optional long
//! output, and the `--json` document.
//!
//! Colors come from the `console` crate, which drops them when stdout is not
//! a terminal, so monitoring systems always see plain text.

use console::style;
use domain_expiry_lib::{ExpirationReport, ExpiryError};
use serde::Serialize;

use crate::threshold::{Status, Thresholds};

/// Check name prefixed to every status line.
pub const CHECK_NAME: &str = "DOMAIN_EXPIRATION";

/// Performance data label of the metric.
pub const METRIC: &str = "daystoexpiration";

fn styled_status(status: Status) -> String {
    let label = style(status.label()).bold();
    match status {
        Status::Ok => label.green().to_string(),
        Status::Warning => label.yellow().to_string(),
        Status::Critical => label.red().to_string(),
        Status::Unknown => label.magenta().to_string(),
    }
}

/// `daystoexpiration=42d;@15:30;@~:15`
pub fn perfdata(days: i64, thresholds: &Thresholds) -> String {
    format!(
        "{}={}d;{};{}",
        METRIC, days, thresholds.warning, thresholds.critical
    )
}

/// Status line for a resolved domain.
pub fn status_line(status: Status, days: i64, thresholds: &Thresholds) -> String {
    format!(
        "{} {} - {} days until domain expires | {}",
        CHECK_NAME,
        styled_status(status),
        days,
        perfdata(days, thresholds)
    )
}

/// Status line for a check that could not produce a metric.
pub fn unknown_line(message: &str) -> String {
    format!("{} {} - {}", CHECK_NAME, styled_status(Status::Unknown), message)
}

/// Extra lines printed below the status line with `-v`.
pub fn long_output(report: &ExpirationReport) -> Vec<String> {
    let mut lines = vec![
        format!("domain: {}", report.domain),
        format!("expiration date: {}", report.expiration_date),
        format!("RDAP server: {}", report.rdap_server),
    ];
    if report.ascii_domain != report.domain {
        lines.insert(1, format!("ASCII domain: {}", report.ascii_domain));
    }
    if let Some(registrar) = &report.registrar {
        lines.push(format!("registrar: {}", registrar));
    }
    lines
}

/// Machine-readable result for `--json`.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a ExpirationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JsonError<'a> {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<&'a str>,
}

impl<'a> JsonOutput<'a> {
    pub fn success(status: Status, report: &'a ExpirationReport, thresholds: &Thresholds) -> Self {
        Self {
            status: status.label(),
            report: Some(report),
            error: None,
            warning: Some(thresholds.warning.to_string()),
            critical: Some(thresholds.critical.to_string()),
        }
    }

    /// `thresholds` is `None` when the failure happened before they were known.
    pub fn failure(error: &'a ExpiryError, thresholds: Option<&Thresholds>) -> Self {
        Self {
            status: Status::Unknown.label(),
            report: None,
            error: Some(JsonError {
                kind: error.kind(),
                message: error.to_string(),
                raw_body: error.raw_body(),
            }),
            warning: thresholds.map(|t| t.warning.to_string()),
            critical: thresholds.map(|t| t.critical.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn report() -> ExpirationReport {
        ExpirationReport {
            domain: "bücher.example".to_string(),
            ascii_domain: "xn--bcher-kva.example".to_string(),
            days: 42,
            expiration_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            rdap_server: "https://rdap.example/".to_string(),
            registrar: Some("Example Registrar, Inc.".to_string()),
        }
    }

    #[test]
    fn test_status_line_format() {
        console::set_colors_enabled(false);
        let thresholds = Thresholds::from_days(30, 15).unwrap();
        assert_eq!(
            status_line(Status::Ok, 42, &thresholds),
            "DOMAIN_EXPIRATION OK - 42 days until domain expires | daystoexpiration=42d;@15:30;@~:15"
        );
        assert_eq!(
            status_line(Status::Critical, -2, &thresholds),
            "DOMAIN_EXPIRATION CRITICAL - -2 days until domain expires | daystoexpiration=-2d;@15:30;@~:15"
        );
    }

    #[test]
    fn test_unknown_line() {
        console::set_colors_enabled(false);
        assert_eq!(
            unknown_line("The TLD zz does not have an RDAP server"),
            "DOMAIN_EXPIRATION UNKNOWN - The TLD zz does not have an RDAP server"
        );
    }

    #[test]
    fn test_long_output_lists_fallback_details() {
        let lines = long_output(&report());
        assert_eq!(lines[0], "domain: bücher.example");
        assert_eq!(lines[1], "ASCII domain: xn--bcher-kva.example");
        assert_eq!(lines.last().unwrap(), "registrar: Example Registrar, Inc.");
    }

    #[test]
    fn test_json_failure_carries_kind() {
        let thresholds = Thresholds::from_days(30, 15).unwrap();
        let error = ExpiryError::RdapRateLimited {
            server: "https://rdap.example/".to_string(),
        };
        let json = serde_json::to_value(JsonOutput::failure(&error, Some(&thresholds))).unwrap();
        assert_eq!(json["status"], "UNKNOWN");
        assert_eq!(json["error"]["kind"], "rdap_rate_limited");
        assert!(json.get("report").is_none());
        assert_eq!(json["critical"], "@~:15");

        let config = ExpiryError::config("bad timeout");
        let json = serde_json::to_value(JsonOutput::failure(&config, None)).unwrap();
        assert_eq!(json["error"]["kind"], "config_error");
        assert!(json.get("warning").is_none());
    }

    #[test]
    fn test_json_success_embeds_report() {
        let thresholds = Thresholds::from_days(30, 15).unwrap();
        let report = report();
        let json =
            serde_json::to_value(JsonOutput::success(Status::Ok, &report, &thresholds)).unwrap();
        assert_eq!(json["report"]["days"], 42);
        assert_eq!(json["report"]["expiration_date"], "2030-01-01");
        assert_eq!(json["warning"], "@15:30");
    }
}

//! Nagios threshold ranges and status evaluation.
//!
//! A range is written `[@]start:end`. `~` as start means negative infinity,
//! an omitted end means positive infinity and a bare `N` means `0:N`. A value
//! alerts when it lies outside the range, or inside it when the range is
//! prefixed with `@`. Both ends are inclusive.

use std::fmt;
use std::str::FromStr;

/// Plugin status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// Process exit code defined by the monitoring plugin guidelines.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// `None` is negative infinity
    start: Option<i64>,
    /// `None` is positive infinity
    end: Option<i64>,
    /// Alert inside the range instead of outside
    inside: bool,
}

impl Range {
    pub fn new(start: Option<i64>, end: Option<i64>, inside: bool) -> Result<Self, String> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(format!("range start {} is greater than end {}", s, e));
            }
        }
        Ok(Self { start, end, inside })
    }

    fn contains(&self, value: i64) -> bool {
        self.start.map_or(true, |s| value >= s) && self.end.map_or(true, |e| value <= e)
    }

    /// Whether `value` triggers this range.
    pub fn alerts(&self, value: i64) -> bool {
        self.contains(value) == self.inside
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let (inside, body) = match spec.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };

        let parse_bound = |text: &str| {
            text.parse::<i64>()
                .map_err(|_| format!("invalid range bound '{}' in '{}'", text, spec))
        };

        let (start, end) = match body.split_once(':') {
            None => (Some(0), Some(parse_bound(body)?)),
            Some((start, end)) => {
                let start = match start {
                    "~" => None,
                    "" => Some(0),
                    s => Some(parse_bound(s)?),
                };
                let end = match end {
                    "" => None,
                    e => Some(parse_bound(e)?),
                };
                (start, end)
            }
        };

        Self::new(start, end, inside)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inside {
            f.write_str("@")?;
        }
        match (self.start, self.end) {
            (Some(0), Some(end)) if !self.inside => write!(f, "{}", end),
            (start, end) => {
                match start {
                    Some(s) => write!(f, "{}:", s)?,
                    None => f.write_str("~:")?,
                }
                if let Some(e) = end {
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

/// Warning and critical ranges for the `daystoexpiration` metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub warning: Range,
    pub critical: Range,
}

impl Thresholds {
    /// Build the ranges from day counts: warning `@critical:warning`,
    /// critical `@~:critical`.
    pub fn from_days(warning: i64, critical: i64) -> Result<Self, String> {
        let warning_range: Range = format!("@{}:{}", critical, warning).parse().map_err(|_| {
            format!(
                "critical threshold ({} days) must not exceed warning threshold ({} days)",
                critical, warning
            )
        })?;
        Ok(Self {
            warning: warning_range,
            critical: format!("@~:{}", critical).parse()?,
        })
    }

    pub fn evaluate(&self, days: i64) -> Status {
        if self.critical.alerts(days) {
            Status::Critical
        } else if self.warning.alerts(days) {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

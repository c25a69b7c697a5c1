use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive span of timestamps covered by a run's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.date(), self.end.date())
    }
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        DateRange { start, end }
    }

    /// Smallest range covering every timestamp, or `None` for no timestamps.
    pub fn spanning<I>(timestamps: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        timestamps.into_iter().fold(None, |range, ts| match range {
            None => Some(DateRange::new(ts, ts)),
            Some(r) => Some(DateRange::new(r.start.min(ts), r.end.max(ts))),
        })
    }

    pub fn contains(self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Human-facing label for what a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportingPeriod {
    Day { date: NaiveDate },
    Month { year: i32, month: u32 },
    Span { start: NaiveDate, end: NaiveDate },
    Empty,
}

impl ReportingPeriod {
    pub fn infer(range: Option<DateRange>) -> Self {
        let Some(range) = range else {
            return ReportingPeriod::Empty;
        };
        let (start, end) = (range.start.date(), range.end.date());
        if start == end {
            ReportingPeriod::Day { date: start }
        } else if start.year() == end.year() && start.month() == end.month() {
            ReportingPeriod::Month {
                year: start.year(),
                month: start.month(),
            }
        } else {
            ReportingPeriod::Span { start, end }
        }
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingPeriod::Day { date } => write!(
                f,
                "{}年{}月{}日_当日对账",
                date.year(),
                date.month(),
                date.day()
            ),
            ReportingPeriod::Month { year, month } => write!(f, "{year}年{month}月_月度对账"),
            ReportingPeriod::Span { start, end } => write!(
                f,
                "{}月{}日 - {}月{}日_阶段对账",
                start.month(),
                start.day(),
                end.month(),
                end.day()
            ),
            ReportingPeriod::Empty => write!(f, "无数据期间"),
        }
    }
}

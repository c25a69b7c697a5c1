//! Turns raw cells into typed amounts and timestamps.
//!
//! Neither function fails: a dirty amount becomes zero and an unreadable date
//! becomes `None`, which the processors treat as a row-drop condition.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tally_core::{Cell, Money};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_currency_noise, r"[¥￥$元,]");
re!(re_leading_number, r"^([+-]?)(\d+(?:\.\d+)?|\.\d+)");

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y年%m月%d日 %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

/// Largest serial a spreadsheet can hold (9999-12-31).
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

/// Parses a currency cell into cents, returning zero for anything unreadable.
pub fn parse_amount(cell: &Cell) -> Money {
    Money::from_decimal(parse_decimal(cell))
}

/// Like [`parse_amount`] but unrounded, for values that feed further
/// arithmetic before they are rounded once.
pub fn parse_decimal(cell: &Cell) -> Decimal {
    match cell {
        Cell::Number(n) => Decimal::from_f64(*n).unwrap_or_default(),
        Cell::Text(s) => parse_decimal_text(s),
        Cell::Empty | Cell::Date(_) => Decimal::ZERO,
    }
}

pub fn parse_decimal_text(s: &str) -> Decimal {
    let cleaned = re_currency_noise().replace_all(s.trim(), "");
    let mut token = cleaned.trim();

    // Dirty cells like "15 15.00": take the first token that reads as a number.
    if token.contains(char::is_whitespace) {
        if let Some(first) = token.split_whitespace().find(|t| leading_number(t).is_some()) {
            token = first;
        }
    }

    // Accounting exports write negatives as "150-".
    let signed = match token.strip_suffix('-') {
        Some(rest) => format!("-{rest}"),
        None => token.to_string(),
    };

    leading_number(&signed).unwrap_or_default()
}

/// Reads the numeric prefix of `s`, ignoring trailing junk ("12.5abc" → 12.5).
fn leading_number(s: &str) -> Option<Decimal> {
    let caps = re_leading_number().captures(s)?;
    let sign = caps.get(1).map_or("", |m| m.as_str());
    let digits = caps.get(2)?.as_str();
    let sign = if sign == "-" { "-" } else { "" };
    let zero = if digits.starts_with('.') { "0" } else { "" };
    Decimal::from_str(&format!("{sign}{zero}{digits}")).ok()
}

/// Parses a timestamp cell. Numbers are spreadsheet serial dates.
pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => from_serial_date(*n),
        Cell::Text(s) => parse_timestamp_text(s),
        Cell::Empty => None,
    }
}

pub fn parse_timestamp_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// 1900 date system, with the usual 1899-12-30 epoch that absorbs the
/// phantom 1900-02-29.
fn from_serial_date(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

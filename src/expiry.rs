//! Expiry Module
//!
//! Turns the `expires` option into a relative TTL in seconds.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::config::Expires;
use crate::error::{CacheError, Result};

/// TTL value meaning "never expires" for the store.
pub const NO_EXPIRY: i64 = 0;

// == TTL ==
/// Computes the TTL in seconds for `expires`, relative to `now`.
///
/// `Expires::Never` maps to [`NO_EXPIRY`]. An expression resolving to a past
/// instant yields a negative TTL. An expression resolving to `now` itself
/// yields `-1` so that it still reads as expired rather than as "no expiry".
pub fn ttl_seconds(expires: &Expires, now: DateTime<Utc>) -> Result<i64> {
    match expires {
        Expires::Never => Ok(NO_EXPIRY),
        Expires::At(expr) => {
            let target = resolve(expr, now)?;
            let ttl = (target - now).num_seconds();
            Ok(if ttl == NO_EXPIRY { -1 } else { ttl })
        }
    }
}

// == Resolve ==
/// Resolves an absolute-time expression against `now`.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, and
/// sequences of relative terms such as `tomorrow +6 hours` or `-30 minutes`.
pub fn resolve(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(invalid(expr));
    }

    if let Some(absolute) = parse_absolute(trimmed) {
        return Ok(absolute);
    }

    let lowered = trimmed.to_ascii_lowercase();
    let mut tokens = lowered.split_whitespace();
    let mut cursor = now;

    while let Some(token) = tokens.next() {
        cursor = match token {
            "now" => cursor,
            "today" | "midnight" => midnight(cursor).ok_or_else(|| invalid(expr))?,
            "tomorrow" => midnight(cursor)
                .and_then(|m| shift(m, 1, "day"))
                .ok_or_else(|| invalid(expr))?,
            "yesterday" => midnight(cursor)
                .and_then(|m| shift(m, -1, "day"))
                .ok_or_else(|| invalid(expr))?,
            "next" | "last" => {
                let amount = if token == "next" { 1 } else { -1 };
                let unit = tokens.next().ok_or_else(|| invalid(expr))?;
                shift(cursor, amount, unit).ok_or_else(|| invalid(expr))?
            }
            _ => {
                let (amount, attached_unit) = split_amount(token).ok_or_else(|| invalid(expr))?;
                let unit = match attached_unit {
                    Some(unit) => unit,
                    None => tokens.next().ok_or_else(|| invalid(expr))?,
                };
                shift(cursor, amount, unit).ok_or_else(|| invalid(expr))?
            }
        };
    }

    Ok(cursor)
}

fn invalid(expr: &str) -> CacheError {
    CacheError::InvalidArgument(format!("unrecognised expiry expression: {expr:?}"))
}

fn parse_absolute(expr: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(expr) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(expr, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(expr, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn midnight(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    dt.date_naive().and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Splits `+3`, `-2` or `+3days` into a signed amount and an optional unit.
fn split_amount(token: &str) -> Option<(i64, Option<&str>)> {
    let (sign, rest) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => (1, token),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let amount: i64 = rest[..digits_end].parse().ok()?;
    let unit = &rest[digits_end..];
    Some((sign * amount, (!unit.is_empty()).then_some(unit)))
}

fn shift(dt: DateTime<Utc>, amount: i64, unit: &str) -> Option<DateTime<Utc>> {
    let seconds_per_unit = match unit {
        "sec" | "secs" | "second" | "seconds" => 1,
        "min" | "mins" | "minute" | "minutes" => 60,
        "hour" | "hours" => 3_600,
        "day" | "days" => 86_400,
        "week" | "weeks" => 604_800,
        "month" | "months" => return shift_months(dt, amount),
        "year" | "years" => return shift_months(dt, amount.checked_mul(12)?),
        _ => return None,
    };
    let delta = TimeDelta::try_seconds(amount.checked_mul(seconds_per_unit)?)?;
    dt.checked_add_signed(delta)
}

fn shift_months(dt: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        dt.checked_add_months(months)
    } else {
        dt.checked_sub_months(months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_never_is_no_expiry() {
        assert_eq!(ttl_seconds(&Expires::Never, fixed_now()).unwrap(), NO_EXPIRY);
    }

    #[test]
    fn test_plus_one_hour() {
        let ttl = ttl_seconds(&Expires::At("+1 hour".to_string()), fixed_now()).unwrap();
        assert_eq!(ttl, 3_600);
    }

    #[test]
    fn test_compound_relative_terms() {
        let ttl = ttl_seconds(&Expires::At("+1 day +30 minutes".to_string()), fixed_now()).unwrap();
        assert_eq!(ttl, 86_400 + 1_800);

        let ttl = ttl_seconds(&Expires::At("+2hours".to_string()), fixed_now()).unwrap();
        assert_eq!(ttl, 7_200);
    }

    #[test]
    fn test_past_expression_is_negative() {
        let ttl = ttl_seconds(&Expires::At("-10 minutes".to_string()), fixed_now()).unwrap();
        assert_eq!(ttl, -600);
    }

    #[test]
    fn test_now_reads_as_expired() {
        let ttl = ttl_seconds(&Expires::At("now".to_string()), fixed_now()).unwrap();
        assert_eq!(ttl, -1);
    }

    #[test]
    fn test_tomorrow_and_midnight() {
        let now = fixed_now();
        let tomorrow = resolve("tomorrow", now).unwrap();
        assert_eq!(tomorrow, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());

        let midnight = resolve("midnight", now).unwrap();
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());

        let morning = resolve("tomorrow +6 hours", now).unwrap();
        assert_eq!(morning, Utc.with_ymd_and_hms(2024, 3, 16, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_next_and_last() {
        let now = fixed_now();
        assert_eq!(
            resolve("next week", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 22, 10, 30, 0).unwrap()
        );
        assert_eq!(
            resolve("last month", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(
            resolve("+1 year", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_absolute_formats() {
        let now = fixed_now();
        assert_eq!(
            resolve("2024-03-15T11:30:00Z", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 11, 30, 0).unwrap()
        );
        assert_eq!(
            resolve("2024-03-15 12:00:00", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(
            resolve("2024-04-01", now).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_expressions() {
        let now = fixed_now();
        for expr in ["", "soon", "+1 fortnight", "+ hour", "next", "+5"] {
            assert!(
                matches!(resolve(expr, now), Err(CacheError::InvalidArgument(_))),
                "expected {expr:?} to be rejected"
            );
        }
    }
}

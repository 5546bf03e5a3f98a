//! §4.E.3: the `DateTime` family. `east_core::value::DateTime` is a UTC
//! millisecond instant; calendar arithmetic (leap years, month lengths,
//! weekday) is delegated to `chrono`, since no crate in this workspace's own
//! dependency stack does calendar math and hand-rolling the proleptic
//! Gregorian calendar is exactly the kind of thing the pack's own
//! value-model code reaches for a real crate to do.
//!
//! Format/parse directives (`Y`/`M`/`D`/`H`/`h`/`m`/`s`/`S`/`A`/`a`/`dddd`)
//! are "pre-tokenized at build time, then interpreted at runtime" per the
//! contract; this dispatcher only ever sees an already-evaluated pattern
//! string, so it tokenizes on every call rather than caching against a
//! build-time IR node — the same simplification the regex family makes.

use chrono::{Datelike, TimeZone, Timelike, Utc};

use east_core::value::{DateTime, EastString, Value};
use east_core::{EastError, EastResult};

fn want_datetime(v: &Value) -> EastResult<i64> {
    match v {
        Value::DateTime(DateTime(ms)) => Ok(*ms),
        other => Err(EastError::internal(format!("expected DateTime, got {other:?}"))),
    }
}

fn want_int(v: &Value) -> EastResult<i64> {
    match v {
        Value::Integer(n) => Ok(*n),
        other => Err(EastError::internal(format!("expected Integer, got {other:?}"))),
    }
}

fn want_float(v: &Value) -> EastResult<f64> {
    match v {
        Value::Float(f) => Ok(*f),
        other => Err(EastError::internal(format!("expected Float, got {other:?}"))),
    }
}

fn want_string(v: &Value) -> EastResult<&EastString> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(EastError::internal(format!("expected String, got {other:?}"))),
    }
}

fn to_chrono(ms: i64) -> EastResult<chrono::DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| EastError::domain("DateTime value is out of the representable range"))
}

/// §9 Open Question resolution: weekday numbering is 1 = Monday … 7 = Sunday.
fn day_of_week(dt: &chrono::DateTime<Utc>) -> i64 {
    dt.weekday().num_days_from_monday() as i64 + 1
}

enum Token {
    Literal(char),
    Directive(char, usize),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    const DIRECTIVES: &str = "YMDHhmsSAa";
    while i < chars.len() {
        let c = chars[i];
        if DIRECTIVES.contains(c) {
            let start = i;
            while chars.get(i) == Some(&c) {
                i += 1;
            }
            tokens.push(Token::Directive(c, i - start));
        } else {
            tokens.push(Token::Literal(c));
            i += 1;
        }
    }
    tokens
}

fn format_with(dt: &chrono::DateTime<Utc>, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < tokens.len() {
        // `dddd` is four repeats of the literal 'd', which is not one of
        // our directive letters, so detect it as a literal run instead.
        if let Token::Literal('d') = tokens[i] {
            let mut count = 0;
            let mut j = i;
            while let Some(Token::Literal('d')) = tokens.get(j) {
                count += 1;
                j += 1;
            }
            if count == 4 {
                out.push_str(weekday_name(dt));
                i = j;
                continue;
            }
        }
        match &tokens[i] {
            Token::Literal(c) => out.push(*c),
            Token::Directive('Y', n) => out.push_str(&pad(dt.year(), *n)),
            Token::Directive('M', n) => out.push_str(&pad(dt.month() as i32, *n)),
            Token::Directive('D', n) => out.push_str(&pad(dt.day() as i32, *n)),
            Token::Directive('H', n) => out.push_str(&pad(dt.hour() as i32, *n)),
            Token::Directive('h', n) => {
                let h12 = match dt.hour12().1 {
                    0 => 12,
                    other => other,
                };
                out.push_str(&pad(h12 as i32, *n));
            }
            Token::Directive('m', n) => out.push_str(&pad(dt.minute() as i32, *n)),
            Token::Directive('s', n) => out.push_str(&pad(dt.second() as i32, *n)),
            Token::Directive('S', n) => out.push_str(&pad(dt.timestamp_subsec_millis() as i32, *n)),
            Token::Directive('A', _) => out.push_str(if dt.hour12().0 { "PM" } else { "AM" }),
            Token::Directive('a', _) => out.push_str(if dt.hour12().0 { "pm" } else { "am" }),
            Token::Directive(_, _) => {}
        }
        i += 1;
    }
    out
}

fn weekday_name(dt: &chrono::DateTime<Utc>) -> &'static str {
    match dt.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

fn pad(n: i32, width: usize) -> String {
    let s = n.to_string();
    if s.len() >= width {
        s
    } else {
        format!("{}{}", "0".repeat(width - s.len()), s)
    }
}

/// Parses a value formatted by the same token pattern back into an instant.
/// Only the numeric directives and `dddd`/`A`/`a` literals this dispatcher
/// itself produces are accepted; this is a matching interpreter for the
/// directive language, not a general free-form date parser.
fn parse_with(input: &str, tokens: &[Token]) -> EastResult<chrono::DateTime<Utc>> {
    let mut year = 1970i32;
    let mut month = 1u32;
    let mut day = 1u32;
    let mut hour = 0u32;
    let mut minute = 0u32;
    let mut second = 0u32;
    let mut milli = 0u32;
    let mut pm = false;
    let mut saw_12_hour = false;
    let mut rest = input;

    let take_digits = |rest: &mut &str, max: usize| -> EastResult<u32> {
        let n = rest.chars().take(max).take_while(|c| c.is_ascii_digit()).count();
        if n == 0 {
            return Err(EastError::domain("DateTimeParse: expected a digit"));
        }
        let (digits, remainder) = rest.split_at(n);
        *rest = remainder;
        digits.parse().map_err(|_| EastError::domain("DateTimeParse: malformed number"))
    };

    let mut i = 0;
    while i < tokens.len() {
        if let Token::Literal('d') = tokens[i] {
            let mut count = 0;
            let mut j = i;
            while let Some(Token::Literal('d')) = tokens.get(j) {
                count += 1;
                j += 1;
            }
            if count == 4 {
                let name = rest.get(0..rest.find(|c: char| c.is_ascii_digit() || c == ' ').unwrap_or(rest.len()));
                if let Some(name) = name {
                    rest = &rest[name.len()..];
                }
                i = j;
                continue;
            }
        }
        match &tokens[i] {
            Token::Literal(c) => {
                if rest.starts_with(*c) {
                    rest = &rest[c.len_utf8()..];
                } else {
                    return Err(EastError::domain("DateTimeParse: literal mismatch"));
                }
            }
            Token::Directive('Y', n) => year = take_digits(&mut rest, (*n).max(4))? as i32,
            Token::Directive('M', n) => month = take_digits(&mut rest, (*n).max(2))?,
            Token::Directive('D', n) => day = take_digits(&mut rest, (*n).max(2))?,
            Token::Directive('H', n) => hour = take_digits(&mut rest, (*n).max(2))?,
            Token::Directive('h', n) => {
                hour = take_digits(&mut rest, (*n).max(2))?;
                saw_12_hour = true;
            }
            Token::Directive('m', n) => minute = take_digits(&mut rest, (*n).max(2))?,
            Token::Directive('s', n) => second = take_digits(&mut rest, (*n).max(2))?,
            Token::Directive('S', n) => milli = take_digits(&mut rest, (*n).max(3))?,
            Token::Directive('A', _) | Token::Directive('a', _) => {
                let upper = rest.to_uppercase();
                if let Some(stripped) = upper.strip_prefix("PM") {
                    pm = true;
                    rest = &rest[rest.len() - stripped.len()..];
                } else if let Some(stripped) = upper.strip_prefix("AM") {
                    rest = &rest[rest.len() - stripped.len()..];
                } else {
                    return Err(EastError::domain("DateTimeParse: expected AM/PM"));
                }
            }
            Token::Directive(_, _) => {}
        }
        i += 1;
    }
    if saw_12_hour {
        if pm && hour < 12 {
            hour += 12;
        } else if !pm && hour == 12 {
            hour = 0;
        }
    }
    let naive_date = chrono::NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| EastError::domain("DateTimeParse: invalid calendar date"))?;
    let naive_time = chrono::NaiveTime::from_hms_milli_opt(hour, minute, second, milli)
        .ok_or_else(|| EastError::domain("DateTimeParse: invalid time of day"))?;
    Ok(Utc.from_utc_datetime(&naive_date.and_time(naive_time)))
}

pub fn dispatch(name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    Some(match (name, args) {
        ("DateTimeYear", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.year() as i64)),
        ("DateTimeMonth", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.month() as i64)),
        ("DateTimeDay", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.day() as i64)),
        ("DateTimeHour", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.hour() as i64)),
        ("DateTimeMinute", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.minute() as i64)),
        ("DateTimeSecond", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.second() as i64)),
        ("DateTimeMillisecond", [d]) => {
            want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(dt.timestamp_subsec_millis() as i64))
        }
        ("DateTimeDayOfWeek", [d]) => want_datetime(d).and_then(|ms| to_chrono(ms)).map(|dt| Value::Integer(day_of_week(&dt))),

        ("DateTimeAddMilliseconds", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add(want_int(delta)?))))
        })(),
        ("DateTimeSubtractMilliseconds", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_sub(want_int(delta)?))))
        })(),
        ("DateTimeAddSeconds", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add((want_float(delta)? * 1_000.0).round() as i64))))
        })(),
        ("DateTimeAddMinutes", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add((want_float(delta)? * 60_000.0).round() as i64))))
        })(),
        ("DateTimeAddHours", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add((want_float(delta)? * 3_600_000.0).round() as i64))))
        })(),
        ("DateTimeAddDays", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add((want_float(delta)? * 86_400_000.0).round() as i64))))
        })(),
        ("DateTimeAddWeeks", [d, delta]) => (|| {
            Ok(Value::DateTime(DateTime(want_datetime(d)?.wrapping_add((want_float(delta)? * 604_800_000.0).round() as i64))))
        })(),

        ("DateTimeDurationMilliseconds", [a, b]) => (|| {
            Ok(Value::Integer(want_datetime(b)?.wrapping_sub(want_datetime(a)?)))
        })(),
        ("DateTimeDurationSeconds", [a, b]) => (|| {
            Ok(Value::Float((want_datetime(b)? - want_datetime(a)?) as f64 / 1_000.0))
        })(),
        ("DateTimeDurationMinutes", [a, b]) => (|| {
            Ok(Value::Float((want_datetime(b)? - want_datetime(a)?) as f64 / 60_000.0))
        })(),
        ("DateTimeDurationHours", [a, b]) => (|| {
            Ok(Value::Float((want_datetime(b)? - want_datetime(a)?) as f64 / 3_600_000.0))
        })(),
        ("DateTimeDurationDays", [a, b]) => (|| {
            Ok(Value::Float((want_datetime(b)? - want_datetime(a)?) as f64 / 86_400_000.0))
        })(),
        ("DateTimeDurationWeeks", [a, b]) => (|| {
            Ok(Value::Float((want_datetime(b)? - want_datetime(a)?) as f64 / 604_800_000.0))
        })(),

        ("DateTimeFromEpochMilliseconds", [n]) => want_int(n).map(|ms| Value::DateTime(DateTime(ms))),
        ("DateTimeToEpochMilliseconds", [d]) => want_datetime(d).map(Value::Integer),

        ("DateTimeFromComponents", [y, mo, day_, h, mi, s, ms]) => (|| {
            let (y, mo, day_, h, mi, s, ms) = (
                want_int(y)?, want_int(mo)?, want_int(day_)?, want_int(h)?, want_int(mi)?, want_int(s)?, want_int(ms)?,
            );
            let date = chrono::NaiveDate::from_ymd_opt(y as i32, mo as u32, day_ as u32)
                .ok_or_else(|| EastError::domain("DateTimeFromComponents: invalid calendar date"))?;
            let time = chrono::NaiveTime::from_hms_milli_opt(h as u32, mi as u32, s as u32, ms as u32)
                .ok_or_else(|| EastError::domain("DateTimeFromComponents: invalid time of day"))?;
            Ok(Value::DateTime(DateTime(Utc.from_utc_datetime(&date.and_time(time)).timestamp_millis())))
        })(),

        ("DateTimeFormat", [d, pattern]) => (|| {
            let dt = to_chrono(want_datetime(d)?)?;
            let tokens = tokenize(&want_string(pattern)?.to_rust_string());
            Ok(Value::string(format_with(&dt, &tokens)))
        })(),
        ("DateTimeParse", [s, pattern]) => (|| {
            let tokens = tokenize(&want_string(pattern)?.to_rust_string());
            let dt = parse_with(&want_string(s)?.to_rust_string(), &tokens)?;
            Ok(Value::DateTime(DateTime(dt.timestamp_millis())))
        })(),

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(ms: i64) -> Value {
        Value::DateTime(DateTime(ms))
    }

    #[test]
    fn epoch_zero_is_a_thursday() {
        let result = dispatch("DateTimeDayOfWeek", &[dt(0)]).unwrap().unwrap();
        // 1970-01-01 is a Thursday; 1 = Monday, so Thursday = 4.
        assert_eq!(result, Value::Integer(4));
    }

    #[test]
    fn format_then_parse_round_trips() {
        let pattern = Value::string("YYYY-MM-DD HH:mm:ss.SSS");
        let original = dt(1_700_000_000_123);
        let formatted = dispatch("DateTimeFormat", &[original.clone(), pattern.clone()]).unwrap().unwrap();
        let parsed = dispatch("DateTimeParse", &[formatted, pattern]).unwrap().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn from_components_rejects_invalid_date() {
        let args = [
            Value::Integer(2024),
            Value::Integer(2),
            Value::Integer(30),
            Value::Integer(0),
            Value::Integer(0),
            Value::Integer(0),
            Value::Integer(0),
        ];
        let result = dispatch("DateTimeFromComponents", &args).unwrap();
        assert!(matches!(result, Err(EastError::DomainError { .. })));
    }
}

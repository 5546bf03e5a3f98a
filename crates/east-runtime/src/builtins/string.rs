//! §4.E.2: string operators and the `Regex*` family.
//!
//! Pattern precompilation ("implementations MUST precompile once" for a
//! literal pattern) is a concern of whatever builds the IR from source text
//! — by the time a `Builtin` node reaches this dispatcher it has already
//! been evaluated down to plain `Value`s, with no literal/dynamic
//! distinction left to exploit. A host that wants literal patterns compiled
//! once should cache the compiled `Regex` keyed on `(pattern, flags)`
//! upstream of this call; this module compiles fresh per call, which is
//! correct but not maximally fast for a hot literal pattern in a loop.

use east_core::value::{EastString, Value};
use east_core::{EastError, EastResult};

fn want_string(v: &Value) -> EastResult<&EastString> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(EastError::internal(format!("expected String, got {other:?}"))),
    }
}

fn want_int(v: &Value) -> EastResult<i64> {
    match v {
        Value::Integer(n) => Ok(*n),
        other => Err(EastError::internal(format!("expected Integer, got {other:?}"))),
    }
}

fn saturating_range(len: usize, start: i64, end: i64) -> (usize, usize) {
    let clamp = |n: i64| -> usize {
        if n < 0 {
            0
        } else {
            (n as usize).min(len)
        }
    };
    let start = clamp(start);
    let end = clamp(end).max(start);
    (start, end)
}

fn build_regex(pattern: &str, flags: &str) -> EastResult<regex::Regex> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| EastError::domain(format!("invalid regular expression: {e}")))
}

enum ReplToken {
    Literal(String),
    Group(usize),
    Name(String),
}

/// Parses the restricted replacement grammar of §4.E.2: `$$`, `$1`…`$9`…,
/// and `$<name>`. Any other `$`-escape is rejected — this function is the
/// single place that rule is enforced, whether the caller is validating a
/// literal at IR-build time or expanding a dynamic value at run time.
fn parse_replacement(tpl: &str) -> EastResult<Vec<ReplToken>> {
    let chars: Vec<char> = tpl.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }
        if !literal.is_empty() {
            tokens.push(ReplToken::Literal(std::mem::take(&mut literal)));
        }
        i += 1;
        match chars.get(i) {
            Some('$') => {
                tokens.push(ReplToken::Literal("$".to_string()));
                i += 1;
            }
            Some(c) if c.is_ascii_digit() => {
                let start = i;
                while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                tokens.push(ReplToken::Group(digits.parse().unwrap()));
            }
            Some('<') => {
                i += 1;
                let start = i;
                while chars.get(i).is_some_and(|c| *c != '>') {
                    i += 1;
                }
                if chars.get(i) != Some(&'>') {
                    return Err(EastError::domain("unterminated $<name> replacement token"));
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(ReplToken::Name(name));
                i += 1;
            }
            _ => return Err(EastError::domain("invalid $ replacement token; only $$, $1-$9(…) and $<name> are allowed")),
        }
    }
    if !literal.is_empty() {
        tokens.push(ReplToken::Literal(literal));
    }
    Ok(tokens)
}

fn expand_replacement(tokens: &[ReplToken], caps: &regex::Captures) -> String {
    let mut out = String::new();
    for t in tokens {
        match t {
            ReplToken::Literal(s) => out.push_str(s),
            ReplToken::Group(n) => {
                if let Some(m) = caps.get(*n) {
                    out.push_str(m.as_str());
                }
            }
            ReplToken::Name(name) => {
                if let Some(m) = caps.name(name) {
                    out.push_str(m.as_str());
                }
            }
        }
    }
    out
}

/// Byte offset (regex's native unit) to codepoint offset.
fn byte_to_codepoint_index(s: &str, byte_idx: usize) -> i64 {
    s[..byte_idx].chars().count() as i64
}

pub fn dispatch(name: &str, args: &[Value]) -> Option<EastResult<Value>> {
    Some(match (name, args) {
        ("StringConcat", [a, b]) => (|| {
            let (a, b) = (want_string(a)?, want_string(b)?);
            Ok(Value::string(format!("{a}{b}")))
        })(),
        ("StringRepeat", [s, n]) => (|| {
            let (s, n) = (want_string(s)?, want_int(n)?);
            Ok(Value::string(if n <= 0 { String::new() } else { s.to_rust_string().repeat(n as usize) }))
        })(),
        ("StringLength", [s]) => want_string(s).map(|s| Value::Integer(s.len() as i64)),
        ("StringSubstring", [s, start, end]) => (|| {
            let s = want_string(s)?;
            let (start, end) = saturating_range(s.len(), want_int(start)?, want_int(end)?);
            Ok(Value::String(EastString::from_chars(s.chars()[start..end].to_vec())))
        })(),
        ("StringUpperCase", [s]) => {
            want_string(s).map(|s| Value::string(s.to_rust_string().to_uppercase()))
        }
        ("StringLowerCase", [s]) => {
            want_string(s).map(|s| Value::string(s.to_rust_string().to_lowercase()))
        }
        ("StringSplit", [s, delim]) => (|| {
            let (s, delim) = (want_string(s)?, want_string(delim)?);
            let text = s.to_rust_string();
            if text.is_empty() {
                return Ok(Value::new_array(vec![Value::string("")]));
            }
            let parts: Vec<Value> = if delim.is_empty() {
                text.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                text.split(delim.to_rust_string().as_str()).map(Value::string).collect()
            };
            Ok(Value::new_array(parts))
        })(),
        ("StringTrim", [s]) => want_string(s).map(|s| Value::string(s.to_rust_string().trim())),
        ("StringTrimStart", [s]) => {
            want_string(s).map(|s| Value::string(s.to_rust_string().trim_start()))
        }
        ("StringTrimEnd", [s]) => want_string(s).map(|s| Value::string(s.to_rust_string().trim_end())),
        ("StringStartsWith", [s, needle]) => (|| {
            let (s, needle) = (want_string(s)?, want_string(needle)?);
            Ok(Value::Boolean(s.to_rust_string().starts_with(needle.to_rust_string().as_str())))
        })(),
        ("StringEndsWith", [s, needle]) => (|| {
            let (s, needle) = (want_string(s)?, want_string(needle)?);
            Ok(Value::Boolean(s.to_rust_string().ends_with(needle.to_rust_string().as_str())))
        })(),
        ("StringContains", [s, needle]) => (|| {
            let (s, needle) = (want_string(s)?, want_string(needle)?);
            Ok(Value::Boolean(s.to_rust_string().contains(needle.to_rust_string().as_str())))
        })(),
        ("StringIndexOf", [s, needle]) => (|| {
            let (s, needle) = (want_string(s)?, want_string(needle)?);
            if needle.is_empty() {
                return Ok(Value::Integer(0));
            }
            let text = s.to_rust_string();
            match text.find(needle.to_rust_string().as_str()) {
                Some(byte_idx) => Ok(Value::Integer(byte_to_codepoint_index(&text, byte_idx))),
                None => Ok(Value::Integer(-1)),
            }
        })(),
        ("StringReplace", [s, from, to]) => (|| {
            let (s, from, to) = (want_string(s)?, want_string(from)?, want_string(to)?);
            if from.is_empty() {
                return Ok(Value::String(s.clone()));
            }
            Ok(Value::string(s.to_rust_string().replace(from.to_rust_string().as_str(), &to.to_rust_string())))
        })(),
        ("StringEncodeUtf8", [s]) => {
            want_string(s).map(|s| Value::Blob(east_core::value::Blob::from_bytes(s.to_rust_string().into_bytes())))
        }
        ("StringEncodeUtf16", [s]) => want_string(s).map(|s| {
            let mut bytes = vec![0xFFu8, 0xFE]; // UTF-16LE BOM
            for unit in s.to_rust_string().encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            Value::Blob(east_core::value::Blob::from_bytes(bytes))
        }),

        ("RegexContains", [s, pattern, flags]) => (|| {
            let (s, pattern, flags) = (want_string(s)?, want_string(pattern)?, want_string(flags)?);
            let re = build_regex(&pattern.to_rust_string(), &flags.to_rust_string())?;
            Ok(Value::Boolean(re.is_match(&s.to_rust_string())))
        })(),
        ("RegexIndexOf", [s, pattern, flags]) => (|| {
            let (s, pattern, flags) = (want_string(s)?, want_string(pattern)?, want_string(flags)?);
            let text = s.to_rust_string();
            let re = build_regex(&pattern.to_rust_string(), &flags.to_rust_string())?;
            match re.find(&text) {
                Some(m) => Ok(Value::Integer(byte_to_codepoint_index(&text, m.start()))),
                None => Ok(Value::Integer(-1)),
            }
        })(),
        ("RegexReplace", [s, pattern, flags, replacement]) => (|| {
            let (s, pattern, flags, replacement) =
                (want_string(s)?, want_string(pattern)?, want_string(flags)?, want_string(replacement)?);
            let re = build_regex(&pattern.to_rust_string(), &flags.to_rust_string())?;
            let tokens = parse_replacement(&replacement.to_rust_string())?;
            let text = s.to_rust_string();
            // The global flag is mandatory for RegexReplace (§4.E.2): every
            // match is replaced, never just the first.
            let mut out = String::new();
            let mut last = 0;
            for caps in re.captures_iter(&text) {
                let m = caps.get(0).expect("capture 0 is always present");
                out.push_str(&text[last..m.start()]);
                out.push_str(&expand_replacement(&tokens, &caps));
                last = m.end();
            }
            out.push_str(&text[last..]);
            Ok(Value::string(out))
        })(),

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_empty_delimiter_splits_into_codepoints() {
        let result = dispatch("StringSplit", &[Value::string("abc"), Value::string("")]).unwrap().unwrap();
        assert_eq!(result, Value::new_array(vec![Value::string("a"), Value::string("b"), Value::string("c")]));
    }

    #[test]
    fn split_on_empty_input_yields_single_empty_string() {
        let result = dispatch("StringSplit", &[Value::string(""), Value::string(",")]).unwrap().unwrap();
        assert_eq!(result, Value::new_array(vec![Value::string("")]));
    }

    #[test]
    fn index_of_with_empty_needle_is_zero() {
        let result = dispatch("StringIndexOf", &[Value::string("abc"), Value::string("")]).unwrap().unwrap();
        assert_eq!(result, Value::Integer(0));
    }

    #[test]
    fn regex_replace_rejects_unknown_dollar_escape() {
        let result = dispatch(
            "RegexReplace",
            &[Value::string("a1b2"), Value::string(r"\d"), Value::string(""), Value::string("$x")],
        )
        .unwrap();
        assert!(matches!(result, Err(EastError::DomainError { .. })));
    }

    #[test]
    fn regex_replace_substitutes_every_match() {
        let result = dispatch(
            "RegexReplace",
            &[Value::string("a1b2c3"), Value::string(r"\d"), Value::string(""), Value::string("[$0]")],
        )
        .unwrap()
        .unwrap();
        assert_eq!(result, Value::string("a[1]b[2]c[3]"));
    }
}

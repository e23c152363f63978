//! Locale-tolerant numeric coercion for price cells

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::reader::Value;

/// Currency marks stripped before parsing, longest first
const CURRENCY_MARKS: [&str; 8] = ["RMB", "rmb", "CNY", "cny", "¥", "￥", "$", "元"];

/// Coerce a cell to a decimal price. Returns `None` for anything that is not
/// a finite number after normalization.
pub fn parse_price(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) if n.is_finite() => Decimal::from_f64(*n),
        Value::Text(s) => parse_decimal_text(s),
        _ => None,
    }
}

/// Parse price text such as `¥1,234.50`, `12,50`, `１２.５` or `35 元`
pub fn parse_decimal_text(raw: &str) -> Option<Decimal> {
    let mut text: String = raw.trim().chars().map(to_half_width).collect();
    for mark in CURRENCY_MARKS {
        text = text.replace(mark, "");
    }
    // Spaces, NBSP and apostrophes show up as thousands separators
    text.retain(|c| !c.is_whitespace() && c != '\'');

    let mut normalized = normalize_separators(&text)?;
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    } else if normalized.starts_with("-.") || normalized.starts_with("+.") {
        normalized.insert(1, '0');
    }

    if !number_pattern().is_match(&normalized) {
        return None;
    }

    let unsigned = normalized.strip_prefix('+').unwrap_or(&normalized);
    if unsigned.contains(['e', 'E']) {
        Decimal::from_scientific(unsigned).ok()
    } else {
        Decimal::from_str(unsigned).ok()
    }
}

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"^[+-]?\d+(\.\d+)?([eE][+-]?\d+)?$").unwrap())
}

fn to_half_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '．' => '.',
        '，' => ',',
        '－' => '-',
        '＋' => '+',
        _ => c,
    }
}

/// Resolve `,` and `.` into a plain `1234.5` form.
///
/// With both present, the rightmost one is the decimal separator. A lone comma
/// followed by exactly three digits is a thousands separator, otherwise a
/// decimal comma. Repeated separators must form groups of three digits.
fn normalize_separators(text: &str) -> Option<String> {
    match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (split_at, group) = if dot > comma { (dot, ',') } else { (comma, '.') };
            let (int_part, frac_part) = text.split_at(split_at);
            let frac_digits = &frac_part[1..];
            if frac_digits.contains([',', '.']) {
                return None;
            }
            let int_digits = ungroup(int_part, group)?;
            Some(format!("{}.{}", int_digits, frac_digits))
        }
        (Some(_), None) => {
            let parts: Vec<&str> = text.split(',').collect();
            if parts.len() == 2 && parts[1].len() != 3 {
                Some(format!("{}.{}", parts[0], parts[1]))
            } else {
                ungroup(text, ',')
            }
        }
        (None, Some(_)) => {
            if text.matches('.').count() == 1 {
                Some(text.to_string())
            } else {
                ungroup(text, '.')
            }
        }
        (None, None) => Some(text.to_string()),
    }
}

/// Remove thousands separators, checking the digit grouping
fn ungroup(text: &str, separator: char) -> Option<String> {
    let mut parts = text.split(separator);
    let head = parts.next()?;
    let head_digits = head.trim_start_matches(['+', '-']).len();
    if !(1..=3).contains(&head_digits) && text.contains(separator) {
        return None;
    }

    let mut result = head.to_string();
    for part in parts {
        if part.len() != 3 {
            return None;
        }
        result.push_str(part);
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_numeric_cells() {
        assert_eq!(parse_price(&Value::Number(35.5)), Some(dec("35.5")));
        assert_eq!(parse_price(&Value::Number(0.0)), Some(Decimal::ZERO));
        assert_eq!(parse_price(&Value::Number(f64::NAN)), None);
        assert_eq!(parse_price(&Value::Empty), None);
        assert_eq!(parse_price(&Value::Boolean(true)), None);
        assert_eq!(parse_price(&Value::Error("#VALUE!".into())), None);
    }

    #[test]
    fn test_locale_tolerant_text() {
        assert_eq!(parse_decimal_text(" 42 "), Some(dec("42")));
        assert_eq!(parse_decimal_text("¥1,234.50"), Some(dec("1234.50")));
        assert_eq!(parse_decimal_text("1.234,50"), Some(dec("1234.50")));
        assert_eq!(parse_decimal_text("12,50"), Some(dec("12.50")));
        assert_eq!(parse_decimal_text("1,234"), Some(dec("1234")));
        assert_eq!(parse_decimal_text("1 234.5"), Some(dec("1234.5")));
        assert_eq!(parse_decimal_text("１２.５"), Some(dec("12.5")));
        assert_eq!(parse_decimal_text("35 元"), Some(dec("35")));
        assert_eq!(parse_decimal_text("RMB 19.9"), Some(dec("19.9")));
        assert_eq!(parse_decimal_text("-3"), Some(dec("-3")));
        assert_eq!(parse_decimal_text(".5"), Some(dec("0.5")));
        assert_eq!(parse_decimal_text("1.5e2"), Some(dec("150")));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_decimal_text(""), None);
        assert_eq!(parse_decimal_text("abc"), None);
        assert_eq!(parse_decimal_text("待定"), None);
        assert_eq!(parse_decimal_text("12.5.3"), None);
        assert_eq!(parse_decimal_text("1,23,4"), None);
        assert_eq!(parse_decimal_text("12-5"), None);
    }
}

use chrono::{Datelike, Days, NaiveDate};

/// Parses a spreadsheet-style numeric string.
///
/// Accepts thousands separators, a leading `$`, a leading minus sign,
/// accounting negatives written as `(1,234)` and a trailing `%` which scales
/// the value down by 100. Returns `None` for blanks, non-finite values and
/// anything else that is not a number.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let mut s = text.trim();
    if s.is_empty() {
        return None;
    }

    let mut sign = 1.0;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        sign = -1.0;
        s = s[1..s.len() - 1].trim();
    }

    let (s, percent) = match s.strip_suffix('%') {
        Some(rest) => (rest.trim_end(), true),
        None => (s, false),
    };

    let s = match s.strip_prefix('-') {
        Some(rest) => {
            sign = -sign;
            rest.trim_start()
        }
        None => s,
    };

    let s = s.strip_prefix('$').unwrap_or(s).trim_start();
    if s.starts_with(['-', '+']) {
        return None;
    }
    let cleaned = strip_grouping(s)?;

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let value = sign * value;
    Some(if percent { value / 100.0 } else { value })
}

/// Removes thousands separators, requiring groups of three digits after the
/// first. Separators in the fractional part are rejected.
fn strip_grouping(s: &str) -> Option<String> {
    if !s.contains(',') {
        return Some(s.to_string());
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (s, None),
    };
    if frac_part.is_some_and(|f| f.contains(',')) {
        return None;
    }

    let mut groups = int_part.split(',');
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }

    Some(match frac_part {
        Some(frac) => format!("{digits}.{frac}"),
        None => digits,
    })
}

/// Converts a float to a year if it is integral and in range.
pub fn float_to_year(value: f64) -> Option<i32> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

/// Parses a year cell written as text.
///
/// Recognises plain integers ("2021"), integral floats ("2021.0"), ISO dates
/// ("2023-12-31", the fiscal year end) and labels with an alphabetic prefix
/// such as "FY2023" or "Year -4".
pub fn parse_year_label(text: &str) -> Option<i32> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }

    if let Ok(year) = t.parse::<i32>() {
        return Some(year);
    }

    if let Ok(value) = t.parse::<f64>() {
        return float_to_year(value);
    }

    if let Ok(date) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(date.year());
    }

    let rest = t.trim_start_matches(|c: char| c.is_alphabetic()).trim();
    if rest.len() < t.len() && !rest.is_empty() {
        let rest: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
        return rest.parse::<i32>().ok();
    }

    None
}

/// Converts an Excel serial date (1900 date system) to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Formats a value with comma thousands separators, e.g. `1234567.8` as
/// `"1,234,568"` for zero decimals.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_plain_and_formatted() {
        assert_eq!(parse_numeric("150772"), Some(150772.0));
        assert_eq!(parse_numeric(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_numeric("$70,081"), Some(70081.0));
        assert_eq!(parse_numeric("-$4,500"), Some(-4500.0));
        assert_eq!(parse_numeric("(1,234)"), Some(-1234.0));
        assert_eq!(parse_numeric("0.14"), Some(0.14));
    }

    #[test]
    fn test_parse_numeric_percent() {
        let value = parse_numeric("14%").unwrap();
        assert!((value - 0.14).abs() < 1e-12);
        let value = parse_numeric("(2.5%)").unwrap();
        assert!((value + 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_parse_numeric_rejects_garbage() {
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("   "), None);
        assert_eq!(parse_numeric("n/a"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("$"), None);
        assert_eq!(parse_numeric("12abc"), None);
    }

    #[test]
    fn test_parse_numeric_rejects_doubled_sign_and_bad_grouping() {
        assert_eq!(parse_numeric("--5"), None);
        assert_eq!(parse_numeric("-+5"), None);
        assert_eq!(parse_numeric("$-5"), None);
        assert_eq!(parse_numeric("1,2,3"), None);
        assert_eq!(parse_numeric("12,34"), None);
        assert_eq!(parse_numeric(",123"), None);
        assert_eq!(parse_numeric("1.234,5"), None);
        assert_eq!(parse_numeric("1,234,567.25"), Some(1_234_567.25));
        assert_eq!(parse_numeric("-1,000"), Some(-1000.0));
    }

    #[test]
    fn test_parse_year_label() {
        assert_eq!(parse_year_label("2021"), Some(2021));
        assert_eq!(parse_year_label("2021.0"), Some(2021));
        assert_eq!(parse_year_label("2021.5"), None);
        assert_eq!(parse_year_label("2023-12-31"), Some(2023));
        assert_eq!(parse_year_label("FY2023"), Some(2023));
        assert_eq!(parse_year_label("FY 2023"), Some(2023));
        assert_eq!(parse_year_label("Year -4"), Some(-4));
        assert_eq!(parse_year_label("Year 0"), Some(0));
        assert_eq!(parse_year_label("Year"), None);
        assert_eq!(parse_year_label("last year"), None);
        assert_eq!(parse_year_label(""), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45291.0),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        assert_eq!(
            excel_serial_to_date(44197.75),
            NaiveDate::from_ymd_opt(2021, 1, 1)
        );
        assert_eq!(excel_serial_to_date(-1.0), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        let avg = mean(&[0.07, 0.08, 0.10, 0.14, 0.14]).unwrap();
        assert!((avg - 0.106).abs() < 1e-9);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(985_295.0, 0), "985,295");
        assert_eq!(format_thousands(1_234_567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(-4_500.0, 0), "-4,500");
        assert_eq!(format_thousands(999.0, 0), "999");
        assert_eq!(format_thousands(-0.2, 0), "0");
    }
}

/// Format a number with thousands separators and a fixed number of decimal
/// places.
///
/// # Examples
///
/// ```
/// use metrics_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a dollar amount with two decimals, sign before the symbol.
///
/// # Examples
///
/// ```
/// use metrics_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56), "$1,234.56");
/// assert_eq!(format_currency(-9.99), "-$9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    let body = format_number(amount.abs(), 2);
    if amount < 0.0 && body != "0.00" {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Compact impression count: `950`, `1.8K`, `2.5M`.
pub fn format_impressions(impressions: i64) -> String {
    let abs = impressions.unsigned_abs() as f64;
    let sign = if impressions < 0 { "-" } else { "" };
    // 999_950 rounds to 1000.0K, so choose the unit after rounding.
    let thousands = (abs / 100.0).round() / 10.0;
    if abs >= 1_000_000.0 || thousands >= 1_000.0 {
        format!("{sign}{}M", trim_decimal(abs / 1_000_000.0))
    } else if abs >= 1_000.0 {
        format!("{sign}{}K", trim_decimal(abs / 1_000.0))
    } else {
        impressions.to_string()
    }
}

/// One decimal place, dropping a trailing `.0`.
fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

/// Render a first-open delay for display.
///
/// `None` becomes `"-"`, a `NaN` delay becomes `"invalid"`, and anything an
/// hour or longer is split into hours and minutes.
pub fn format_first_open(minutes: Option<f64>) -> String {
    let Some(m) = minutes else {
        return "-".to_string();
    };
    if m.is_nan() {
        return "invalid".to_string();
    }
    let total = m.round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.abs();
    if abs < 60 {
        format!("{sign}{abs}m")
    } else if abs % 60 == 0 {
        format!("{sign}{}h", abs / 60)
    } else {
        format!("{sign}{}h {}m", abs / 60, abs % 60)
    }
}

/// `(part / whole) * 100`, or `0.0` when `whole` is zero.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    (part / whole) * 100.0
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(5.0, 0), "5");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(123_456.0, 0), "123,456");
        assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
    }

    #[test]
    fn test_format_number_negative_zero() {
        assert_eq!(format_number(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(45.0), "$45.00");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-22.5), "-$22.50");
    }

    #[test]
    fn test_format_impressions() {
        assert_eq!(format_impressions(0), "0");
        assert_eq!(format_impressions(950), "950");
        assert_eq!(format_impressions(1_000), "1K");
        assert_eq!(format_impressions(1_800), "1.8K");
        assert_eq!(format_impressions(2_500_000), "2.5M");
        assert_eq!(format_impressions(-1_500), "-1.5K");
    }

    #[test]
    fn test_format_impressions_rolls_over_to_millions() {
        assert_eq!(format_impressions(999_949), "999.9K");
        assert_eq!(format_impressions(999_950), "1M");
        assert_eq!(format_impressions(999_999), "1M");
        assert_eq!(format_impressions(-999_999), "-1M");
    }

    #[test]
    fn test_format_first_open() {
        assert_eq!(format_first_open(None), "-");
        assert_eq!(format_first_open(Some(f64::NAN)), "invalid");
        assert_eq!(format_first_open(Some(5.0)), "5m");
        assert_eq!(format_first_open(Some(-7.0)), "-7m");
        assert_eq!(format_first_open(Some(120.0)), "2h");
        assert_eq!(format_first_open(Some(125.0)), "2h 5m");
    }

    #[test]
    fn test_percentage() {
        assert!((percentage(1.0, 4.0) - 25.0).abs() < 1e-9);
        assert_eq!(percentage(3.0, 0.0), 0.0);
    }
}

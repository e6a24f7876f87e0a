// Velopool Engine: Numeric Formatting

/// Group an integer's digits in threes with commas: `12345678` → `"12,345,678"`.
pub fn format_with_commas(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Truncate a display amount toward zero, then group it.
/// Values outside the i64 range saturate.
pub fn format_truncated(value: f64) -> String {
    format_with_commas(value as i64)
}

/// Four decimal places with a trailing percent sign.
pub fn format_percent(value: f64) -> String {
    format!("{:.4}%", value)
}

/// Four decimal places, no unit.
pub fn format_price(value: f64) -> String {
    format!("{:.4}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas() {
        assert_eq!(format_with_commas(12_345_678), "12,345,678");
        assert_eq!(format_with_commas(987_654), "987,654");
        assert_eq!(format_with_commas(1_000), "1,000");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(-1_234_567), "-1,234,567");
        assert_eq!(format_with_commas(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn truncates_rather_than_rounds() {
        assert_eq!(format_truncated(950_000.999_999), "950,000");
        assert_eq!(format_truncated(12_345_678.9), "12,345,678");
        assert_eq!(format_truncated(0.75), "0");
    }

    #[test]
    fn four_decimal_places() {
        assert_eq!(format_percent(0.12345), "0.1235%");
        assert_eq!(format_price(1.00007), "1.0001");
        assert_eq!(format_percent(0.05), "0.0500%");
        assert_eq!(format_price(0.999), "0.9990");
        assert_eq!(format_percent(0.0), "0.0000%");
    }
}

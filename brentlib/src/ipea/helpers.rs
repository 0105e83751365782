use chrono::NaiveDate;

// IPEA publishes prices as fixed-point text ("6.625" or "6,625" meaning 66.25 with
// the default scale of 100). The separator is stripped before parsing.
pub fn parse_price_text(text: &str, thousands_separator: char, scale: f64) -> Option<f64> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|&c| c != thousands_separator && !c.is_whitespace())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<f64>().ok()? / scale;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

// Dates come as day/month/year; anything else is flagged rather than raised
pub fn parse_date_text(text: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_is_rescaled_from_fixed_point() {
        assert_eq!(parse_price_text("6625", ',', 100.0), Some(66.25));
        assert_eq!(parse_price_text(" 12,345 ", ',', 100.0), Some(123.45));
        assert_eq!(parse_price_text("10000", ',', 100.0), Some(100.0));
    }

    #[test]
    fn bad_price_text_is_none() {
        assert_eq!(parse_price_text("", ',', 100.0), None);
        assert_eq!(parse_price_text("n/a", ',', 100.0), None);
        assert_eq!(parse_price_text("inf", ',', 100.0), None);
    }

    #[test]
    fn date_uses_day_month_year() {
        assert_eq!(
            parse_date_text("02/01/2020", "%d/%m/%Y"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(parse_date_text("2020-01-02", "%d/%m/%Y"), None);
        assert_eq!(parse_date_text("31/02/2020", "%d/%m/%Y"), None);
    }
}

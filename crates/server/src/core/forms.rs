//! Lenient parsing of HTML form values.
//!
//! Browsers submit every field as text, and Brazilian users type decimals
//! with a comma (`12,50`) as often as with a dot.

/// Trimmed value, or `None` when blank.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a decimal accepting `1234.5`, `1234,5` and `1.234,50`.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a row id; blank or malformed input yields `None`.
pub fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Interpret a `1`/`0` style flag. Anything other than an explicit "off"
/// value counts as set.
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "nao" | "não"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_formats() {
        assert_eq!(parse_decimal("10"), Some(10.0));
        assert_eq!(parse_decimal(" 12.5 "), Some(12.5));
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal("1.234,50"), Some(1234.5));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  ana "), Some("ana".to_string()));
        assert_eq!(non_empty("   "), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
    }
}

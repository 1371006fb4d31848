//! Cleaning functions for scraped infobox values.
//!
//! Every cleaner returns `None` when nothing usable is left; none of them
//! panics or substitutes zero.

/// Strip every character that is not a digit or `.` and parse what remains.
///
/// `"$2.5 trillion"` → `2.5`, `"1,234,567"` → `1234567`.
pub fn clean_numeric(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    parse_finite(&digits)
}

/// First run of digits/decimal points: `"5.2% (2023 est.)"` → `5.2`.
pub fn clean_percentage(text: &str) -> Option<f64> {
    parse_finite(first_number_run(text)?)
}

/// Population in millions, unit left implicit: `"331 million"` → `331`.
pub fn clean_population(text: &str) -> Option<f64> {
    parse_finite(first_number_run(text)?)
}

/// Currency code: the parenthesized abbreviation if present, otherwise the
/// first word token. `"US dollar (USD)"` → `"USD"`.
pub fn clean_currency(text: &str) -> Option<String> {
    if let Some(open) = text.find('(') {
        if let Some(len) = text[open + 1..].find(')') {
            let inner = text[open + 1..open + 1 + len].trim();
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }
    first_word(text).map(str::to_string)
}

/// Trimmed passthrough.
pub fn clean_text(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn first_number_run(text: &str) -> Option<&str> {
    let is_num = |c: char| c.is_ascii_digit() || c == '.';
    let start = text.find(is_num)?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !is_num(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn first_word(text: &str) -> Option<&str> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = text.find(is_word)?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_finite(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strips_noise() {
        assert_eq!(clean_numeric("$2.5 trillion"), Some(2.5));
        assert_eq!(clean_numeric("1,234,567 (2022)"), Some(12345672022.0));
        assert_eq!(clean_numeric("0.921 (very high)"), Some(0.921));
    }

    #[test]
    fn percentage_takes_first_number() {
        assert_eq!(clean_percentage("5.2% (2023 est.)"), Some(5.2));
        assert_eq!(clean_percentage("−0.3% (2020)"), Some(0.3));
    }

    #[test]
    fn no_numeric_content_is_none_not_zero() {
        for s in ["", "   ", "n/a", "unknown", "—", ".", "..."] {
            assert_eq!(clean_numeric(s), None, "numeric {s:?}");
            assert_eq!(clean_percentage(s), None, "percentage {s:?}");
            assert_eq!(clean_population(s), None, "population {s:?}");
        }
        // Two decimal points survive stripping but do not parse.
        assert_eq!(clean_numeric("v1.2.3"), None);
    }

    #[test]
    fn population_keeps_unit_implicit() {
        assert_eq!(clean_population("331 million (2023)"), Some(331.0));
    }

    #[test]
    fn currency_prefers_parenthesized_code() {
        assert_eq!(clean_currency("US dollar (USD)").as_deref(), Some("USD"));
        assert_eq!(clean_currency("Euro").as_deref(), Some("Euro"));
        assert_eq!(clean_currency("Renminbi (CN¥) (CNY)").as_deref(), Some("CN¥"));
        assert_eq!(clean_currency("Rupee ()").as_deref(), Some("Rupee"));
        assert_eq!(clean_currency("  "), None);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(clean_text("  Services, industry \n").as_deref(), Some("Services, industry"));
        assert_eq!(clean_text("\t"), None);
    }
}

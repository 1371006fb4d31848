//! Entities (countries) and their external codes.

use std::collections::BTreeMap;

/// Page identifiers scraped by default (G20 plus others for diversity).
///
/// Identifiers use underscores, as they appear in page URLs.
pub const DEFAULT_ENTITIES: [&str; 50] = [
    "United_States", "China", "India", "Germany", "Brazil", "Japan", "United_Kingdom",
    "France", "Canada", "Australia", "Russia", "South_Korea", "Mexico", "Indonesia",
    "Nigeria", "South_Africa", "Argentina", "Saudi_Arabia", "Italy", "Spain",
    "Turkey", "Netherlands", "Switzerland", "Sweden", "Belgium", "Poland", "Thailand",
    "Malaysia", "Philippines", "Vietnam", "Singapore", "Egypt", "Algeria", "Morocco",
    "Kenya", "Ethiopia", "Ghana", "Pakistan", "Bangladesh", "Iran", "United_Arab_Emirates",
    "Qatar", "Chile", "Colombia", "Peru", "New_Zealand", "Norway", "Denmark", "Finland",
    "Ireland",
];

const DEFAULT_CODES: [(&str, &str); 50] = [
    ("United States", "USA"), ("China", "CHN"), ("India", "IND"), ("Germany", "DEU"),
    ("Brazil", "BRA"), ("Japan", "JPN"), ("United Kingdom", "GBR"), ("France", "FRA"),
    ("Canada", "CAN"), ("Australia", "AUS"), ("Russia", "RUS"), ("South Korea", "KOR"),
    ("Mexico", "MEX"), ("Indonesia", "IDN"), ("Nigeria", "NGA"), ("South Africa", "ZAF"),
    ("Argentina", "ARG"), ("Saudi Arabia", "SAU"), ("Italy", "ITA"), ("Spain", "ESP"),
    ("Turkey", "TUR"), ("Netherlands", "NLD"), ("Switzerland", "CHE"), ("Sweden", "SWE"),
    ("Belgium", "BEL"), ("Poland", "POL"), ("Thailand", "THA"), ("Malaysia", "MYS"),
    ("Philippines", "PHL"), ("Vietnam", "VNM"), ("Singapore", "SGP"), ("Egypt", "EGY"),
    ("Algeria", "DZA"), ("Morocco", "MAR"), ("Kenya", "KEN"), ("Ethiopia", "ETH"),
    ("Ghana", "GHA"), ("Pakistan", "PAK"), ("Bangladesh", "BGD"), ("Iran", "IRN"),
    ("United Arab Emirates", "ARE"), ("Qatar", "QAT"), ("Chile", "CHL"), ("Colombia", "COL"),
    ("Peru", "PER"), ("New Zealand", "NZL"), ("Norway", "NOR"), ("Denmark", "DNK"),
    ("Finland", "FIN"), ("Ireland", "IRL"),
];

/// Immutable display-name → ISO-3 code lookup used by the time-series fetcher.
///
/// Keys are canonical display names (see [`normalize_entity_name`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryCodes {
    codes: BTreeMap<String, String>,
}

impl CountryCodes {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            codes: pairs
                .into_iter()
                .map(|(name, code)| (name.into(), code.into()))
                .collect(),
        }
    }

    pub fn get(&self, display_name: &str) -> Option<&str> {
        self.codes.get(display_name).map(String::as_str)
    }
}

impl Default for CountryCodes {
    fn default() -> Self {
        Self::new(DEFAULT_CODES)
    }
}

/// Title-case a name the way the join key expects: the first letter of every
/// alphabetic run is uppercased, the rest lowercased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Canonical entity name: underscores become spaces, then title case.
///
/// `"united_states"` and `"United States"` both map to `"United States"`.
pub fn normalize_entity_name(raw: &str) -> String {
    title_case(&raw.trim().replace('_', " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_resets_after_non_letters() {
        assert_eq!(title_case("united arab emirates"), "United Arab Emirates");
        assert_eq!(title_case("SOUTH KOREA"), "South Korea");
        assert_eq!(title_case("guinea-bissau"), "Guinea-Bissau");
        assert_eq!(title_case("côte d'ivoire"), "Côte D'Ivoire");
    }

    #[test]
    fn scraped_identifiers_normalize_to_code_table_keys() {
        let codes = CountryCodes::default();
        for id in DEFAULT_ENTITIES {
            let name = normalize_entity_name(id);
            assert!(codes.get(&name).is_some(), "no code for {name}");
        }
    }

    #[test]
    fn unknown_names_have_no_code() {
        let codes = CountryCodes::new([("Testland", "TST")]);
        assert_eq!(codes.get("Testland"), Some("TST"));
        assert_eq!(codes.get("Atlantis"), None);
    }
}

use serde::{Deserialize, Serialize};

use super::Lookups;

/// One entry of a venue's `additional_cnae` list: a secondary economic
/// activity code plus its resolved label (invariant 2 — label is present
/// only when the code resolves).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cnae {
    pub code: Option<i64>,
    pub label: Option<String>,
}

impl Cnae {
    pub fn new(code: i64, label: String) -> Self {
        Self { code: Some(code), label: Some(label) }
    }
}

/// Parses the venue row's comma-joined secondary-CNAE column (e.g.
/// `"4711-1-02,4721-1-03"`). Each entry's punctuation is stripped before
/// parsing — the Federal Revenue renders CNAE codes with hyphens for
/// display, but the reference table keys on the bare 7-digit code.
pub fn parse_secondary_cnaes(raw: &str, lookups: &Lookups) -> Vec<Cnae> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|entry| {
            let digits: String = entry.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<i64>().ok()
        })
        .map(|code| Cnae {
            code: Some(code),
            label: lookups.get_cnae(code).cloned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cnae_creation() {
        let cnae = Cnae::new(4751201, "Comércio varejista de produtos de panificação".to_string());
        assert_eq!(cnae.code, Some(4751201));
        assert!(cnae.label.unwrap().contains("panificação"));
    }

    #[test]
    fn parses_comma_joined_hyphenated_codes() {
        let mut lookups = Lookups::new();
        lookups.cnaes.insert(4711102, "Comercio varejista".to_string());
        let cnaes = parse_secondary_cnaes("4711-1-02,4721-1-03", &lookups);
        assert_eq!(cnaes.len(), 2);
        assert_eq!(cnaes[0].code, Some(4711102));
        assert_eq!(cnaes[0].label, Some("Comercio varejista".to_string()));
        assert_eq!(cnaes[1].code, Some(4721103));
        assert_eq!(cnaes[1].label, None);
    }

    #[test]
    fn empty_column_yields_empty_list() {
        let lookups = Lookups::new();
        assert!(parse_secondary_cnaes("", &lookups).is_empty());
    }
}

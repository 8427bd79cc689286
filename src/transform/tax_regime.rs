use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use super::primitives::to_date;
use super::DecodeError;

/// Simples Nacional / MEI tax-regime fragment joined onto a venue through
/// the KV staging store (C3). Field names already match the venue
/// record's JSON projection so the exporter can merge this fragment onto
/// `Company` without renaming anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxRegime {
    pub simple_taxes_status: Option<bool>,
    pub simple_taxes_start_date: Option<NaiveDate>,
    pub simple_taxes_exclusion_date: Option<NaiveDate>,
    pub individual_taxpayer_status: Option<bool>,
    pub individual_taxpayer_start_date: Option<NaiveDate>,
    pub individual_taxpayer_delete_date: Option<NaiveDate>,
}

/// Decodes a `S`/`N` flag cell. Anything other than exactly `S` or `N`
/// (including an empty cell) decodes to absent rather than to `false` —
/// invariant 3 forbids an empty cell masquerading as a value.
fn flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "S" => Some(true),
        "N" => Some(false),
        _ => None,
    }
}

impl TaxRegime {
    /// Decodes one row of a `*SIMPLES.CSV` shard (columns: 0 base; 1
    /// simples flag; 2 simples entry date; 3 simples exclusion date; 4 MEI
    /// flag; 5 MEI entry date; 6 MEI exclusion date).
    pub fn new(row: &StringRecord) -> Result<Self, DecodeError> {
        let get = |i: usize| row.get(i).unwrap_or("");
        Ok(TaxRegime {
            simple_taxes_status: flag(get(1)),
            simple_taxes_start_date: to_date("simple_taxes_start_date", get(2))?,
            simple_taxes_exclusion_date: to_date("simple_taxes_exclusion_date", get(3))?,
            individual_taxpayer_status: flag(get(4)),
            individual_taxpayer_start_date: to_date("individual_taxpayer_start_date", get(5))?,
            individual_taxpayer_delete_date: to_date("individual_taxpayer_delete_date", get(6))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_tax_regime_creation() {
        let regime = TaxRegime::default();
        assert_eq!(regime.simple_taxes_status, None);
        assert_eq!(regime.individual_taxpayer_status, None);
    }

    #[test]
    fn decodes_simples_and_mei_flags() {
        let r = row(&["12345678", "S", "20150101", "", "N", "", ""]);
        let tr = TaxRegime::new(&r).unwrap();
        assert_eq!(tr.simple_taxes_status, Some(true));
        assert_eq!(tr.simple_taxes_start_date, Some(chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()));
        assert_eq!(tr.individual_taxpayer_status, Some(false));
    }

    #[test]
    fn empty_flag_is_absent_not_false() {
        let r = row(&["12345678", "", "", "", "", "", ""]);
        let tr = TaxRegime::new(&r).unwrap();
        assert_eq!(tr.simple_taxes_status, None);
        assert_eq!(tr.individual_taxpayer_status, None);
    }
}

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use super::primitives::{clean_string, to_date, to_int};
use super::{DecodeError, Lookups};

/// Partner (Sócio) enrichment fragment, joined onto a venue through the KV
/// staging store by the venue's 8-char CNPJ base (C3).
///
/// `cnpj_cpf` arrives from the source already masked for natural persons —
/// the Federal Revenue's own `*SOCIOCSV` export partially redacts CPFs
/// before publication, so this crate passes the column through verbatim
/// rather than re-masking it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub partner_code: Option<i64>,
    pub name: String,
    pub cnpj_cpf: String,
    pub qualification_code: Option<i64>,
    pub qualification: Option<String>,
    pub company_entry_date: Option<chrono::NaiveDate>,
    pub country_code: Option<i64>,
    pub country: Option<String>,
    pub cpf_legal_representative: String,
    pub name_legal_representative: String,
    pub legal_representative_qualification_code: Option<i64>,
    pub legal_representative_qualification: Option<String>,
    pub age_range_code: Option<i64>,
    pub age_range: Option<String>,
}

impl Partner {
    /// Resolves an age-bracket code (0–9) to its fixed Portuguese label.
    /// Any other code (including none of the digits 0–9) leaves the label
    /// absent.
    pub fn age_range_label(code: i64) -> Option<&'static str> {
        match code {
            0 => Some("Não se aplica"),
            1 => Some("para os intervalos entre 0 a 12 anos"),
            2 => Some("Entre 13 a 20 ano"),
            3 => Some("Entre 21 a 30 anos"),
            4 => Some("Entre 31 a 40 anos"),
            5 => Some("Entre 41 a 50 anos"),
            6 => Some("Entre 51 a 60 anos"),
            7 => Some("Entre 61 a 70 anos"),
            8 => Some("Entre 71 a 80 anos"),
            9 => Some("Maiores de 80 anos"),
            _ => None,
        }
    }

    /// Decodes one row of a `*SOCIOCSV` shard (columns per SPEC_FULL.md §6:
    /// 0 base; 1 partner kind; 2 name; 3 CNPJ/CPF; 4 qualification; 5 entry
    /// date; 6 country code; 7 legal-rep CPF; 8 legal-rep name; 9 legal-rep
    /// qualification; 10 age bracket). The base itself is not stored on the
    /// fragment — it is the KV key the loader groups this row under.
    pub fn new(row: &StringRecord, lookups: &Lookups) -> Result<Self, DecodeError> {
        let get = |i: usize| row.get(i).unwrap_or("");

        let partner_code = to_int("partner_code", get(1))?;
        let qualification_code = to_int("qualification_code", get(4))?;
        let company_entry_date = to_date("company_entry_date", get(5))?;
        let country_code = to_int("country_code", get(6))?;
        let legal_representative_qualification_code =
            to_int("legal_representative_qualification_code", get(9))?;
        let age_range_code = to_int("age_range_code", get(10))?;

        Ok(Partner {
            partner_code,
            name: clean_string(get(2)),
            cnpj_cpf: clean_string(get(3)),
            qualification: qualification_code.and_then(|c| lookups.get_qualification(c).cloned()),
            qualification_code,
            company_entry_date,
            country: country_code.and_then(|c| lookups.get_country(c).cloned()),
            country_code,
            cpf_legal_representative: clean_string(get(7)),
            name_legal_representative: clean_string(get(8)),
            legal_representative_qualification: legal_representative_qualification_code
                .and_then(|c| lookups.get_qualification(c).cloned()),
            legal_representative_qualification_code,
            age_range: age_range_code.and_then(Self::age_range_label).map(str::to_string),
            age_range_code,
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
    fn test_age_range_labels() {
        assert_eq!(Partner::age_range_label(0), Some("Não se aplica"));
        assert_eq!(Partner::age_range_label(3), Some("Entre 21 a 30 anos"));
        assert_eq!(Partner::age_range_label(9), Some("Maiores de 80 anos"));
        assert_eq!(Partner::age_range_label(99), None);
    }

    #[test]
    fn decodes_partner_row_with_country_lookup() {
        let mut lookups = Lookups::new();
        lookups.countries.insert(105, "BRASIL".to_string());
        let r = row(&["12345678", "2", "JOAO DA SILVA", "***123456**", "49", "20200101", "105", "", "", "", "3"]);
        let p = Partner::new(&r, &lookups).unwrap();
        assert_eq!(p.country_code, Some(105));
        assert_eq!(p.country, Some("BRASIL".to_string()));
        assert_eq!(p.age_range_code, Some(3));
        assert_eq!(p.age_range, Some("Entre 21 a 30 anos".to_string()));
    }

    #[test]
    fn unknown_country_code_leaves_label_absent() {
        let lookups = Lookups::new();
        let r = row(&["12345678", "2", "JOAO", "x", "", "", "999", "", "", "", ""]);
        let p = Partner::new(&r, &lookups).unwrap();
        assert_eq!(p.country_code, Some(999));
        assert_eq!(p.country, None);
    }

    #[test]
    fn malformed_date_is_a_decode_error() {
        let lookups = Lookups::new();
        let r = row(&["12345678", "2", "JOAO", "x", "", "2023AB01", "", "", "", "", ""]);
        assert!(Partner::new(&r, &lookups).is_err());
    }
}

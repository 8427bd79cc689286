use chrono::NaiveDate;
use csv::StringRecord;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::cnae::{parse_secondary_cnaes, Cnae};
use super::kv::{KvStore, KIND_ACTIVITY, KIND_PARTNER, KIND_SIMPLES};
use super::partner::Partner;
use super::primitives::{clean_string, to_date, to_int};
use super::tax_regime::TaxRegime;
use super::{Lookups, Result, TransformError};

lazy_static! {
    /// Masks the trailing CPF embedded in a MEI's auto-generated trade name:
    /// one non-digit followed by 11 digits, e.g. `JOSE12345678901` ->
    /// `JOSE***45678***` (§4.3 trade-name privacy mask).
    static ref CPF_IN_NAME: Regex = Regex::new(r"(\D)(\d{3})(\d{5})(\d{3})$").unwrap();
}

fn mask_trade_name(name: &str) -> String {
    CPF_IN_NAME.replace(name, "$1***$3***").trim().to_string()
}

fn registration_status_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("NULA"),
        2 => Some("ATIVA"),
        3 => Some("SUSPENSA"),
        4 => Some("INAPTA"),
        8 => Some("BAIXADA"),
        _ => None,
    }
}

fn branch_type_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("MATRIZ"),
        2 => Some("FILIAL"),
        _ => None,
    }
}

fn business_size_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("MICRO EMPRESA"),
        3 => Some("EMPRESA DE PEQUENO PORTE"),
        5 => Some("DEMAIS"),
        _ => None,
    }
}

/// The per-base company attribute fragment sourced from the `*EMPRECSV`
/// shard and joined through the KV store under `kind=activity`
/// (SPEC_FULL.md §4.3). Not part of the public JSON projection on its
/// own — its fields are merged directly onto [`Company`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CompanyBaseFragment {
    full_name: String,
    legal_entity_type_code: Option<i64>,
    personal_responsability_code: Option<i64>,
    charter_capital: Option<f64>,
    business_size_code: Option<i64>,
    responsible_federative_entity: String,
}

/// Decodes one row of an `*EMPRECSV` shard into its KV fragment payload.
/// Exposed to the loader (C5), which has no other reason to know about
/// `CompanyBaseFragment`'s internal shape.
pub(crate) fn decode_base_attributes(
    row: &StringRecord,
) -> std::result::Result<CompanyBaseFragment, super::DecodeError> {
    CompanyBaseFragment::new(row)
}

impl CompanyBaseFragment {
    /// Decodes one row of an `*EMPRECSV` shard (columns: 0 base; 1 legal
    /// name; 2 legal-entity-type code; 3 responsible-party qualification
    /// code; 4 charter capital; 5 business size code; 6 responsible
    /// federative entity).
    fn new(row: &StringRecord) -> std::result::Result<Self, super::DecodeError> {
        let get = |i: usize| row.get(i).unwrap_or("");
        Ok(CompanyBaseFragment {
            full_name: clean_string(get(1)),
            legal_entity_type_code: to_int("legal_entity_type_code", get(2))?,
            personal_responsability_code: to_int("personal_responsability_code", get(3))?,
            charter_capital: super::primitives::to_float("charter_capital", get(4))?,
            business_size_code: to_int("business_size_code", get(5))?,
            responsible_federative_entity: clean_string(get(6)),
        })
    }
}

/// The denormalized venue record emitted by the exporter — one JSON object
/// per output line (C3 venue record, SPEC_FULL.md §3). Field names match
/// the original exporter's English JSON projection verbatim so invariant 4
/// (byte-identical re-serialization) is meaningful against real consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub cnpj: String,
    pub branch_type: Option<i64>,
    pub branch_type_description: Option<String>,
    pub trade_mark: String,
    pub registration_status_code: Option<i64>,
    pub registration_status: Option<String>,
    pub registration_update_date: Option<NaiveDate>,
    pub closing_status_code: Option<i64>,
    pub closing_status_reason: Option<String>,
    pub international_city_name: String,
    pub country_code: Option<i64>,
    pub country: Option<String>,
    pub activity_start_date: Option<NaiveDate>,
    pub cnae_code: Option<i64>,
    pub cnae_description: Option<String>,
    pub street_type: String,
    pub street: String,
    pub number: String,
    pub additional: String,
    pub bairro: String,
    pub cep: String,
    pub uf: String,
    pub municipality_code: Option<i64>,
    pub ibge_municipality_code: Option<i64>,
    pub municipality: Option<String>,
    pub phone1: String,
    pub phone2: String,
    pub fax: String,
    pub email: Option<String>,
    pub special_code: String,
    pub special_situation_date: Option<NaiveDate>,
    pub simple_taxes_status: Option<bool>,
    pub simple_taxes_start_date: Option<NaiveDate>,
    pub simple_taxes_exclusion_date: Option<NaiveDate>,
    pub individual_taxpayer_status: Option<bool>,
    pub individual_taxpayer_start_date: Option<NaiveDate>,
    pub individual_taxpayer_delete_date: Option<NaiveDate>,
    pub full_name: String,
    pub legal_entity_type_code: Option<i64>,
    pub legal_type: Option<String>,
    pub personal_responsability_code: Option<i64>,
    pub charter_capital: Option<f64>,
    pub business_size_code: Option<i64>,
    pub business_size: Option<String>,
    pub business_size_description: String,
    pub responsible_federative_entity: String,
    pub qsa: Vec<Partner>,
    pub additional_cnae: Vec<Cnae>,
}

impl Company {
    /// Decodes one venue row, resolves every code against `lookups`,
    /// fetches its partner/company-base/tax-regime fragments from `kv`,
    /// and applies the privacy transform when `privacy` is set (C3).
    pub fn new(
        row: &StringRecord,
        lookups: &Lookups,
        kv: &dyn KvStore,
        privacy: bool,
    ) -> Result<Self> {
        let get = |i: usize| row.get(i).unwrap_or("");

        let base = get(0).to_string();
        let cnpj = format!("{}{}{}", get(0), get(1), get(2));

        let branch_type = to_int("branch_type", get(3))?;
        let registration_status_code = to_int("registration_status_code", get(5))?;
        let closing_status_code = to_int("closing_status_code", get(7))?;
        let country_code = to_int("country_code", get(9))?;
        let cnae_code = to_int("cnae_code", get(11))?;
        let municipality_code = to_int("municipality_code", get(20))?;

        let additional_cnae = parse_secondary_cnaes(get(12), lookups);

        let mut company = Company {
            cnpj,
            branch_type,
            branch_type_description: branch_type.and_then(branch_type_label).map(str::to_string),
            trade_mark: clean_string(get(4)),
            registration_status_code,
            registration_status: registration_status_code
                .and_then(registration_status_label)
                .map(str::to_string),
            registration_update_date: to_date("registration_update_date", get(6))?,
            closing_status_code,
            closing_status_reason: closing_status_code.and_then(|c| lookups.get_motive(c).cloned()),
            international_city_name: clean_string(get(8)),
            country_code,
            country: country_code.and_then(|c| lookups.get_country(c).cloned()),
            activity_start_date: to_date("activity_start_date", get(10))?,
            cnae_code,
            cnae_description: cnae_code.and_then(|c| lookups.get_cnae(c).cloned()),
            street_type: clean_string(get(13)),
            street: clean_string(get(14)),
            number: clean_string(get(15)),
            additional: clean_string(get(16)),
            bairro: clean_string(get(17)),
            cep: clean_string(get(18)),
            uf: clean_string(get(19)),
            municipality_code,
            ibge_municipality_code: municipality_code.and_then(|c| lookups.get_ibge_municipality(c)),
            municipality: municipality_code.and_then(|c| lookups.get_city(c).cloned()),
            phone1: format!("{}{}", get(21), get(22)),
            phone2: format!("{}{}", get(23), get(24)),
            fax: format!("{}{}", get(25), get(26)),
            email: Some(get(27).to_string()).filter(|s| !s.is_empty()),
            special_code: clean_string(get(28)),
            special_situation_date: to_date("special_situation_date", get(29))?,
            simple_taxes_status: None,
            simple_taxes_start_date: None,
            simple_taxes_exclusion_date: None,
            individual_taxpayer_status: None,
            individual_taxpayer_start_date: None,
            individual_taxpayer_delete_date: None,
            full_name: String::new(),
            legal_entity_type_code: None,
            legal_type: None,
            personal_responsability_code: None,
            charter_capital: None,
            business_size_code: None,
            business_size: None,
            business_size_description: String::new(),
            responsible_federative_entity: String::new(),
            qsa: Vec::new(),
            additional_cnae,
        };

        company.enrich(&base, lookups, kv)?;

        if privacy {
            company.apply_privacy();
        }

        Ok(company)
    }

    /// Joins the company-base, partner, and tax-regime fragments the
    /// loader staged under this venue's base identifier (C4/C5/C6).
    fn enrich(&mut self, base: &str, lookups: &Lookups, kv: &dyn KvStore) -> Result<()> {
        if let Some(blob) = kv.get(base, KIND_ACTIVITY)?.last() {
            let fragment: CompanyBaseFragment =
                serde_json::from_slice(blob).map_err(TransformError::from)?;
            self.full_name = fragment.full_name;
            self.legal_entity_type_code = fragment.legal_entity_type_code;
            self.legal_type = fragment
                .legal_entity_type_code
                .and_then(|c| lookups.get_legal_nature(c).cloned());
            self.personal_responsability_code = fragment.personal_responsability_code;
            self.charter_capital = fragment.charter_capital;
            self.business_size_code = fragment.business_size_code;
            self.business_size = fragment
                .business_size_code
                .and_then(business_size_label)
                .map(str::to_string);
            self.business_size_description = self.business_size.clone().unwrap_or_default();
            self.responsible_federative_entity = fragment.responsible_federative_entity;
        }

        if let Some(blob) = kv.get(base, KIND_SIMPLES)?.last() {
            let regime: TaxRegime = serde_json::from_slice(blob).map_err(TransformError::from)?;
            self.simple_taxes_status = regime.simple_taxes_status;
            self.simple_taxes_start_date = regime.simple_taxes_start_date;
            self.simple_taxes_exclusion_date = regime.simple_taxes_exclusion_date;
            self.individual_taxpayer_status = regime.individual_taxpayer_status;
            self.individual_taxpayer_start_date = regime.individual_taxpayer_start_date;
            self.individual_taxpayer_delete_date = regime.individual_taxpayer_delete_date;
        }

        for blob in kv.get(base, KIND_PARTNER)? {
            let partner: Partner = serde_json::from_slice(&blob).map_err(TransformError::from)?;
            self.qsa.push(partner);
        }

        Ok(())
    }

    /// Applies the privacy transform (invariant 5): mask a natural
    /// person's CPF embedded in the trade name, drop the email, and for
    /// natural-person legal types clear address and contact fields. Both
    /// the code and the label are checked before comparing the label text
    /// — the label can be `None` even when the code resolved to nothing,
    /// and must never be unwrapped blindly (SPEC_FULL.md §9 open question 2).
    fn apply_privacy(&mut self) {
        self.trade_mark = mask_trade_name(&self.trade_mark);
        self.email = None;

        let is_individual = self
            .legal_entity_type_code
            .is_some()
            && self
                .legal_type
                .as_deref()
                .map(|t| t.to_lowercase().contains("individual"))
                .unwrap_or(false);

        if is_individual {
            self.street_type.clear();
            self.street.clear();
            self.number.clear();
            self.additional.clear();
            self.phone1.clear();
            self.phone2.clear();
            self.fax.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::kv::HighMemoryStore;

    fn row(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    fn minimal_row() -> StringRecord {
        row(&[
            "00000000", "0001", "01", "1", "ACME", "2", "20230101", "", "", "76", "20200101",
            "4711", "", "R", "RUA A", "1", "", "CENTRO", "01000000", "SP", "3550308", "11",
            "99990000", "", "", "", "", "a@b", "", "",
        ])
    }

    #[test]
    fn test_parse_situacao_cadastral() {
        assert_eq!(registration_status_label(2), Some("ATIVA"));
        assert_eq!(registration_status_label(8), Some("BAIXADA"));
        assert_eq!(registration_status_label(99), None);
    }

    #[test]
    fn test_parse_matriz_filial() {
        assert_eq!(branch_type_label(1), Some("MATRIZ"));
        assert_eq!(branch_type_label(2), Some("FILIAL"));
        assert_eq!(branch_type_label(3), None);
    }

    #[test]
    fn test_clean_name() {
        let cleaned = mask_trade_name("JOSE12345678901");
        assert_eq!(cleaned, "JOSE***45678***");
    }

    #[test]
    fn minimal_venue_with_no_partners() {
        let lookups = Lookups::new();
        let kv = HighMemoryStore::new();
        let r = minimal_row();
        let company = Company::new(&r, &lookups, &kv, false).unwrap();
        assert_eq!(company.cnpj, "00000000000101");
        assert_eq!(company.branch_type, Some(1));
        assert!(company.qsa.is_empty());
        assert!(company.additional_cnae.is_empty());
    }

    #[test]
    fn privacy_masks_trade_name_and_drops_email() {
        let lookups = Lookups::new();
        let kv = HighMemoryStore::new();
        let mut r = minimal_row();
        r = {
            let mut fields: Vec<&str> = r.iter().collect();
            fields[4] = "JOSE12345678901";
            row(&fields)
        };
        let company = Company::new(&r, &lookups, &kv, true).unwrap();
        assert_eq!(company.trade_mark, "JOSE***45678***");
        assert_eq!(company.email, None);
    }

    #[test]
    fn secondary_cnaes_are_resolved() {
        let mut lookups = Lookups::new();
        lookups.cnaes.insert(4711102, "Comercio".to_string());
        lookups.cnaes.insert(4721103, "Outro".to_string());
        let kv = HighMemoryStore::new();
        let mut r = minimal_row();
        r = {
            let mut fields: Vec<&str> = r.iter().collect();
            fields[12] = "4711-1-02,4721-1-03";
            row(&fields)
        };
        let company = Company::new(&r, &lookups, &kv, false).unwrap();
        assert_eq!(company.additional_cnae.len(), 2);
    }

    #[test]
    fn enrichment_pulls_partners_and_tax_regime_from_kv() {
        let lookups = Lookups::new();
        let kv = HighMemoryStore::new();
        let partner = Partner {
            partner_code: Some(2),
            name: "JOAO".to_string(),
            cnpj_cpf: "***".to_string(),
            qualification_code: None,
            qualification: None,
            company_entry_date: None,
            country_code: None,
            country: None,
            cpf_legal_representative: String::new(),
            name_legal_representative: String::new(),
            legal_representative_qualification_code: None,
            legal_representative_qualification: None,
            age_range_code: None,
            age_range: None,
        };
        kv.put("00000000", KIND_PARTNER, serde_json::to_vec(&partner).unwrap())
            .unwrap();
        let regime = TaxRegime { simple_taxes_status: Some(true), ..Default::default() };
        kv.put("00000000", KIND_SIMPLES, serde_json::to_vec(&regime).unwrap())
            .unwrap();

        let r = minimal_row();
        let company = Company::new(&r, &lookups, &kv, false).unwrap();
        assert_eq!(company.qsa.len(), 1);
        assert_eq!(company.qsa[0].name, "JOAO");
        assert_eq!(company.simple_taxes_status, Some(true));
    }
}

use std::collections::HashMap;

use super::csv_source::{read_small_csv, shards};
use super::{Result, TransformError};

/// Small (≤10⁴ rows) reference tables loaded fully into memory and shared
/// read-only for the rest of the run (C2).
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub countries: HashMap<i64, String>,
    pub cities: HashMap<i64, String>,
    pub cnaes: HashMap<i64, String>,
    pub legal_natures: HashMap<i64, String>,
    pub qualifications: HashMap<i64, String>,
    pub motives: HashMap<i64, String>,
    /// Federal-Revenue-internal municipality code -> official 7-digit IBGE
    /// code. Optional: the crosswalk is a bundled static asset in the
    /// original, not part of the CSV distribution, so this stays empty
    /// when no `*IBGECSV` file is present (see SPEC_FULL.md §4.2).
    pub ibge_municipalities: HashMap<i64, i64>,
}

/// One reference table: its glob pattern fragment and the map it fills.
struct Table<'a> {
    pattern: &'a str,
    name: &'a str,
}

const TABLES: &[Table] = &[
    Table { pattern: "PAISCSV", name: "countries" },
    Table { pattern: "MUNICCSV", name: "cities" },
    Table { pattern: "CNAECSV", name: "cnaes" },
    Table { pattern: "NATJUCSV", name: "legal_natures" },
    Table { pattern: "QUALSCSV", name: "qualifications" },
    Table { pattern: "MOTICSV", name: "motives" },
];

impl Lookups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every reference table from `dir`. A missing reference file is
    /// fatal (§4.2); duplicate codes within a table resolve last-one-wins.
    pub fn load_from_directory(&mut self, dir: &str) -> Result<()> {
        tracing::info!("loading lookup tables from {}", dir);
        for table in TABLES {
            let files = shards(dir, table.pattern)?;
            if files.is_empty() {
                return Err(TransformError::LookupLoad(format!(
                    "no reference file matching *{}* found in {}",
                    table.pattern, dir
                )));
            }
            for file in &files {
                let rows = read_small_csv(file)?;
                let map = self.map_for(table.name);
                for row in rows {
                    let code = row.get(0).unwrap_or("").trim();
                    if code.is_empty() {
                        continue;
                    }
                    let label = row.get(1).unwrap_or("").trim();
                    let code: i64 = code.parse().map_err(|_| {
                        TransformError::LookupLoad(format!(
                            "non-numeric code {:?} in {}",
                            code,
                            file.display()
                        ))
                    })?;
                    map.insert(code, label.to_string());
                }
            }
        }

        for file in shards(dir, "IBGECSV")? {
            let rows = read_small_csv(&file)?;
            for row in rows {
                let code = row.get(0).unwrap_or("").trim();
                let ibge = row.get(1).unwrap_or("").trim();
                if code.is_empty() || ibge.is_empty() {
                    continue;
                }
                if let (Ok(code), Ok(ibge)) = (code.parse(), ibge.parse()) {
                    self.ibge_municipalities.insert(code, ibge);
                }
            }
        }
        Ok(())
    }

    /// Loads and returns a fresh `Lookups` in one call.
    pub fn load(dir: &str) -> Result<Self> {
        let mut lookups = Self::default();
        lookups.load_from_directory(dir)?;
        Ok(lookups)
    }

    fn map_for(&mut self, name: &str) -> &mut HashMap<i64, String> {
        match name {
            "countries" => &mut self.countries,
            "cities" => &mut self.cities,
            "cnaes" => &mut self.cnaes,
            "legal_natures" => &mut self.legal_natures,
            "qualifications" => &mut self.qualifications,
            "motives" => &mut self.motives,
            _ => unreachable!("unknown lookup table {name}"),
        }
    }

    pub fn get_country(&self, code: i64) -> Option<&String> {
        self.countries.get(&code)
    }

    pub fn get_city(&self, code: i64) -> Option<&String> {
        self.cities.get(&code)
    }

    pub fn get_legal_nature(&self, code: i64) -> Option<&String> {
        self.legal_natures.get(&code)
    }

    pub fn get_qualification(&self, code: i64) -> Option<&String> {
        self.qualifications.get(&code)
    }

    pub fn get_cnae(&self, code: i64) -> Option<&String> {
        self.cnaes.get(&code)
    }

    pub fn get_motive(&self, code: i64) -> Option<&String> {
        self.motives.get(&code)
    }

    pub fn get_ibge_municipality(&self, code: i64) -> Option<i64> {
        self.ibge_municipalities.get(&code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, filename: &str, rows: &[(i64, &str)]) {
        let path = dir.path().join(filename);
        let mut f = fs::File::create(path).unwrap();
        for (code, label) in rows {
            writeln!(f, "{};{}", code, label).unwrap();
        }
    }

    fn make_full_set(dir: &TempDir) {
        write_table(dir, "F.PAISCSV", &[(76, "BRASIL"), (249, "FRANCA")]);
        write_table(dir, "F.MUNICCSV", &[(7107, "SAO PAULO")]);
        write_table(dir, "F.CNAECSV", &[(4711, "COMERCIO VAREJISTA")]);
        write_table(dir, "F.NATJUCSV", &[(2062, "SOCIEDADE EMPRESARIA LIMITADA")]);
        write_table(dir, "F.QUALSCSV", &[(49, "SOCIO-ADMINISTRADOR")]);
        write_table(dir, "F.MOTICSV", &[(1, "EXTINCAO")]);
    }

    #[test]
    fn test_lookups_creation() {
        let lookups = Lookups::new();
        assert_eq!(lookups.countries.len(), 0);
        assert_eq!(lookups.cities.len(), 0);
    }

    #[test]
    fn test_lookups_get() {
        let mut lookups = Lookups::new();
        lookups.countries.insert(76, "Brasil".to_string());

        assert_eq!(lookups.get_country(76), Some(&"Brasil".to_string()));
        assert_eq!(lookups.get_country(999), None);
    }

    #[test]
    fn loads_all_tables_and_resolves_codes() {
        let dir = TempDir::new().unwrap();
        make_full_set(&dir);
        let lookups = Lookups::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(lookups.get_country(76), Some(&"BRASIL".to_string()));
        assert_eq!(lookups.get_city(7107), Some(&"SAO PAULO".to_string()));
        assert_eq!(lookups.get_cnae(4711), Some(&"COMERCIO VAREJISTA".to_string()));
        assert_eq!(lookups.get_country(999), None);
    }

    #[test]
    fn duplicate_codes_last_one_wins() {
        let dir = TempDir::new().unwrap();
        make_full_set(&dir);
        write_table(&dir, "G.PAISCSV", &[(76, "BRAZIL (UPDATED)")]);
        let lookups = Lookups::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(lookups.get_country(76), Some(&"BRAZIL (UPDATED)".to_string()));
    }

    #[test]
    fn missing_reference_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_table(&dir, "F.PAISCSV", &[(76, "BRASIL")]);
        let err = Lookups::load(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, TransformError::LookupLoad(_)));
    }
}

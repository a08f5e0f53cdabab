// Optional TOML configuration. Every key has a built-in default.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cost::{default_overrides, CarrierOverride};
use crate::error::Result;
use crate::resolver::CandidateTable;
use crate::types::Role;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    /// Per-role candidate lists replacing the built-in ones.
    pub candidates: HashMap<String, Vec<String>>,
    pub carrier_overrides: Vec<CarrierOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            input: PathBuf::from("merged.csv"),
            output_dir: PathBuf::from("."),
            preview_rows: 10,
            candidates: HashMap::new(),
            carrier_overrides: default_overrides(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn candidate_table(&self) -> CandidateTable {
        let mut table = CandidateTable::default();
        for (key, list) in &self.candidates {
            match Role::from_key(key) {
                Some(role) => table.set(role, list.clone()),
                None => tracing::warn!(key = %key, "ignoring candidates for unknown role"),
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AppConfig::parse("").unwrap();
        assert_eq!(cfg.input, PathBuf::from("merged.csv"));
        assert_eq!(cfg.preview_rows, 10);
        assert_eq!(cfg.carrier_overrides, default_overrides());
        assert_eq!(cfg.candidate_table(), CandidateTable::default());
    }

    #[test]
    fn parses_candidates_and_overrides() {
        let cfg = AppConfig::parse(
            r#"
input = "data/merged.csv"
preview_rows = 3

[candidates]
carrier = ["futarceg", "carrier"]
bogus = ["x"]

[[carrier_overrides]]
pattern = "Packeta"
components = ["packeta_dij"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.preview_rows, 3);
        assert_eq!(cfg.carrier_overrides.len(), 1);
        assert_eq!(cfg.carrier_overrides[0].pattern, "Packeta");
        let table = cfg.candidate_table();
        assert_eq!(table.candidates(Role::Carrier).to_vec(), vec!["futarceg", "carrier"]);
        assert_eq!(table.candidates(Role::Date)[0], "kelt");
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(AppConfig::parse("preview_rows = \"many\"").is_err());
    }
}

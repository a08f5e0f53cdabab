// Canonical shipping cost per row: a direct cost column when there is one,
// otherwise the sum of the itemized fee columns, with carrier overrides.
use serde::Deserialize;

use crate::resolver::FieldMap;
use crate::types::{Dataset, Role};

/// Column name used for the synthesized cost in exports.
pub const COST_COLUMN: &str = "szall_kltsg";

/// Generic fee components: base fee, COD fee, insurance, fuel surcharge,
/// toll, card fee, depot-out fee, return fee, other, and carrier variants.
pub const FEE_COMPONENTS: [&str; 11] = [
    "alapdij",
    "utanvet_dij",
    "biztositas",
    "uzemanyag_potdij",
    "utdij",
    "kartyas_dij",
    "depo_kiadasi_dij",
    "visszaszallitas_dij",
    "egyeb",
    "mpl_kezelesi_dij",
    "foxpost_dij",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarrierOverride {
    /// Case-insensitive substring of the carrier name.
    pub pattern: String,
    pub components: Vec<String>,
}

impl CarrierOverride {
    pub fn matches(&self, carrier: &str) -> bool {
        carrier.to_lowercase().contains(&self.pattern.to_lowercase())
    }
}

pub fn default_overrides() -> Vec<CarrierOverride> {
    vec![CarrierOverride {
        pattern: "GLS".to_string(),
        components: ["gls_alapdij", "gls_uzemanyag_potdij", "gls_utdij", "utanvet_dij"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostSource {
    /// An existing cost column, used as-is.
    Column(String),
    /// Summed from fee-component columns.
    Components(Vec<String>),
    None,
}

/// The dataset plus a synthesized cost overlay; the rows are never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct CostedDataset {
    pub data: Dataset,
    pub cost: Option<Vec<Option<f64>>>,
    pub source: CostSource,
}

impl CostedDataset {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn has_cost(&self) -> bool {
        self.cost.is_some()
    }

    pub fn cost_at(&self, row: usize) -> Option<f64> {
        self.cost.as_ref().and_then(|c| c[row])
    }

    /// Filtered subset with the overlay carried along.
    pub fn select(&self, indices: &[usize]) -> CostedDataset {
        CostedDataset {
            data: self.data.select(indices),
            cost: self
                .cost
                .as_ref()
                .map(|c| indices.iter().map(|&i| c[i]).collect()),
            source: self.source.clone(),
        }
    }
}

/// Sum of the numeric component values of one row. Missing components
/// count as zero as long as at least one of them is numeric.
fn sum_components(data: &Dataset, row: usize, columns: &[&str]) -> Option<f64> {
    let mut total = None;
    for col in columns {
        if let Some(v) = data.value(row, col).as_f64() {
            total = Some(total.unwrap_or(0.0) + v);
        }
    }
    total
}

fn present<'a, S: AsRef<str>>(data: &Dataset, names: &'a [S]) -> Vec<&'a str> {
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|n| data.has_column(n))
        .collect()
}

pub fn synthesize_cost(
    data: &Dataset,
    fields: &FieldMap,
    overrides: &[CarrierOverride],
) -> CostedDataset {
    if let Some(col) = fields.get(Role::Cost) {
        let cost = (0..data.len()).map(|r| data.value(r, col).as_f64()).collect();
        tracing::info!(column = col, "using existing shipping cost column");
        return CostedDataset {
            data: data.clone(),
            cost: Some(cost),
            source: CostSource::Column(col.to_string()),
        };
    }

    let generic = present(data, &FEE_COMPONENTS);
    let carrier_col = fields.get(Role::Carrier);
    let active: Vec<(&CarrierOverride, Vec<&str>)> = match carrier_col {
        Some(_) => overrides
            .iter()
            .map(|o| (o, present(data, &o.components)))
            .filter(|(_, cols)| !cols.is_empty())
            .collect(),
        None => Vec::new(),
    };

    if generic.is_empty() && active.is_empty() {
        tracing::warn!("no shipping cost column and no fee component columns found");
        return CostedDataset { data: data.clone(), cost: None, source: CostSource::None };
    }

    let mut overridden = 0usize;
    let cost: Vec<Option<f64>> = (0..data.len())
        .map(|r| {
            let carrier = data.get(r, carrier_col).to_string();
            let hit = if carrier.is_empty() {
                None
            } else {
                // first matching pattern wins
                active.iter().find(|(o, _)| o.matches(&carrier))
            };
            match hit {
                Some((_, cols)) => {
                    overridden += 1;
                    sum_components(data, r, cols)
                }
                None => sum_components(data, r, &generic),
            }
        })
        .collect();

    let mut used: Vec<String> = generic.iter().map(|s| s.to_string()).collect();
    for (_, cols) in &active {
        for c in cols {
            if !used.iter().any(|u| u == c) {
                used.push(c.to_string());
            }
        }
    }
    tracing::info!(
        components = used.len(),
        overridden_rows = overridden,
        "synthesized shipping cost from fee components"
    );
    CostedDataset { data: data.clone(), cost: Some(cost), source: CostSource::Components(used) }
}

// Maps the heterogeneous source columns onto the canonical roles.
use std::collections::{BTreeMap, HashSet};

use crate::types::Role;

/// Default candidate names per role, most preferred first: the localized
/// column name, then the English one, then the generic one.
pub fn default_candidates(role: Role) -> &'static [&'static str] {
    match role {
        Role::Date => &["kelt", "teljesites", "invoice_date", "date"],
        Role::Country => &["orszag", "country_code", "country"],
        Role::Shop => &["shop", "webshop", "store"],
        Role::Carrier => &["futar", "szallito", "carrier"],
        Role::Price => &["ar", "brutto_ar", "price"],
        Role::Revenue => &["bevetel", "brutto_osszeg", "revenue"],
        Role::Margin => &["arres", "fedezet", "margin"],
        Role::Cost => &["szall_kltsg", "szallitasi_koltseg", "shipping_cost", "cost"],
        Role::Invoice => &["szamlaszam", "invoice_id", "invoice"],
        Role::Customer => &["vevo_nev", "customer_name", "customer"],
    }
}

/// Candidate lists for every role.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTable {
    lists: BTreeMap<Role, Vec<String>>,
}

impl Default for CandidateTable {
    fn default() -> Self {
        let lists = Role::ALL
            .iter()
            .map(|&r| (r, default_candidates(r).iter().map(|s| s.to_string()).collect()))
            .collect();
        CandidateTable { lists }
    }
}

impl CandidateTable {
    /// Replace the candidate list of one role.
    pub fn set(&mut self, role: Role, candidates: Vec<String>) {
        self.lists.insert(role, candidates);
    }

    pub fn candidates(&self, role: Role) -> &[String] {
        self.lists.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// First candidate present in `available`, in priority order.
pub fn resolve<S: AsRef<str>>(candidates: &[S], available: &HashSet<&str>) -> Option<String> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|c| available.contains(c))
        .map(str::to_string)
}

/// The column chosen for each role in the current dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    columns: BTreeMap<Role, String>,
}

impl FieldMap {
    pub fn resolve(headers: &[String], table: &CandidateTable) -> Self {
        let available: HashSet<&str> = headers.iter().map(String::as_str).collect();
        let mut columns = BTreeMap::new();
        for role in Role::ALL {
            match resolve(table.candidates(role), &available) {
                Some(col) => {
                    tracing::debug!(%role, column = %col, "resolved column");
                    columns.insert(role, col);
                }
                None => tracing::info!(%role, "no matching column; role is unavailable"),
            }
        }
        FieldMap { columns }
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    pub fn is_resolved(&self, role: Role) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn unresolved(&self) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|r| !self.is_resolved(*r)).collect()
    }

    #[cfg(test)]
    pub fn with(mut self, role: Role, column: &str) -> Self {
        self.columns.insert(role, column.to_string());
        self
    }
}

// Row selection for the dashboard: exact-match selectors plus a date range.
use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::resolver::FieldMap;
use crate::types::{Dataset, Role};

/// Sentinel shown as the first selector option.
pub const ALL: &str = "(all)";
const ALL_LOCALIZED: &str = "(összes)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Exact(String),
}

impl Selection {
    pub fn parse(s: &str) -> Selection {
        let s = s.trim();
        if s == ALL || s == ALL_LOCALIZED {
            Selection::All
        } else {
            Selection::Exact(s.to_string())
        }
    }

    /// Menu input for a selector: `0` or a sentinel means all, `1..=n` picks
    /// an option by number, and a typed value is accepted if it is an option.
    pub fn from_choice(input: &str, options: &[String]) -> Option<Selection> {
        match input.trim().parse::<usize>() {
            Ok(0) => Some(Selection::All),
            Ok(n) if n <= options.len() => Some(Selection::Exact(options[n - 1].clone())),
            Ok(_) => None,
            Err(_) => match Selection::parse(input) {
                Selection::All => Some(Selection::All),
                Selection::Exact(v) if options.contains(&v) => Some(Selection::Exact(v)),
                Selection::Exact(_) => None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub country: Selection,
    pub shop: Selection,
    pub carrier: Selection,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterSpec {
    pub fn describe(&self) -> String {
        let sel = |s: &Selection| match s {
            Selection::All => ALL.to_string(),
            Selection::Exact(v) => v.clone(),
        };
        let range = match self.date_range {
            Some((a, b)) => format!("{} .. {}", a, b),
            None => ALL.to_string(),
        };
        format!(
            "country={}, shop={}, carrier={}, date={}",
            sel(&self.country),
            sel(&self.shop),
            sel(&self.carrier),
            range
        )
    }
}

enum Predicate<'a> {
    Equals { column: &'a str, value: &'a str },
    DateRange { column: &'a str, from: NaiveDate, to: NaiveDate },
}

impl Predicate<'_> {
    fn matches(&self, data: &Dataset, row: usize) -> bool {
        match self {
            Predicate::Equals { column, value } => data.value(row, column).to_string() == *value,
            Predicate::DateRange { column, from, to } => match data.value(row, column).as_date() {
                Some(d) => *from <= d && d <= *to,
                None => false,
            },
        }
    }
}

/// Active predicates; the ones on unresolved roles are left out.
fn predicates<'a>(fields: &'a FieldMap, spec: &'a FilterSpec) -> Vec<Predicate<'a>> {
    let mut out = Vec::new();
    for (role, sel) in [
        (Role::Country, &spec.country),
        (Role::Shop, &spec.shop),
        (Role::Carrier, &spec.carrier),
    ] {
        if let (Some(column), Selection::Exact(value)) = (fields.get(role), sel) {
            out.push(Predicate::Equals { column, value });
        }
    }
    if let (Some(column), Some((a, b))) = (fields.get(Role::Date), spec.date_range) {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        out.push(Predicate::DateRange { column, from, to });
    }
    out
}

/// Indices of the rows matching every active predicate, in input order.
pub fn filter(data: &Dataset, fields: &FieldMap, spec: &FilterSpec) -> Vec<usize> {
    let preds = predicates(fields, spec);
    (0..data.len())
        .filter(|&r| preds.iter().all(|p| p.matches(data, r)))
        .collect()
}

/// Sorted distinct non-empty values of a column, for populating a selector.
pub fn distinct_values(data: &Dataset, column: &str) -> Vec<String> {
    let set: BTreeSet<String> = (0..data.len())
        .map(|r| data.value(r, column))
        .filter(|v| !v.is_missing())
        .map(|v| v.to_string())
        .collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> (Dataset, FieldMap) {
        let mut ds = Dataset::new(vec!["kelt".into(), "orszag".into(), "shop".into(), "futar".into()]);
        for (date, country, shop, carrier) in [
            ("2024-01-01", "HU", "alpha", "GLS"),
            ("2024-01-05", "HU", "beta", "DPD"),
            ("2024-01-10", "SK", "alpha", "GLS Express"),
            ("garbage", "HU", "alpha", "GLS"),
            ("", "RO", "beta", ""),
        ] {
            ds.push_row(vec![
                Value::infer(date),
                Value::infer(country),
                Value::infer(shop),
                Value::infer(carrier),
            ]);
        }
        let fields = FieldMap::default()
            .with(Role::Date, "kelt")
            .with(Role::Country, "orszag")
            .with(Role::Shop, "shop")
            .with(Role::Carrier, "futar");
        (ds, fields)
    }

    #[test]
    fn all_selection_keeps_everything() {
        let (ds, fields) = sample();
        assert_eq!(filter(&ds, &fields, &FilterSpec::default()).len(), 5);
    }

    #[test]
    fn exact_selectors_are_anded() {
        let (ds, fields) = sample();
        let spec = FilterSpec {
            country: Selection::Exact("HU".into()),
            shop: Selection::Exact("alpha".into()),
            ..Default::default()
        };
        assert_eq!(filter(&ds, &fields, &spec), vec![0, 3]);
    }

    #[test]
    fn date_range_is_inclusive_and_drops_bad_dates() {
        let (ds, fields) = sample();
        let spec = FilterSpec { date_range: Some((d(2024, 1, 1), d(2024, 1, 5))), ..Default::default() };
        assert_eq!(filter(&ds, &fields, &spec), vec![0, 1]);
    }

    #[test]
    fn swapped_range_is_normalized() {
        let (ds, fields) = sample();
        let fwd = FilterSpec { date_range: Some((d(2024, 1, 2), d(2024, 1, 10))), ..Default::default() };
        let rev = FilterSpec { date_range: Some((d(2024, 1, 10), d(2024, 1, 2))), ..Default::default() };
        assert_eq!(filter(&ds, &fields, &fwd), filter(&ds, &fields, &rev));
        assert_eq!(filter(&ds, &fields, &fwd), vec![1, 2]);
    }

    #[test]
    fn predicates_on_unresolved_roles_are_ignored() {
        let (ds, _) = sample();
        let spec = FilterSpec {
            carrier: Selection::Exact("nobody".into()),
            date_range: Some((d(2030, 1, 1), d(2030, 1, 2))),
            ..Default::default()
        };
        assert_eq!(filter(&ds, &FieldMap::default(), &spec).len(), 5);
    }

    #[test]
    fn sentinel_parses_to_all() {
        assert_eq!(Selection::parse("(all)"), Selection::All);
        assert_eq!(Selection::parse("(összes)"), Selection::All);
        assert_eq!(Selection::parse("GLS"), Selection::Exact("GLS".into()));
    }

    #[test]
    fn menu_choices_map_to_selections() {
        let options = vec!["DPD".to_string(), "GLS".to_string()];
        assert_eq!(Selection::from_choice("0", &options), Some(Selection::All));
        assert_eq!(Selection::from_choice("(összes)", &options), Some(Selection::All));
        assert_eq!(Selection::from_choice("2", &options), Some(Selection::Exact("GLS".into())));
        assert_eq!(Selection::from_choice(" DPD ", &options), Some(Selection::Exact("DPD".into())));
        assert_eq!(Selection::from_choice("3", &options), None);
        assert_eq!(Selection::from_choice("UPS", &options), None);
    }

    #[test]
    fn distinct_values_skip_missing() {
        let (ds, _) = sample();
        assert_eq!(distinct_values(&ds, "futar"), vec!["DPD", "GLS", "GLS Express"]);
    }

    proptest! {
        #[test]
        fn more_predicates_never_grow_the_result(
            country in prop_oneof![Just("HU"), Just("SK"), Just("RO")],
            shop in prop_oneof![Just("alpha"), Just("beta")],
            carrier in prop_oneof![Just("GLS"), Just("DPD")],
            from in 0u32..12,
            to in 0u32..12,
        ) {
            let (ds, fields) = sample();
            let mut spec = FilterSpec::default();
            let mut last = filter(&ds, &fields, &spec).len();
            spec.country = Selection::Exact(country.into());
            let n = filter(&ds, &fields, &spec).len();
            prop_assert!(n <= last);
            last = n;
            spec.shop = Selection::Exact(shop.into());
            let n = filter(&ds, &fields, &spec).len();
            prop_assert!(n <= last);
            last = n;
            spec.carrier = Selection::Exact(carrier.into());
            let n = filter(&ds, &fields, &spec).len();
            prop_assert!(n <= last);
            last = n;
            spec.date_range = Some((d(2024, 1, 1 + from), d(2024, 1, 1 + to)));
            prop_assert!(filter(&ds, &fields, &spec).len() <= last);
        }

        #[test]
        fn swapping_bounds_gives_same_subset(a in 0u32..12, b in 0u32..12) {
            let (ds, fields) = sample();
            let fwd = FilterSpec { date_range: Some((d(2024, 1, 1 + a), d(2024, 1, 1 + b))), ..Default::default() };
            let rev = FilterSpec { date_range: Some((d(2024, 1, 1 + b), d(2024, 1, 1 + a))), ..Default::default() };
            prop_assert_eq!(filter(&ds, &fields, &fwd), filter(&ds, &fields, &rev));
        }
    }
}

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::cost::{CostedDataset, COST_COLUMN};
use crate::error::{ReportError, Result};
use crate::resolver::{default_candidates, FieldMap};
use crate::types::{DailyCostRow, LineItemRecord, MetricsRecord, Role, Value};
use crate::util::average;

/// Numeric values of a resolved column; non-numeric cells are dropped.
fn numeric_column(data: &CostedDataset, column: Option<&str>) -> Vec<f64> {
    match column {
        Some(col) => (0..data.len()).filter_map(|r| data.data.value(r, col).as_f64()).collect(),
        None => Vec::new(),
    }
}

fn sum_or_none(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

fn canonical_name(role: Role) -> String {
    default_candidates(role)[0].to_string()
}

/// The dashboard needs at least one of date and cost to show anything useful.
pub fn check_required(fields: &FieldMap, data: &CostedDataset) -> Result<()> {
    if !fields.is_resolved(Role::Date) && !data.has_cost() {
        return Err(ReportError::MissingFields(vec![
            canonical_name(Role::Date),
            COST_COLUMN.to_string(),
        ]));
    }
    Ok(())
}

pub fn aggregate(subset: &CostedDataset, fields: &FieldMap) -> MetricsRecord {
    let prices = numeric_column(subset, fields.get(Role::Price));
    let revenue = numeric_column(subset, fields.get(Role::Revenue));
    let margin = numeric_column(subset, fields.get(Role::Margin));
    let costs: Vec<f64> = (0..subset.len()).filter_map(|r| subset.cost_at(r)).collect();

    MetricsRecord {
        count: subset.len(),
        avg_price: average(&prices),
        min_price: prices.iter().copied().reduce(f64::min),
        max_price: prices.iter().copied().reduce(f64::max),
        revenue_sum: sum_or_none(&revenue),
        margin_sum: sum_or_none(&margin),
        cost_sum: sum_or_none(&costs),
    }
}

fn text(v: &Value) -> Option<String> {
    if v.is_missing() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Sort tier of an invoice id: numeric ids first, then text ids, then missing.
fn id_key(id: &Option<String>) -> (u8, f64, &str) {
    match id {
        Some(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => (0, n, s.as_str()),
            _ => (1, 0.0, s.as_str()),
        },
        None => (2, 0.0, ""),
    }
}

fn compare_ids(a: &Option<String>, b: &Option<String>) -> Ordering {
    let (ta, na, sa) = id_key(a);
    let (tb, nb, sb) = id_key(b);
    ta.cmp(&tb)
        .then_with(|| na.total_cmp(&nb))
        .then_with(|| sa.cmp(sb))
}

pub fn build_line_items(subset: &CostedDataset, fields: &FieldMap) -> Vec<LineItemRecord> {
    let data = &subset.data;
    let mut items: Vec<LineItemRecord> = (0..subset.len())
        .map(|r| {
            let revenue = data.get(r, fields.get(Role::Revenue)).as_f64();
            let cost = subset.cost_at(r);
            let result = match (revenue, cost) {
                (Some(rev), Some(c)) => Some(rev - c),
                _ => None,
            };
            let result_pct = match (result, revenue) {
                (Some(res), Some(rev)) if rev != 0.0 => Some(res / rev * 100.0),
                _ => None,
            };
            LineItemRecord {
                invoice_id: text(data.get(r, fields.get(Role::Invoice))),
                shop: text(data.get(r, fields.get(Role::Shop))),
                customer: text(data.get(r, fields.get(Role::Customer))),
                carrier: text(data.get(r, fields.get(Role::Carrier))),
                revenue,
                cost,
                result,
                result_pct,
            }
        })
        .collect();

    if fields.is_resolved(Role::Invoice) {
        items.sort_by(|a, b| compare_ids(&a.invoice_id, &b.invoice_id));
    }
    items
}

/// Total shipping cost per calendar day, ascending.
pub fn daily_cost(subset: &CostedDataset, fields: &FieldMap) -> Result<Vec<DailyCostRow>> {
    let mut missing = Vec::new();
    if !fields.is_resolved(Role::Date) {
        missing.push(canonical_name(Role::Date));
    }
    if !subset.has_cost() {
        missing.push(COST_COLUMN.to_string());
    }
    if !missing.is_empty() {
        return Err(ReportError::MissingFields(missing));
    }

    let mut by_day: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    for r in 0..subset.len() {
        if let Some(day) = subset.data.get(r, fields.get(Role::Date)).as_date() {
            *by_day.entry(day).or_insert(0.0) += subset.cost_at(r).unwrap_or(0.0);
        }
    }
    Ok(by_day
        .into_iter()
        .map(|(date, cost)| DailyCostRow { date, cost })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{synthesize_cost, CostSource};
    use crate::types::Dataset;

    fn costed(headers: &[&str], rows: &[&[&str]]) -> (CostedDataset, FieldMap) {
        let mut ds = Dataset::new(headers.iter().map(|s| s.to_string()).collect());
        for r in rows {
            ds.push_row(r.iter().map(|c| Value::infer(c)).collect());
        }
        let fields = FieldMap::resolve(ds.headers(), &Default::default());
        let costed = synthesize_cost(&ds, &fields, &[]);
        (costed, fields)
    }

    #[test]
    fn line_items_derive_result_and_percentage() {
        let (data, fields) = costed(
            &["bevetel", "szall_kltsg"],
            &[&["100", "40"], &["200", "260"], &["", "10"]],
        );
        let items = build_line_items(&data, &fields);
        let results: Vec<_> = items.iter().map(|i| i.result).collect();
        let pcts: Vec<_> = items.iter().map(|i| i.result_pct).collect();
        assert_eq!(results, vec![Some(60.0), Some(-60.0), None]);
        assert_eq!(pcts, vec![Some(60.0), Some(-30.0), None]);

        let m = aggregate(&data, &fields);
        assert_eq!(m.revenue_sum, Some(300.0));
        assert_eq!(m.count, 3);
        assert_eq!(m.cost_sum, Some(310.0));
    }

    #[test]
    fn zero_revenue_has_no_percentage() {
        let (data, fields) = costed(&["bevetel", "szall_kltsg"], &[&["0", "5"]]);
        let items = build_line_items(&data, &fields);
        assert_eq!(items[0].result, Some(-5.0));
        assert_eq!(items[0].result_pct, None);
    }

    #[test]
    fn non_numeric_price_is_unavailable() {
        let (data, fields) = costed(&["ar"], &[&["cheap"], &["pricey"], &["n/a"]]);
        let m = aggregate(&data, &fields);
        assert_eq!(m.count, 3);
        assert_eq!((m.avg_price, m.min_price, m.max_price), (None, None, None));
        assert_eq!(m.revenue_sum, None);
        assert_eq!(m.margin_sum, None);
    }

    #[test]
    fn stray_text_in_price_is_dropped() {
        let (data, fields) = costed(&["ar", "arres"], &[&["10", "1"], &["x", "2"], &["30", ""]]);
        let m = aggregate(&data, &fields);
        assert_eq!(m.avg_price, Some(20.0));
        assert_eq!(m.min_price, Some(10.0));
        assert_eq!(m.max_price, Some(30.0));
        assert_eq!(m.margin_sum, Some(3.0));
    }

    #[test]
    fn line_items_sort_by_invoice_id() {
        let (data, fields) = costed(
            &["szamlaszam", "bevetel"],
            &[&["10", "1"], &["", "2"], &["9", "3"], &["100", "4"]],
        );
        let ids: Vec<_> = build_line_items(&data, &fields)
            .into_iter()
            .map(|i| i.invoice_id)
            .collect();
        assert_eq!(
            ids,
            vec![Some("9".into()), Some("10".into()), Some("100".into()), None]
        );
    }

    #[test]
    fn mixed_invoice_ids_sort_numbers_then_text() {
        let ids: Vec<String> = (0..300)
            .map(|i| match i % 3 {
                0 => format!("{}", 1000 - i),
                1 => format!("{}a", i),
                _ => format!("INV-{:04}", i),
            })
            .collect();
        let rows: Vec<[&str; 2]> = ids.iter().map(|id| [id.as_str(), "1"]).collect();
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let (data, fields) = costed(&["szamlaszam", "bevetel"], &row_refs);

        let sorted: Vec<String> = build_line_items(&data, &fields)
            .into_iter()
            .filter_map(|i| i.invoice_id)
            .collect();
        assert_eq!(sorted.len(), 300);
        let first_text = sorted.iter().position(|s| s.parse::<f64>().is_err()).unwrap();
        assert_eq!(first_text, 100);
        let numbers: Vec<f64> = sorted[..first_text].iter().map(|s| s.parse().unwrap()).collect();
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        assert!(sorted[first_text..].windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn numeric_looking_ids_keep_their_text() {
        let (data, fields) = costed(
            &["szamlaszam", "vevo_nev", "bevetel"],
            &[&["000123", "12345678901234567891", "10"]],
        );
        let items = build_line_items(&data, &fields);
        assert_eq!(items[0].invoice_id.as_deref(), Some("000123"));
        assert_eq!(items[0].customer.as_deref(), Some("12345678901234567891"));
        assert_eq!(items[0].revenue, Some(10.0));
    }

    #[test]
    fn input_order_kept_without_invoice_column() {
        let (data, fields) = costed(&["shop"], &[&["b"], &["a"]]);
        let shops: Vec<_> = build_line_items(&data, &fields)
            .into_iter()
            .map(|i| i.shop)
            .collect();
        assert_eq!(shops, vec![Some("b".into()), Some("a".into())]);
    }

    #[test]
    fn missing_date_and_cost_is_reported() {
        let (data, fields) = costed(&["shop", "ar"], &[&["a", "1"]]);
        assert_eq!(data.source, CostSource::None);
        match check_required(&fields, &data) {
            Err(ReportError::MissingFields(f)) => assert_eq!(f, vec!["kelt", "szall_kltsg"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn daily_cost_groups_by_day() {
        let (data, fields) = costed(
            &["kelt", "szall_kltsg"],
            &[
                &["2024-01-02", "10"],
                &["2024-01-01", "5"],
                &["2024-01-02 08:00:00", "7"],
                &["", "100"],
                &["2024-01-01", ""],
            ],
        );
        let rows = daily_cost(&data, &fields).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cost, 5.0);
        assert_eq!(rows[1].cost, 17.0);
        assert!(rows[0].date < rows[1].date);
    }

    #[test]
    fn daily_cost_needs_a_date_column() {
        let (data, fields) = costed(&["szall_kltsg"], &[&["1"]]);
        assert!(matches!(
            daily_cost(&data, &fields),
            Err(ReportError::MissingFields(f)) if f == vec!["kelt".to_string()]
        ));
    }
}

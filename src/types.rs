use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

use crate::util::{format_metric, parse_date_safe, parse_f64_safe};

/// A single cell of the merged dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Value {
    /// Infer the cell type from its raw CSV text. A cell only becomes a
    /// `Number` or `Date` when rendering it back yields the same text, so
    /// ids like `000123` stay `Text` and still coerce through `as_f64`.
    pub fn infer(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Missing;
        }
        let typed = parse_f64_safe(Some(s))
            .map(Value::Number)
            .or_else(|| parse_date_safe(Some(s)).map(Value::Date));
        match typed {
            Some(v) if v.to_string() == s => v,
            _ => Value::Text(s.to_string()),
        }
    }

    /// Numeric coercion; anything that does not parse is missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_f64_safe(Some(s)),
            Value::Date(_) | Value::Missing => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => parse_date_safe(Some(s)),
            Value::Number(_) | Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Missing => Ok(()),
        }
    }
}

/// Rows x named columns, in file order. Columns vary between source runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Dataset { headers, index, rows: Vec::new() }
    }

    /// Append a row, padding short rows with `Missing` and dropping extra cells.
    pub fn push_row(&mut self, mut cells: Vec<Value>) {
        cells.resize(self.headers.len(), Value::Missing);
        self.rows.push(cells);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> &[Value] {
        &self.rows[idx]
    }

    /// Cell lookup by column name; unknown columns read as missing.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        match self.index.get(column) {
            Some(&c) => &self.rows[row][c],
            None => &Value::Missing,
        }
    }

    /// Same cell lookup for an optionally-resolved column.
    pub fn get(&self, row: usize, column: Option<&str>) -> &Value {
        match column {
            Some(c) => self.value(row, c),
            None => &Value::Missing,
        }
    }

    /// A new dataset holding the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            index: self.index.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// The semantic concepts the report logic works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Date,
    Country,
    Shop,
    Carrier,
    Price,
    Revenue,
    Margin,
    Cost,
    Invoice,
    Customer,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Date,
        Role::Country,
        Role::Shop,
        Role::Carrier,
        Role::Price,
        Role::Revenue,
        Role::Margin,
        Role::Cost,
        Role::Invoice,
        Role::Customer,
    ];

    /// Config key for the role (`[candidates]` table).
    pub fn key(&self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Country => "country",
            Role::Shop => "shop",
            Role::Carrier => "carrier",
            Role::Price => "price",
            Role::Revenue => "revenue",
            Role::Margin => "margin",
            Role::Cost => "cost",
            Role::Invoice => "invoice",
            Role::Customer => "customer",
        }
    }

    pub fn from_key(key: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.key() == key)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub count: usize,
    pub avg_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub revenue_sum: Option<f64>,
    pub margin_sum: Option<f64>,
    pub cost_sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItemRecord {
    pub invoice_id: Option<String>,
    pub shop: Option<String>,
    pub customer: Option<String>,
    pub carrier: Option<String>,
    pub revenue: Option<f64>,
    pub cost: Option<f64>,
    pub result: Option<f64>,
    pub result_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCostRow {
    pub date: NaiveDate,
    #[serde(rename = "szall_kltsg")]
    pub cost: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricsRecord {
    /// Rows for the two-column metrics table.
    pub fn rows(&self) -> Vec<MetricRow> {
        let row = |metric: &str, value: String| MetricRow { metric: metric.to_string(), value };
        vec![
            row("Shipments", crate::util::format_count(self.count)),
            row("Avg price", format_metric(self.avg_price, 2)),
            row("Min price", format_metric(self.min_price, 2)),
            row("Max price", format_metric(self.max_price, 2)),
            row("Revenue", format_metric(self.revenue_sum, 2)),
            row("Margin", format_metric(self.margin_sum, 2)),
            row("Shipping cost", format_metric(self.cost_sum, 2)),
        ]
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LineItemRow {
    #[tabled(rename = "Invoice")]
    pub invoice_id: String,
    #[tabled(rename = "Shop")]
    pub shop: String,
    #[tabled(rename = "Customer")]
    pub customer: String,
    #[tabled(rename = "Carrier")]
    pub carrier: String,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "Result")]
    pub result: String,
    #[tabled(rename = "Result %")]
    pub result_pct: String,
}

impl From<&LineItemRecord> for LineItemRow {
    fn from(r: &LineItemRecord) -> Self {
        let text = |s: &Option<String>| s.clone().unwrap_or_default();
        LineItemRow {
            invoice_id: text(&r.invoice_id),
            shop: text(&r.shop),
            customer: text(&r.customer),
            carrier: text(&r.carrier),
            revenue: format_metric(r.revenue, 2),
            cost: format_metric(r.cost, 2),
            result: format_metric(r.result, 2),
            result_pct: format_metric(r.result_pct, 1),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyCostDisplayRow {
    #[tabled(rename = "kelt")]
    pub date: String,
    #[tabled(rename = "szall_kltsg")]
    pub cost: String,
}

impl From<&DailyCostRow> for DailyCostDisplayRow {
    fn from(r: &DailyCostRow) -> Self {
        DailyCostDisplayRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            cost: crate::util::format_number(r.cost, 2),
        }
    }
}

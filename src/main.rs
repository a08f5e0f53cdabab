// Entry point and high-level CLI flow.
//
// A terminal version of the shipping cost dashboard:
// - Option [1] loads the merged CSV, resolves its columns and derives the
//   shipping cost.
// - Option [2] sets the country / shop / carrier / date filters.
// - Options [3] and [4] show the metrics, the per-invoice listing and the
//   daily cost summary for the filtered rows.
// - Option [5] exports the filtered rows and the listing.
mod config;
mod cost;
mod error;
mod filter;
mod loader;
mod output;
mod reports;
mod resolver;
mod types;
mod util;

use chrono::NaiveDate;
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use config::AppConfig;
use cost::CostedDataset;
use error::{ReportError, Result};
use filter::{FilterSpec, Selection};
use resolver::FieldMap;
use types::{DailyCostDisplayRow, LineItemRow, Role};

#[derive(Debug, Parser)]
#[command(name = "shipping_report", about = "Shipping cost and profitability report")]
struct Args {
    /// Merged CSV to load (defaults to the config value, then `merged.csv`).
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Optional TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory for exported files.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

// In-memory app state so the CSV is loaded once but the views can be
// recomputed for every filter change.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState { config: AppConfig::default(), loaded: None, filter: FilterSpec::default() })
});

struct AppState {
    config: AppConfig,
    loaded: Option<Loaded>,
    filter: FilterSpec,
}

#[derive(Clone)]
struct Loaded {
    data: CostedDataset,
    fields: FieldMap,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|e| e.into_inner())
}

fn prompt(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    if let Ok(0) = io::stdin().read_line(&mut buf) {
        println!("\nExiting the program.");
        std::process::exit(0);
    }
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice")
}

/// Handle option [1]: load the CSV, resolve columns, derive the cost.
fn handle_load() -> Result<()> {
    let (path, table, overrides) = {
        let st = state();
        (st.config.input.clone(), st.config.candidate_table(), st.config.carrier_overrides.clone())
    };
    let (data, report) = loader::load_dataset(&path)?;
    let fields = FieldMap::resolve(data.headers(), &table);
    let costed = cost::synthesize_cost(&data, &fields, &overrides);

    println!(
        "Processing dataset... ({} rows, {} columns loaded)",
        util::format_count(report.total_rows),
        util::format_count(report.columns)
    );
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse errors.",
            util::format_count(report.parse_errors)
        );
    }
    let unresolved = fields.unresolved();
    if !unresolved.is_empty() {
        let names: Vec<&str> = unresolved.iter().map(|r| r.key()).collect();
        println!("Info: no column found for: {}", names.join(", "));
    }
    match &costed.source {
        cost::CostSource::Column(c) => println!("Shipping cost taken from column '{}'.", c),
        cost::CostSource::Components(c) => {
            println!("Shipping cost summed from {} fee columns.", c.len())
        }
        cost::CostSource::None => println!("Warning: no shipping cost could be derived."),
    }
    println!();

    let mut st = state();
    st.loaded = Some(Loaded { data: costed, fields });
    st.filter = FilterSpec::default();
    Ok(())
}

fn loaded() -> Result<Loaded> {
    state().loaded.clone().ok_or(ReportError::NoData)
}

fn pick_selection(label: &str, options: &[String]) -> Selection {
    println!("{} filter:", label);
    println!("[0] {}", filter::ALL);
    for (i, o) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, o);
    }
    loop {
        match Selection::from_choice(&read_choice(), options) {
            Some(sel) => return sel,
            None => println!("Invalid choice. Enter 0 to {} or one of the listed values.", options.len()),
        }
    }
}

fn read_date(label: &str) -> Option<NaiveDate> {
    loop {
        let s = prompt(label);
        if s.is_empty() {
            return None;
        }
        match util::parse_date_safe(Some(&s)) {
            Some(d) => return Some(d),
            None => println!("Invalid date. Use YYYY-MM-DD or leave empty."),
        }
    }
}

/// Handle option [2]: choose the selectors and the date range.
fn handle_filters() -> Result<()> {
    let Loaded { data, fields } = loaded()?;
    let mut spec = FilterSpec::default();

    for (role, label) in [(Role::Country, "Country"), (Role::Shop, "Shop"), (Role::Carrier, "Carrier")] {
        let Some(column) = fields.get(role) else {
            println!("No {} column, not filtering on it.", role);
            continue;
        };
        let sel = pick_selection(label, &filter::distinct_values(&data.data, column));
        match role {
            Role::Country => spec.country = sel,
            Role::Shop => spec.shop = sel,
            _ => spec.carrier = sel,
        }
    }

    if let Some(column) = fields.get(Role::Date) {
        let dates: Vec<NaiveDate> =
            (0..data.len()).filter_map(|r| data.data.value(r, column).as_date()).collect();
        if let (Some(min), Some(max)) = (dates.iter().min().copied(), dates.iter().max().copied()) {
            println!("Dates available: {} .. {}", min, max);
            let from = read_date("From date (empty = earliest)");
            let to = read_date("To date (empty = latest)");
            if from.is_some() || to.is_some() {
                spec.date_range = Some((from.unwrap_or(min), to.unwrap_or(max)));
            }
        }
    }

    println!("Filters: {}\n", spec.describe());
    state().filter = spec;
    Ok(())
}

fn filtered() -> Result<(CostedDataset, FieldMap, FilterSpec, usize)> {
    let Loaded { data, fields } = loaded()?;
    let spec = state().filter.clone();
    let rows = filter::filter(&data.data, &fields, &spec);
    Ok((data.select(&rows), fields, spec, data.len()))
}

/// Handle option [3]: metrics and the per-invoice listing.
fn handle_dashboard(preview_rows: usize) -> Result<()> {
    let (subset, fields, spec, total) = filtered()?;
    reports::check_required(&fields, &subset)?;

    println!(
        "{} of {} rows selected ({})\n",
        util::format_count(subset.len()),
        util::format_count(total),
        spec.describe()
    );
    let metrics = reports::aggregate(&subset, &fields);
    output::print_table("Summary", None, &metrics.rows(), usize::MAX);

    let items = reports::build_line_items(&subset, &fields);
    let rows: Vec<LineItemRow> = items.iter().map(LineItemRow::from).collect();
    let note = format!("first {} of {} invoices", preview_rows.min(rows.len()), rows.len());
    output::print_table("Profitability by invoice", Some(&note), &rows, preview_rows);
    Ok(())
}

/// Handle option [4]: total shipping cost per day.
fn handle_daily() -> Result<()> {
    let (subset, fields, _, _) = filtered()?;
    let days = reports::daily_cost(&subset, &fields)?;
    let rows: Vec<DailyCostDisplayRow> = days.iter().map(DailyCostDisplayRow::from).collect();
    output::print_table("Daily total shipping cost", None, &rows, usize::MAX);
    if !days.is_empty() {
        println!("{}\n", output::render_daily_bars(&days, 40));
    }
    Ok(())
}

/// Handle option [5]: write the filtered rows, the listing, the metrics and
/// (when possible) the daily summary to the output directory.
fn handle_export() -> Result<()> {
    let out_dir = state().config.output_dir.clone();
    let (subset, fields, _, _) = filtered()?;
    std::fs::create_dir_all(&out_dir)?;

    let rows_path = out_dir.join("filtered_rows.xlsx");
    output::export_rows_xlsx(&rows_path, &subset)?;
    println!("Filtered rows exported to {}", rows_path.display());

    let items_path = out_dir.join("line_items.xlsx");
    output::export_line_items_xlsx(&items_path, &reports::build_line_items(&subset, &fields))?;
    println!("Invoice listing exported to {}", items_path.display());

    let metrics_path = out_dir.join("metrics.json");
    output::write_json(&metrics_path, &reports::aggregate(&subset, &fields))?;
    println!("Metrics exported to {}", metrics_path.display());

    match reports::daily_cost(&subset, &fields) {
        Ok(days) => {
            let daily_path = out_dir.join("daily_cost.csv");
            output::write_csv(&daily_path, &days)?;
            println!("Daily cost exported to {}", daily_path.display());
        }
        Err(e) => println!("Daily cost not exported: {}", e),
    }
    println!();
    Ok(())
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("Error: {}\n", e);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => match AppConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to read config {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => AppConfig::default(),
    };
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(out_dir) = args.out_dir {
        config.output_dir = out_dir;
    }
    let preview_rows = config.preview_rows;
    state().config = config;

    loop {
        println!("Shipping cost dashboard");
        println!("[1] Load the file");
        println!("[2] Set filters");
        println!("[3] Show dashboard");
        println!("[4] Daily shipping cost");
        println!("[5] Export");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => report(handle_load()),
            "2" => report(handle_filters()),
            "3" => report(handle_dashboard(preview_rows)),
            "4" => report(handle_daily()),
            "5" => report(handle_export()),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0 to 5.\n"),
        }
    }
}

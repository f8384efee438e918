//! `cotakit`: load a budget sheet, set aside ME/EPP quotas, export the result.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cotakit_io_xlsx::{C_FILE_NAME_DEFAULT, export_table_xlsx, read_table};
use cotakit_quota::conf::{N_PCT_QUOTA_MAX, N_TOLERANCE_DIVERGENCE, N_VALUE_CEILING};
use cotakit_quota::{
    C_COL_ITEM, C_COL_QTY_TOTAL, C_COL_SPECIFICATION, C_COL_UNIT_PRICE, SpecColumnSchema,
    SpecQuotaPolicy, SpecTable, format_currency_brl, normalize, process_budget,
};

#[derive(Parser, Debug)]
#[command(name = "cotakit")]
#[command(about = "ME/EPP quota allocation for procurement budget sheets")]
#[command(version)]
struct Cli {
    /// Budget sheet (xlsx, xlsm, xls, ods) or Polars IPC file.
    input: PathBuf,

    /// Rows flagged for ME/EPP treatment: 1-based numbers and ranges, e.g. `1,3,5-8`.
    #[arg(long, value_name = "ROWS", conflicts_with = "all")]
    flag: Option<String>,

    /// Flag every row.
    #[arg(long)]
    all: bool,

    /// Output workbook.
    #[arg(short, long, default_value = C_FILE_NAME_DEFAULT)]
    output: PathBuf,

    /// Value ceiling for exclusive treatment and for the quota slice.
    #[arg(long, env = "COTAKIT_CEILING", default_value_t = N_VALUE_CEILING)]
    ceiling: f64,

    /// Largest quota percentage tried.
    #[arg(long, env = "COTAKIT_PCT_MAX", default_value_t = N_PCT_QUOTA_MAX)]
    pct_max: u32,

    /// Tolerance before a supplied total is reported as divergent.
    #[arg(long, env = "COTAKIT_TOLERANCE", default_value_t = N_TOLERANCE_DIVERGENCE)]
    tolerance: f64,

    /// Print the normalized rows with their positions and exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let policy = SpecQuotaPolicy {
        value_ceiling: cli.ceiling,
        pct_quota_max: cli.pct_max,
        tolerance: cli.tolerance,
        ..SpecQuotaPolicy::default()
    };

    let table = read_table(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;

    if cli.list {
        return print_listing(&table, &policy);
    }

    let set_flagged: BTreeSet<usize> = if cli.all {
        (0..table.height()).collect()
    } else {
        match &cli.flag {
            Some(c_rows) => parse_flagged_rows(c_rows)?,
            None => BTreeSet::new(),
        }
    };

    let outcome = process_budget(&table, &set_flagged, &policy)
        .with_context(|| format!("failed to process {}", cli.input.display()))?;

    for c_message in outcome.report_normalize.messages() {
        println!("{c_message}");
    }
    println!("{}", outcome.summary);

    let v_bytes = export_table_xlsx(&outcome.table);
    std::fs::write(&cli.output, &v_bytes)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(path = %cli.output.display(), bytes = v_bytes.len(), "saved result workbook");

    Ok(())
}

/// Parse `1,3,5-8` into 0-based row positions.
fn parse_flagged_rows(c_rows: &str) -> Result<BTreeSet<usize>> {
    let mut set_rows = BTreeSet::new();
    for c_token in c_rows.split(',').map(str::trim).filter(|tok| !tok.is_empty()) {
        let (n_start, n_end) = match c_token.split_once('-') {
            Some((c_start, c_end)) => (parse_row_number(c_start)?, parse_row_number(c_end)?),
            None => {
                let n_row = parse_row_number(c_token)?;
                (n_row, n_row)
            }
        };
        if n_start > n_end {
            bail!("invalid row range {c_token:?}: start is after end");
        }
        set_rows.extend((n_start..=n_end).map(|n_row| n_row - 1));
    }
    Ok(set_rows)
}

fn parse_row_number(c_value: &str) -> Result<usize> {
    let n_row: usize = c_value
        .trim()
        .parse()
        .with_context(|| format!("invalid row number {c_value:?}"))?;
    if n_row == 0 {
        bail!("row numbers start at 1");
    }
    Ok(n_row)
}

fn print_listing(table: &SpecTable, policy: &SpecQuotaPolicy) -> Result<()> {
    let (table, _) = normalize(table, policy).context("failed to normalize table")?;
    let schema = SpecColumnSchema::derive(table.columns());

    println!("{:>5}  {:<8}  {:<40}  {:>12}  {:>16}", "#", "ITEM", "ESPECIFICAÇÃO", "QTD", "VALOR UNIT.");
    for n_idx_row in 0..table.height() {
        let c_text = |name: &str| {
            table
                .cell(n_idx_row, name)
                .map(|cell| cell.to_text())
                .unwrap_or_default()
        };
        let n_qty_total = if schema.has_family_columns() {
            schema
                .pairs
                .iter()
                .filter_map(|pair| table.cell(n_idx_row, &pair.qty).and_then(|cell| cell.to_f64()))
                .sum::<f64>()
        } else {
            table
                .cell(n_idx_row, C_COL_QTY_TOTAL)
                .and_then(|cell| cell.to_f64())
                .unwrap_or(0.0)
        };
        let n_unit_price = table
            .cell(n_idx_row, C_COL_UNIT_PRICE)
            .and_then(|cell| cell.to_f64())
            .unwrap_or(0.0);

        let c_spec: String = c_text(C_COL_SPECIFICATION).chars().take(40).collect();
        println!(
            "{:>5}  {:<8}  {:<40}  {:>12}  {:>16}",
            n_idx_row + 1,
            c_text(C_COL_ITEM),
            c_spec,
            n_qty_total,
            format_currency_brl(n_unit_price)
        );
    }
    Ok(())
}

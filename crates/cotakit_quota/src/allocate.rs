//! Quota allocator: per-row set-aside decision, row splitting and
//! whole-table recomputation.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::conf::{
    C_COL_ITEM, C_COL_QTY_TOTAL, C_COL_SPECIFICATION, C_COL_TREATMENT, C_COL_UNIT_PRICE,
    C_COL_VALUE_TOTAL,
};
use crate::spec::{EnumTreatment, QuotaError, SpecAllocationSummary, SpecQuotaPolicy};
use crate::table::{EnumCellValue, SpecColumnSchema, SpecTable};
use crate::util::{calculate_quota_qty, round_to_decimals};

////////////////////////////////////////////////////////////////////////////////
// #region Decision

/// Outcome of the decision rule for one flagged row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumQuotaDecision {
    /// Whole item fits under the ceiling.
    Exclusive,
    /// No set-aside possible; keep the row in open competition.
    OpenCompetition,
    /// Carve out `pct` percent as a reserved quota.
    Split { pct: u32 },
}

/// Apply the ceiling/percentage-band rule to one row.
pub fn decide_quota(
    unit_price: Option<f64>,
    qty_total: Option<f64>,
    policy: &SpecQuotaPolicy,
) -> EnumQuotaDecision {
    let (Some(n_unit_price), Some(n_qty_total)) = (unit_price, qty_total) else {
        return EnumQuotaDecision::Exclusive;
    };

    if n_unit_price * n_qty_total <= policy.value_ceiling {
        return EnumQuotaDecision::Exclusive;
    }
    if n_unit_price > policy.value_ceiling {
        return EnumQuotaDecision::OpenCompetition;
    }

    match search_quota_pct(n_unit_price, n_qty_total, policy) {
        Some(pct) => EnumQuotaDecision::Split { pct },
        None => EnumQuotaDecision::OpenCompetition,
    }
}

/// Largest percentage whose rounded quota is at least one unit and stays
/// under the ceiling.
pub fn search_quota_pct(unit_price: f64, qty_total: f64, policy: &SpecQuotaPolicy) -> Option<u32> {
    (policy.pct_quota_min..=policy.pct_quota_max).rev().find(|pct| {
        let n_qty_quota = calculate_quota_qty(qty_total, *pct);
        n_qty_quota >= 1.0 && n_qty_quota * unit_price <= policy.value_ceiling
    })
}

/// Specification text of a quota row pointing back at its remainder row.
pub fn format_quota_specification(item_parent: usize, pct: u32) -> String {
    format!("Idem ao item {item_parent}, cota reservada para me/epp de até {pct}%")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Allocation

/// Quota row back-reference, resolved to an item number after renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpecQuotaOrigin {
    /// Output position of the remainder row.
    idx_parent: usize,
    pct: u32,
}

#[derive(Debug, Clone)]
struct SpecRowDraft {
    cells: Vec<EnumCellValue>,
    treatment: EnumTreatment,
    origin: Option<SpecQuotaOrigin>,
}

/// Column positions in the working table.
#[derive(Debug, Clone)]
struct SpecColumnIndices {
    item: usize,
    specification: usize,
    qty_total: usize,
    unit_price: usize,
    value_total: usize,
    treatment: usize,
    pairs: Vec<(usize, usize)>,
}

impl SpecColumnIndices {
    fn resolve(table: &SpecTable, schema: &SpecColumnSchema) -> Result<Self, QuotaError> {
        let find = |name: &str| {
            table
                .col_index(name)
                .ok_or_else(|| QuotaError::MissingColumn(name.to_string()))
        };
        let pairs = schema
            .pairs
            .iter()
            .map(|pair| -> Result<(usize, usize), QuotaError> {
                Ok((find(&pair.qty)?, find(&pair.value)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            item: find(C_COL_ITEM)?,
            specification: find(C_COL_SPECIFICATION)?,
            qty_total: find(C_COL_QTY_TOTAL)?,
            unit_price: find(C_COL_UNIT_PRICE)?,
            value_total: find(C_COL_VALUE_TOTAL)?,
            treatment: find(C_COL_TREATMENT)?,
            pairs,
        })
    }

    /// Columns holding the quantities that a split divides.
    fn cols_split(&self) -> Vec<usize> {
        if self.pairs.is_empty() {
            vec![self.qty_total]
        } else {
            self.pairs.iter().map(|(n_idx_qty, _)| *n_idx_qty).collect()
        }
    }
}

/// Apply the quota rule to every flagged row and return the result table.
///
/// `flagged_ids` are 0-based positions in `table`; positions beyond the table
/// are ignored. `if_had_qty_total` tells whether the as-loaded input carried
/// `QUANTIDADE TOTAL`; when it did not, the column is dropped from the result.
pub fn allocate(
    table: &SpecTable,
    if_had_qty_total: bool,
    flagged_ids: &BTreeSet<usize>,
    policy: &SpecQuotaPolicy,
) -> Result<SpecTable, QuotaError> {
    allocate_with_summary(table, if_had_qty_total, flagged_ids, policy).map(|(table, _)| table)
}

/// [`allocate`] plus per-treatment counters.
pub fn allocate_with_summary(
    table: &SpecTable,
    if_had_qty_total: bool,
    flagged_ids: &BTreeSet<usize>,
    policy: &SpecQuotaPolicy,
) -> Result<(SpecTable, SpecAllocationSummary), QuotaError> {
    policy.validate()?;

    let schema = SpecColumnSchema::derive(table.columns());
    if !schema.has_quantity_source() {
        return Err(QuotaError::MissingQuantitySource);
    }

    let mut table_work = table.clone();
    table_work.ensure_column_at(C_COL_ITEM, 0);
    table_work.ensure_column(C_COL_SPECIFICATION);
    table_work.ensure_column(C_COL_QTY_TOTAL);
    table_work.ensure_column(C_COL_UNIT_PRICE);
    table_work.ensure_column(C_COL_VALUE_TOTAL);
    for pair in &schema.pairs {
        table_work.ensure_column(&pair.value);
    }
    table_work.ensure_column(C_COL_TREATMENT);
    let idx = SpecColumnIndices::resolve(&table_work, &schema)?;

    if !schema.if_has_qty_total {
        for n_idx_row in 0..table_work.height() {
            let n_qty_sum = sum_family_qty(&table_work.rows()[n_idx_row], &idx);
            table_work.set_cell(n_idx_row, idx.qty_total, EnumCellValue::Number(n_qty_sum));
        }
    }

    let n_rows_in = table_work.height();
    let mut summary = SpecAllocationSummary {
        cnt_rows_in: n_rows_in,
        cnt_flagged: flagged_ids.iter().filter(|id| **id < n_rows_in).count(),
        cnt_flagged_ignored: flagged_ids.iter().filter(|id| **id >= n_rows_in).count(),
        ..SpecAllocationSummary::default()
    };
    if summary.cnt_flagged_ignored > 0 {
        warn!(
            ignored = summary.cnt_flagged_ignored,
            rows = n_rows_in,
            "flagged row ids outside the table were ignored"
        );
    }

    let (columns, rows) = table_work.into_parts();
    let l_cols_split = idx.cols_split();
    let mut l_drafts: Vec<SpecRowDraft> = Vec::with_capacity(rows.len());

    for (n_idx_row, row) in rows.into_iter().enumerate() {
        if !flagged_ids.contains(&n_idx_row) {
            l_drafts.push(SpecRowDraft {
                cells: row,
                treatment: EnumTreatment::OpenCompetition,
                origin: None,
            });
            continue;
        }

        let decision = decide_quota(
            row[idx.unit_price].to_f64(),
            row[idx.qty_total].to_f64(),
            policy,
        );
        debug!(row = n_idx_row, ?decision, "quota decision");

        match decision {
            EnumQuotaDecision::Exclusive => l_drafts.push(SpecRowDraft {
                cells: row,
                treatment: EnumTreatment::Exclusive,
                origin: None,
            }),
            EnumQuotaDecision::OpenCompetition => l_drafts.push(SpecRowDraft {
                cells: row,
                treatment: EnumTreatment::OpenCompetition,
                origin: None,
            }),
            EnumQuotaDecision::Split { pct } => {
                let (row_remainder, row_quota) = split_row(row, &l_cols_split, pct);
                l_drafts.push(SpecRowDraft {
                    cells: row_remainder,
                    treatment: EnumTreatment::OpenCompetition,
                    origin: None,
                });
                let idx_parent = l_drafts.len() - 1;
                l_drafts.push(SpecRowDraft {
                    cells: row_quota,
                    treatment: EnumTreatment::ReservedQuota,
                    origin: Some(SpecQuotaOrigin { idx_parent, pct }),
                });
                summary.cnt_split += 1;
            }
        }
    }

    for (n_pos, draft) in l_drafts.iter_mut().enumerate() {
        recompute_row_totals(&mut draft.cells, &idx, policy);
        draft.cells[idx.item] = EnumCellValue::Number((n_pos + 1) as f64);
        draft.cells[idx.treatment] = EnumCellValue::from(draft.treatment.label());
        summary.count_treatment(draft.treatment);
    }
    resolve_quota_origins(&mut l_drafts, idx.specification);

    let rows_out: Vec<Vec<EnumCellValue>> = l_drafts.into_iter().map(|draft| draft.cells).collect();
    summary.cnt_rows_out = rows_out.len();

    let mut table_out = SpecTable::from_parts_unchecked(columns, rows_out);
    if !if_had_qty_total {
        table_out.drop_column(C_COL_QTY_TOTAL);
    }

    info!(%summary, "allocated quotas");
    Ok((table_out, summary))
}

/// Split into `(remainder, quota)`; quota cells are `round(qty × pct/100)`
/// per split column, the remainder keeps the difference.
fn split_row(
    row: Vec<EnumCellValue>,
    cols_split: &[usize],
    pct: u32,
) -> (Vec<EnumCellValue>, Vec<EnumCellValue>) {
    let mut row_quota = row.clone();
    let mut row_remainder = row;

    for n_idx_col in cols_split {
        let n_qty = row_remainder[*n_idx_col].to_f64().unwrap_or(0.0);
        let n_qty_quota = calculate_quota_qty(n_qty, pct);
        row_quota[*n_idx_col] = EnumCellValue::Number(n_qty_quota);
        row_remainder[*n_idx_col] = EnumCellValue::Number(n_qty - n_qty_quota);
    }

    (row_remainder, row_quota)
}

fn sum_family_qty(row: &[EnumCellValue], idx: &SpecColumnIndices) -> f64 {
    idx.pairs
        .iter()
        .map(|(n_idx_qty, _)| row[*n_idx_qty].to_f64().unwrap_or(0.0))
        .sum()
}

fn recompute_row_totals(row: &mut [EnumCellValue], idx: &SpecColumnIndices, policy: &SpecQuotaPolicy) {
    let n_unit_price = row[idx.unit_price].to_f64();
    let round_value = |n_qty: Option<f64>| -> EnumCellValue {
        match (n_qty, n_unit_price) {
            (Some(n_qty), Some(n_price)) => {
                EnumCellValue::Number(round_to_decimals(n_qty * n_price, policy.n_decimals))
            }
            _ => EnumCellValue::None,
        }
    };

    if !idx.pairs.is_empty() {
        row[idx.qty_total] = EnumCellValue::Number(sum_family_qty(row, idx));
        for (n_idx_qty, n_idx_value) in &idx.pairs {
            row[*n_idx_value] = round_value(row[*n_idx_qty].to_f64());
        }
    }
    row[idx.value_total] = round_value(row[idx.qty_total].to_f64());
}

/// Write the cross-reference text of every quota row from its parent's final
/// item number.
fn resolve_quota_origins(drafts: &mut [SpecRowDraft], n_idx_spec: usize) {
    for draft in drafts.iter_mut() {
        if let Some(origin) = draft.origin {
            // items are numbered by output position
            let c_spec = format_quota_specification(origin.idx_parent + 1, origin.pct);
            draft.cells[n_idx_spec] = EnumCellValue::String(c_spec);
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

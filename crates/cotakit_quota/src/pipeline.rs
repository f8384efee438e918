//! Load-to-result pipeline: normalize, then allocate.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::allocate::allocate_with_summary;
use crate::conf::C_COL_QTY_TOTAL;
use crate::normalize::normalize;
use crate::spec::{QuotaError, SpecQuotaOutcome, SpecQuotaPolicy};
use crate::table::SpecTable;

/// Run both stages over an as-loaded table.
///
/// Whether `QUANTIDADE TOTAL` was present is read from `table` itself, so the
/// result keeps or omits that column exactly as the input did.
pub fn process_budget(
    table: &SpecTable,
    flagged_ids: &BTreeSet<usize>,
    policy: &SpecQuotaPolicy,
) -> Result<SpecQuotaOutcome, QuotaError> {
    if flagged_ids.is_empty() {
        warn!("no rows flagged for quota evaluation; every row stays in open competition");
    }

    let if_had_qty_total = table.has_column(C_COL_QTY_TOTAL);
    let (table_normalized, report_normalize) = normalize(table, policy)?;
    let (table_result, summary) =
        allocate_with_summary(&table_normalized, if_had_qty_total, flagged_ids, policy)?;

    info!(
        corrections = report_normalize.correction_count(),
        rows_out = summary.cnt_rows_out,
        "processed budget"
    );
    Ok(SpecQuotaOutcome {
        table: table_result,
        report_normalize,
        summary,
    })
}

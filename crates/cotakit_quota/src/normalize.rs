//! Validator/normalizer: numeric coercion and derived-total recomputation.

use tracing::{debug, info};

use crate::conf::{C_COL_ITEM, C_COL_QTY_TOTAL, C_COL_UNIT_PRICE, C_COL_VALUE_TOTAL};
use crate::spec::{EnumRowRef, QuotaError, SpecCorrection, SpecNormalizeReport, SpecQuotaPolicy};
use crate::table::{EnumCellValue, SpecColumnSchema, SpecTable};
use crate::util::round_to_decimals;

/// Return a corrected copy of `table` plus one correction per divergent total.
///
/// Unit price and every quantity-family column are coerced to numbers
/// (missing or non-numeric → 0). Each paired value column and `VALOR TOTAL`
/// are recomputed and overwritten; supplied values that differed by more than
/// `policy.tolerance` are reported. Fails only when `VALOR UNITÁRIO` is absent.
pub fn normalize(
    table: &SpecTable,
    policy: &SpecQuotaPolicy,
) -> Result<(SpecTable, SpecNormalizeReport), QuotaError> {
    policy.validate()?;

    let schema = SpecColumnSchema::derive(table.columns());
    if !schema.if_has_unit_price {
        return Err(QuotaError::MissingColumn(C_COL_UNIT_PRICE.to_string()));
    }

    let mut table_out = table.clone();
    let mut report = SpecNormalizeReport::default();

    for pair in &schema.pairs {
        table_out.ensure_column(&pair.value);
    }
    let n_idx_value_total = if schema.has_quantity_source() {
        Some(table_out.ensure_column(C_COL_VALUE_TOTAL))
    } else {
        None
    };

    let n_idx_unit_price = require_column(&table_out, C_COL_UNIT_PRICE)?;
    let n_idx_qty_total = table_out.col_index(C_COL_QTY_TOTAL);
    let n_idx_item = table_out.col_index(C_COL_ITEM);
    let l_idx_pairs = schema
        .pairs
        .iter()
        .map(|pair| -> Result<(usize, usize), QuotaError> {
            Ok((
                require_column(&table_out, &pair.qty)?,
                require_column(&table_out, &pair.value)?,
            ))
        })
        .collect::<Result<Vec<(usize, usize)>, QuotaError>>()?;

    for n_idx_row in 0..table_out.height() {
        let row_ref = derive_row_ref(&table_out, n_idx_row, n_idx_item);

        let n_unit_price = coerce_cell_to_number(&mut table_out, n_idx_row, n_idx_unit_price);

        let mut n_qty_sum = 0.0;
        for (n_idx_qty, n_idx_value) in &l_idx_pairs {
            let n_qty = coerce_cell_to_number(&mut table_out, n_idx_row, *n_idx_qty);
            n_qty_sum += n_qty;

            let n_value = round_to_decimals(n_qty * n_unit_price, policy.n_decimals);
            overwrite_with_check(
                &mut table_out,
                n_idx_row,
                *n_idx_value,
                n_value,
                &row_ref,
                policy,
                &mut report,
            );
        }

        let n_qty_total = match (l_idx_pairs.is_empty(), n_idx_qty_total) {
            (false, Some(n_idx_col)) => {
                table_out.set_cell(n_idx_row, n_idx_col, EnumCellValue::Number(n_qty_sum));
                Some(n_qty_sum)
            }
            (false, None) => Some(n_qty_sum),
            (true, Some(n_idx_col)) => Some(coerce_cell_to_number(
                &mut table_out,
                n_idx_row,
                n_idx_col,
            )),
            (true, None) => None,
        };

        if let (Some(n_qty_total), Some(n_idx_value_total)) = (n_qty_total, n_idx_value_total) {
            let n_value_total = round_to_decimals(n_qty_total * n_unit_price, policy.n_decimals);
            overwrite_with_check(
                &mut table_out,
                n_idx_row,
                n_idx_value_total,
                n_value_total,
                &row_ref,
                policy,
                &mut report,
            );
        }
    }

    info!(
        rows = table_out.height(),
        pairs = l_idx_pairs.len(),
        corrections = report.correction_count(),
        "normalized budget table"
    );
    Ok((table_out, report))
}

fn require_column(table: &SpecTable, name: &str) -> Result<usize, QuotaError> {
    table
        .col_index(name)
        .ok_or_else(|| QuotaError::MissingColumn(name.to_string()))
}

fn derive_row_ref(table: &SpecTable, n_idx_row: usize, n_idx_item: Option<usize>) -> EnumRowRef {
    match n_idx_item.map(|n_idx_col| &table.rows()[n_idx_row][n_idx_col]) {
        Some(value) if !value.is_missing() => EnumRowRef::Item(value.to_text().trim().to_string()),
        _ => EnumRowRef::Position(n_idx_row + 1),
    }
}

fn coerce_cell_to_number(table: &mut SpecTable, n_idx_row: usize, n_idx_col: usize) -> f64 {
    let n_value = table.rows()[n_idx_row][n_idx_col].to_f64().unwrap_or(0.0);
    table.set_cell(n_idx_row, n_idx_col, EnumCellValue::Number(n_value));
    n_value
}

fn overwrite_with_check(
    table: &mut SpecTable,
    n_idx_row: usize,
    n_idx_col: usize,
    n_value_correct: f64,
    row_ref: &EnumRowRef,
    policy: &SpecQuotaPolicy,
    report: &mut SpecNormalizeReport,
) {
    let cell_supplied = &table.rows()[n_idx_row][n_idx_col];
    if !cell_supplied.is_missing()
        && let Some(n_value_supplied) = cell_supplied.to_f64()
        && (n_value_supplied - n_value_correct).abs() > policy.tolerance
    {
        let column = table.columns()[n_idx_col].clone();
        debug!(
            row = %row_ref,
            column = %column,
            supplied = n_value_supplied,
            corrected = n_value_correct,
            "supplied total diverges"
        );
        report.corrections.push(SpecCorrection {
            row_ref: row_ref.clone(),
            column,
            value_supplied: n_value_supplied,
            value_corrected: n_value_correct,
        });
    }
    table.set_cell(n_idx_row, n_idx_col, EnumCellValue::Number(n_value_correct));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<EnumCellValue>>) -> SpecTable {
        SpecTable::new(columns.iter().map(ToString::to_string).collect(), rows).expect("table")
    }

    fn num(n: f64) -> EnumCellValue {
        EnumCellValue::Number(n)
    }

    #[test]
    fn test_missing_unit_price_is_schema_error() {
        let input = table(&["ITEM", "QUANTIDADE TOTAL"], vec![vec![num(1.0), num(2.0)]]);
        let err = normalize(&input, &SpecQuotaPolicy::default()).expect_err("must fail");
        assert_eq!(err, QuotaError::MissingColumn("VALOR UNITÁRIO".to_string()));
    }

    #[test]
    fn test_family_values_and_totals_recomputed() {
        let input = table(
            &[
                "ITEM",
                "QUANTIDADE A",
                "QUANTIDADE B",
                "QUANTIDADE TOTAL",
                "VALOR UNITÁRIO",
                "VALOR TOTAL A",
                "VALOR TOTAL B",
                "VALOR TOTAL",
            ],
            vec![vec![
                num(1.0),
                num(3.0),
                EnumCellValue::from("x"),
                num(99.0),
                EnumCellValue::from("2.5"),
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::None,
            ]],
        );

        let (out, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");

        assert_eq!(out.cell(0, "QUANTIDADE B"), Some(&num(0.0)));
        assert_eq!(out.cell(0, "VALOR UNITÁRIO"), Some(&num(2.5)));
        assert_eq!(out.cell(0, "VALOR TOTAL A"), Some(&num(7.5)));
        assert_eq!(out.cell(0, "VALOR TOTAL B"), Some(&num(0.0)));
        assert_eq!(out.cell(0, "QUANTIDADE TOTAL"), Some(&num(3.0)));
        assert_eq!(out.cell(0, "VALOR TOTAL"), Some(&num(7.5)));
        // blank supplied totals are filled silently
        assert!(report.is_clean());
    }

    #[test]
    fn test_divergent_total_is_reported_and_overwritten() {
        let input = table(
            &["ITEM", "QUANTIDADE TOTAL", "VALOR UNITÁRIO", "VALOR TOTAL"],
            vec![
                vec![num(4.0), num(10.0), num(3.0), num(31.0)],
                vec![num(5.0), num(10.0), num(3.0), num(30.005)],
            ],
        );

        let (out, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");

        assert_eq!(report.correction_count(), 1);
        let correction = &report.corrections[0];
        assert_eq!(correction.row_ref, EnumRowRef::Item("4".to_string()));
        assert_eq!(correction.column, "VALOR TOTAL");
        assert_eq!(correction.value_supplied, 31.0);
        assert_eq!(correction.value_corrected, 30.0);
        assert_eq!(
            report.messages(),
            vec!["Item 4: VALOR TOTAL informado (R$ 31,00) corrigido para R$ 30,00.".to_string()]
        );

        assert_eq!(out.cell(0, "VALOR TOTAL"), Some(&num(30.0)));
        assert_eq!(out.cell(1, "VALOR TOTAL"), Some(&num(30.0)));
    }

    #[test]
    fn test_tolerance_boundary_on_supplied_total() {
        let input = table(
            &["ITEM", "QUANTIDADE TOTAL", "VALOR UNITÁRIO", "VALOR TOTAL"],
            vec![
                vec![num(1.0), num(10.0), num(3.0), num(30.009)],
                vec![num(2.0), num(10.0), num(3.0), num(30.02)],
                vec![num(3.0), num(10.0), num(3.0), num(30.01)],
            ],
        );

        let (_, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");

        let l_refs: Vec<&EnumRowRef> = report.corrections.iter().map(|c| &c.row_ref).collect();
        // 30.01 - 30.0 evaluates to 0.0100000000000016, strictly above 0.01
        assert_eq!(
            l_refs,
            vec![&EnumRowRef::Item("2".to_string()), &EnumRowRef::Item("3".to_string())]
        );
    }

    #[test]
    fn test_row_without_item_is_referenced_by_position() {
        let input = table(
            &["QUANTIDADE A", "VALOR UNITÁRIO", "VALOR TOTAL A"],
            vec![
                vec![num(1.0), num(1.0), num(1.0)],
                vec![num(2.0), num(1.0), num(5.0)],
            ],
        );

        let (out, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");

        assert_eq!(report.corrections[0].row_ref, EnumRowRef::Position(2));
        assert!(!out.has_column("QUANTIDADE TOTAL"));
        assert_eq!(out.cell(1, "VALOR TOTAL"), Some(&num(2.0)));
    }

    #[test]
    fn test_non_numeric_supplied_total_is_overwritten_silently() {
        let input = table(
            &["QUANTIDADE TOTAL", "VALOR UNITÁRIO", "VALOR TOTAL"],
            vec![vec![num(2.0), num(10.0), EnumCellValue::from("ver anexo")]],
        );

        let (out, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");

        assert!(report.is_clean());
        assert_eq!(out.cell(0, "VALOR TOTAL"), Some(&num(20.0)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = table(
            &[
                "ITEM",
                "QUANTIDADE 1",
                "QUANTIDADE 2",
                "VALOR UNITÁRIO",
                "VALOR TOTAL 1",
                "VALOR TOTAL 2",
                "VALOR TOTAL",
            ],
            vec![
                vec![num(1.0), num(3.0), num(7.0), num(0.33333), num(9.0), num(9.0), num(9.0)],
                vec![num(2.0), num(11.0), num(0.0), num(12.5), num(0.0), num(0.0), num(0.0)],
            ],
        );
        let policy = SpecQuotaPolicy::default();

        let (once, report_once) = normalize(&input, &policy).expect("first pass");
        assert!(!report_once.is_clean());

        let (twice, report_twice) = normalize(&once, &policy).expect("second pass");
        assert!(report_twice.is_clean());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_quantity_source_leaves_totals_alone() {
        let input = table(&["ITEM", "VALOR UNITÁRIO"], vec![vec![num(1.0), num(5.0)]]);
        let (out, report) = normalize(&input, &SpecQuotaPolicy::default()).expect("normalize");
        assert!(report.is_clean());
        assert_eq!(out.columns(), ["ITEM", "VALOR UNITÁRIO"]);
    }
}

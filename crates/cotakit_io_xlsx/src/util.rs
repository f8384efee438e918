//! Stateless helper utilities used by the readers and the writer kernel.

use cotakit_quota::{C_COL_UNIT_PRICE, C_PREFIX_VALUE};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, XlsxError};

use crate::conf::{
    C_TOTALS_LABEL, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::spec::{SpecCellFormat, SpecSheetHorizontalMerge, SpecTotalsCell, SpecTotalsRowPlan};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnRoles

/// `VALOR UNITÁRIO` plus every `VALOR TOTAL*` column, sorted by position.
pub fn select_currency_column_indices(columns: &[String]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, c_name)| *c_name == C_COL_UNIT_PRICE || c_name.starts_with(C_PREFIX_VALUE))
        .map(|(n_idx, _)| n_idx)
        .collect()
}

/// Every `VALOR TOTAL*` column, sorted by position.
pub fn select_value_total_column_indices(columns: &[String]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, c_name)| c_name.starts_with(C_PREFIX_VALUE))
        .map(|(n_idx, _)| n_idx)
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TotalsRow

/// Plan the totals row at sheet row `row_idx`.
///
/// `sums` holds one `(column index, sum)` per value-total column in column
/// order. The label spans columns `0..first value column`; the last sum cell
/// spans two columns. Returns `None` when there is no value-total column.
pub fn plan_totals_row(row_idx: usize, sums: &[(usize, f64)]) -> Option<SpecTotalsRowPlan> {
    let (n_idx_first, _) = sums.first()?;
    let n_idx_last_entry = sums.len() - 1;

    let label = (*n_idx_first > 0).then(|| SpecSheetHorizontalMerge {
        row_idx_start: row_idx,
        col_idx_start: 0,
        col_idx_end: n_idx_first - 1,
        text: C_TOTALS_LABEL.to_string(),
    });

    let cells = sums
        .iter()
        .enumerate()
        .map(|(n_entry, (n_idx_col, n_sum))| SpecTotalsCell {
            col_idx_start: *n_idx_col,
            col_idx_end: if n_entry == n_idx_last_entry {
                n_idx_col + 1
            } else {
                *n_idx_col
            },
            value: *n_sum,
        })
        .collect();

    Some(SpecTotalsRowPlan {
        row_idx,
        label,
        cells,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Reject bodies that cannot fit one sheet with header and totals rows.
pub fn validate_sheet_fits(height_body: usize, width: usize) -> Result<(), String> {
    if height_body + 2 > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Table too tall for one sheet: {height_body} rows (limit {}).",
            N_NROWS_EXCEL_MAX - 2
        ));
    }
    if width + 1 > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Table too wide for one sheet: {width} columns (limit {}).",
            N_NCOLS_EXCEL_MAX - 1
        ));
    }
    Ok(())
}

/// Displayed width units; non-ASCII glyphs count wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RustXlsxBridge

pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

pub fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

pub fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

pub fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

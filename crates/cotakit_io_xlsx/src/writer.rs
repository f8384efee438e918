//! XLSX writer kernel that renders budget tables into workbook output.

use std::collections::BTreeSet;
use std::path::PathBuf;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

use cotakit_quota::{EnumCellValue, SpecTable};

use crate::conf::N_LEN_EXCEL_SHEET_NAME_MAX;
use crate::spec::{
    SpecAutofitCellsPolicy, SpecTotalsRowPlan, SpecXlsxFormats, SpecXlsxReport,
    SpecXlsxWriteOptions,
};
use crate::util::{
    cast_col_num, cast_row_num, derive_rust_xlsx_format, derive_xlsx_error_text,
    estimate_unicode_string_width, plan_totals_row, sanitize_sheet_name,
    select_currency_column_indices, select_value_total_column_indices, validate_sheet_fits,
};

/// Stateful workbook writer.
///
/// The workbook is buffered in memory until [`Self::close`] or
/// [`Self::save_to_buffer`] is called.
pub struct XlsxWriter {
    path_file_out: Option<PathBuf>,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

struct SpecSheetFormats {
    text: Format,
    header: Format,
    currency: Format,
    totals_label: Format,
    totals_currency: Format,
}

impl SpecSheetFormats {
    fn derive(formats: &SpecXlsxFormats) -> Self {
        Self {
            text: derive_rust_xlsx_format(&formats.text),
            header: derive_rust_xlsx_format(&formats.header),
            currency: derive_rust_xlsx_format(&formats.currency),
            totals_label: derive_rust_xlsx_format(&formats.totals_label),
            totals_currency: derive_rust_xlsx_format(&formats.totals_currency),
        }
    }
}

impl XlsxWriter {
    /// Create a writer; `path_file_out` is only required by [`Self::close`].
    pub fn new(
        path_file_out: Option<PathBuf>,
        formats: SpecXlsxFormats,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        let Some(path_file_out) = &self.path_file_out else {
            return Err("Writer has no output path; use save_to_buffer().".to_string());
        };
        self.workbook
            .save(path_file_out)
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        Ok(())
    }

    /// Serialize workbook to bytes and close the writer.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, String> {
        if self.if_closed {
            return Err("Cannot save after close().".to_string());
        }
        let v_bytes = self
            .workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error_text)?;
        self.if_closed = true;
        Ok(v_bytes)
    }

    /// Write one sheet from a table.
    pub fn write_sheet_from_table(&mut self, table: &SpecTable, sheet_name: &str) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        self.write_sheet(table, sheet_name)
    }

    fn write_sheet(&mut self, table: &SpecTable, sheet_name: &str) -> Result<(), String> {
        let policy_autofit = self.write_options.policy_autofit.clone();
        validate_policy_autofit(&policy_autofit)?;
        validate_sheet_fits(table.height(), table.width())?;

        let l_colnames = table.columns();
        let l_cols_idx_currency = select_currency_column_indices(l_colnames);
        let set_cols_idx_currency: BTreeSet<usize> = l_cols_idx_currency.iter().copied().collect();

        let sheet_name_unique = self.derive_unique_sheet_name(&sanitize_sheet_name(sheet_name, "_"));
        let mut report = SpecXlsxReport {
            sheet_name: sheet_name_unique.clone(),
            n_rows_body: table.height(),
            cols_idx_currency: l_cols_idx_currency.clone(),
            warnings: vec![],
        };

        let fmts = SpecSheetFormats::derive(&self.formats);
        let write_options = self.write_options.clone();
        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        let mut l_width_by_col = vec![0usize; l_colnames.len()];
        for (n_idx_col, c_name) in l_colnames.iter().enumerate() {
            worksheet
                .write_string_with_format(0, cast_col_num(n_idx_col)?, c_name, &fmts.header)
                .map_err(derive_xlsx_error_text)?;
            l_width_by_col[n_idx_col] = estimate_unicode_string_width(c_name);
        }

        let mut set_cols_idx_currency_text = BTreeSet::new();
        for (n_idx_row, row) in table.rows().iter().enumerate() {
            let if_infer_width = policy_autofit
                .height_body_inferred_max
                .is_none_or(|n_max| n_idx_row < n_max);

            for (n_idx_col, value) in row.iter().enumerate() {
                let if_is_currency_col = set_cols_idx_currency.contains(&n_idx_col);
                let fmt = if if_is_currency_col {
                    &fmts.currency
                } else {
                    &fmts.text
                };
                if if_is_currency_col && matches!(value, EnumCellValue::String(_)) {
                    set_cols_idx_currency_text.insert(n_idx_col);
                }

                write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col, value, fmt)?;

                if if_infer_width && !if_is_currency_col {
                    l_width_by_col[n_idx_col] =
                        usize::max(l_width_by_col[n_idx_col], estimate_width_len(value));
                }
            }
        }
        for n_idx_col in set_cols_idx_currency_text {
            report.warn(format!(
                "Column {:?} holds non-numeric values; written as text.",
                l_colnames[n_idx_col]
            ));
        }

        let n_min = usize::max(1, policy_autofit.width_cell_min);
        let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
        for (n_idx_col, n_width_recorded) in l_width_by_col.iter().enumerate() {
            let n_width_final = if set_cols_idx_currency.contains(&n_idx_col) {
                write_options.width_currency
            } else {
                usize::min(
                    n_max,
                    usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
                ) as f64
            };
            worksheet
                .set_column_width(cast_col_num(n_idx_col)?, n_width_final)
                .map_err(derive_xlsx_error_text)?;
        }

        if write_options.if_freeze_header {
            worksheet
                .set_freeze_panes(1, 0)
                .map_err(derive_xlsx_error_text)?;
        }

        if write_options.if_write_totals {
            let l_sums: Vec<(usize, f64)> = select_value_total_column_indices(l_colnames)
                .into_iter()
                .map(|n_idx_col| {
                    let n_sum = table
                        .rows()
                        .iter()
                        .filter_map(|row| match &row[n_idx_col] {
                            EnumCellValue::Number(n) if n.is_finite() => Some(*n),
                            _ => None,
                        })
                        .sum::<f64>();
                    (n_idx_col, n_sum)
                })
                .collect();
            match plan_totals_row(table.height() + 1, &l_sums) {
                Some(plan) => write_totals_row(worksheet, &plan, &fmts)?,
                None => report.warn("No VALOR TOTAL column; totals row skipped."),
            }
        }

        debug!(
            sheet = %report.sheet_name,
            rows = report.n_rows_body,
            cols = l_colnames.len(),
            warnings = report.warnings.len(),
            "wrote worksheet"
        );
        self.l_reports.push(report);
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Displayed width units for one body cell.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        other => estimate_unicode_string_width(&other.to_text()),
    }
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    value: &EnumCellValue,
    fmt: &Format,
) -> Result<(), String> {
    let n_row = cast_row_num(row)?;
    let n_col = cast_col_num(col)?;
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, fmt)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(n) if n.is_finite() => {
            worksheet
                .write_number_with_format(n_row, n_col, *n, fmt)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::Number(_) => {
            worksheet
                .write_blank(n_row, n_col, fmt)
                .map_err(derive_xlsx_error_text)?;
        }
        EnumCellValue::String(s) => {
            worksheet
                .write_string_with_format(n_row, n_col, s, fmt)
                .map_err(derive_xlsx_error_text)?;
        }
    }
    Ok(())
}

fn write_totals_row(
    worksheet: &mut Worksheet,
    plan: &SpecTotalsRowPlan,
    fmts: &SpecSheetFormats,
) -> Result<(), String> {
    let n_row = cast_row_num(plan.row_idx)?;

    if let Some(label) = &plan.label {
        let n_col_start = cast_col_num(label.col_idx_start)?;
        let n_col_end = cast_col_num(label.col_idx_end)?;
        // single-cell merges are rejected by rust_xlsxwriter
        if n_col_end > n_col_start {
            worksheet
                .merge_range(n_row, n_col_start, n_row, n_col_end, &label.text, &fmts.totals_label)
                .map_err(derive_xlsx_error_text)?;
        } else {
            worksheet
                .write_string_with_format(n_row, n_col_start, &label.text, &fmts.totals_label)
                .map_err(derive_xlsx_error_text)?;
        }
    }

    for cell in &plan.cells {
        let n_col_start = cast_col_num(cell.col_idx_start)?;
        let n_col_end = cast_col_num(cell.col_idx_end)?;
        if n_col_end > n_col_start {
            worksheet
                .merge_range(n_row, n_col_start, n_row, n_col_end, "", &fmts.totals_currency)
                .map_err(derive_xlsx_error_text)?;
        }
        worksheet
            .write_number_with_format(n_row, n_col_start, cell.value, &fmts.totals_currency)
            .map_err(derive_xlsx_error_text)?;
    }
    Ok(())
}

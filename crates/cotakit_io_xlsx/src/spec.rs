//! Shared XLSX specification models.

use std::path::PathBuf;

use cotakit_quota::QuotaError;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; `None` fields inherit on merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Top border override.
    pub top: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            top: other.top.or(self.top),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
        }
    }
}

/// Named presets consumed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxFormats {
    /// Body cells outside currency columns.
    pub text: SpecCellFormat,
    /// Header row.
    pub header: SpecCellFormat,
    /// Body cells of currency columns.
    pub currency: SpecCellFormat,
    /// Merged totals label.
    pub totals_label: SpecCellFormat,
    /// Totals-row sums.
    pub totals_currency: SpecCellFormat,
}

impl Default for SpecXlsxFormats {
    fn default() -> Self {
        crate::conf::derive_default_xlsx_formats()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Width inference for non-currency columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Max body rows inspected; `None` inspects all rows.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            height_body_inferred_max: None,
            width_cell_min: 1,
            width_cell_max: 255,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide options.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecXlsxWriteOptions {
    /// Autofit policy for non-currency columns.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Width applied to every currency column.
    pub width_currency: f64,
    /// Append the totals row under the body.
    pub if_write_totals: bool,
    /// Freeze the header row.
    pub if_freeze_header: bool,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            policy_autofit: SpecAutofitCellsPolicy::default(),
            width_currency: crate::conf::N_WIDTH_CURRENCY_COL,
            if_write_totals: true,
            if_freeze_header: true,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TotalsRowSpecification

/// Horizontal merge plan item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetHorizontalMerge {
    /// Row index where merge is applied.
    pub row_idx_start: usize,
    /// Start column index (inclusive).
    pub col_idx_start: usize,
    /// End column index (inclusive).
    pub col_idx_end: usize,
    /// Merge display text.
    pub text: String,
}

/// One sum cell of the totals row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTotalsCell {
    /// Start column index (inclusive).
    pub col_idx_start: usize,
    /// End column index (inclusive); greater than start when merged.
    pub col_idx_end: usize,
    /// Column sum.
    pub value: f64,
}

/// Planned totals row under the table body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecTotalsRowPlan {
    /// Sheet row index of the totals row.
    pub row_idx: usize,
    /// Label spanning the columns before the first value column.
    pub label: Option<SpecSheetHorizontalMerge>,
    /// One sum per value column, in column order.
    pub cells: Vec<SpecTotalsCell>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-sheet write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Body rows written.
    pub n_rows_body: usize,
    /// Currency-formatted column indices.
    pub cols_idx_currency: Vec<usize>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Spreadsheet load/export failures.
#[derive(Debug, thiserror::Error)]
pub enum XlsxIoError {
    /// Workbook could not be opened or parsed.
    #[error("Failed to open spreadsheet {}: {message}", path.display())]
    Open { path: PathBuf, message: String },
    /// Workbook has no worksheet to read.
    #[error("Spreadsheet has no worksheets: {}", .0.display())]
    NoSheets(PathBuf),
    /// Input file type is not supported.
    #[error("Unsupported input file type: {0:?}")]
    UnsupportedExtension(String),
    /// IPC payload could not be decoded.
    #[error("Failed to read IPC DataFrame bytes: {0}")]
    Ipc(String),
    /// Workbook construction or serialization failed.
    #[error("{0}")]
    Write(String),
    /// File system access failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Loaded cells do not form a valid table.
    #[error(transparent)]
    Table(#[from] QuotaError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

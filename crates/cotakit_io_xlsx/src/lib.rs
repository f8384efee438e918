//! `cotakit_io_xlsx` v1:
//! Spreadsheet IO for budget tables.
//!
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options/errors
//! - `util`   : pure helper functions
//! - `frame`  : Polars `DataFrame` -> `SpecTable`
//! - `reader` : xlsx/ods and IPC loaders
//! - `writer` : pure-Rust writer kernel
//! - `export` : one-shot export with error-notice fallback
pub mod conf;
pub mod export;
pub mod frame;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_EXPORT_ERROR_NOTICE, C_FILE_NAME_DEFAULT, C_NUM_FORMAT_CURRENCY, C_SHEET_NAME_DEFAULT,
    C_TOTALS_LABEL, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
pub use export::{export_table_xlsx, try_export_table_xlsx};
pub use frame::derive_table_from_dataframe;
pub use reader::{read_table, read_table_ipc, read_table_ipc_bytes, read_table_xlsx};
pub use spec::{
    SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetHorizontalMerge, SpecTotalsCell,
    SpecTotalsRowPlan, SpecXlsxFormats, SpecXlsxReport, SpecXlsxWriteOptions, XlsxIoError,
};
pub use util::{plan_totals_row, sanitize_sheet_name, select_currency_column_indices};
pub use writer::XlsxWriter;

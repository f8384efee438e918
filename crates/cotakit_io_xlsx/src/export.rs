//! One-shot export of an allocated table into workbook bytes.

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::{error, info};

use cotakit_quota::SpecTable;

use crate::conf::{C_EXPORT_ERROR_NOTICE, C_SHEET_NAME_DEFAULT};
use crate::spec::{SpecXlsxFormats, SpecXlsxReport, SpecXlsxWriteOptions, XlsxIoError};
use crate::util::derive_xlsx_error_text;
use crate::writer::XlsxWriter;

/// Render `table` into a single `PlanilhaOrc` sheet and return the bytes.
///
/// Never fails: on error the result is a workbook that carries the error text.
pub fn export_table_xlsx(table: &SpecTable) -> Vec<u8> {
    match try_export_table_xlsx(table, &SpecXlsxWriteOptions::default()) {
        Ok((v_bytes, _)) => v_bytes,
        Err(err) => {
            error!(error = %err, "xlsx export failed; writing error notice");
            derive_error_notice_xlsx(&err.to_string())
        }
    }
}

/// Fallible export with explicit options; also returns the sheet report.
pub fn try_export_table_xlsx(
    table: &SpecTable,
    write_options: &SpecXlsxWriteOptions,
) -> Result<(Vec<u8>, SpecXlsxReport), XlsxIoError> {
    let mut writer = XlsxWriter::new(None, SpecXlsxFormats::default(), write_options.clone());
    writer
        .write_sheet_from_table(table, C_SHEET_NAME_DEFAULT)
        .map_err(XlsxIoError::Write)?;
    let report = writer.report().pop().unwrap_or_default();
    let v_bytes = writer.save_to_buffer().map_err(XlsxIoError::Write)?;

    info!(
        rows = report.n_rows_body,
        bytes = v_bytes.len(),
        warnings = report.warnings.len(),
        "exported workbook"
    );
    Ok((v_bytes, report))
}

fn derive_error_notice_xlsx(c_error: &str) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let result = write_error_notice(&mut workbook, c_error).and_then(|_| workbook.save_to_buffer());

    match result {
        Ok(v_bytes) => v_bytes,
        Err(err) => {
            error!(error = %derive_xlsx_error_text(err), "failed to build error notice workbook");
            Vec::new()
        }
    }
}

fn write_error_notice(workbook: &mut Workbook, c_error: &str) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, C_EXPORT_ERROR_NOTICE)?;
    worksheet.write_string(1, 0, c_error)?;
    Ok(())
}

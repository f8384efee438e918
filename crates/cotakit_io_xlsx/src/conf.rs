//! XLSX constants and default format presets.

use crate::spec::{SpecCellFormat, SpecXlsxFormats};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel column width ceiling.
pub const N_WIDTH_EXCEL_COL_MAX: usize = 255;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Result sheet name.
pub const C_SHEET_NAME_DEFAULT: &str = "PlanilhaOrc";
/// Default exported file name.
pub const C_FILE_NAME_DEFAULT: &str = "resultado_cotas_processado.xlsx";
/// BRL currency with four decimals and thousands separator.
pub const C_NUM_FORMAT_CURRENCY: &str = "R$ #,##0.0000_ ;[Red]-R$ #,##0.0000_ ;R$ 0,0000_ ;@_ ";
/// Label merged across the non-value columns of the totals row.
pub const C_TOTALS_LABEL: &str = "VALOR TOTAL QUE AS INSTITUIÇÕES SE DISPÕEM A PAGAR";
/// First line of the fallback workbook written when export fails.
pub const C_EXPORT_ERROR_NOTICE: &str = "Ocorreu um erro ao gerar o arquivo Excel:";
/// Fixed width of currency columns.
pub const N_WIDTH_CURRENCY_COL: f64 = 20.0;

/// Build the default format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_formats() -> SpecXlsxFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };
    let cfg_currency_fmt_spec = cfg_base_fmt_spec.with_(SpecCellFormat {
        num_format: Some(C_NUM_FORMAT_CURRENCY.to_string()),
        ..Default::default()
    });

    SpecXlsxFormats {
        text: cfg_base_fmt_spec.clone(),
        header: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            border: Some(1),
            align: Some("center".to_string()),
            ..Default::default()
        }),
        currency: cfg_currency_fmt_spec.clone(),
        totals_label: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            top: Some(1),
            ..Default::default()
        }),
        totals_currency: cfg_currency_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            top: Some(1),
            ..Default::default()
        }),
    }
}

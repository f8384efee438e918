//! Load budget tables from spreadsheets and Polars IPC payloads.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Sheets, open_workbook_auto};
use polars::prelude::{DataFrame, IpcReader, SerReader};
use tracing::{debug, info};

use cotakit_quota::{EnumCellValue, SpecTable};

use crate::frame::derive_table_from_dataframe;
use crate::spec::XlsxIoError;

const TUP_EXT_SPREADSHEET: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];
const TUP_EXT_IPC: [&str; 3] = ["ipc", "arrow", "feather"];

/// Read the first worksheet; the first row holds column names.
///
/// Blank header cells become `UNNAMED: {idx}`. Rows with no value are skipped.
pub fn read_table_xlsx(path: &Path) -> Result<SpecTable, XlsxIoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|err| XlsxIoError::Open {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let l_sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = l_sheet_names.first() else {
        return Err(XlsxIoError::NoSheets(path.to_path_buf()));
    };
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|err| XlsxIoError::Open {
            path: path.to_path_buf(),
            message: format!("Failed to read sheet '{sheet_name}': {err}"),
        })?;

    let mut l_rows_raw = range.rows();
    let Some(row_header) = l_rows_raw.next() else {
        debug!(path = %path.display(), sheet = %sheet_name, "sheet is empty");
        return Ok(SpecTable::default());
    };
    let l_colnames: Vec<String> = row_header
        .iter()
        .enumerate()
        .map(|(n_idx, cell)| match derive_cell_value_from_data(cell) {
            EnumCellValue::None => format!("UNNAMED: {n_idx}"),
            value => value.to_text(),
        })
        .collect();

    let l_rows: Vec<Vec<EnumCellValue>> = l_rows_raw
        .map(|row| row.iter().map(derive_cell_value_from_data).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_missing()))
        .collect();

    info!(
        path = %path.display(),
        sheet = %sheet_name,
        rows = l_rows.len(),
        cols = l_colnames.len(),
        "loaded spreadsheet"
    );
    Ok(SpecTable::new(l_colnames, l_rows)?)
}

/// Decode a Polars IPC payload into a table.
pub fn read_table_ipc_bytes(v_ipc_df: &[u8]) -> Result<SpecTable, XlsxIoError> {
    let df = derive_dataframe_from_ipc_bytes(v_ipc_df).map_err(XlsxIoError::Ipc)?;
    derive_table_from_dataframe(&df)
}

/// Read a Polars IPC file into a table.
pub fn read_table_ipc(path: &Path) -> Result<SpecTable, XlsxIoError> {
    let file = File::open(path).map_err(|source| XlsxIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = IpcReader::new(file)
        .finish()
        .map_err(|err| XlsxIoError::Ipc(err.to_string()))?;
    info!(path = %path.display(), rows = df.height(), cols = df.width(), "loaded IPC frame");
    derive_table_from_dataframe(&df)
}

/// Dispatch on the file extension (case-insensitive).
pub fn read_table(path: &Path) -> Result<SpecTable, XlsxIoError> {
    let c_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if TUP_EXT_SPREADSHEET.contains(&c_ext.as_str()) {
        read_table_xlsx(path)
    } else if TUP_EXT_IPC.contains(&c_ext.as_str()) {
        read_table_ipc(path)
    } else {
        Err(XlsxIoError::UnsupportedExtension(c_ext))
    }
}

pub(crate) fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, String> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))
}

fn derive_cell_value_from_data(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty | Data::Error(_) => EnumCellValue::None,
        Data::String(val) => {
            let c_val = val.trim();
            if c_val.is_empty() {
                EnumCellValue::None
            } else {
                EnumCellValue::String(c_val.to_string())
            }
        }
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        other => EnumCellValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, IpcWriter, SerWriter};
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn write_fixture_xlsx(path: &Path) {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, " Item ").expect("write");
        worksheet.write_string(0, 1, "Especificação").expect("write");
        worksheet.write_string(0, 3, "Valor Unitário").expect("write");
        worksheet.write_number(1, 0, 1.0).expect("write");
        worksheet.write_string(1, 1, "  Caneta azul ").expect("write");
        worksheet.write_number(1, 3, 2.5).expect("write");
        worksheet.write_string(2, 1, "   ").expect("write");
        worksheet.write_number(3, 0, 2.0).expect("write");
        worksheet.write_string(3, 3, "3,10").expect("write");
        workbook.save(path).expect("save");
    }

    #[test]
    fn test_read_table_xlsx_header_and_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("orcamento.xlsx");
        write_fixture_xlsx(&path);

        let table = read_table(&path).expect("read");

        assert_eq!(
            table.columns(),
            ["ITEM", "ESPECIFICAÇÃO", "UNNAMED: 2", "VALOR UNITÁRIO"]
        );
        // whitespace-only row is dropped
        assert_eq!(table.height(), 2);
        assert_eq!(table.cell(0, "ESPECIFICAÇÃO"), Some(&EnumCellValue::from("Caneta azul")));
        assert_eq!(table.cell(0, "VALOR UNITÁRIO"), Some(&EnumCellValue::Number(2.5)));
        assert_eq!(table.cell(1, "ESPECIFICAÇÃO"), Some(&EnumCellValue::None));
        assert_eq!(table.cell(1, "VALOR UNITÁRIO"), Some(&EnumCellValue::from("3,10")));
    }

    #[test]
    fn test_read_table_ipc_bytes() {
        let mut df = DataFrame::new(vec![
            Column::new("Item".into(), vec![1i64, 2]),
            Column::new("Valor Unitário".into(), vec![Some(2.5), None]),
        ])
        .expect("df");
        let mut v_buf = Vec::new();
        IpcWriter::new(&mut v_buf).finish(&mut df).expect("ipc");

        let table = read_table_ipc_bytes(&v_buf).expect("read");

        assert_eq!(table.columns(), ["ITEM", "VALOR UNITÁRIO"]);
        assert_eq!(table.cell(1, "ITEM"), Some(&EnumCellValue::Number(2.0)));
        assert_eq!(table.cell(1, "VALOR UNITÁRIO"), Some(&EnumCellValue::None));
    }

    #[test]
    fn test_read_table_rejects_unknown_extension() {
        let err = read_table(Path::new("orcamento.csv")).expect_err("must fail");
        assert!(matches!(err, XlsxIoError::UnsupportedExtension(ext) if ext == "csv"));
    }

    #[test]
    fn test_read_table_xlsx_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_table_xlsx(&dir.path().join("nao_existe.xlsx")).expect_err("must fail");
        assert!(matches!(err, XlsxIoError::Open { .. }));
    }
}

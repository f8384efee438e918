//! Polars `DataFrame` to [`SpecTable`] conversion for IPC input.

use polars::prelude::{AnyValue, DataFrame};

use cotakit_quota::{EnumCellValue, SpecTable};

use crate::spec::XlsxIoError;

/// Convert any Polars frame; headers are canonicalized like spreadsheet input.
pub fn derive_table_from_dataframe(df: &DataFrame) -> Result<SpecTable, XlsxIoError> {
    let l_colnames: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let l_cols = df.get_columns();

    let mut l_rows = Vec::with_capacity(df.height());
    for n_idx_row in 0..df.height() {
        let mut row = Vec::with_capacity(l_cols.len());
        for col in l_cols {
            let value = col
                .get(n_idx_row)
                .map_err(|err| XlsxIoError::Ipc(format!("Failed to access cell value: {err}")))?;
            row.push(derive_cell_value_from_any_value(value));
        }
        l_rows.push(row);
    }

    Ok(SpecTable::new(l_colnames, l_rows)?)
}

pub(crate) fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) if val.is_nan() => EnumCellValue::None,
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::Column;

    use super::*;

    #[test]
    fn test_dataframe_to_table_maps_dtypes() {
        let df = DataFrame::new(vec![
            Column::new("Item".into(), vec![1i32, 2]),
            Column::new("Especificação".into(), vec![Some("Cadeira"), None]),
            Column::new("Valor Unitário".into(), vec![Some(10.5), Some(f64::NAN)]),
            Column::new("Ativo".into(), vec![true, false]),
        ])
        .expect("df");

        let table = derive_table_from_dataframe(&df).expect("table");

        assert_eq!(
            table.columns(),
            ["ITEM", "ESPECIFICAÇÃO", "VALOR UNITÁRIO", "ATIVO"]
        );
        assert_eq!(table.cell(1, "ITEM"), Some(&EnumCellValue::Number(2.0)));
        assert_eq!(table.cell(0, "ESPECIFICAÇÃO"), Some(&EnumCellValue::from("Cadeira")));
        assert_eq!(table.cell(1, "ESPECIFICAÇÃO"), Some(&EnumCellValue::None));
        assert_eq!(table.cell(0, "VALOR UNITÁRIO"), Some(&EnumCellValue::Number(10.5)));
        assert_eq!(table.cell(1, "VALOR UNITÁRIO"), Some(&EnumCellValue::None));
        assert_eq!(table.cell(0, "ATIVO"), Some(&EnumCellValue::from("True")));
    }

    #[test]
    fn test_dataframe_with_duplicate_canonical_headers_is_rejected() {
        let df = DataFrame::new(vec![
            Column::new("item".into(), vec![1.0f64]),
            Column::new("ITEM".into(), vec![2.0f64]),
        ])
        .expect("df");

        let err = derive_table_from_dataframe(&df).expect_err("must fail");
        assert!(matches!(err, XlsxIoError::Table(_)));
    }
}

//! Row-oriented budget table and the column schema derived from its header.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{C_COL_QTY_TOTAL, C_COL_UNIT_PRICE, C_COL_VALUE_TOTAL, C_PREFIX_QTY, C_PREFIX_VALUE};
use crate::spec::QuotaError;
use crate::util::format_number_text;

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// One table cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

impl EnumCellValue {
    /// `true` for `None` and for whitespace-only text.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
        }
    }

    /// Numeric coercion: finite numbers and numeric-looking text, else `None`.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Text rendering used in messages and width estimation.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => format_number_text(*n),
        }
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Option<f64>> for EnumCellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::None, Self::Number)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Table

/// Canonical header form: trimmed and upper-cased.
pub fn canonicalize_column_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Ordered rows sharing one canonical column set.
///
/// Row position is the row identifier used by flagged-row selections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecTable {
    columns: Vec<String>,
    rows: Vec<Vec<EnumCellValue>>,
}

impl SpecTable {
    /// Build a table, canonicalizing headers and padding short rows with `None`.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<EnumCellValue>>,
    ) -> Result<Self, QuotaError> {
        let columns: Vec<String> = columns
            .iter()
            .map(|c_name| canonicalize_column_name(c_name))
            .collect();
        validate_unique_columns(&columns)?;

        let n_width = columns.len();
        let mut l_rows = Vec::with_capacity(rows.len());
        for (n_idx_row, mut row) in rows.into_iter().enumerate() {
            if row.len() > n_width {
                return Err(QuotaError::RaggedRow {
                    row: n_idx_row + 1,
                    width_row: row.len(),
                    width: n_width,
                });
            }
            row.resize(n_width, EnumCellValue::None);
            l_rows.push(row);
        }

        Ok(Self {
            columns,
            rows: l_rows,
        })
    }

    /// Table with the given header and no rows.
    pub fn empty(columns: Vec<String>) -> Result<Self, QuotaError> {
        Self::new(columns, vec![])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by canonical name.
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c_name| c_name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.col_index(name).is_some()
    }

    /// Cell at `(row, column name)`.
    pub fn cell(&self, n_idx_row: usize, name: &str) -> Option<&EnumCellValue> {
        let n_idx_col = self.col_index(name)?;
        self.rows.get(n_idx_row).map(|row| &row[n_idx_col])
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<EnumCellValue>>) {
        (self.columns, self.rows)
    }

    /// Append `name` with blank cells unless it already exists; return its index.
    pub(crate) fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(n_idx_col) = self.col_index(name) {
            return n_idx_col;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(EnumCellValue::None);
        }
        self.columns.len() - 1
    }

    /// Insert `name` at `n_idx_col` unless it already exists anywhere.
    pub(crate) fn ensure_column_at(&mut self, name: &str, n_idx_col: usize) {
        if self.has_column(name) {
            return;
        }
        let n_idx_col = usize::min(n_idx_col, self.columns.len());
        self.columns.insert(n_idx_col, name.to_string());
        for row in &mut self.rows {
            row.insert(n_idx_col, EnumCellValue::None);
        }
    }

    pub(crate) fn drop_column(&mut self, name: &str) {
        let Some(n_idx_col) = self.col_index(name) else {
            return;
        };
        self.columns.remove(n_idx_col);
        for row in &mut self.rows {
            row.remove(n_idx_col);
        }
    }

    pub(crate) fn set_cell(&mut self, n_idx_row: usize, n_idx_col: usize, value: EnumCellValue) {
        self.rows[n_idx_row][n_idx_col] = value;
    }

    pub(crate) fn from_parts_unchecked(
        columns: Vec<String>,
        rows: Vec<Vec<EnumCellValue>>,
    ) -> Self {
        Self { columns, rows }
    }
}

fn validate_unique_columns(columns: &[String]) -> Result<(), QuotaError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");

    Err(QuotaError::DuplicateColumns(c_msg))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnSchema

/// `QUANTIDADE*` other than the total-quantity column.
pub fn is_qty_family_column(name: &str) -> bool {
    name.starts_with(C_PREFIX_QTY) && name != C_COL_QTY_TOTAL
}

/// `VALOR TOTAL*` other than the total-value column.
pub fn is_value_family_column(name: &str) -> bool {
    name.starts_with(C_PREFIX_VALUE) && name != C_COL_VALUE_TOTAL
}

/// One quantity-family column and the value column that must equal
/// `round(qty × unit price)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnPair {
    pub qty: String,
    pub value: String,
}

/// Column roles resolved once from an input header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecColumnSchema {
    /// Quantity/value pairs in quantity-column order.
    pub pairs: Vec<SpecColumnPair>,
    /// Input carried `QUANTIDADE TOTAL`.
    pub if_has_qty_total: bool,
    /// Input carried `VALOR UNITÁRIO`.
    pub if_has_unit_price: bool,
}

impl SpecColumnSchema {
    /// Pair every quantity-family column with a value column.
    ///
    /// Matching order: same suffix (`QUANTIDADE X` ↔ `VALOR TOTAL X`), then the
    /// next unpaired value-family column by position, then a new column name.
    pub fn derive(columns: &[String]) -> Self {
        let l_cols_qty: Vec<&String> = columns.iter().filter(|c| is_qty_family_column(c)).collect();
        let l_cols_value: Vec<&String> =
            columns.iter().filter(|c| is_value_family_column(c)).collect();

        let mut l_paired: Vec<Option<String>> = vec![None; l_cols_qty.len()];
        let mut set_value_used: BTreeSet<&str> = BTreeSet::new();

        for (n_idx, c_qty) in l_cols_qty.iter().enumerate() {
            let c_suffix = &c_qty[C_PREFIX_QTY.len()..];
            if c_suffix.is_empty() {
                continue;
            }
            let c_candidate = format!("{C_PREFIX_VALUE}{c_suffix}");
            if let Some(c_value) = l_cols_value.iter().find(|c| ***c == c_candidate)
                && set_value_used.insert(c_value.as_str())
            {
                l_paired[n_idx] = Some(c_candidate);
            }
        }

        let mut it_value_free = l_cols_value
            .iter()
            .filter(|c| !set_value_used.contains(c.as_str()));
        for (n_idx, c_qty) in l_cols_qty.iter().enumerate() {
            if l_paired[n_idx].is_some() {
                continue;
            }
            l_paired[n_idx] = Some(match it_value_free.next() {
                Some(c_value) => (*c_value).clone(),
                None => derive_value_column_name(c_qty),
            });
        }

        let pairs = l_cols_qty
            .into_iter()
            .zip(l_paired)
            .map(|(c_qty, c_value)| SpecColumnPair {
                qty: c_qty.clone(),
                value: c_value.unwrap_or_else(|| derive_value_column_name(c_qty)),
            })
            .collect();

        Self {
            pairs,
            if_has_qty_total: columns.iter().any(|c| c == C_COL_QTY_TOTAL),
            if_has_unit_price: columns.iter().any(|c| c == C_COL_UNIT_PRICE),
        }
    }

    /// Total quantity can be read or derived.
    pub fn has_quantity_source(&self) -> bool {
        self.if_has_qty_total || !self.pairs.is_empty()
    }

    pub fn has_family_columns(&self) -> bool {
        !self.pairs.is_empty()
    }
}

fn derive_value_column_name(col_qty: &str) -> String {
    let c_suffix = &col_qty[C_PREFIX_QTY.len()..];
    if c_suffix.is_empty() {
        format!("{C_PREFIX_VALUE} {col_qty}")
    } else {
        format!("{C_PREFIX_VALUE}{c_suffix}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_new_canonicalizes_headers_and_pads_rows() {
        let table = SpecTable::new(
            cols(&[" item ", "valor unitário", "Especificação"]),
            vec![vec![EnumCellValue::from(1.0)]],
        )
        .expect("table");

        assert_eq!(table.columns(), ["ITEM", "VALOR UNITÁRIO", "ESPECIFICAÇÃO"]);
        assert_eq!(table.rows()[0].len(), 3);
        assert_eq!(table.cell(0, "ESPECIFICAÇÃO"), Some(&EnumCellValue::None));
    }

    #[test]
    fn test_new_rejects_duplicates_after_canonicalization() {
        let err = SpecTable::new(cols(&["Item", "ITEM "]), vec![]).expect_err("must fail");
        assert!(matches!(err, QuotaError::DuplicateColumns(_)));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let err = SpecTable::new(
            cols(&["ITEM"]),
            vec![vec![EnumCellValue::from(1.0), EnumCellValue::from(2.0)]],
        )
        .expect_err("must fail");
        assert_eq!(
            err,
            QuotaError::RaggedRow {
                row: 1,
                width_row: 2,
                width: 1
            }
        );
    }

    #[test]
    fn test_to_f64_coerces_numeric_text_only() {
        assert_eq!(EnumCellValue::from(" 12.5 ").to_f64(), Some(12.5));
        assert_eq!(EnumCellValue::from("abc").to_f64(), None);
        assert_eq!(EnumCellValue::None.to_f64(), None);
        assert_eq!(EnumCellValue::Number(f64::NAN).to_f64(), None);
    }

    #[test]
    fn test_schema_pairs_by_suffix_before_position() {
        let schema = SpecColumnSchema::derive(&cols(&[
            "QUANTIDADE TOTAL",
            "QUANTIDADE A",
            "QUANTIDADE B",
            "VALOR UNITÁRIO",
            "VALOR TOTAL B",
            "VALOR TOTAL A",
            "VALOR TOTAL",
        ]));

        assert!(schema.if_has_qty_total);
        assert!(schema.if_has_unit_price);
        assert_eq!(
            schema.pairs,
            vec![
                SpecColumnPair {
                    qty: "QUANTIDADE A".to_string(),
                    value: "VALOR TOTAL A".to_string()
                },
                SpecColumnPair {
                    qty: "QUANTIDADE B".to_string(),
                    value: "VALOR TOTAL B".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_schema_falls_back_to_position_then_new_name() {
        let schema = SpecColumnSchema::derive(&cols(&[
            "QUANTIDADE CAMPUS 1",
            "QUANTIDADE CAMPUS 2",
            "VALOR TOTAL SEDE",
        ]));

        assert_eq!(schema.pairs[0].value, "VALOR TOTAL SEDE");
        assert_eq!(schema.pairs[1].value, "VALOR TOTAL CAMPUS 2");
        assert!(!schema.if_has_qty_total);
    }

    #[test]
    fn test_schema_bare_quantity_never_pairs_with_total_value() {
        let schema = SpecColumnSchema::derive(&cols(&["QUANTIDADE", "VALOR TOTAL"]));
        assert_eq!(schema.pairs[0].value, "VALOR TOTAL QUANTIDADE");
        assert!(schema.has_quantity_source());
    }

    #[test]
    fn test_ensure_and_drop_column() {
        let mut table = SpecTable::new(cols(&["A"]), vec![vec![EnumCellValue::from(1.0)]])
            .expect("table");
        table.ensure_column_at("ITEM", 0);
        assert_eq!(table.ensure_column("B"), 2);
        assert_eq!(table.ensure_column("A"), 1);
        assert_eq!(table.columns(), ["ITEM", "A", "B"]);

        table.drop_column("A");
        assert_eq!(table.columns(), ["ITEM", "B"]);
        assert_eq!(table.rows()[0], vec![EnumCellValue::None, EnumCellValue::None]);
    }
}

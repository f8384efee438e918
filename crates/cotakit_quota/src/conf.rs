//! Column names, treatment labels and decision-rule constants.

/// Item number column.
pub const C_COL_ITEM: &str = "ITEM";
/// Free-text item specification column.
pub const C_COL_SPECIFICATION: &str = "ESPECIFICAÇÃO";
/// Total quantity column (optional in input).
pub const C_COL_QTY_TOTAL: &str = "QUANTIDADE TOTAL";
/// Unit price column (mandatory in input).
pub const C_COL_UNIT_PRICE: &str = "VALOR UNITÁRIO";
/// Total value column.
pub const C_COL_VALUE_TOTAL: &str = "VALOR TOTAL";
/// Treatment classification column added by the allocator.
pub const C_COL_TREATMENT: &str = "TRATAMENTO FAVORECIDO DECRETO 8538/2015";

/// Prefix shared by every quantity-family column.
pub const C_PREFIX_QTY: &str = "QUANTIDADE";
/// Prefix shared by every value-family column.
pub const C_PREFIX_VALUE: &str = "VALOR TOTAL";

/// Label for rows whose whole value fits under the ceiling.
pub const C_TREATMENT_EXCLUSIVE: &str = "Exclusivo para ME/EPP";
/// Label for open-competition rows.
pub const C_TREATMENT_OPEN: &str = "Ampla Disputa";
/// Label for reserved-quota rows.
pub const C_TREATMENT_QUOTA: &str = "Cota reservada para ME/EPP";

/// Set-aside value ceiling (BRL).
pub const N_VALUE_CEILING: f64 = 80_000.0;
/// Largest quota percentage tried.
pub const N_PCT_QUOTA_MAX: u32 = 25;
/// Smallest quota percentage tried.
pub const N_PCT_QUOTA_MIN: u32 = 1;
/// Decimal places kept on every value column.
pub const N_DECIMALS_VALUE: u32 = 4;
/// Absolute divergence tolerated between supplied and recomputed totals.
pub const N_TOLERANCE_DIVERGENCE: f64 = 0.01;

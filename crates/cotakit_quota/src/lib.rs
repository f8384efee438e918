//! `cotakit_quota` v1:
//! ME/EPP quota allocation kernel for budget tables.
//!
//! Modules:
//! - `conf`      : column names, labels and rule constants
//! - `spec`      : policy/report/error models
//! - `table`     : table model and column schema
//! - `util`      : rounding and currency helpers
//! - `normalize` : coercion and derived-total recomputation
//! - `allocate`  : set-aside decision and row splitting
//! - `pipeline`  : normalize + allocate in one call
pub mod allocate;
pub mod conf;
pub mod normalize;
pub mod pipeline;
pub mod spec;
pub mod table;
pub mod util;

pub use allocate::{
    EnumQuotaDecision, allocate, allocate_with_summary, decide_quota, format_quota_specification,
    search_quota_pct,
};
pub use conf::{
    C_COL_ITEM, C_COL_QTY_TOTAL, C_COL_SPECIFICATION, C_COL_TREATMENT, C_COL_UNIT_PRICE,
    C_COL_VALUE_TOTAL, C_PREFIX_QTY, C_PREFIX_VALUE, C_TREATMENT_EXCLUSIVE, C_TREATMENT_OPEN,
    C_TREATMENT_QUOTA,
};
pub use normalize::normalize;
pub use pipeline::process_budget;
pub use spec::{
    EnumRowRef, EnumTreatment, QuotaError, SpecAllocationSummary, SpecCorrection,
    SpecNormalizeReport, SpecQuotaOutcome, SpecQuotaPolicy,
};
pub use table::{
    EnumCellValue, SpecColumnPair, SpecColumnSchema, SpecTable, canonicalize_column_name,
    is_qty_family_column, is_value_family_column,
};
pub use util::format_currency_brl;

//! Policy, treatment, report and error models.

use std::fmt;

use crate::conf::{
    C_TREATMENT_EXCLUSIVE, C_TREATMENT_OPEN, C_TREATMENT_QUOTA, N_DECIMALS_VALUE,
    N_PCT_QUOTA_MAX, N_PCT_QUOTA_MIN, N_TOLERANCE_DIVERGENCE, N_VALUE_CEILING,
};
use crate::table::SpecTable;
use crate::util::format_currency_brl;

////////////////////////////////////////////////////////////////////////////////
// #region Treatment

/// Favored-treatment classification written to every output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumTreatment {
    /// Whole item reserved for ME/EPP.
    Exclusive,
    /// Open competition.
    OpenCompetition,
    /// Reserved quota carved out of a larger item.
    ReservedQuota,
}

impl EnumTreatment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Exclusive => C_TREATMENT_EXCLUSIVE,
            Self::OpenCompetition => C_TREATMENT_OPEN,
            Self::ReservedQuota => C_TREATMENT_QUOTA,
        }
    }
}

impl fmt::Display for EnumTreatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Policy

/// Decision-rule and validation thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecQuotaPolicy {
    /// Value ceiling for full set-aside and for the quota slice.
    pub value_ceiling: f64,
    /// First (largest) percentage tried by the quota search.
    pub pct_quota_max: u32,
    /// Last (smallest) percentage tried by the quota search.
    pub pct_quota_min: u32,
    /// Decimal places kept on value columns.
    pub n_decimals: u32,
    /// Absolute tolerance before a supplied total is reported as divergent.
    pub tolerance: f64,
}

impl Default for SpecQuotaPolicy {
    fn default() -> Self {
        Self {
            value_ceiling: N_VALUE_CEILING,
            pct_quota_max: N_PCT_QUOTA_MAX,
            pct_quota_min: N_PCT_QUOTA_MIN,
            n_decimals: N_DECIMALS_VALUE,
            tolerance: N_TOLERANCE_DIVERGENCE,
        }
    }
}

impl SpecQuotaPolicy {
    pub fn validate(&self) -> Result<(), QuotaError> {
        if !(self.value_ceiling.is_finite() && self.value_ceiling > 0.0) {
            return Err(QuotaError::InvalidPolicy(
                "value_ceiling must be a positive number.".to_string(),
            ));
        }
        if self.pct_quota_min == 0 {
            return Err(QuotaError::InvalidPolicy(
                "pct_quota_min must be >= 1.".to_string(),
            ));
        }
        if self.pct_quota_max > 100 {
            return Err(QuotaError::InvalidPolicy(
                "pct_quota_max must be <= 100.".to_string(),
            ));
        }
        if self.pct_quota_min > self.pct_quota_max {
            return Err(QuotaError::InvalidPolicy(
                "pct_quota_min must be <= pct_quota_max.".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(QuotaError::InvalidPolicy(
                "tolerance must be >= 0.".to_string(),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reports

/// How a correction message names its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRowRef {
    /// Item number as supplied in the `ITEM` column.
    Item(String),
    /// 1-based row position, used when the item number is missing.
    Position(usize),
}

impl fmt::Display for EnumRowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(item) => write!(f, "Item {item}"),
            Self::Position(n_pos) => write!(f, "Linha {n_pos}"),
        }
    }
}

/// One supplied total that disagreed with its recomputed value.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecCorrection {
    pub row_ref: EnumRowRef,
    pub column: String,
    pub value_supplied: f64,
    pub value_corrected: f64,
}

impl SpecCorrection {
    /// Human-readable correction line.
    pub fn message(&self) -> String {
        format!(
            "{}: {} informado ({}) corrigido para {}.",
            self.row_ref,
            self.column,
            format_currency_brl(self.value_supplied),
            format_currency_brl(self.value_corrected)
        )
    }
}

/// Outcome of one normalization pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecNormalizeReport {
    pub corrections: Vec<SpecCorrection>,
}

impl SpecNormalizeReport {
    pub fn messages(&self) -> Vec<String> {
        self.corrections.iter().map(SpecCorrection::message).collect()
    }

    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Counters for one allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecAllocationSummary {
    pub cnt_rows_in: usize,
    pub cnt_rows_out: usize,
    /// Flagged ids that matched an input row.
    pub cnt_flagged: usize,
    /// Flagged ids with no matching input row.
    pub cnt_flagged_ignored: usize,
    pub cnt_exclusive: usize,
    pub cnt_open: usize,
    pub cnt_quota: usize,
    /// Flagged rows split into remainder + quota.
    pub cnt_split: usize,
}

impl SpecAllocationSummary {
    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} rows_in={} rows_out={} flagged={} ignored={} exclusive={} open={} quota={} split={}",
            self.cnt_rows_in,
            self.cnt_rows_out,
            self.cnt_flagged,
            self.cnt_flagged_ignored,
            self.cnt_exclusive,
            self.cnt_open,
            self.cnt_quota,
            self.cnt_split
        )
    }

    pub(crate) fn count_treatment(&mut self, treatment: EnumTreatment) {
        match treatment {
            EnumTreatment::Exclusive => self.cnt_exclusive += 1,
            EnumTreatment::OpenCompetition => self.cnt_open += 1,
            EnumTreatment::ReservedQuota => self.cnt_quota += 1,
        }
    }
}

impl fmt::Display for SpecAllocationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[QUOTA]"))
    }
}

/// Result of the full normalize + allocate pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecQuotaOutcome {
    pub table: SpecTable,
    pub report_normalize: SpecNormalizeReport,
    pub summary: SpecAllocationSummary,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Schema and configuration failures that abort processing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuotaError {
    /// A mandatory column is absent.
    #[error("Required column missing: {0:?}")]
    MissingColumn(String),
    /// Neither `QUANTIDADE TOTAL` nor any `QUANTIDADE*` column exists.
    #[error(
        "The table has neither 'QUANTIDADE TOTAL' nor partial 'QUANTIDADE' columns to compute from."
    )]
    MissingQuantitySource,
    /// Canonical header names collide.
    #[error("Duplicate column names detected: {0}")]
    DuplicateColumns(String),
    /// A row carries more cells than the header has columns.
    #[error("Row {row} has {width_row} cells but the header has {width} columns.")]
    RaggedRow {
        row: usize,
        width_row: usize,
        width: usize,
    },
    /// Policy thresholds are inconsistent.
    #[error("Invalid quota policy: {0}")]
    InvalidPolicy(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

//! Column type inference.
//!
//! Inference runs in two steps. [`ColumnProfile::from_values`] scans a
//! column once and records its [`ValueKind`], integer range and longest
//! stringified value. An [`InferencePolicy`] then maps the profile to a
//! [`ColumnType`].
//!
//! Two policies exist:
//!
//! - [`CoarsePolicy`] looks only at the kind (`Integer` → `INT`, text →
//!   `VARCHAR(255)`).
//! - [`RangeAwarePolicy`] picks the narrowest integer type that holds the
//!   observed range and sizes `VARCHAR` from the longest value plus 20%.
//!
//! ```
//! use sluice::ingest::inference::{infer_column, RangeAwarePolicy};
//! use sluice::ingest::{ColumnType, Value};
//!
//! let values = vec![Value::Integer(-128), Value::Integer(127)];
//! assert_eq!(infer_column(&values, &RangeAwarePolicy), ColumnType::TinyInt);
//! ```

use super::missing::is_missing;
use super::table::{Table, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest `VARCHAR` bound the range-aware policy will emit.
pub const MAX_VARCHAR_LENGTH: u32 = 65_535;
/// Bound used for all-missing columns, and the floor for every other one.
pub const MIN_VARCHAR_LENGTH: u32 = 1;
/// Fixed text width of the coarse policy.
pub const COARSE_VARCHAR_LENGTH: u32 = 255;

/// Target SQL storage type for one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Double,
    DateTime,
    Boolean,
    Varchar(u32),
}

impl ColumnType {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::DateTime => "DATETIME",
            Self::Boolean => "BOOLEAN",
            Self::Varchar(_) => "VARCHAR",
        }
    }

    /// Character bound, only present for `VARCHAR`.
    pub fn length(&self) -> Option<u32> {
        match self {
            Self::Varchar(len) => Some(*len),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt
        )
    }

    /// Narrowest integer type whose inclusive range holds `[min, max]`.
    pub fn narrowest_integer(min: i64, max: i64) -> Self {
        let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
        if fits(i8::MIN.into(), i8::MAX.into()) {
            Self::TinyInt
        } else if fits(i16::MIN.into(), i16::MAX.into()) {
            Self::SmallInt
        } else if fits(i32::MIN.into(), i32::MAX.into()) {
            Self::Int
        } else {
            Self::BigInt
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length() {
            Some(len) => write!(f, "{}({len})", self.tag()),
            None => f.write_str(self.tag()),
        }
    }
}

/// Everything a policy needs to know about one column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnProfile {
    pub kind: ValueKind,
    pub count: usize,
    pub non_missing: usize,
    /// Observed `(min, max)`, only for integer columns.
    pub int_range: Option<(i64, i64)>,
    /// Longest non-missing value, in characters, after stringification.
    pub max_chars: usize,
}

#[derive(Default)]
struct KindFlags {
    integer: bool,
    float: bool,
    boolean: bool,
    timestamp: bool,
    text: bool,
}

impl KindFlags {
    fn kind(&self) -> ValueKind {
        let numeric = self.integer || self.float;
        let others = [numeric, self.boolean, self.timestamp]
            .iter()
            .filter(|seen| **seen)
            .count();

        if self.text || others > 1 {
            ValueKind::Text
        } else if self.float {
            ValueKind::Float
        } else if self.integer {
            ValueKind::Integer
        } else if self.boolean {
            ValueKind::Boolean
        } else if self.timestamp {
            ValueKind::Timestamp
        } else {
            ValueKind::AllMissing
        }
    }
}

impl ColumnProfile {
    pub fn from_values(values: &[Value]) -> Self {
        let mut flags = KindFlags::default();
        let mut non_missing = 0;
        let mut int_range: Option<(i64, i64)> = None;
        let mut max_chars = 0;

        for value in values.iter().filter(|v| !is_missing(v)) {
            non_missing += 1;
            max_chars = max_chars.max(value.char_len());
            match value {
                Value::Integer(i) => {
                    flags.integer = true;
                    int_range = Some(match int_range {
                        Some((lo, hi)) => (lo.min(*i), hi.max(*i)),
                        None => (*i, *i),
                    });
                }
                Value::Float(_) => flags.float = true,
                Value::Boolean(_) => flags.boolean = true,
                Value::Timestamp(_) => flags.timestamp = true,
                Value::Text(_) => flags.text = true,
                Value::Missing => {}
            }
        }

        let kind = flags.kind();
        Self {
            kind,
            count: values.len(),
            non_missing,
            int_range: if kind == ValueKind::Integer {
                int_range
            } else {
                None
            },
            max_chars,
        }
    }
}

/// Strategy mapping a column profile to a SQL type.
pub trait InferencePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&self, profile: &ColumnProfile) -> ColumnType;
}

/// Maps by kind only; text is always `VARCHAR(255)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoarsePolicy;

impl InferencePolicy for CoarsePolicy {
    fn name(&self) -> &'static str {
        "coarse"
    }

    fn decide(&self, profile: &ColumnProfile) -> ColumnType {
        match profile.kind {
            ValueKind::Integer => ColumnType::Int,
            ValueKind::Float => ColumnType::Double,
            ValueKind::Boolean => ColumnType::Boolean,
            ValueKind::Timestamp => ColumnType::DateTime,
            ValueKind::Text | ValueKind::AllMissing => ColumnType::Varchar(COARSE_VARCHAR_LENGTH),
        }
    }
}

/// Narrowest integer type for the observed range; text sized from content.
#[derive(Clone, Copy, Debug, Default)]
pub struct RangeAwarePolicy;

impl RangeAwarePolicy {
    /// `floor(longest * 1.2)`, clamped to `[MIN_VARCHAR_LENGTH, MAX_VARCHAR_LENGTH]`.
    pub fn varchar_length(max_chars: usize) -> u32 {
        // integer arithmetic keeps floor(n * 1.2) exact
        let padded = max_chars.saturating_mul(6) / 5;
        let capped = padded.min(MAX_VARCHAR_LENGTH as usize) as u32;
        capped.max(MIN_VARCHAR_LENGTH)
    }
}

impl InferencePolicy for RangeAwarePolicy {
    fn name(&self) -> &'static str {
        "range-aware"
    }

    fn decide(&self, profile: &ColumnProfile) -> ColumnType {
        match profile.kind {
            ValueKind::Integer => match profile.int_range {
                Some((min, max)) => ColumnType::narrowest_integer(min, max),
                None => ColumnType::BigInt,
            },
            ValueKind::Float => ColumnType::Double,
            ValueKind::Boolean => ColumnType::Boolean,
            ValueKind::Timestamp => ColumnType::DateTime,
            ValueKind::Text => ColumnType::Varchar(Self::varchar_length(profile.max_chars)),
            ValueKind::AllMissing => ColumnType::Varchar(MIN_VARCHAR_LENGTH),
        }
    }
}

static COARSE: CoarsePolicy = CoarsePolicy;
static RANGE_AWARE: RangeAwarePolicy = RangeAwarePolicy;

/// Configuration-level choice of policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferencePolicyKind {
    Coarse,
    #[default]
    RangeAware,
}

impl InferencePolicyKind {
    pub fn policy(self) -> &'static dyn InferencePolicy {
        match self {
            Self::Coarse => &COARSE,
            Self::RangeAware => &RANGE_AWARE,
        }
    }
}

impl FromStr for InferencePolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coarse" => Ok(Self::Coarse),
            "range-aware" | "range_aware" | "rangeaware" => Ok(Self::RangeAware),
            other => Err(format!(
                "Unknown inference policy '{other}' (expected 'coarse' or 'range-aware')"
            )),
        }
    }
}

pub fn infer_column(values: &[Value], policy: &dyn InferencePolicy) -> ColumnType {
    policy.decide(&ColumnProfile::from_values(values))
}

/// Per-column decisions for a whole table, in column order.
pub fn infer_table(table: &Table, policy: &dyn InferencePolicy) -> Vec<(String, ColumnType)> {
    table
        .columns()
        .iter()
        .map(|column| {
            let column_type = infer_column(column.values(), policy);
            tracing::debug!(
                column = column.name(),
                policy = policy.name(),
                %column_type,
                "Inferred column type"
            );
            (column.name().to_owned(), column_type)
        })
        .collect()
}

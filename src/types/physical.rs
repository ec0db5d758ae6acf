//! Logical and physical type definitions for column vectors.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorError};

/// Maximum decimal digits that always fit a signed 16-bit integer.
pub const MAX_WIDTH_INT16: u8 = 4;
/// Maximum decimal digits that always fit a signed 32-bit integer.
pub const MAX_WIDTH_INT32: u8 = 9;
/// Maximum decimal digits that always fit a signed 64-bit integer.
pub const MAX_WIDTH_INT64: u8 = 18;
/// Maximum decimal digits that always fit a signed 128-bit integer.
pub const MAX_WIDTH_INT128: u8 = 38;

/// Fixed-width integer representation backing a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhysicalType {
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 128-bit signed integer.
    Int128,
}

impl PhysicalType {
    /// Returns the name of the physical type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalType::Int16 => "INT16",
            PhysicalType::Int32 => "INT32",
            PhysicalType::Int64 => "INT64",
            PhysicalType::Int128 => "INT128",
        }
    }

    /// Returns the width of one element in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            PhysicalType::Int16 => 2,
            PhysicalType::Int32 => 4,
            PhysicalType::Int64 => 8,
            PhysicalType::Int128 => 16,
        }
    }

    /// Picks the narrowest physical type able to hold `precision` decimal digits.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::ConstructionError`] if `precision` exceeds
    /// [`MAX_WIDTH_INT128`].
    pub fn for_decimal_precision(precision: u8) -> Result<Self> {
        match precision {
            p if p <= MAX_WIDTH_INT16 => Ok(PhysicalType::Int16),
            p if p <= MAX_WIDTH_INT32 => Ok(PhysicalType::Int32),
            p if p <= MAX_WIDTH_INT64 => Ok(PhysicalType::Int64),
            p if p <= MAX_WIDTH_INT128 => Ok(PhysicalType::Int128),
            p => Err(VectorError::ConstructionError(format!(
                "Decimal precision {p} is bigger than the maximum supported width {MAX_WIDTH_INT128}"
            ))),
        }
    }

    /// Returns true if `value` is representable in this width.
    #[must_use]
    pub fn fits(&self, value: i128) -> bool {
        match self {
            PhysicalType::Int16 => i16::try_from(value).is_ok(),
            PhysicalType::Int32 => i32::try_from(value).is_ok(),
            PhysicalType::Int64 => i64::try_from(value).is_ok(),
            PhysicalType::Int128 => true,
        }
    }
}

impl std::fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical column types handled by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Date (stored as days since epoch).
    Date,
    /// Timestamp (stored as microseconds since epoch).
    Timestamp {
        /// Declared sub-second precision, informational only.
        precision: u8,
    },
    /// Fixed-point decimal (stored as an unscaled integer).
    Decimal {
        /// Total significant digits.
        precision: u8,
        /// Fractional digits.
        scale: u8,
    },
}

impl DataType {
    /// Returns the SQL-style name of the data type.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            DataType::Date => "DATE".to_string(),
            DataType::Timestamp { .. } => "TIMESTAMP".to_string(),
            DataType::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
        }
    }

    /// Returns the physical type values of this data type are stored as.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::ConstructionError`] for decimals wider than 38 digits.
    pub fn physical_type(&self) -> Result<PhysicalType> {
        match self {
            DataType::Date => Ok(PhysicalType::Int32),
            DataType::Timestamp { .. } => Ok(PhysicalType::Int64),
            DataType::Decimal { precision, .. } => PhysicalType::for_decimal_precision(*precision),
        }
    }

    /// Converts to an Arrow data type.
    #[must_use]
    pub fn to_arrow(&self) -> arrow::datatypes::DataType {
        match self {
            DataType::Date => arrow::datatypes::DataType::Date32,
            DataType::Timestamp { .. } => {
                arrow::datatypes::DataType::Timestamp(arrow::datatypes::TimeUnit::Microsecond, None)
            }
            DataType::Decimal { precision, scale } => {
                arrow::datatypes::DataType::Decimal128(*precision, *scale as i8)
            }
        }
    }

    /// Converts from an Arrow data type.
    ///
    /// Returns None for unsupported Arrow types.
    #[must_use]
    pub fn from_arrow(arrow_type: &arrow::datatypes::DataType) -> Option<Self> {
        match arrow_type {
            arrow::datatypes::DataType::Date32 => Some(DataType::Date),
            arrow::datatypes::DataType::Timestamp(arrow::datatypes::TimeUnit::Microsecond, _) => {
                Some(DataType::Timestamp { precision: 6 })
            }
            arrow::datatypes::DataType::Decimal128(precision, scale) if *scale >= 0 => {
                Some(DataType::Decimal {
                    precision: *precision,
                    scale: *scale as u8,
                })
            }
            _ => None,
        }
    }
}

//! Timestamp column vector: one `i64` microsecond count per row.

use std::sync::Arc;

use arrow::array::{ArrayRef, TimestampMicrosecondArray};

use super::aligned::AlignedBuffer;
use super::base::ColumnVector;
use super::calendar::{self, MICROS_PER_MILLI, MICROS_PER_SECOND};
use super::{Vector, VectorConfig};
use crate::error::{Result, VectorError};
use crate::types::{DataType, PhysicalType};

/// Base alignment of timestamp buffers, in bytes. Applies to the initial
/// allocation and to every reallocation.
pub const TIMESTAMP_ALIGNMENT: usize = 64;

/// Column of timestamps stored as microseconds since 1970-01-01T00:00:00 UTC.
#[derive(Debug)]
pub struct TimestampColumnVector {
    base: ColumnVector<i64>,
    /// Declared sub-second precision; informational only.
    precision: u8,
}

impl TimestampColumnVector {
    /// Creates a timestamp vector.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn new(capacity: usize, precision: u8, encoding: bool) -> Result<Self> {
        Self::with_capacity_and_config(capacity, precision, encoding, VectorConfig::default())
    }

    /// Creates a timestamp vector sized to `config.default_capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn with_config(precision: u8, config: VectorConfig) -> Result<Self> {
        Self::with_capacity_and_config(config.default_capacity, precision, true, config)
    }

    /// Creates a timestamp vector with an explicit capacity and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn with_capacity_and_config(
        capacity: usize,
        precision: u8,
        encoding: bool,
        config: VectorConfig,
    ) -> Result<Self> {
        let base =
            ColumnVector::new(capacity, encoding, TIMESTAMP_ALIGNMENT, config.growth_factor)?;
        Ok(Self { base, precision })
    }

    /// Wraps microsecond values owned elsewhere; the first `len` are treated
    /// as written.
    #[must_use]
    pub fn from_external(
        buffer: Arc<AlignedBuffer<i64>>,
        len: usize,
        precision: u8,
        config: VectorConfig,
    ) -> Self {
        Self {
            base: ColumnVector::from_external(buffer, len, config.growth_factor),
            precision,
        }
    }

    #[must_use]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// The underlying generic vector.
    #[must_use]
    pub fn base(&self) -> &ColumnVector<i64> {
        &self.base
    }

    /// Converts `YYYY-MM-DD HH:MM:SS[.mmm[.uuu]]` to microseconds since the epoch.
    ///
    /// The optional groups are read as integers: `.5` is 5 milliseconds and
    /// `.500.250` is 500 milliseconds plus 250 microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::FormatError`] if the text does not match the
    /// grammar, and [`VectorError::ConversionError`] if the fields name no
    /// real instant.
    pub fn parse_micros(value: &str) -> Result<i64> {
        let (seconds, rest) = calendar::parse_datetime_prefix(value)?;
        let (millis, rest) = calendar::parse_fraction_group(value, rest)?;
        let (micros, rest) = calendar::parse_fraction_group(value, rest)?;
        if !rest.is_empty() {
            return Err(VectorError::FormatError(format!(
                "Invalid timestamp string '{value}'. Expected: YYYY-MM-DD HH:MM:SS[.millis[.micros]]"
            )));
        }
        seconds
            .checked_mul(MICROS_PER_SECOND)
            .and_then(|us| us.checked_add(millis * MICROS_PER_MILLI + micros))
            .ok_or_else(|| {
                VectorError::ConversionError(format!("Failed to convert '{value}' to a timestamp"))
            })
    }

    /// Parses a timestamp string and appends it.
    ///
    /// # Errors
    ///
    /// See [`parse_micros`](Self::parse_micros); also fails after close.
    pub fn add_str(&mut self, value: &str) -> Result<()> {
        let micros = Self::parse_micros(value)?;
        self.add_i64(micros)
    }

    /// Appends a raw microsecond count.
    ///
    /// # Errors
    ///
    /// Fails after close.
    pub fn add_i64(&mut self, micros: i64) -> Result<()> {
        self.base.push(micros).map(|_| ())
    }

    /// Writes `micros` at `position`, marking it not null.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::IndexOutOfBounds`] past the capacity; also fails
    /// after close.
    pub fn set(&mut self, position: usize, micros: i64) -> Result<()> {
        self.base.set(position, micros)
    }

    /// Writes `micros` at `position` without updating its null flag.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_untracked(&mut self, position: usize, micros: i64) -> Result<()> {
        self.base.set_untracked(position, micros)
    }

    /// Marks `position` null.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_null(&mut self, position: usize) -> Result<()> {
        self.base.set_null(position)
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<i64> {
        self.base.get(position)
    }

    #[must_use]
    pub fn values(&self) -> &[i64] {
        self.base.values()
    }

    /// Unread values, or None once the buffer is released.
    #[must_use]
    pub fn current(&self) -> Option<&[i64]> {
        self.base.current()
    }

    pub fn advance(&mut self, count: usize) -> usize {
        self.base.advance(count)
    }
}

impl Vector for TimestampColumnVector {
    fn data_type(&self) -> DataType {
        DataType::Timestamp {
            precision: self.precision,
        }
    }

    fn physical_type(&self) -> PhysicalType {
        PhysicalType::Int64
    }

    forward_to_base!(base);

    fn add_str(&mut self, value: &str) -> Result<()> {
        TimestampColumnVector::add_str(self, value)
    }

    fn format_value(&self, position: usize) -> Option<String> {
        calendar::format_timestamp(self.base.get(position)?)
    }

    fn to_arrow(&self) -> Result<ArrayRef> {
        if self.base.is_closed() {
            return Err(VectorError::Closed);
        }
        let array: TimestampMicrosecondArray = (0..self.base.write_index())
            .map(|i| self.base.get(i))
            .collect();
        Ok(Arc::new(array))
    }
}

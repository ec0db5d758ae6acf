//! Date column vector: one `i32` day number per row.

use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array};

use super::aligned::AlignedBuffer;
use super::base::ColumnVector;
use super::calendar::{self, SECONDS_PER_DAY};
use super::{Vector, VectorConfig};
use crate::error::{Result, VectorError};
use crate::types::{DataType, PhysicalType};

/// Base alignment of date buffers, in bytes.
pub const DATE_ALIGNMENT: usize = 32;

/// Column of dates stored as day counts relative to 1970-01-01 UTC.
///
/// With the default [`VectorConfig`], parsed dates carry a `+1` offset:
/// 1970-01-01 is stored as 1 and 1970-01-02 as 2. Raw integers passed to
/// [`add_i32`](Self::add_i32) and [`set`](Self::set) are stored unchanged.
#[derive(Debug)]
pub struct DateColumnVector {
    base: ColumnVector<i32>,
    config: VectorConfig,
}

impl DateColumnVector {
    /// Creates a date vector with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn new(capacity: usize, encoding: bool) -> Result<Self> {
        Self::with_capacity_and_config(capacity, encoding, VectorConfig::default())
    }

    /// Creates a date vector sized to `config.default_capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn with_config(config: VectorConfig) -> Result<Self> {
        Self::with_capacity_and_config(config.default_capacity, true, config)
    }

    /// Creates a date vector with an explicit capacity and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn with_capacity_and_config(
        capacity: usize,
        encoding: bool,
        config: VectorConfig,
    ) -> Result<Self> {
        let base = ColumnVector::new(capacity, encoding, DATE_ALIGNMENT, config.growth_factor)?;
        Ok(Self { base, config })
    }

    /// Wraps day numbers owned elsewhere; the first `len` are treated as written.
    ///
    /// `config` decides how the stored numbers are read back (day offset) and
    /// how the vector grows once it takes ownership.
    #[must_use]
    pub fn from_external(
        buffer: Arc<AlignedBuffer<i32>>,
        len: usize,
        config: VectorConfig,
    ) -> Self {
        Self {
            base: ColumnVector::from_external(buffer, len, config.growth_factor),
            config,
        }
    }

    /// The underlying generic vector.
    #[must_use]
    pub fn base(&self) -> &ColumnVector<i32> {
        &self.base
    }

    /// Converts `YYYY-MM-DD` to the stored day number.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::FormatError`] for malformed text,
    /// [`VectorError::ConversionError`] for dates that do not exist, and
    /// [`VectorError::RangeError`] for pre-epoch dates when rejection is
    /// enabled or day numbers outside `i32`.
    pub fn parse_days(&self, value: &str) -> Result<i32> {
        let seconds = calendar::parse_date_seconds(value)?;
        if self.config.reject_pre_epoch_dates && seconds < 0 {
            return Err(VectorError::RangeError(format!(
                "Invalid date '{value}': dates before 1970-01-01 are not supported"
            )));
        }
        let days = seconds.div_euclid(SECONDS_PER_DAY) + self.config.day_offset();
        i32::try_from(days)
            .map_err(|_| VectorError::RangeError(format!("Date '{value}' is out of range")))
    }

    /// Parses `YYYY-MM-DD` and appends it.
    ///
    /// # Errors
    ///
    /// See [`parse_days`](Self::parse_days); also fails after close.
    pub fn add_str(&mut self, value: &str) -> Result<()> {
        let days = self.parse_days(value)?;
        self.add_i32(days)
    }

    /// Appends 1 for true and 0 for false.
    ///
    /// # Errors
    ///
    /// Fails after close.
    pub fn add_bool(&mut self, value: bool) -> Result<()> {
        self.add_i32(i32::from(value))
    }

    /// Appends a raw day number.
    ///
    /// # Errors
    ///
    /// Fails after close.
    pub fn add_i32(&mut self, days: i32) -> Result<()> {
        self.base.push(days).map(|_| ())
    }

    /// Appends a raw day number given as `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if `days` does not fit `i32`; also
    /// fails after close.
    pub fn add_i64(&mut self, days: i64) -> Result<()> {
        let days = i32::try_from(days).map_err(|_| {
            VectorError::RangeError(format!("Day number {days} does not fit a 32-bit date"))
        })?;
        self.add_i32(days)
    }

    /// Writes `days` at `position`, marking it not null.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::IndexOutOfBounds`] past the capacity; also fails
    /// after close.
    pub fn set(&mut self, position: usize, days: i32) -> Result<()> {
        self.base.set(position, days)
    }

    /// Writes `days` at `position` without updating its null flag.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_untracked(&mut self, position: usize, days: i32) -> Result<()> {
        self.base.set_untracked(position, days)
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
    pub fn get(&self, position: usize) -> Option<i32> {
        self.base.get(position)
    }

    /// Written day numbers, including raw contents of null slots.
    #[must_use]
    pub fn values(&self) -> &[i32] {
        self.base.values()
    }

    /// Unread day numbers, or None once the buffer is released.
    #[must_use]
    pub fn current(&self) -> Option<&[i32]> {
        self.base.current()
    }

    /// Moves the read index forward.
    pub fn advance(&mut self, count: usize) -> usize {
        self.base.advance(count)
    }
}

impl Vector for DateColumnVector {
    fn data_type(&self) -> DataType {
        DataType::Date
    }

    fn physical_type(&self) -> PhysicalType {
        PhysicalType::Int32
    }

    forward_to_base!(base);

    fn add_str(&mut self, value: &str) -> Result<()> {
        DateColumnVector::add_str(self, value)
    }

    fn format_value(&self, position: usize) -> Option<String> {
        let days = self.base.get(position)?;
        calendar::format_date(i64::from(days) - self.config.day_offset())
    }

    fn to_arrow(&self) -> Result<ArrayRef> {
        if self.base.is_closed() {
            return Err(VectorError::Closed);
        }
        // Arrow's Date32 counts from 1970-01-01 = 0.
        let offset = i32::from(self.config.legacy_day_offset);
        let array = (0..self.base.write_index())
            .map(|i| {
                self.base
                    .get(i)
                    .map(|days| {
                        days.checked_sub(offset).ok_or_else(|| {
                            VectorError::RangeError(format!(
                                "Day number {days} at position {i} has no Date32 equivalent"
                            ))
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Date32Array>>()?;
        Ok(Arc::new(array))
    }
}

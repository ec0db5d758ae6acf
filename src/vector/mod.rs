//! Column vectors.
//!
//! This module provides the typed, aligned, growable buffers that hold one
//! column's values for a batch of rows:
//! - Generic storage and lifecycle ([`ColumnVector`], [`AlignedBuffer`], [`NullMask`])
//! - Dates as days since epoch ([`DateColumnVector`])
//! - Fixed-point decimals as unscaled integers ([`DecimalColumnVector`])
//! - Timestamps as microseconds since epoch ([`TimestampColumnVector`])

/// Implements the storage half of [`Vector`] by delegating to a
/// [`ColumnVector`] field.
macro_rules! forward_to_base {
    ($field:ident) => {
        fn length(&self) -> usize {
            self.$field.length()
        }

        fn write_index(&self) -> usize {
            self.$field.write_index()
        }

        fn read_index(&self) -> usize {
            self.$field.read_index()
        }

        fn is_null(&self, position: usize) -> bool {
            self.$field.is_null(position)
        }

        fn null_count(&self) -> usize {
            self.$field.null_count()
        }

        fn memory_usage(&self) -> usize {
            self.$field.memory_usage()
        }

        fn encoding(&self) -> bool {
            self.$field.encoding()
        }

        fn is_closed(&self) -> bool {
            self.$field.is_closed()
        }

        fn ensure_size(
            &mut self,
            min_capacity: usize,
            preserve_data: bool,
        ) -> $crate::error::Result<()> {
            self.$field.ensure_size(min_capacity, preserve_data)
        }

        fn add_null(&mut self) -> $crate::error::Result<()> {
            self.$field.push_null().map(|_| ())
        }

        fn reset(&mut self) -> $crate::error::Result<()> {
            self.$field.reset()
        }

        fn close(&mut self) {
            self.$field.close();
        }

        fn current_bytes(&self) -> Option<&[u8]> {
            self.$field.current_bytes()
        }
    };
}

mod aligned;
mod base;
mod calendar;
mod date;
mod decimal;
mod null_mask;
mod timestamp;

pub use aligned::{AlignedBuffer, Element};
pub use base::ColumnVector;
pub use date::{DateColumnVector, DATE_ALIGNMENT};
pub use decimal::{DecimalColumnVector, DecimalSlice, DECIMAL_ALIGNMENT};
pub use null_mask::NullMask;
pub use timestamp::{TimestampColumnVector, TIMESTAMP_ALIGNMENT};

use arrow::array::ArrayRef;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{DataType, PhysicalType};

/// Default number of rows a vector is sized for.
pub const DEFAULT_SIZE: usize = 1024;

/// Default capacity multiplier applied when an append finds the buffer full.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Configuration shared by the typed column vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Capacity used by the `with_config` constructors.
    pub default_capacity: usize,
    /// Capacity multiplier used when an append overflows the buffer.
    pub growth_factor: usize,
    /// Store dates as `days_since_epoch + 1` (1970-01-01 is day 1).
    pub legacy_day_offset: bool,
    /// Reject dates before 1970-01-01 instead of storing them.
    pub reject_pre_epoch_dates: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_SIZE,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            legacy_day_offset: true,
            reject_pre_epoch_dates: false,
        }
    }
}

impl VectorConfig {
    /// Creates a new vector configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default capacity.
    #[must_use]
    pub fn with_default_capacity(mut self, default_capacity: usize) -> Self {
        self.default_capacity = default_capacity;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Enables or disables the `+1` day offset for parsed dates.
    #[must_use]
    pub fn with_legacy_day_offset(mut self, legacy_day_offset: bool) -> Self {
        self.legacy_day_offset = legacy_day_offset;
        self
    }

    /// Enables or disables rejection of dates before the epoch.
    #[must_use]
    pub fn with_reject_pre_epoch_dates(mut self, reject: bool) -> Self {
        self.reject_pre_epoch_dates = reject;
        self
    }

    /// Day number stored for 1970-01-01.
    #[must_use]
    pub fn day_offset(&self) -> i64 {
        i64::from(self.legacy_day_offset)
    }
}

/// Operations a row-batch container needs from any column vector.
pub trait Vector {
    /// Logical type of the column.
    fn data_type(&self) -> DataType;

    /// Physical width of each stored value.
    fn physical_type(&self) -> PhysicalType;

    /// Allocated capacity in elements.
    fn length(&self) -> usize;

    /// Next unwritten logical position.
    fn write_index(&self) -> usize;

    /// Next unread logical position.
    fn read_index(&self) -> usize;

    /// True if `position` is null or unwritten.
    fn is_null(&self, position: usize) -> bool;

    /// Nulls among the written prefix.
    fn null_count(&self) -> usize;

    /// Bytes held by buffers the vector owns.
    fn memory_usage(&self) -> usize;

    /// Whether the vector owns its value buffer.
    fn encoding(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Grows the buffers to at least `min_capacity` elements.
    ///
    /// # Errors
    ///
    /// Fails after close or when the allocation size overflows.
    fn ensure_size(&mut self, min_capacity: usize, preserve_data: bool) -> Result<()>;

    /// Parses `value` and appends it.
    ///
    /// # Errors
    ///
    /// Fails with the type's parse errors, or after close.
    fn add_str(&mut self, value: &str) -> Result<()>;

    /// Appends a null slot.
    ///
    /// # Errors
    ///
    /// Fails after close.
    fn add_null(&mut self) -> Result<()>;

    /// Clears written values for reuse.
    ///
    /// # Errors
    ///
    /// Fails after close.
    fn reset(&mut self) -> Result<()>;

    /// Releases buffers; idempotent.
    fn close(&mut self);

    /// Physical bytes from the read index to the write index.
    fn current_bytes(&self) -> Option<&[u8]>;

    /// Renders the value at `position` as text, None if null.
    fn format_value(&self, position: usize) -> Option<String>;

    /// Exports the written prefix as an Arrow array.
    ///
    /// # Errors
    ///
    /// Fails after close or if Arrow rejects the type parameters.
    fn to_arrow(&self) -> Result<ArrayRef>;
}

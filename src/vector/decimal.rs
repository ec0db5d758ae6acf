//! Decimal column vector.
//!
//! Values are stored as unscaled integers: 3.14 in a `DECIMAL(3,2)` column is
//! stored as 314. The physical width is the narrowest of INT16, INT32, INT64
//! and INT128 that can hold `precision` digits.

use std::sync::Arc;

use arrow::array::{ArrayRef, Decimal128Array};
use tracing::{trace, warn};

use super::aligned::Element;
use super::base::ColumnVector;
use super::{Vector, VectorConfig};
use crate::error::{Result, VectorError};
use crate::types::{DataType, PhysicalType};

/// Base alignment of decimal buffers, in bytes.
pub const DECIMAL_ALIGNMENT: usize = 32;

#[derive(Debug)]
enum DecimalValues {
    Int16(ColumnVector<i16>),
    Int32(ColumnVector<i32>),
    Int64(ColumnVector<i64>),
    Int128(ColumnVector<i128>),
}

/// Runs `$body` against whichever width-specific vector is active.
macro_rules! with_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            DecimalValues::Int16($v) => $body,
            DecimalValues::Int32($v) => $body,
            DecimalValues::Int64($v) => $body,
            DecimalValues::Int128($v) => $body,
        }
    };
}

/// Borrowed decimal values at their physical width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalSlice<'a> {
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Int128(&'a [i128]),
}

impl DecimalSlice<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            DecimalSlice::Int16(s) => s.len(),
            DecimalSlice::Int32(s) => s.len(),
            DecimalSlice::Int64(s) => s.len(),
            DecimalSlice::Int128(s) => s.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unscaled value at `index`, widened to `i128`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i128> {
        match self {
            DecimalSlice::Int16(s) => s.get(index).map(|v| v.to_i128()),
            DecimalSlice::Int32(s) => s.get(index).map(|v| v.to_i128()),
            DecimalSlice::Int64(s) => s.get(index).map(|v| v.to_i128()),
            DecimalSlice::Int128(s) => s.get(index).copied(),
        }
    }
}

/// Column of fixed-point decimals with a declared precision and scale.
#[derive(Debug)]
pub struct DecimalColumnVector {
    values: DecimalValues,
    precision: u8,
    scale: u8,
    physical_type: PhysicalType,
}

impl DecimalColumnVector {
    /// Creates a decimal vector.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::ConstructionError`] if `precision` is zero or
    /// above 38, or if `scale > precision`.
    pub fn new(capacity: usize, precision: u8, scale: u8, encoding: bool) -> Result<Self> {
        Self::with_capacity_and_config(
            capacity,
            precision,
            scale,
            encoding,
            VectorConfig::default(),
        )
    }

    /// Creates a decimal vector sized to `config.default_capacity`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(precision: u8, scale: u8, config: VectorConfig) -> Result<Self> {
        Self::with_capacity_and_config(config.default_capacity, precision, scale, true, config)
    }

    /// Creates a decimal vector with an explicit capacity and configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new), plus [`VectorError::RangeError`] if the
    /// allocation size overflows.
    pub fn with_capacity_and_config(
        capacity: usize,
        precision: u8,
        scale: u8,
        encoding: bool,
        config: VectorConfig,
    ) -> Result<Self> {
        if precision == 0 || scale > precision {
            warn!(precision, scale, "rejected decimal column parameters");
            return Err(VectorError::ConstructionError(format!(
                "Invalid decimal precision/scale ({precision},{scale})"
            )));
        }
        let physical_type = PhysicalType::for_decimal_precision(precision).map_err(|err| {
            warn!(precision, scale, "decimal precision exceeds the widest physical type");
            err
        })?;

        let growth = config.growth_factor;
        let values = match physical_type {
            PhysicalType::Int16 => DecimalValues::Int16(ColumnVector::new(
                capacity,
                encoding,
                DECIMAL_ALIGNMENT,
                growth,
            )?),
            PhysicalType::Int32 => DecimalValues::Int32(ColumnVector::new(
                capacity,
                encoding,
                DECIMAL_ALIGNMENT,
                growth,
            )?),
            PhysicalType::Int64 => DecimalValues::Int64(ColumnVector::new(
                capacity,
                encoding,
                DECIMAL_ALIGNMENT,
                growth,
            )?),
            PhysicalType::Int128 => DecimalValues::Int128(ColumnVector::new(
                capacity,
                encoding,
                DECIMAL_ALIGNMENT,
                growth,
            )?),
        };

        Ok(Self {
            values,
            precision,
            scale,
            physical_type,
        })
    }

    #[must_use]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    #[must_use]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Physical width of the stored unscaled values.
    #[must_use]
    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    /// Converts a fixed-point literal to the unscaled value stored for it.
    ///
    /// When the integer part has exactly `precision` digits, the value is
    /// rounded on the first fractional digit and stored as that integer, with
    /// no scale digits appended. Otherwise the fraction is cut or zero-padded
    /// to `scale` digits, rounding half up on the first dropped digit. Negative
    /// values round away from zero. The sign does not count as a digit.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::FormatError`] for anything other than digits
    /// with at most one `.`, and [`VectorError::RangeError`] if the integer
    /// part is longer than `precision` or the result does not fit the
    /// physical width.
    pub fn parse_unscaled(&self, value: &str) -> Result<i128> {
        let (negative, body) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        let (integer_part, fractional_part) = body.split_once('.').unwrap_or((body, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (integer_part.is_empty() && fractional_part.is_empty())
            || !all_digits(integer_part)
            || !all_digits(fractional_part)
        {
            return Err(VectorError::FormatError(format!(
                "Invalid decimal '{value}'. Expected digits with at most one '.'"
            )));
        }

        let precision = usize::from(self.precision);
        let scale = usize::from(self.scale);

        let magnitude = if integer_part.len() == precision {
            trace!(
                value,
                precision = self.precision,
                scale = self.scale,
                "integer part fills the precision, storing without scale digits"
            );
            let whole = accumulate_digits(value, integer_part.bytes())?;
            round_half_up(value, whole, fractional_part.bytes().next())?
        } else if integer_part.len() > precision {
            return Err(VectorError::RangeError(format!(
                "Decimal value '{value}' exceeds specified precision {precision}: integer part too long"
            )));
        } else {
            let kept = &fractional_part[..fractional_part.len().min(scale)];
            let padding = scale - kept.len();
            let digits = integer_part
                .bytes()
                .chain(kept.bytes())
                .chain(std::iter::repeat(b'0').take(padding));
            let truncated = accumulate_digits(value, digits)?;
            round_half_up(value, truncated, fractional_part.bytes().nth(scale))?
        };

        let unscaled = if negative { -magnitude } else { magnitude };
        if !self.physical_type.fits(unscaled) {
            return Err(VectorError::RangeError(format!(
                "Decimal value '{value}' exceeds range of {}",
                self.physical_type
            )));
        }
        Ok(unscaled)
    }

    /// Parses a fixed-point literal and appends its unscaled value.
    ///
    /// # Errors
    ///
    /// See [`parse_unscaled`](Self::parse_unscaled); also fails after close.
    pub fn add_str(&mut self, value: &str) -> Result<()> {
        let unscaled = self.parse_unscaled(value)?;
        self.add_i128(unscaled)
    }

    /// Appends an unscaled value.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the value does not fit the
    /// physical width; also fails after close.
    pub fn add_i64(&mut self, unscaled: i64) -> Result<()> {
        self.add_i128(i128::from(unscaled))
    }

    /// Appends an unscaled value wider than 64 bits.
    ///
    /// # Errors
    ///
    /// Same as [`add_i64`](Self::add_i64).
    pub fn add_i128(&mut self, unscaled: i128) -> Result<()> {
        with_values!(&mut self.values, v => {
            let narrowed = Self::narrow_for(self.physical_type, unscaled)?;
            v.push(narrowed).map(|_| ())
        })
    }

    fn narrow_for<T: Element>(physical_type: PhysicalType, unscaled: i128) -> Result<T> {
        T::from_i128(unscaled).ok_or_else(|| {
            VectorError::RangeError(format!(
                "Decimal value {unscaled} exceeds range of {physical_type}"
            ))
        })
    }

    /// Writes an unscaled value at `position`, marking it not null.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the value does not fit the
    /// physical width, [`VectorError::IndexOutOfBounds`] past the capacity;
    /// also fails after close.
    pub fn set(&mut self, position: usize, unscaled: i128) -> Result<()> {
        with_values!(&mut self.values, v => {
            let narrowed = Self::narrow_for(self.physical_type, unscaled)?;
            v.set(position, narrowed)
        })
    }

    /// Writes an unscaled value without updating the null flag.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_untracked(&mut self, position: usize, unscaled: i128) -> Result<()> {
        with_values!(&mut self.values, v => {
            let narrowed = Self::narrow_for(self.physical_type, unscaled)?;
            v.set_untracked(position, narrowed)
        })
    }

    /// Marks `position` null.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::IndexOutOfBounds`] past the capacity; also fails
    /// after close.
    pub fn set_null(&mut self, position: usize) -> Result<()> {
        with_values!(&mut self.values, v => v.set_null(position))
    }

    /// Unscaled value at `position`, or None if null or unwritten.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<i128> {
        with_values!(&self.values, v => v.get(position).map(Element::to_i128))
    }

    /// Written unscaled values at their physical width.
    #[must_use]
    pub fn values(&self) -> DecimalSlice<'_> {
        match &self.values {
            DecimalValues::Int16(v) => DecimalSlice::Int16(v.values()),
            DecimalValues::Int32(v) => DecimalSlice::Int32(v.values()),
            DecimalValues::Int64(v) => DecimalSlice::Int64(v.values()),
            DecimalValues::Int128(v) => DecimalSlice::Int128(v.values()),
        }
    }

    /// Unread values, or None once the buffer is released.
    #[must_use]
    pub fn current(&self) -> Option<DecimalSlice<'_>> {
        match &self.values {
            DecimalValues::Int16(v) => v.current().map(DecimalSlice::Int16),
            DecimalValues::Int32(v) => v.current().map(DecimalSlice::Int32),
            DecimalValues::Int64(v) => v.current().map(DecimalSlice::Int64),
            DecimalValues::Int128(v) => v.current().map(DecimalSlice::Int128),
        }
    }

    pub fn advance(&mut self, count: usize) -> usize {
        with_values!(&mut self.values, v => v.advance(count))
    }

    /// Alignment of the value buffer in bytes.
    #[must_use]
    pub fn alignment(&self) -> usize {
        with_values!(&self.values, v => v.alignment())
    }

    /// Renders an unscaled value with this column's scale.
    #[must_use]
    pub fn format_unscaled(&self, unscaled: i128) -> String {
        let digits = unscaled.unsigned_abs().to_string();
        let sign = if unscaled < 0 { "-" } else { "" };
        let scale = usize::from(self.scale);
        if scale == 0 {
            return format!("{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        format!("{sign}{whole}.{fraction}")
    }
}

/// Folds ASCII digits into an `i128`.
fn accumulate_digits(value: &str, mut digits: impl Iterator<Item = u8>) -> Result<i128> {
    digits
        .try_fold(0i128, |acc, d| {
            acc.checked_mul(10)?.checked_add(i128::from(d - b'0'))
        })
        .ok_or_else(|| {
            VectorError::RangeError(format!("Decimal value '{value}' exceeds range of INT128"))
        })
}

/// Adds one to `magnitude` if the next digit is 5 or more.
fn round_half_up(value: &str, magnitude: i128, next_digit: Option<u8>) -> Result<i128> {
    match next_digit {
        Some(d) if d >= b'5' => magnitude.checked_add(1).ok_or_else(|| {
            VectorError::RangeError(format!("Decimal value '{value}' exceeds range of INT128"))
        }),
        _ => Ok(magnitude),
    }
}

impl Vector for DecimalColumnVector {
    fn data_type(&self) -> DataType {
        DataType::Decimal {
            precision: self.precision,
            scale: self.scale,
        }
    }

    fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    fn length(&self) -> usize {
        with_values!(&self.values, v => v.length())
    }

    fn write_index(&self) -> usize {
        with_values!(&self.values, v => v.write_index())
    }

    fn read_index(&self) -> usize {
        with_values!(&self.values, v => v.read_index())
    }

    fn is_null(&self, position: usize) -> bool {
        with_values!(&self.values, v => v.is_null(position))
    }

    fn null_count(&self) -> usize {
        with_values!(&self.values, v => v.null_count())
    }

    fn memory_usage(&self) -> usize {
        with_values!(&self.values, v => v.memory_usage())
    }

    fn encoding(&self) -> bool {
        with_values!(&self.values, v => v.encoding())
    }

    fn is_closed(&self) -> bool {
        with_values!(&self.values, v => v.is_closed())
    }

    fn ensure_size(&mut self, min_capacity: usize, preserve_data: bool) -> Result<()> {
        with_values!(&mut self.values, v => v.ensure_size(min_capacity, preserve_data))
    }

    fn add_str(&mut self, value: &str) -> Result<()> {
        DecimalColumnVector::add_str(self, value)
    }

    fn add_null(&mut self) -> Result<()> {
        with_values!(&mut self.values, v => v.push_null().map(|_| ()))
    }

    fn reset(&mut self) -> Result<()> {
        with_values!(&mut self.values, v => v.reset())
    }

    fn close(&mut self) {
        with_values!(&mut self.values, v => v.close());
    }

    fn current_bytes(&self) -> Option<&[u8]> {
        with_values!(&self.values, v => v.current_bytes())
    }

    fn format_value(&self, position: usize) -> Option<String> {
        self.get(position).map(|unscaled| self.format_unscaled(unscaled))
    }

    fn to_arrow(&self) -> Result<ArrayRef> {
        if self.is_closed() {
            return Err(VectorError::Closed);
        }
        let scale = i8::try_from(self.scale)
            .map_err(|_| VectorError::ArrowError(format!("scale {} out of range", self.scale)))?;
        let array: Decimal128Array = (0..self.write_index()).map(|i| self.get(i)).collect();
        Ok(Arc::new(array.with_precision_and_scale(self.precision, scale)?))
    }
}

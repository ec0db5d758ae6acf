//! colvec - typed column vectors for a columnar storage engine.
//!
//! A column vector holds one column's values for a batch of rows in an
//! aligned, growable buffer, plus a null mask and a running count of the bytes
//! it has allocated. Producers append parsed text or raw integers; consumers
//! read positions back or borrow the physical buffer for an encoder.
//!
//! ```
//! use colvec::{DecimalColumnVector, Vector};
//!
//! let mut prices = DecimalColumnVector::new(4, 5, 2, true)?;
//! prices.add_str("123.456")?;
//! assert_eq!(prices.get(0), Some(12_346));
//! assert_eq!(prices.format_value(0).as_deref(), Some("123.46"));
//! prices.close();
//! # Ok::<(), colvec::VectorError>(())
//! ```

pub mod error;
pub mod types;
pub mod vector;

pub use error::{Result, VectorError};
pub use types::{DataType, PhysicalType};
pub use vector::{
    AlignedBuffer, ColumnVector, DateColumnVector, DecimalColumnVector, DecimalSlice, NullMask,
    TimestampColumnVector, Vector, VectorConfig, DEFAULT_SIZE,
};

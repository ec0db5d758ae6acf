//! Type definitions shared by all column vectors.

mod physical;

pub use physical::{
    DataType, PhysicalType, MAX_WIDTH_INT128, MAX_WIDTH_INT16, MAX_WIDTH_INT32, MAX_WIDTH_INT64,
};

//! Unit tests for colvec.

use colvec::types::{DataType, PhysicalType};
use colvec::{
    DateColumnVector, DecimalColumnVector, TimestampColumnVector, Vector, VectorConfig,
    VectorError,
};

// =============================================================================
// Error Tests
// =============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let err = VectorError::FormatError("Invalid format 'x'".into());
        assert!(err.to_string().contains("Format error"));
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_index_out_of_bounds_display() {
        let err = VectorError::IndexOutOfBounds {
            position: 9,
            capacity: 4,
        };
        assert!(err.to_string().contains("Position 9"));
        assert!(err.to_string().contains("capacity 4"));
    }

    #[test]
    fn test_closed_display() {
        assert_eq!(VectorError::Closed.to_string(), "Column vector is closed");
    }
}

// =============================================================================
// Date Vector Tests
// =============================================================================

mod date_tests {
    use super::*;

    #[test]
    fn test_day_after_epoch_is_two() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        v.add_str("1970-01-02").unwrap();
        assert_eq!(v.get(0), Some(2));
    }

    #[test]
    fn test_day_before_epoch_is_accepted() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        v.add_str("1969-12-31").unwrap();
        assert_eq!(v.get(0), Some(0));
    }

    #[test]
    fn test_with_config_uses_default_capacity() {
        let config = VectorConfig::new().with_default_capacity(16);
        let v = DateColumnVector::with_config(config).unwrap();
        assert_eq!(v.length(), 16);
        assert_eq!(v.data_type(), DataType::Date);
        assert_eq!(v.physical_type(), PhysicalType::Int32);
    }

    #[test]
    fn test_failed_parse_leaves_vector_untouched() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        v.add_str("2020-01-01").unwrap();
        assert!(v.add_str("2020-13-01").is_err());
        assert!(v.add_str("garbage").is_err());
        assert_eq!(v.write_index(), 1);
    }

    #[test]
    fn test_loose_date_text_rejected() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        for bad in [" 2023-01-01", "2023-1-5", "+2023-01-01"] {
            assert!(matches!(v.add_str(bad), Err(VectorError::FormatError(_))));
        }
        assert_eq!(v.write_index(), 0);
    }

    #[test]
    fn test_arrow_export_of_extreme_day_number() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        v.add_i32(i32::MIN).unwrap();
        assert!(matches!(v.to_arrow(), Err(VectorError::RangeError(_))));
    }

    #[test]
    fn test_read_cursor() {
        let mut v = DateColumnVector::new(4, true).unwrap();
        for d in [10, 20, 30] {
            v.add_i32(d).unwrap();
        }
        assert_eq!(v.current(), Some(&[10, 20, 30][..]));
        v.advance(2);
        assert_eq!(v.read_index(), 2);
        assert_eq!(v.current(), Some(&[30][..]));
        assert_eq!(v.current_bytes().map(<[u8]>::len), Some(4));
    }
}

// =============================================================================
// Decimal Vector Tests
// =============================================================================

mod decimal_tests {
    use super::*;

    #[test]
    fn test_example_rounding() {
        let mut v = DecimalColumnVector::new(4, 5, 2, true).unwrap();
        v.add_str("123.456").unwrap();
        assert_eq!(v.get(0), Some(12_346));
        assert_eq!(v.precision(), 5);
        assert_eq!(v.scale(), 2);
    }

    #[test]
    fn test_max_precision_boundary() {
        assert!(DecimalColumnVector::new(4, 38, 0, true).is_ok());
        assert!(matches!(
            DecimalColumnVector::new(4, 39, 0, true),
            Err(VectorError::ConstructionError(_))
        ));
    }

    #[test]
    fn test_data_type() {
        let v = DecimalColumnVector::new(4, 10, 3, true).unwrap();
        assert_eq!(
            v.data_type(),
            DataType::Decimal {
                precision: 10,
                scale: 3
            }
        );
        assert_eq!(Vector::physical_type(&v), PhysicalType::Int64);
    }

    #[test]
    fn test_reset_then_reuse() {
        let mut v = DecimalColumnVector::new(2, 9, 2, true).unwrap();
        v.add_str("1.00").unwrap();
        v.add_str("2.00").unwrap();
        v.add_str("3.00").unwrap();
        let capacity = v.length();
        v.reset().unwrap();
        assert_eq!(v.write_index(), 0);
        assert_eq!(v.length(), capacity);
        v.add_str("4.25").unwrap();
        assert_eq!(v.get(0), Some(425));
        assert_eq!(v.get(1), None);
    }
}

// =============================================================================
// Timestamp Vector Tests
// =============================================================================

mod timestamp_tests {
    use super::*;

    #[test]
    fn test_example_millis_micros() {
        let mut v = TimestampColumnVector::new(4, 6, true).unwrap();
        v.add_str("2023-12-23 10:00:00.500.250").unwrap();
        let whole = TimestampColumnVector::parse_micros("2023-12-23 10:00:00").unwrap();
        assert_eq!(v.get(0), Some(whole + 500_000 + 250));
    }

    #[test]
    fn test_missing_time_is_format_error() {
        let mut v = TimestampColumnVector::new(4, 6, true).unwrap();
        assert!(matches!(
            v.add_str("2023-12-23"),
            Err(VectorError::FormatError(_))
        ));
    }

    #[test]
    fn test_loose_timestamp_text_rejected() {
        let mut v = TimestampColumnVector::new(4, 6, true).unwrap();
        for bad in ["2023-12-23  10:00:00", "2023-12-23 1:2:3"] {
            assert!(matches!(v.add_str(bad), Err(VectorError::FormatError(_))));
        }
        assert!(matches!(
            v.add_str("2023-12-23 10:00:60"),
            Err(VectorError::ConversionError(_))
        ));
        assert_eq!(v.write_index(), 0);
    }

    #[test]
    fn test_with_config() {
        let config = VectorConfig::new().with_default_capacity(8).with_growth_factor(4);
        let mut v = TimestampColumnVector::with_config(3, config).unwrap();
        assert_eq!(v.length(), 8);
        for i in 0..9 {
            v.add_i64(i).unwrap();
        }
        assert_eq!(v.length(), 32);
        assert_eq!(v.data_type(), DataType::Timestamp { precision: 3 });
    }
}

// =============================================================================
// Growth Tests
// =============================================================================

mod growth_tests {
    use super::*;

    #[test]
    fn test_growth_past_initial_capacity_preserves_prefix() {
        let mut v = TimestampColumnVector::new(4, 6, true).unwrap();
        for i in 0..4 {
            v.add_i64(i * 10).unwrap();
        }
        let before = v.memory_usage();
        for i in 4..10 {
            v.add_i64(i * 10).unwrap();
        }
        assert_eq!(&v.values()[..4], &[0, 10, 20, 30]);
        assert_eq!(v.get(4), Some(40));
        assert_eq!(v.write_index(), 10);
        assert!(v.length() >= 10);
        assert!(v.memory_usage() > before);
    }

    #[test]
    fn test_decimal_growth_across_widths() {
        let mut narrow = DecimalColumnVector::new(1, 4, 1, true).unwrap();
        let mut wide = DecimalColumnVector::new(1, 30, 1, true).unwrap();
        for i in 0..20i64 {
            narrow.add_i64(i).unwrap();
            wide.add_i64(i).unwrap();
        }
        assert_eq!(Vector::physical_type(&narrow), PhysicalType::Int16);
        assert_eq!(Vector::physical_type(&wide), PhysicalType::Int128);
        assert_eq!(narrow.values().len(), 20);
        assert_eq!(wide.values().get(19), Some(19));
    }

    #[test]
    fn test_ensure_size_without_preserve_discards() {
        let mut v = DateColumnVector::new(2, true).unwrap();
        v.add_i32(7).unwrap();
        v.ensure_size(100, false).unwrap();
        assert_eq!(v.write_index(), 0);
        assert_eq!(v.length(), 100);
        assert_eq!(v.get(0), None);
    }

    #[test]
    fn test_operations_after_close() {
        let mut v = DateColumnVector::new(2, true).unwrap();
        v.add_i32(1).unwrap();
        v.close();
        v.close();
        assert!(v.is_closed());
        assert_eq!(v.memory_usage(), 0);
        assert_eq!(v.add_i32(2), Err(VectorError::Closed));
        assert_eq!(v.ensure_size(8, true), Err(VectorError::Closed));
        assert!(v.current().is_none());
    }
}

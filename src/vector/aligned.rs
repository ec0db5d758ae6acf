//! Explicitly aligned, owned heap buffers.
//!
//! Column values are handed to SIMD scans and encoders that assume a fixed
//! base alignment, so the value storage cannot be a plain `Vec<T>` (whose
//! alignment is only `align_of::<T>()`). [`AlignedBuffer`] owns one
//! zero-initialized allocation of `capacity` elements at a caller-chosen
//! alignment and frees it exactly once on drop.

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{Result, VectorError};
use crate::types::PhysicalType;

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for i128 {}
}

/// Fixed-width integer element stored in a column vector.
///
/// Sealed: only the four signed integer widths implement it, all of which
/// accept the all-zero bit pattern and have no padding bytes.
pub trait Element:
    sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Physical type tag for this element width.
    const PHYSICAL_TYPE: PhysicalType;

    /// Widens the element to `i128`.
    fn to_i128(self) -> i128;

    /// Narrows an `i128`, returning None when out of range.
    fn from_i128(value: i128) -> Option<Self>;
}

macro_rules! impl_element {
    ($ty:ty, $physical:expr) => {
        impl Element for $ty {
            const PHYSICAL_TYPE: PhysicalType = $physical;

            #[inline]
            fn to_i128(self) -> i128 {
                i128::from(self)
            }

            #[inline]
            fn from_i128(value: i128) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }
        }
    };
}

impl_element!(i16, PhysicalType::Int16);
impl_element!(i32, PhysicalType::Int32);
impl_element!(i64, PhysicalType::Int64);
impl_element!(i128, PhysicalType::Int128);

/// Owned, zero-initialized buffer of `T` with an explicit base alignment.
pub struct AlignedBuffer<T: Element> {
    ptr: NonNull<T>,
    capacity: usize,
    alignment: usize,
    /// Bumped on every reallocation.
    generation: u64,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer exclusively owns its allocation and `T: Send + Sync`.
#[allow(unsafe_code)]
unsafe impl<T: Element> Send for AlignedBuffer<T> {}
// SAFETY: shared access only hands out `&[T]`.
#[allow(unsafe_code)]
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

impl<T: Element> AlignedBuffer<T> {
    /// Allocates a zeroed buffer of `capacity` elements.
    ///
    /// The effective alignment is the larger of `alignment` and
    /// `align_of::<T>()`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if `alignment` is not a power of two
    /// or the total size overflows `isize`.
    pub fn zeroed(capacity: usize, alignment: usize) -> Result<Self> {
        let alignment = alignment.max(std::mem::align_of::<T>());
        let layout = Self::layout(capacity, alignment)?;
        let ptr = Self::allocate(layout);
        Ok(Self {
            ptr,
            capacity,
            alignment,
            generation: 0,
            _marker: PhantomData,
        })
    }

    fn layout(capacity: usize, alignment: usize) -> Result<Layout> {
        Layout::array::<T>(capacity)
            .and_then(|layout| layout.align_to(alignment))
            .map_err(|err| {
                VectorError::RangeError(format!(
                    "cannot allocate {capacity} elements at alignment {alignment}: {err}"
                ))
            })
    }

    #[allow(unsafe_code)]
    fn allocate(layout: Layout) -> NonNull<T> {
        if layout.size() == 0 {
            // Zero-sized allocations are never dereferenced; any well-aligned
            // non-null pointer will do.
            return NonNull::dangling();
        }
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        match NonNull::new(raw.cast::<T>()) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        }
    }

    #[allow(unsafe_code)]
    fn release(&mut self) {
        if let Ok(layout) = Self::layout(self.capacity, self.alignment) {
            if layout.size() != 0 {
                // SAFETY: `ptr` was produced by `alloc_zeroed` with this exact layout
                // and is released once, either here or in `grow`.
                unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
            }
        }
    }

    /// Reallocates to `new_capacity` elements.
    ///
    /// With `preserve_data`, the first `min(capacity, new_capacity)` elements
    /// are copied into the new allocation; the rest are zero. The old
    /// allocation is freed and the generation counter advances.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the new size overflows.
    #[allow(unsafe_code)]
    pub fn grow(&mut self, new_capacity: usize, preserve_data: bool) -> Result<()> {
        let layout = Self::layout(new_capacity, self.alignment)?;
        let new_ptr = Self::allocate(layout);
        if preserve_data {
            let count = self.capacity.min(new_capacity);
            // SAFETY: both regions hold at least `count` initialized elements and
            // come from distinct allocations.
            unsafe {
                std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), count);
            }
        }
        self.release();
        self.ptr = new_ptr;
        self.capacity = new_capacity;
        self.generation += 1;
        Ok(())
    }

    /// Returns the number of elements the buffer holds.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the effective base alignment in bytes.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns the allocation size in bytes.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.capacity * std::mem::size_of::<T>()
    }

    /// Returns how many times the buffer has been reallocated.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the start address, for alignment checks.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns the whole buffer as a slice.
    #[must_use]
    #[allow(unsafe_code)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `capacity` zero-initialized elements live at `ptr`, and every
        // all-zero bit pattern is a valid `T`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }

    /// Returns the whole buffer as a mutable slice.
    #[allow(unsafe_code)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) }
    }

    /// Returns the raw native-endian bytes of the buffer.
    #[must_use]
    #[allow(unsafe_code)]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: integer elements have no padding, so every byte is initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), self.byte_size()) }
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Element> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        let layout = Self::layout(self.capacity, self.alignment)
            .unwrap_or_else(|_| unreachable!("layout was valid when the buffer was allocated"));
        let mut copy = Self {
            ptr: Self::allocate(layout),
            capacity: self.capacity,
            alignment: self.alignment,
            generation: 0,
            _marker: PhantomData,
        };
        copy.as_mut_slice().copy_from_slice(self.as_slice());
        copy
    }
}

impl<T: Element> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("physical_type", &T::PHYSICAL_TYPE)
            .field("capacity", &self.capacity)
            .field("alignment", &self.alignment)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_allocation_is_aligned() {
        let buf = AlignedBuffer::<i32>::zeroed(100, 32).unwrap();
        assert_eq!(buf.capacity(), 100);
        assert_eq!(buf.alignment(), 32);
        assert_eq!(buf.byte_size(), 400);
        assert_eq!(buf.as_ptr() as usize % 32, 0);
        assert!(buf.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_alignment_never_below_element() {
        let buf = AlignedBuffer::<i128>::zeroed(4, 1).unwrap();
        assert!(buf.alignment() >= std::mem::align_of::<i128>());
    }

    #[test]
    fn test_grow_preserves_prefix() {
        let mut buf = AlignedBuffer::<i64>::zeroed(4, 64).unwrap();
        buf.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);

        buf.grow(8, true).unwrap();

        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.generation(), 1);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 0, 0, 0, 0]);
        assert_eq!(buf.as_ptr() as usize % 64, 0);
    }

    #[test]
    fn test_grow_without_preserve_zeroes() {
        let mut buf = AlignedBuffer::<i16>::zeroed(2, 32).unwrap();
        buf.as_mut_slice().copy_from_slice(&[7, 8]);

        buf.grow(4, false).unwrap();

        assert_eq!(buf.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut buf = AlignedBuffer::<i32>::zeroed(0, 32).unwrap();
        assert!(buf.as_slice().is_empty());
        assert!(buf.as_bytes().is_empty());
        buf.grow(3, true).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn test_bad_alignment_rejected() {
        assert!(matches!(
            AlignedBuffer::<i32>::zeroed(4, 24),
            Err(VectorError::RangeError(_))
        ));
    }

    #[test]
    fn test_bytes_are_native_endian_values() {
        let mut buf = AlignedBuffer::<i32>::zeroed(2, 32).unwrap();
        buf.as_mut_slice().copy_from_slice(&[1, -1]);
        let bytes = buf.as_bytes();
        assert_eq!(i32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 1);
        assert_eq!(i32::from_ne_bytes(bytes[4..8].try_into().unwrap()), -1);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut buf = AlignedBuffer::<i64>::zeroed(3, 64).unwrap();
        buf.as_mut_slice().copy_from_slice(&[5, 6, 7]);
        let copy = buf.clone();
        buf.as_mut_slice()[0] = 99;
        assert_eq!(copy.as_slice(), &[5, 6, 7]);
        assert_eq!(copy.alignment(), 64);
        assert_ne!(copy.as_ptr(), buf.as_ptr());
    }
}

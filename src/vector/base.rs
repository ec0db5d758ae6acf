//! Generic column vector: lifecycle, growth, null tracking, memory accounting.

use std::sync::Arc;

use tracing::{debug, trace};

use super::aligned::{AlignedBuffer, Element};
use super::null_mask::NullMask;
use crate::error::{Result, VectorError};

/// Value storage behind a column vector.
#[derive(Debug)]
enum Backing<T: Element> {
    /// Allocated and freed by the vector itself.
    Owned(AlignedBuffer<T>),
    /// A view of storage whose lifetime is managed elsewhere.
    External(Arc<AlignedBuffer<T>>),
}

impl<T: Element> Backing<T> {
    fn buffer(&self) -> &AlignedBuffer<T> {
        match self {
            Backing::Owned(buf) => buf,
            Backing::External(buf) => buf,
        }
    }
}

/// Typed, growable column of fixed-width values with a parallel null mask.
///
/// The typed vectors ([`DateColumnVector`](super::DateColumnVector),
/// [`DecimalColumnVector`](super::DecimalColumnVector),
/// [`TimestampColumnVector`](super::TimestampColumnVector)) wrap one of these
/// and add parsing on top.
///
/// Single writer: nothing here is synchronized, and concurrent mutation of one
/// vector is the caller's problem. Slices handed out by [`current`](Self::current)
/// borrow the vector, so growth cannot invalidate them while they are alive.
#[derive(Debug)]
pub struct ColumnVector<T: Element> {
    /// None once the vector has been closed.
    values: Option<Backing<T>>,
    nulls: NullMask,
    /// Allocated capacity in elements.
    length: usize,
    write_index: usize,
    read_index: usize,
    /// Bytes currently allocated by this vector.
    memory_usage: usize,
    alignment: usize,
    growth_factor: usize,
    closed: bool,
}

impl<T: Element> ColumnVector<T> {
    /// Creates a vector with room for `capacity` values.
    ///
    /// With `encoding == false` the value buffer is placed behind an [`Arc`]
    /// so an external owner can share it (see [`shared_values`](Self::shared_values));
    /// it is then not counted in [`memory_usage`](Self::memory_usage).
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::RangeError`] if the allocation size overflows.
    pub fn new(
        capacity: usize,
        encoding: bool,
        alignment: usize,
        growth_factor: usize,
    ) -> Result<Self> {
        let buffer = AlignedBuffer::zeroed(capacity, alignment)?;
        let values = if encoding {
            Backing::Owned(buffer)
        } else {
            Backing::External(Arc::new(buffer))
        };
        let mut vector = Self {
            values: Some(values),
            nulls: NullMask::new_all_null(capacity),
            length: capacity,
            write_index: 0,
            read_index: 0,
            memory_usage: 0,
            alignment,
            growth_factor,
            closed: false,
        };
        vector.recount_memory();
        Ok(vector)
    }

    /// Wraps externally owned values; the first `len` positions are treated as
    /// written and not null.
    #[must_use]
    pub fn from_external(buffer: Arc<AlignedBuffer<T>>, len: usize, growth_factor: usize) -> Self {
        let length = buffer.capacity();
        let len = len.min(length);
        let mut nulls = NullMask::new_all_null(length);
        for i in 0..len {
            nulls.set(i, false);
        }
        let mut vector = Self {
            alignment: buffer.alignment(),
            values: Some(Backing::External(buffer)),
            nulls,
            length,
            write_index: len,
            read_index: 0,
            memory_usage: 0,
            growth_factor,
            closed: false,
        };
        vector.recount_memory();
        vector
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(VectorError::Closed)
        } else {
            Ok(())
        }
    }

    fn recount_memory(&mut self) {
        let values = match &self.values {
            Some(Backing::Owned(buf)) => buf.byte_size(),
            Some(Backing::External(_)) | None => 0,
        };
        let nulls = if self.values.is_some() {
            self.nulls.byte_size()
        } else {
            0
        };
        self.memory_usage = values + nulls;
    }

    /// Allocated capacity in elements.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Next unwritten logical position.
    #[must_use]
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Next unread logical position.
    #[must_use]
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Bytes held by buffers this vector allocated and still owns.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Whether the vector owns (and frees) its value buffer.
    #[must_use]
    pub fn encoding(&self) -> bool {
        matches!(self.values, Some(Backing::Owned(_)))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Base alignment of the value buffer in bytes.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.values
            .as_ref()
            .map_or(self.alignment, |v| v.buffer().alignment())
    }

    /// Allocation generation of the value buffer; changes on every reallocation.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.values.as_ref().map(|v| v.buffer().generation())
    }

    /// Returns the external buffer this vector views, if it is not the owner.
    #[must_use]
    pub fn shared_values(&self) -> Option<Arc<AlignedBuffer<T>>> {
        match &self.values {
            Some(Backing::External(buf)) => Some(Arc::clone(buf)),
            _ => None,
        }
    }

    /// Sets the logical capacity. Allocation is done by the caller.
    fn resize(&mut self, new_length: usize) {
        self.length = new_length;
    }

    /// Mutable access to the value buffer, taking ownership of external
    /// storage first (copy-on-write).
    fn buffer_mut(&mut self) -> Result<&mut AlignedBuffer<T>> {
        self.check_open()?;
        if let Some(Backing::External(_)) = self.values {
            if let Some(Backing::External(shared)) = self.values.take() {
                let owned = Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone());
                trace!(capacity = owned.capacity(), "taking ownership of external column buffer");
                self.values = Some(Backing::Owned(owned));
                self.recount_memory();
            }
        }
        match self.values.as_mut() {
            Some(Backing::Owned(buf)) => Ok(buf),
            _ => Err(VectorError::Closed),
        }
    }

    /// Grows the vector to hold at least `min_capacity` values.
    ///
    /// Does nothing if the capacity already suffices. With `preserve_data`,
    /// existing values and null flags are kept; without it the new buffer is
    /// all null and the read/write positions restart at zero.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Closed`] after [`close`](Self::close), or
    /// [`VectorError::RangeError`] if the allocation size overflows.
    pub fn ensure_size(&mut self, min_capacity: usize, preserve_data: bool) -> Result<()> {
        self.check_open()?;
        if self.length >= min_capacity {
            return Ok(());
        }
        let old_capacity = self.length;
        let old_memory = self.memory_usage;
        let copied = match self.values.as_mut() {
            Some(Backing::Owned(buf)) => {
                buf.grow(min_capacity, preserve_data)?;
                None
            }
            Some(Backing::External(shared)) => {
                let mut owned = AlignedBuffer::zeroed(min_capacity, shared.alignment())?;
                if preserve_data {
                    let count = shared.capacity();
                    owned.as_mut_slice()[..count].copy_from_slice(shared.as_slice());
                }
                Some(owned)
            }
            None => return Err(VectorError::Closed),
        };
        if let Some(owned) = copied {
            self.values = Some(Backing::Owned(owned));
        }
        self.nulls.resize(min_capacity, preserve_data);
        if !preserve_data {
            self.write_index = 0;
            self.read_index = 0;
        }
        self.resize(min_capacity);
        self.recount_memory();
        debug!(
            physical_type = %T::PHYSICAL_TYPE,
            old_capacity,
            new_capacity = min_capacity,
            bytes_added = self.memory_usage.saturating_sub(old_memory),
            "grew column vector"
        );
        Ok(())
    }

    /// Makes room for one more append, growing by the configured factor.
    fn reserve_one(&mut self) -> Result<()> {
        if self.write_index >= self.length {
            let target = self
                .write_index
                .saturating_mul(self.growth_factor)
                .max(self.write_index + 1);
            self.ensure_size(target, true)?;
        }
        Ok(())
    }

    /// Appends a value and marks it not null. Returns its position.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Closed`] after [`close`](Self::close), or any
    /// error from growing the buffer.
    pub fn push(&mut self, value: T) -> Result<usize> {
        self.check_open()?;
        self.reserve_one()?;
        let index = self.write_index;
        self.buffer_mut()?.as_mut_slice()[index] = value;
        self.nulls.set(index, false);
        self.write_index += 1;
        Ok(index)
    }

    /// Appends a null slot. Returns its position.
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn push_null(&mut self) -> Result<usize> {
        self.check_open()?;
        self.reserve_one()?;
        let index = self.write_index;
        self.buffer_mut()?.as_mut_slice()[index] = T::default();
        self.nulls.set(index, true);
        self.write_index += 1;
        Ok(index)
    }

    fn write_at(&mut self, position: usize, value: T) -> Result<()> {
        self.check_open()?;
        if position >= self.length {
            return Err(VectorError::IndexOutOfBounds {
                position,
                capacity: self.length,
            });
        }
        self.buffer_mut()?.as_mut_slice()[position] = value;
        if position >= self.write_index {
            self.write_index = position + 1;
        }
        Ok(())
    }

    /// Writes `value` at `position` and marks it not null.
    ///
    /// Positions past the current write index advance it to `position + 1`;
    /// any skipped positions stay null.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::IndexOutOfBounds`] if `position >= length()`.
    pub fn set(&mut self, position: usize, value: T) -> Result<()> {
        self.write_at(position, value)?;
        self.nulls.set(position, false);
        Ok(())
    }

    /// Writes `value` at `position` without touching the null mask.
    ///
    /// The slot keeps whatever null flag it had; callers that use this must
    /// maintain null flags themselves.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_untracked(&mut self, position: usize, value: T) -> Result<()> {
        self.write_at(position, value)
    }

    /// Marks `position` null, advancing the write index like [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn set_null(&mut self, position: usize) -> Result<()> {
        self.write_at(position, T::default())?;
        self.nulls.set(position, true);
        Ok(())
    }

    /// Returns the value at `position`, or None if it is null or unwritten.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<T> {
        if position >= self.write_index || self.nulls.is_null(position) {
            return None;
        }
        self.values
            .as_ref()
            .map(|v| v.buffer().as_slice()[position])
    }

    /// Returns true if `position` is null or unwritten.
    #[must_use]
    pub fn is_null(&self, position: usize) -> bool {
        position >= self.write_index || self.nulls.is_null(position)
    }

    /// Null flags for every allocated position.
    #[must_use]
    pub fn null_mask(&self) -> &NullMask {
        &self.nulls
    }

    /// Number of null positions among the written prefix.
    #[must_use]
    pub fn null_count(&self) -> usize {
        (0..self.write_index)
            .filter(|&i| self.nulls.is_null(i))
            .count()
    }

    /// The written prefix `0..write_index`, including the raw contents of
    /// null slots. Empty once closed.
    #[must_use]
    pub fn values(&self) -> &[T] {
        self.values
            .as_ref()
            .map_or(&[][..], |v| &v.buffer().as_slice()[..self.write_index])
    }

    /// Unread values `read_index..write_index`, or None once the buffer has
    /// been released.
    #[must_use]
    pub fn current(&self) -> Option<&[T]> {
        self.values
            .as_ref()
            .map(|v| &v.buffer().as_slice()[self.read_index..self.write_index])
    }

    /// Physical bytes of [`current`](Self::current), for handing to an encoder.
    #[must_use]
    pub fn current_bytes(&self) -> Option<&[u8]> {
        let width = std::mem::size_of::<T>();
        self.values.as_ref().map(|v| {
            &v.buffer().as_bytes()[self.read_index * width..self.write_index * width]
        })
    }

    /// Moves the read position forward by up to `count` values, stopping at
    /// the write index. Returns the new read index.
    pub fn advance(&mut self, count: usize) -> usize {
        self.read_index = self
            .read_index
            .saturating_add(count)
            .min(self.write_index);
        self.read_index
    }

    /// Forgets all written values so the allocation can be reused.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Closed`] after [`close`](Self::close).
    pub fn reset(&mut self) -> Result<()> {
        self.check_open()?;
        self.write_index = 0;
        self.read_index = 0;
        self.nulls.fill_null();
        Ok(())
    }

    /// Releases the buffers. Safe to call more than once.
    ///
    /// Owned storage is freed; for external storage only this vector's
    /// reference is dropped.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        let encoding = self.encoding();
        self.values = None;
        self.nulls = NullMask::new_all_null(0);
        self.closed = true;
        self.recount_memory();
        trace!(physical_type = %T::PHYSICAL_TYPE, encoding, "closed column vector");
    }
}

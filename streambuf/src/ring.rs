// SPDX-License-Identifier: Apache-2.0

//! A growable, double-ended ring buffer.

mod iter;

pub use iter::*;

use std::{fmt, mem, ptr, result};
use std::cmp::{max, min};
use std::collections::TryReserveError;
use std::mem::MaybeUninit;
use std::ops::{Index, IndexMut, Range};
use std::sync::Arc;
use all_asserts::debug_assert_le;
use amplify_derive::Display;
use crate::error;

pub type Error = error::Error<OperationKind, ErrorKind>;
pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Default, Display)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("reserve ring capacity")]
	Reserve,
	#[display("insert into ring")]
	Insert,
	#[display("{0}")]
	Other(&'static str)
}

impl error::OperationKind for OperationKind {
	fn unknown() -> Self { Self::Unknown }
}

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("capacity overflow")]
	CapacityOverflow,
	#[display("storage allocation failed")]
	Alloc,
	#[display("{0}")]
	Other(&'static str),
}

impl error::ErrorKind for ErrorKind {
	fn other(message: &'static str) -> Self { Self::Other(message) }
}

impl Error {
	/// Creates a new "capacity overflow" error.
	pub fn capacity_overflow(op: OperationKind) -> Self {
		Self::new(op, ErrorKind::CapacityOverflow, None)
	}

	/// Creates a new allocation error.
	pub fn alloc(op: OperationKind, error: TryReserveError) -> Self {
		Self::new(op, ErrorKind::Alloc, Some(Arc::new(error)))
	}
}

/// A growable ring buffer, giving amortized `O(1)` pushes and pops at both ends
/// and `O(n)` bulk copies at the back and front.
///
/// Element `i` lives at slot `(head + i) % capacity`. The head is reset to slot
/// `0` whenever the buffer becomes empty. Capacity never shrinks; when a push
/// or insert would overflow it, storage grows to `1.5x` the needed length and
/// the contents are relocated in logical order.
pub struct CircularBuffer<T> {
	/// The backing storage. Its length is the capacity.
	buf: Vec<MaybeUninit<T>>,
	head: usize,
	len: usize,
}

impl<T> CircularBuffer<T> {
	/// Creates a new, empty buffer without allocating.
	pub const fn new() -> Self {
		Self {
			buf: Vec::new(),
			head: 0,
			len: 0,
		}
	}

	/// Creates a new, empty buffer with space for exactly `capacity` elements.
	pub fn with_capacity(capacity: usize) -> Self {
		let mut ring = Self::new();
		ring.reserve_exact(capacity);
		ring
	}

	/// Returns the number of elements in the buffer.
	pub fn len(&self) -> usize { self.len }
	/// Returns the number of elements the buffer can hold before growing.
	pub fn capacity(&self) -> usize { self.buf.len() }
	/// Returns the number of elements that can be pushed before growing.
	pub fn free(&self) -> usize { self.capacity() - self.len }
	/// Returns `true` if the buffer is empty.
	pub fn is_empty(&self) -> bool { self.len == 0 }
	/// Returns `true` if the next push will grow the buffer.
	pub fn is_full(&self) -> bool { self.len == self.capacity() }
	/// Returns `true` if the contents fit in one contiguous slice.
	pub fn is_contiguous(&self) -> bool { self.head <= self.capacity() - self.len }

	/// Returns a reference to the element at `index`.
	pub fn get(&self, index: usize) -> Option<&T> {
		(index < self.len).then(|| unsafe {
			self.buf[self.wrap(index)].assume_init_ref()
		})
	}

	/// Returns a mutable reference to the element at `index`.
	pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
		if index < self.len {
			let slot = self.wrap(index);
			Some(unsafe { self.buf[slot].assume_init_mut() })
		} else {
			None
		}
	}

	/// Returns a reference to the front element, or `None` if the buffer is empty.
	pub fn front(&self) -> Option<&T> { self.get(0) }

	/// Returns a mutable reference to the front element, or `None` if the buffer
	/// is empty.
	pub fn front_mut(&mut self) -> Option<&mut T> { self.get_mut(0) }

	/// Returns a reference to the back element, or `None` if the buffer is empty.
	pub fn back(&self) -> Option<&T> {
		self.get(self.len.wrapping_sub(1))
	}

	/// Returns a mutable reference to the back element, or `None` if the buffer is
	/// empty.
	pub fn back_mut(&mut self) -> Option<&mut T> {
		self.get_mut(self.len.wrapping_sub(1))
	}

	/// Iterates over elements front-to-back.
	pub fn iter(&self) -> Iter<'_, T> {
		let (a, b) = self.as_slices();
		Iter::new(a, b)
	}

	/// Iterates mutably over elements front-to-back.
	pub fn iter_mut(&mut self) -> IterMut<'_, T> {
		let (a, b) = self.as_mut_slices();
		IterMut::new(a, b)
	}

	/// Returns a pair of slices which contain the contents of the buffer, in
	/// order. The second slice is empty unless the contents wrap around the end
	/// of the storage.
	pub fn as_slices(&self) -> (&[T], &[T]) {
		let (a, b) = self.slice_ranges(0, self.len);
		unsafe {
			(assume_init(&self.buf[a]), assume_init(&self.buf[b]))
		}
	}

	/// Returns a pair of mutable slices which contain the contents of the buffer,
	/// in order.
	pub fn as_mut_slices(&mut self) -> (&mut [T], &mut [T]) {
		let (a, b) = self.slice_ranges(0, self.len);
		let (a, b) = split_range_mut(&mut self.buf, a, b);
		unsafe {
			(assume_init_mut(a), assume_init_mut(b))
		}
	}

	/// Inserts `value` at the front of the buffer, growing it if full.
	pub fn push_front(&mut self, value: T) {
		self.reserve(self.len + 1);
		self.head = if self.head == 0 {
			self.capacity() - 1
		} else {
			self.head - 1
		};
		self.buf[self.head].write(value);
		self.len += 1;
	}

	/// Inserts `value` at the back of the buffer, growing it if full.
	pub fn push_back(&mut self, value: T) {
		self.reserve(self.len + 1);
		let slot = self.wrap(self.len);
		self.buf[slot].write(value);
		self.len += 1;
	}

	/// Removes the front element and returns it, or `None` if the buffer is empty.
	pub fn pop_front(&mut self) -> Option<T> {
		if self.is_empty() { return None }

		let head = self.head;
		self.head = self.wrap(1);
		self.len -= 1;
		self.reset_if_empty();
		Some(unsafe { self.buf[head].assume_init_read() })
	}

	/// Removes the back element and returns it, or `None` if the buffer is empty.
	pub fn pop_back(&mut self) -> Option<T> {
		if self.is_empty() { return None }

		self.len -= 1;
		let slot = self.wrap(self.len);
		self.reset_if_empty();
		Some(unsafe { self.buf[slot].assume_init_read() })
	}

	/// Reserves capacity for at least `min_capacity` elements in total, growing
	/// to `1.5x` that amount if growth is needed.
	///
	/// # Panics
	///
	/// Panics if the new capacity overflows or the allocator refuses it.
	pub fn reserve(&mut self, min_capacity: usize) {
		if let Err(error) = self.try_reserve(min_capacity) {
			panic!("{error}")
		}
	}

	/// Reserves capacity for exactly `min_capacity` elements in total, if the
	/// current capacity is less.
	///
	/// # Panics
	///
	/// Panics if the new capacity overflows or the allocator refuses it.
	pub fn reserve_exact(&mut self, min_capacity: usize) {
		if let Err(error) = self.try_reserve_exact(min_capacity) {
			panic!("{error}")
		}
	}

	/// Tries to reserve capacity for at least `min_capacity` elements in total.
	/// On error, the buffer is left unchanged.
	pub fn try_reserve(&mut self, min_capacity: usize) -> Result {
		if min_capacity <= self.capacity() { return Ok(()) }
		let target = max(min_capacity.saturating_add(min_capacity / 2), min_capacity);
		self.grow(target)
	}

	/// Tries to reserve capacity for exactly `min_capacity` elements in total.
	/// On error, the buffer is left unchanged.
	pub fn try_reserve_exact(&mut self, min_capacity: usize) -> Result {
		if min_capacity <= self.capacity() { return Ok(()) }
		self.grow(min_capacity)
	}

	/// Swaps the contents of two buffers.
	pub fn swap(&mut self, other: &mut Self) {
		mem::swap(self, other)
	}

	/// Drops all elements, front segment first, keeping the capacity.
	pub fn clear(&mut self) {
		struct Dropper<'a, T>(&'a mut [T]);

		impl<T> Drop for Dropper<'_, T> {
			fn drop(&mut self) {
				unsafe { ptr::drop_in_place(self.0) }
			}
		}

		let (front, back) = self.as_mut_slices();
		let (front, back): (*mut [T], *mut [T]) = (front, back);
		self.head = 0;
		self.len = 0;
		unsafe {
			// Drops the wrapped tail even if a front element panics.
			let _back = Dropper(&mut *back);
			ptr::drop_in_place(front);
		}
	}
}

impl<T: Clone> CircularBuffer<T> {
	/// Clones `values` onto the back of the buffer, growing it if needed.
	///
	/// # Panics
	///
	/// Panics if the new capacity overflows or the allocator refuses it.
	pub fn extend_from_slice(&mut self, values: &[T]) {
		self.reserve(self.len.saturating_add(values.len()));
		for value in values {
			self.push_back(value.clone());
		}
	}
}

impl<T: Copy> CircularBuffer<T> {
	/// Copies `values` to the back of the buffer, growing it if needed.
	///
	/// # Panics
	///
	/// Panics if the new capacity overflows or the allocator refuses it.
	pub fn insert_back(&mut self, values: &[T]) {
		if let Err(error) = self.try_insert_back(values) {
			panic!("{error}")
		}
	}

	/// Copies `values` to the back of the buffer, growing it if needed. On error,
	/// the buffer is left unchanged.
	pub fn try_insert_back(&mut self, values: &[T]) -> Result {
		let count = values.len();
		if count == 0 { return Ok(()) }

		let needed = self.len
						 .checked_add(count)
						 .ok_or_else(|| Error::capacity_overflow(OperationKind::Insert))?;
		self.try_reserve(needed)
			.map_err(|error| error.with_operation(OperationKind::Insert))?;

		let (a, b) = self.slice_ranges(self.len, count);
		let (head, tail) = values.split_at(a.len());
		unsafe {
			let dst = self.buf.as_mut_ptr().cast::<T>();
			ptr::copy_nonoverlapping(head.as_ptr(), dst.add(a.start), head.len());
			ptr::copy_nonoverlapping(tail.as_ptr(), dst.add(b.start), tail.len());
		}
		self.len += count;
		Ok(())
	}

	/// Copies elements from the front of the buffer into `target`, removing them,
	/// and returns the number of elements copied.
	pub fn extract_front(&mut self, target: &mut [T]) -> usize {
		let count = min(target.len(), self.len);
		let (a, b) = self.slice_ranges(0, count);
		let (head, tail) = target[..count].split_at_mut(a.len());
		unsafe {
			let src = self.buf.as_ptr().cast::<T>();
			ptr::copy_nonoverlapping(src.add(a.start), head.as_mut_ptr(), head.len());
			ptr::copy_nonoverlapping(src.add(b.start), tail.as_mut_ptr(), tail.len());
		}
		self.skip(count);
		count
	}

	/// Removes up to `count` elements from the front of the buffer, returning the
	/// number removed.
	pub fn skip(&mut self, count: usize) -> usize {
		let count = min(count, self.len);
		if count > 0 {
			self.head = self.wrap(count);
			self.len -= count;
			self.reset_if_empty();
		}
		count
	}
}

impl<T> CircularBuffer<T> {
	fn grow(&mut self, capacity: usize) -> Result {
		debug_assert!(capacity > self.capacity());
		if capacity > isize::MAX as usize / max(mem::size_of::<T>(), 1) {
			return Err(Error::capacity_overflow(OperationKind::Reserve))
		}

		let mut buf = Self::alloc(capacity)
			.map_err(|error| Error::alloc(OperationKind::Reserve, error))?;

		// Moves cannot fail, so once the new storage exists the relocation always
		// completes. The old storage is dropped without dropping its elements.
		let (a, b) = self.slice_ranges(0, self.len);
		unsafe {
			let src = self.buf.as_ptr();
			let dst = buf.as_mut_ptr();
			ptr::copy_nonoverlapping(src.add(a.start), dst, a.len());
			ptr::copy_nonoverlapping(src.add(b.start), dst.add(a.len()), b.len());
		}
		self.buf = buf;
		self.head = 0;
		Ok(())
	}

	fn alloc(capacity: usize) -> result::Result<Vec<MaybeUninit<T>>, TryReserveError> {
		let mut buf = Vec::new();
		buf.try_reserve_exact(capacity)?;
		buf.resize_with(capacity, MaybeUninit::uninit);
		Ok(buf)
	}

	fn reset_if_empty(&mut self) {
		if self.len == 0 {
			self.head = 0;
		}
	}

	/// Maps logical index `idx`, at most the capacity, to its physical slot.
	fn wrap(&self, idx: usize) -> usize {
		let to_end = self.capacity() - self.head;
		if idx >= to_end {
			idx - to_end
		} else {
			self.head + idx
		}
	}

	/// Returns the physical ranges covering `len` logical slots from `start`. The
	/// second range is empty unless the slots wrap around.
	fn slice_ranges(&self, start: usize, len: usize) -> (Range<usize>, Range<usize>) {
		if len == 0 { return (0..0, 0..0) }
		debug_assert_le!(start + len, self.capacity());

		let start = self.wrap(start);
		let head_len = self.capacity() - start;
		if head_len >= len {
			(start..start + len, 0..0)
		} else {
			(start..self.capacity(), 0..len - head_len)
		}
	}
}

/// Splits two disjoint ranges out of a slice, where `b` lies before `a` unless
/// empty.
fn split_range_mut<T>(slice: &mut [T], a: Range<usize>, b: Range<usize>) -> (&mut [T], &mut [T]) {
	debug_assert!(b.is_empty() || b.end <= a.start);
	let (front, back) = slice.split_at_mut(a.start);
	(&mut back[..a.len()], &mut front[b])
}

unsafe fn assume_init<T>(slice: &[MaybeUninit<T>]) -> &[T] {
	&*(slice as *const [MaybeUninit<T>] as *const [T])
}

unsafe fn assume_init_mut<T>(slice: &mut [MaybeUninit<T>]) -> &mut [T] {
	&mut *(slice as *mut [MaybeUninit<T>] as *mut [T])
}

impl<T> Drop for CircularBuffer<T> {
	fn drop(&mut self) { self.clear() }
}

impl<T> Default for CircularBuffer<T> {
	fn default() -> Self { Self::new() }
}

impl<T: Clone> Clone for CircularBuffer<T> {
	fn clone(&self) -> Self {
		let mut ring = Self::with_capacity(self.len);
		ring.extend(self.iter().cloned());
		ring
	}
}

impl<T: fmt::Debug> fmt::Debug for CircularBuffer<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

impl<T> Index<usize> for CircularBuffer<T> {
	type Output = T;

	fn index(&self, index: usize) -> &T {
		let len = self.len;
		match self.get(index) {
			Some(value) => value,
			None => panic!("index {index} out of bounds for length {len}")
		}
	}
}

impl<T> IndexMut<usize> for CircularBuffer<T> {
	fn index_mut(&mut self, index: usize) -> &mut T {
		let len = self.len;
		match self.get_mut(index) {
			Some(value) => value,
			None => panic!("index {index} out of bounds for length {len}")
		}
	}
}

impl<T> Extend<T> for CircularBuffer<T> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		let iter = iter.into_iter();
		self.reserve(self.len.saturating_add(iter.size_hint().0));
		for value in iter {
			self.push_back(value);
		}
	}
}

impl<'a, T: Copy + 'a> Extend<&'a T> for CircularBuffer<T> {
	fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
		self.extend(iter.into_iter().copied())
	}
}

impl<T> FromIterator<T> for CircularBuffer<T> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		let mut ring = Self::new();
		ring.extend(iter);
		ring
	}
}

impl<T> IntoIterator for CircularBuffer<T> {
	type Item = T;
	type IntoIter = IntoIter<T>;

	fn into_iter(self) -> IntoIter<T> { IntoIter::new(self) }
}

impl<'a, T> IntoIterator for &'a CircularBuffer<T> {
	type Item = &'a T;
	type IntoIter = Iter<'a, T>;

	fn into_iter(self) -> Iter<'a, T> { self.iter() }
}

impl<'a, T> IntoIterator for &'a mut CircularBuffer<T> {
	type Item = &'a mut T;
	type IntoIter = IterMut<'a, T>;

	fn into_iter(self) -> IterMut<'a, T> { self.iter_mut() }
}

impl<T: Eq> Eq for CircularBuffer<T> { }

impl<T: PartialEq> PartialEq for CircularBuffer<T> {
	fn eq(&self, other: &Self) -> bool {
		self.len == other.len && self.iter().eq(other.iter())
	}
}

impl<T: PartialEq> PartialEq<[T]> for CircularBuffer<T> {
	fn eq(&self, other: &[T]) -> bool {
		self.len == other.len() && self.iter().eq(other)
	}
}

impl<T: PartialEq> PartialEq<&[T]> for CircularBuffer<T> {
	fn eq(&self, other: &&[T]) -> bool { self == *other }
}

impl<T: PartialEq, const N: usize> PartialEq<[T; N]> for CircularBuffer<T> {
	fn eq(&self, other: &[T; N]) -> bool { self == &other[..] }
}

impl<T: PartialEq, const N: usize> PartialEq<&[T; N]> for CircularBuffer<T> {
	fn eq(&self, other: &&[T; N]) -> bool { self == &other[..] }
}

impl<T: PartialEq> PartialEq<Vec<T>> for CircularBuffer<T> {
	fn eq(&self, other: &Vec<T>) -> bool { self == &other[..] }
}

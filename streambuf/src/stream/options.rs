// SPDX-License-Identifier: Apache-2.0

/// The default stream capacity, 64KiB.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Options for tuning a [`StreamBuffer`](super::StreamBuffer).
///
/// # Capacity
///
/// The maximum number of bytes held between the producer and consumer, 64KiB by
/// default. Once this many bytes are buffered, writes block until the consumer
/// reads some. Must be greater than zero.
///
/// # Preallocation
///
/// By default, the whole capacity is allocated up front. When disabled, the ring
/// starts empty and grows as bytes arrive, never past the capacity. This saves
/// memory for streams that rarely fill up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct StreamOptions {
	pub capacity: usize,
	pub preallocate: bool,
}

impl Default for StreamOptions {
	fn default() -> Self { Self::new() }
}

impl StreamOptions {
	/// Creates a new set of stream options.
	pub const fn new() -> Self {
		Self {
			capacity: DEFAULT_CAPACITY,
			preallocate: true,
		}
	}

	/// Returns the stream capacity.
	#[inline]
	pub const fn capacity(&self) -> usize { self.capacity }

	/// Returns `true` if the ring is allocated up front.
	#[inline]
	pub const fn preallocate(&self) -> bool { self.preallocate }

	/// Sets the stream capacity.
	#[inline]
	pub fn set_capacity(&mut self, value: usize) {
		self.capacity = value;
	}

	/// Sets whether the ring is allocated up front.
	#[inline]
	pub fn set_preallocate(&mut self, value: bool) {
		self.preallocate = value;
	}

	/// Sets the stream capacity.
	#[inline]
	pub const fn with_capacity(mut self, value: usize) -> Self {
		self.capacity = value;
		self
	}

	/// Sets whether the ring is allocated up front.
	#[inline]
	pub const fn with_preallocate(mut self, value: bool) -> Self {
		self.preallocate = value;
		self
	}

	/// Grows the ring as needed instead of allocating it up front.
	#[inline]
	pub const fn lazy(self) -> Self {
		self.with_preallocate(false)
	}
}

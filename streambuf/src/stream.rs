// SPDX-License-Identifier: Apache-2.0

//! A bounded byte pipe between exactly one producer thread and one consumer
//! thread.
//!
//! A [`StreamBuffer`] is [split] into a [`Producer`] and a [`Consumer`]. Bytes
//! written by the producer are delivered to the consumer in order, through a
//! ring of at most `capacity` bytes. A full ring blocks the producer; an empty
//! one blocks the consumer until bytes arrive or the producer [closes] the
//! stream.
//!
//! Either side can record a *fault*, an error of its own which is replayed to
//! the other side. Faults are terminal: the peer's pending or next call fails
//! with the fault as its source, even if bytes are still buffered. Only the
//! first fault recorded by each side is kept.
//!
//! [split]: StreamBuffer::split
//! [closes]: Producer::close

mod consumer;
mod options;
mod producer;

pub use consumer::*;
pub use options::*;
pub use producer::*;

use std::cmp::min;
use std::result;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};
use amplify_derive::Display;
use log::{debug, trace};
use crate::error::{self, Fault};
use crate::ring::CircularBuffer;

pub type Error = error::Error<OperationKind, ErrorKind>;
pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("write to stream")]
	Write,
	#[display("try write to stream")]
	TryWrite,
	#[display("read from stream")]
	Read,
	#[display("try read from stream")]
	TryRead,
	#[display("pump stream")]
	Pump,
	#[display("{0}")]
	Other(&'static str)
}

impl error::OperationKind for OperationKind {
	fn unknown() -> Self { Self::Unknown }
}

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	/// The producer recorded a fault.
	#[display("producer fault")]
	ProducerFault,
	/// The consumer recorded a fault.
	#[display("consumer fault")]
	ConsumerFault,
	/// A byte source driven by the producer failed.
	#[display("byte source failed")]
	SourceFailed,
	/// A byte sink driven by the consumer failed.
	#[display("byte sink failed")]
	SinkFailed,
	#[display("{0}")]
	Other(&'static str),
}

impl error::ErrorKind for ErrorKind {
	fn other(message: &'static str) -> Self { Self::Other(message) }
}

impl Error {
	/// Creates a new error replaying a fault recorded by the producer.
	pub fn producer_fault(op: OperationKind, fault: Fault) -> Self {
		Self::new(op, ErrorKind::ProducerFault, Some(fault))
	}

	/// Creates a new error replaying a fault recorded by the consumer.
	pub fn consumer_fault(op: OperationKind, fault: Fault) -> Self {
		Self::new(op, ErrorKind::ConsumerFault, Some(fault))
	}

	/// Creates a new "byte source failed" error.
	pub fn source_failed(fault: Fault) -> Self {
		Self::new(OperationKind::Pump, ErrorKind::SourceFailed, Some(fault))
	}

	/// Creates a new "byte sink failed" error.
	pub fn sink_failed(fault: Fault) -> Self {
		Self::new(OperationKind::Pump, ErrorKind::SinkFailed, Some(fault))
	}

	/// Returns `true` if the error replays a producer fault.
	pub fn is_producer_fault(&self) -> bool { self.kind == ErrorKind::ProducerFault }

	/// Returns `true` if the error replays a consumer fault.
	pub fn is_consumer_fault(&self) -> bool { self.kind == ErrorKind::ConsumerFault }
}

/// One end of a stream.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Side {
	#[display("producer")]
	Producer,
	#[display("consumer")]
	Consumer,
}

impl Side {
	/// Returns the opposite side.
	pub fn peer(self) -> Self {
		match self {
			Self::Producer => Self::Consumer,
			Self::Consumer => Self::Producer,
		}
	}
}

/// The fault recorded for a side whose handle was dropped before finishing its
/// part of the stream: a producer that never closed, or a consumer that never
/// reached end-of-stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{0} dropped before the stream finished")]
pub struct Abandoned(pub Side);

/// The logical state of a stream.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum StreamState {
	/// The producer may still write.
	#[display("open")]
	Open,
	/// The stream is closed, but bytes remain to be read.
	#[display("draining")]
	Draining,
	/// The stream is closed and every byte was read.
	#[display("done")]
	Done,
	/// A fault was recorded by the given side.
	#[display("faulted by {0}")]
	Faulted(Side),
}

/// A bounded byte buffer synchronizing one producer thread and one consumer
/// thread. Call [`split`](Self::split) to get the two ends.
#[derive(Debug)]
pub struct StreamBuffer {
	shared: Arc<Shared>,
}

impl StreamBuffer {
	/// Creates a new stream buffer holding at most `capacity` bytes.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	pub fn new(capacity: usize) -> Self {
		StreamOptions::default().with_capacity(capacity).into()
	}

	/// Creates a new stream buffer from `options`.
	///
	/// # Panics
	///
	/// Panics if the capacity is zero.
	pub fn with_options(options: StreamOptions) -> Self {
		Self { shared: Arc::new(Shared::new(options)) }
	}

	/// Returns the maximum number of bytes held in flight.
	pub fn capacity(&self) -> usize { self.shared.capacity }

	/// Returns a progress view of the stream.
	pub fn progress(&self) -> Progress {
		Progress { shared: self.shared.clone() }
	}

	/// Splits the buffer into its producer and consumer ends.
	pub fn split(self) -> (Producer, Consumer) {
		let Self { shared } = self;
		(Producer::new(shared.clone()), Consumer::new(shared))
	}
}

impl Default for StreamBuffer {
	fn default() -> Self { StreamOptions::default().into() }
}

impl From<StreamOptions> for StreamBuffer {
	fn from(options: StreamOptions) -> Self { Self::with_options(options) }
}

/// A lock-free view of a stream's byte counters, usable from any thread for
/// progress reporting. The counters only increase.
#[derive(Clone, Debug)]
pub struct Progress {
	shared: Arc<Shared>,
}

impl Progress {
	/// Returns the total number of bytes accepted from the producer.
	pub fn bytes_written(&self) -> u64 { self.shared.written.load(Ordering::Acquire) }

	/// Returns the total number of bytes delivered to the consumer.
	pub fn bytes_read(&self) -> u64 { self.shared.read.load(Ordering::Acquire) }

	/// Returns an estimate of the number of bytes in flight. Bytes dropped when
	/// the consumer saw a producer fault are no longer in flight.
	pub fn buffered(&self) -> u64 {
		let gone = self.bytes_read() + self.shared.discarded.load(Ordering::Acquire);
		self.bytes_written().saturating_sub(gone)
	}

	/// Returns the stream's state. Unlike the counters, this briefly takes the
	/// stream's lock.
	pub fn state(&self) -> StreamState { self.shared.state() }
}

#[derive(Debug)]
struct State {
	ring: CircularBuffer<u8>,
	end_of_input: bool,
	/// The first fault recorded by the producer.
	write_fault: Option<Fault>,
	/// The first fault recorded by the consumer.
	read_fault: Option<Fault>,
}

#[derive(Debug)]
pub(crate) struct Shared {
	state: Mutex<State>,
	/// Signaled by the consumer once it frees space.
	space: Condvar,
	/// Signaled by the producer once it appends bytes, closes, or faults.
	data: Condvar,
	written: AtomicU64,
	read: AtomicU64,
	/// Bytes dropped from the ring after a producer fault.
	discarded: AtomicU64,
	capacity: usize,
}

impl Shared {
	fn new(StreamOptions { capacity, preallocate }: StreamOptions) -> Self {
		assert!(capacity > 0, "stream capacity must be greater than 0");
		debug!("creating stream buffer with capacity {capacity}");
		let ring = if preallocate {
			CircularBuffer::with_capacity(capacity)
		} else {
			CircularBuffer::new()
		};

		Self {
			state: Mutex::new(State {
				ring,
				end_of_input: false,
				write_fault: None,
				read_fault: None,
			}),
			space: Condvar::new(),
			data: Condvar::new(),
			written: AtomicU64::new(0),
			read: AtomicU64::new(0),
			discarded: AtomicU64::new(0),
			capacity,
		}
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		// Nothing panics while holding the lock in a way that breaks the ring's
		// invariants, so a poisoned lock is still usable.
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Waits for free space or a consumer fault, then appends as many bytes of
	/// `data` as fit. Returns the number of bytes appended, at least one.
	pub(crate) fn try_write(&self, data: &[u8], op: OperationKind) -> Result<usize> {
		assert!(!data.is_empty(), "cannot write an empty slice to a stream");

		let capacity = self.capacity;
		let mut state = self.lock();
		debug_assert!(!state.end_of_input, "stream written to after closing");
		if state.read_fault.is_none() && state.ring.len() >= capacity {
			trace!("producer waiting for space; {} bytes buffered", state.ring.len());
			state = self.space
						.wait_while(state, |state|
							state.read_fault.is_none() && state.ring.len() >= capacity
						)
						.unwrap_or_else(PoisonError::into_inner);
		}

		if let Some(fault) = &state.read_fault {
			return Err(Error::consumer_fault(op, fault.clone()))
		}

		let State { ring, .. } = &mut *state;
		let count = min(data.len(), capacity - ring.len());
		let needed = ring.len() + count;
		if needed > ring.capacity() {
			// Grow lazily, but never past the stream's capacity.
			ring.reserve_exact(min(needed.saturating_add(needed / 2), capacity));
		}
		ring.insert_back(&data[..count]);
		self.written.fetch_add(count as u64, Ordering::Release);
		drop(state);

		self.data.notify_one();
		Ok(count)
	}

	/// Waits for bytes, end-of-stream, or a producer fault, then moves as many
	/// bytes as are available into `buf`. Returns the number of bytes moved, zero
	/// only at end-of-stream.
	pub(crate) fn try_read(&self, buf: &mut [u8], op: OperationKind) -> Result<usize> {
		assert!(!buf.is_empty(), "cannot read into an empty slice from a stream");

		let mut state = self.lock();
		if state.write_fault.is_none() && state.ring.is_empty() && !state.end_of_input {
			trace!("consumer waiting for data");
			state = self.data
						.wait_while(state, |state|
							state.write_fault.is_none() &&
							state.ring.is_empty() &&
							!state.end_of_input
						)
						.unwrap_or_else(PoisonError::into_inner);
		}

		if let Some(fault) = &state.write_fault {
			let fault = fault.clone();
			// Undelivered bytes are abandoned along with the stream.
			let dropped = state.ring.len();
			if dropped > 0 {
				trace!("consumer discarding {dropped} bytes after producer fault");
				self.discarded.fetch_add(dropped as u64, Ordering::Release);
				state.ring.clear();
			}
			return Err(Error::producer_fault(op, fault))
		}

		let count = state.ring.extract_front(buf);
		self.read.fetch_add(count as u64, Ordering::Release);
		drop(state);

		if count > 0 {
			self.space.notify_one();
		}
		Ok(count)
	}

	/// Marks the end of input, waking the consumer.
	pub(crate) fn close(&self) {
		let mut state = self.lock();
		debug_assert!(!state.end_of_input, "stream closed twice");
		state.end_of_input = true;
		drop(state);

		debug!(
			"stream closed after {} bytes written",
			self.written.load(Ordering::Acquire)
		);
		self.data.notify_all();
	}

	/// Records `fault` for `side` if it has no fault yet, waking the peer.
	/// Returns `true` if the fault was recorded.
	pub(crate) fn set_fault(&self, side: Side, fault: Fault) -> bool {
		let mut state = self.lock();
		let slot = match side {
			Side::Producer => &mut state.write_fault,
			Side::Consumer => &mut state.read_fault,
		};

		if let Some(first) = slot {
			debug!("ignoring {side} fault \"{fault}\"; already faulted with \"{first}\"");
			return false
		}

		debug!("{side} recorded fault: {fault}");
		*slot = Some(fault);
		drop(state);

		match side {
			Side::Producer => self.data.notify_all(),
			Side::Consumer => self.space.notify_all(),
		}
		true
	}

	/// Returns `true` if `side` has recorded a fault.
	pub(crate) fn is_faulted(&self, side: Side) -> bool {
		let state = self.lock();
		match side {
			Side::Producer => state.write_fault.is_some(),
			Side::Consumer => state.read_fault.is_some(),
		}
	}

	/// Records an [`Abandoned`] fault for `side` when its handle is dropped early.
	/// A consumer that reached the end of a finished stream is not abandoning it.
	pub(crate) fn abandon(&self, side: Side) {
		let state = self.lock();
		let (slot, finished) = match side {
			Side::Producer => (&state.write_fault, false),
			Side::Consumer => (
				&state.read_fault,
				state.end_of_input && state.ring.is_empty()
			),
		};

		if slot.is_some() || finished { return }
		drop(state);

		debug!("{side} abandoned the stream");
		self.set_fault(side, Arc::new(Abandoned(side)));
	}

	pub(crate) fn written(&self) -> u64 { self.written.load(Ordering::Acquire) }

	pub(crate) fn read(&self) -> u64 { self.read.load(Ordering::Acquire) }

	pub(crate) fn capacity(&self) -> usize { self.capacity }

	fn state(&self) -> StreamState {
		let state = self.lock();
		if state.write_fault.is_some() {
			StreamState::Faulted(Side::Producer)
		} else if state.read_fault.is_some() {
			StreamState::Faulted(Side::Consumer)
		} else if !state.end_of_input {
			StreamState::Open
		} else if state.ring.is_empty() {
			StreamState::Done
		} else {
			StreamState::Draining
		}
	}
}

#[cfg(test)]
mod test {
	use std::io;
	use std::sync::Arc;
	use std::sync::atomic::Ordering;
	use pretty_assertions::assert_eq;
	use super::{Abandoned, ErrorKind, Side, StreamBuffer, StreamOptions, StreamState};

	#[test]
	fn state_transitions() {
		let (mut producer, mut consumer) = StreamBuffer::new(4).split();
		let progress = producer.progress();
		assert_eq!(progress.state(), StreamState::Open);

		producer.write(b"AB").unwrap();
		producer.close();
		assert_eq!(progress.state(), StreamState::Draining);
		assert_eq!(progress.buffered(), 2);

		let mut buf = [0; 4];
		assert_eq!(consumer.read(&mut buf).unwrap(), 2);
		assert_eq!(progress.state(), StreamState::Done);
		assert_eq!(progress.buffered(), 0);
	}

	#[test]
	fn fault_state() {
		let (producer, consumer) = StreamBuffer::new(4).split();
		let progress = consumer.progress();
		consumer.set_read_error(io::Error::from(io::ErrorKind::Other));
		assert_eq!(progress.state(), StreamState::Faulted(Side::Consumer));
		assert!(producer.is_faulted());
	}

	#[test]
	fn lazy_ring_stays_within_capacity() {
		let options = StreamOptions::default()
			.with_capacity(10)
			.lazy();
		let (mut producer, consumer) = StreamBuffer::from(options).split();
		assert_eq!(producer.shared().lock().ring.capacity(), 0);

		assert_eq!(producer.try_write(b"abcdefgh").unwrap(), 8);
		assert_eq!(producer.shared().lock().ring.capacity(), 10);
		assert_eq!(producer.try_write(b"ijklmnop").unwrap(), 2);
		assert_eq!(producer.shared().lock().ring.capacity(), 10);
		drop(consumer);
	}

	#[test]
	fn first_fault_wins() {
		let (producer, _consumer) = StreamBuffer::new(4).split();
		assert!(producer.set_write_error(io::Error::new(io::ErrorKind::Other, "first")));
		assert!(!producer.set_write_error(io::Error::new(io::ErrorKind::Other, "second")));
		let state = producer.shared().lock();
		assert_eq!(state.write_fault.as_ref().unwrap().to_string(), "first");
	}

	#[test]
	fn faulted_read_discards_buffer() {
		let (mut producer, mut consumer) = StreamBuffer::new(4).split();
		producer.write(b"ABC").unwrap();
		producer.set_write_error(Abandoned(Side::Producer));

		let error = consumer.try_read(&mut [0; 4]).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::ProducerFault);
		assert!(consumer.shared().lock().ring.is_empty());
		assert_eq!(consumer.total_bytes_read(), 0);
		assert_eq!(consumer.progress().buffered(), 0);
	}

	#[test]
	fn discarded_bytes_leave_progress() {
		let (mut producer, mut consumer) = StreamBuffer::new(8).split();
		let progress = producer.progress();
		producer.write(b"ABCDEF").unwrap();
		assert_eq!(consumer.try_read(&mut [0; 2]).unwrap(), 2);
		assert_eq!(progress.buffered(), 4);

		producer.set_write_error(Abandoned(Side::Producer));
		assert_eq!(progress.buffered(), 4, "bytes stay in flight until the consumer sees the fault");
		assert!(consumer.try_read(&mut [0; 2]).is_err());
		assert_eq!(progress.buffered(), 0);
		assert_eq!(progress.bytes_written(), 6);
		assert_eq!(progress.bytes_read(), 2);
		assert_eq!(producer.shared().discarded.load(Ordering::Acquire), 4);

		assert!(consumer.try_read(&mut [0; 2]).is_err());
		assert_eq!(producer.shared().discarded.load(Ordering::Acquire), 4);
	}

	#[test]
	fn dropped_producer_abandons() {
		let (producer, consumer) = StreamBuffer::new(4).split();
		drop(producer);
		let state = consumer.shared().lock();
		let fault = state.write_fault.clone().unwrap();
		assert_eq!(fault.downcast_ref::<Abandoned>(), Some(&Abandoned(Side::Producer)));
	}

	#[test]
	fn finished_consumer_does_not_abandon() {
		let (mut producer, mut consumer) = StreamBuffer::new(4).split();
		producer.write(b"A").unwrap();
		producer.close();
		let mut buf = [0; 2];
		assert_eq!(consumer.read(&mut buf).unwrap(), 1);
		let shared = Arc::clone(consumer.shared());
		drop(consumer);
		assert!(shared.lock().read_fault.is_none());
	}

	#[test]
	fn side_peer() {
		assert_eq!(Side::Producer.peer(), Side::Consumer);
		assert_eq!(Side::Consumer.peer(), Side::Producer);
		assert_eq!(Abandoned(Side::Consumer).to_string(), "consumer dropped before the stream finished");
	}
}

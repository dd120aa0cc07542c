// SPDX-License-Identifier: Apache-2.0

use std::cmp::min;
use std::error::Error as StdError;
use std::io;
use std::io::Write;
use std::sync::Arc;
use all_asserts::assert_le;
use crate::error::Fault;
use super::{Error, OperationKind, Progress, PUMP_CHUNK_SIZE, Result, Shared, Side, StreamState};

/// The reading end of a [`StreamBuffer`](super::StreamBuffer).
///
/// Dropping a consumer before it reaches end-of-stream records an
/// [`Abandoned`](super::Abandoned) fault, so the producer fails instead of
/// waiting forever.
#[derive(Debug)]
pub struct Consumer {
	shared: Arc<Shared>,
}

impl Consumer {
	pub(super) fn new(shared: Arc<Shared>) -> Self {
		Self { shared }
	}

	/// Fills `buf`, blocking until enough bytes arrive or the stream ends. Returns
	/// the number of bytes read, less than `buf.len()` only at end-of-stream.
	///
	/// Fails with the producer's fault if one is recorded. Bytes read before the
	/// fault was seen are left in `buf`.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let mut filled = 0;
		while filled < buf.len() {
			match self.shared.try_read(&mut buf[filled..], OperationKind::Read)? {
				0 => break,
				count => filled += count
			}
		}
		Ok(filled)
	}

	/// Reads as many bytes as are available into `buf`, blocking only until at
	/// least one byte is available or the stream ends. Returns the number of bytes
	/// read, zero only at end-of-stream.
	///
	/// Fails with the producer's fault as soon as one is recorded, discarding any
	/// bytes still buffered.
	///
	/// # Panics
	///
	/// Panics if `buf` is empty.
	pub fn try_read(&mut self, buf: &mut [u8]) -> Result<usize> {
		self.shared.try_read(buf, OperationKind::TryRead)
	}

	/// Records `fault` as the consumer's error, waking the producer. Returns
	/// `false` if a fault was already recorded, in which case the first one is
	/// kept.
	pub fn set_read_error<E: StdError + Send + Sync + 'static>(&self, fault: E) -> bool {
		self.set_read_fault(Arc::new(fault))
	}

	/// Records a shared `fault` as the consumer's error. See
	/// [`set_read_error`](Self::set_read_error).
	pub fn set_read_fault(&self, fault: Fault) -> bool {
		self.shared.set_fault(Side::Consumer, fault)
	}

	/// Returns `true` if the producer has recorded a fault.
	pub fn is_faulted(&self) -> bool {
		self.shared.is_faulted(Side::Producer)
	}

	/// Returns `true` if the stream is closed and every byte was read.
	pub fn is_done(&self) -> bool {
		self.shared.state() == StreamState::Done
	}

	/// Returns the total number of bytes read.
	pub fn total_bytes_read(&self) -> u64 { self.shared.read() }

	/// Returns the stream capacity.
	pub fn capacity(&self) -> usize { self.shared.capacity() }

	/// Returns a progress view of the stream.
	pub fn progress(&self) -> Progress {
		Progress { shared: self.shared.clone() }
	}

	/// Feeds every byte of the stream to a byte `sink` until end-of-stream.
	/// Returns the number of bytes read.
	///
	/// The sink consumes up to `data.len()` bytes per call and returns the count.
	/// If it fails, or consumes nothing, its error is recorded as the consumer's
	/// fault and returned as a [`SinkFailed`] error.
	///
	/// [`SinkFailed`]: super::ErrorKind::SinkFailed
	pub fn pump_into<F, E>(self, mut sink: F) -> Result<u64>
	where F: FnMut(&[u8]) -> std::result::Result<usize, E>,
		  E: StdError + Send + Sync + 'static {
		let mut chunk = vec![0; min(self.capacity(), PUMP_CHUNK_SIZE)];
		let mut total = 0;
		loop {
			let count = self.shared.try_read(&mut chunk, OperationKind::Pump)?;
			if count == 0 { break }

			let mut data = &chunk[..count];
			while !data.is_empty() {
				let fault: Fault = match sink(data) {
					Ok(0) => Arc::new(io::Error::from(io::ErrorKind::WriteZero)),
					Ok(count) => {
						assert_le!(count, data.len(), "sink consumed more bytes than given");
						data = &data[count..];
						continue
					}
					Err(error) => Arc::new(error)
				};
				self.set_read_fault(fault.clone());
				return Err(Error::sink_failed(fault))
			}
			total += count as u64;
		}
		Ok(total)
	}

	/// Copies the stream into `writer` until end-of-stream, then flushes it. See
	/// [`pump_into`](Self::pump_into).
	pub fn copy_to(self, mut writer: impl Write) -> Result<u64> {
		let shared = self.shared.clone();
		let total = self.pump_into(|data| loop {
			match writer.write(data) {
				Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
				result => break result
			}
		})?;

		writer.flush().map_err(|error| {
			let fault: Fault = Arc::new(error);
			shared.set_fault(Side::Consumer, fault.clone());
			Error::sink_failed(fault)
		})?;
		Ok(total)
	}

	#[cfg(feature = "bytes")]
	/// Reads available bytes into `buf`, as [`try_read`](Self::try_read) does.
	/// Returns zero at end-of-stream, or if `buf` has no room.
	pub fn read_buf(&mut self, buf: &mut impl bytes::BufMut) -> Result<usize> {
		let len = min(buf.remaining_mut(), PUMP_CHUNK_SIZE);
		if len == 0 { return Ok(0) }

		let mut chunk = vec![0; len];
		let count = self.shared.try_read(&mut chunk, OperationKind::TryRead)?;
		buf.put_slice(&chunk[..count]);
		Ok(count)
	}

	#[cfg(test)]
	pub(crate) fn shared(&self) -> &Arc<Shared> { &self.shared }
}

impl Drop for Consumer {
	fn drop(&mut self) {
		self.shared.abandon(Side::Consumer);
	}
}

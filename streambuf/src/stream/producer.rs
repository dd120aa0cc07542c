// SPDX-License-Identifier: Apache-2.0

use std::cmp::min;
use std::error::Error as StdError;
use std::io;
use std::io::Read;
use std::sync::Arc;
use all_asserts::assert_le;
use crate::error::Fault;
use super::{Error, OperationKind, Progress, Result, Shared, Side};

/// The chunk size used when pumping bytes from a source.
pub const PUMP_CHUNK_SIZE: usize = 8192;

/// The writing end of a [`StreamBuffer`](super::StreamBuffer).
///
/// Dropping a producer without [closing](Self::close) it records an
/// [`Abandoned`](super::Abandoned) fault, so the consumer fails instead of
/// waiting forever.
#[derive(Debug)]
pub struct Producer {
	shared: Arc<Shared>,
	closed: bool,
}

impl Producer {
	pub(super) fn new(shared: Arc<Shared>) -> Self {
		Self { shared, closed: false }
	}

	/// Writes all of `data`, blocking whenever the stream is full until the
	/// consumer makes room.
	///
	/// Fails with the consumer's fault if one is recorded, in which case only
	/// part of `data` may have been written.
	pub fn write(&mut self, mut data: &[u8]) -> Result {
		while !data.is_empty() {
			let count = self.shared.try_write(data, OperationKind::Write)?;
			data = &data[count..];
		}
		Ok(())
	}

	/// Writes as much of `data` as fits, blocking only until at least one byte of
	/// space is free. Returns the number of bytes written, never zero.
	///
	/// Fails with the consumer's fault if one is recorded, even if space is free.
	///
	/// # Panics
	///
	/// Panics if `data` is empty.
	pub fn try_write(&mut self, data: &[u8]) -> Result<usize> {
		self.shared.try_write(data, OperationKind::TryWrite)
	}

	/// Signals end-of-stream, waking the consumer. The consumer reads any bytes
	/// still buffered, then reaches end-of-stream.
	pub fn close(mut self) {
		self.shared.close();
		self.closed = true;
	}

	/// Records `fault` as the producer's error, waking the consumer. Returns
	/// `false` if a fault was already recorded, in which case the first one is
	/// kept.
	pub fn set_write_error<E: StdError + Send + Sync + 'static>(&self, fault: E) -> bool {
		self.set_write_fault(Arc::new(fault))
	}

	/// Records a shared `fault` as the producer's error. See
	/// [`set_write_error`](Self::set_write_error).
	pub fn set_write_fault(&self, fault: Fault) -> bool {
		self.shared.set_fault(Side::Producer, fault)
	}

	/// Returns `true` if the consumer has recorded a fault.
	pub fn is_faulted(&self) -> bool {
		self.shared.is_faulted(Side::Consumer)
	}

	/// Returns the total number of bytes written.
	pub fn total_bytes_written(&self) -> u64 { self.shared.written() }

	/// Returns the stream capacity.
	pub fn capacity(&self) -> usize { self.shared.capacity() }

	/// Returns a progress view of the stream.
	pub fn progress(&self) -> Progress {
		Progress { shared: self.shared.clone() }
	}

	/// Drives a byte `source` until it returns zero, writing every chunk it
	/// produces, then closes the stream. Returns the number of bytes written.
	///
	/// The source fills up to `buf.len()` bytes per call and returns the count, or
	/// `0` at the end of its input. If it fails, its error is recorded as the
	/// producer's fault and returned as a [`SourceFailed`] error.
	///
	/// [`SourceFailed`]: super::ErrorKind::SourceFailed
	pub fn pump_from<F, E>(mut self, mut source: F) -> Result<u64>
	where F: FnMut(&mut [u8]) -> std::result::Result<usize, E>,
		  E: StdError + Send + Sync + 'static {
		let mut chunk = vec![0; min(self.capacity(), PUMP_CHUNK_SIZE)];
		let mut total = 0;
		loop {
			let count = match source(&mut chunk) {
				Ok(0) => break,
				Ok(count) => count,
				Err(error) => {
					let fault: Fault = Arc::new(error);
					self.set_write_fault(fault.clone());
					return Err(Error::source_failed(fault))
				}
			};
			assert_le!(count, chunk.len(), "source returned more bytes than requested");

			self.write(&chunk[..count])?;
			total += count as u64;
		}

		self.close();
		Ok(total)
	}

	/// Copies `reader` into the stream until it reaches end-of-file, then closes
	/// the stream. See [`pump_from`](Self::pump_from).
	pub fn copy_from(self, mut reader: impl Read) -> Result<u64> {
		self.pump_from(|buf| loop {
			match reader.read(buf) {
				Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
				result => break result
			}
		})
	}

	#[cfg(feature = "bytes")]
	/// Writes all remaining bytes of `buf`, advancing it as bytes are written.
	pub fn write_buf(&mut self, buf: &mut impl bytes::Buf) -> Result {
		while buf.has_remaining() {
			let count = self.shared.try_write(buf.chunk(), OperationKind::Write)?;
			buf.advance(count);
		}
		Ok(())
	}

	#[cfg(test)]
	pub(crate) fn shared(&self) -> &Arc<Shared> { &self.shared }
}

impl Drop for Producer {
	fn drop(&mut self) {
		if !self.closed {
			self.shared.abandon(Side::Producer);
		}
	}
}

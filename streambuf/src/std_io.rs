// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::io::{Read, Write};
use crate::stream::{Consumer, Error, ErrorKind, Producer};

impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		let kind = if let Some(error) = value.downcast_fault::<io::Error>() {
			error.kind()
		} else {
			match value.kind() {
				ErrorKind::ConsumerFault => io::ErrorKind::BrokenPipe,
				ErrorKind::ProducerFault => io::ErrorKind::UnexpectedEof,
				_ => io::ErrorKind::Other
			}
		};
		Self::new(kind, value)
	}
}

/// Writes to the stream with [`Producer::try_write`]. Writing an empty slice
/// returns zero without blocking.
impl Write for Producer {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if buf.is_empty() { return Ok(0) }
		Ok(self.try_write(buf)?)
	}

	fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
		Ok(Producer::write(self, buf)?)
	}

	/// Does nothing; written bytes are visible to the consumer immediately.
	fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Reads from the stream with [`Consumer::try_read`]. Reading into an empty
/// slice returns zero without blocking.
impl Read for Consumer {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() { return Ok(0) }
		Ok(self.try_read(buf)?)
	}
}

// SPDX-License-Identifier: Apache-2.0

#![cfg(feature = "bytes")]

use std::thread;
use bytes::{Buf, Bytes, BytesMut};
use pretty_assertions::assert_eq;
use streambuf::StreamBuffer;

#[test]
fn write_and_read_buf() {
	let (mut producer, mut consumer) = StreamBuffer::new(4).split();
	let mut out = BytesMut::new();
	thread::scope(|scope| {
		scope.spawn(|| {
			let mut data = Bytes::from_static(b"Hello World!");
			producer.write_buf(&mut data).unwrap();
			assert!(!data.has_remaining());
			producer.close();
		});

		while consumer.read_buf(&mut out).unwrap() > 0 { }
	});

	assert_eq!(&out[..], b"Hello World!");
	assert_eq!(consumer.total_bytes_read(), 12);
}

// SPDX-License-Identifier: Apache-2.0

#[macro_use]
mod common;

use std::cmp::min;
use std::io;
use std::io::Cursor;
use std::thread;
use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use streambuf::StreamBuffer;
use streambuf::stream::ErrorKind;

#[derive(Debug, thiserror::Error)]
#[error("connection reset")]
struct Reset;

#[quickcheck]
fn pump(data: Vec<u8>, capacity: u8, chunks: Vec<u8>) -> TestResult {
	let capacity = 1 + capacity as usize % 64;
	let (producer, consumer) = StreamBuffer::new(capacity).split();
	let (written, read, sink) = thread::scope(|scope| {
		let writer = scope.spawn(|| {
			let mut rest = &data[..];
			let mut sizes = common::chunk_sizes(&chunks, 32);
			producer.pump_from(|buf: &mut [u8]| {
				let count = min(min(buf.len(), rest.len()), sizes.next().unwrap());
				buf[..count].copy_from_slice(&rest[..count]);
				rest = &rest[count..];
				Ok::<_, io::Error>(count)
			})
		});

		let mut sink = Vec::new();
		let read = consumer.pump_into(|chunk| {
			sink.extend_from_slice(chunk);
			Ok::<_, io::Error>(chunk.len())
		}).unwrap();
		(writer.join().unwrap().unwrap(), read, sink)
	});

	let len = data.len() as u64;
	qc_assert_eq!((written, read, sink), (len, len, data))
}

#[test]
fn copy() {
	let data = common::counting(100_000);
	let (producer, consumer) = StreamBuffer::new(1000).split();
	let mut sink = Vec::new();
	thread::scope(|scope| {
		let writer = scope.spawn(|| producer.copy_from(Cursor::new(&data)));
		assert_eq!(consumer.copy_to(&mut sink).unwrap(), 100_000);
		assert_eq!(writer.join().unwrap().unwrap(), 100_000);
	});
	assert_eq!(sink, data);
}

#[test]
fn io_copy() {
	let data = common::counting(5000);
	let (mut producer, mut consumer) = StreamBuffer::new(64).split();
	let mut sink = Vec::new();
	thread::scope(|scope| {
		scope.spawn(|| {
			io::copy(&mut &data[..], &mut producer).unwrap();
			producer.close();
		});
		assert_eq!(io::copy(&mut consumer, &mut sink).unwrap(), 5000);
	});
	assert_eq!(sink, data);
}

#[test]
fn source_failure_faults_stream() {
	let (producer, consumer) = StreamBuffer::new(16).split();
	thread::scope(|scope| {
		let writer = scope.spawn(|| {
			let mut calls = 0;
			producer.pump_from(|buf: &mut [u8]| {
				calls += 1;
				if calls > 1 { return Err(Reset) }
				buf[..4].copy_from_slice(b"abcd");
				Ok(4)
			})
		});

		let error = consumer.copy_to(io::sink()).unwrap_err();
		assert!(error.is_producer_fault());
		assert!(error.downcast_fault::<Reset>().is_some());

		let error = writer.join().unwrap().unwrap_err();
		assert_eq!(error.kind(), ErrorKind::SourceFailed);
		assert!(error.downcast_fault::<Reset>().is_some());
	});
}

#[test]
fn sink_failure_faults_stream() {
	let data = common::counting(1000);
	let (producer, consumer) = StreamBuffer::new(8).split();
	thread::scope(|scope| {
		let writer = scope.spawn(|| producer.copy_from(&data[..]));

		let error = consumer.pump_into(|_| Err::<usize, _>(Reset)).unwrap_err();
		assert_eq!(error.kind(), ErrorKind::SinkFailed);

		let error = writer.join().unwrap().unwrap_err();
		assert!(error.is_consumer_fault());
		assert!(error.downcast_fault::<Reset>().is_some());
	});
}

#[test]
fn stalled_sink_faults_stream() {
	let (mut producer, consumer) = StreamBuffer::new(8).split();
	producer.write(b"abc").unwrap();
	producer.close();

	let error = consumer.pump_into(|_| Ok::<_, io::Error>(0)).unwrap_err();
	assert_eq!(error.kind(), ErrorKind::SinkFailed);
	let fault = error.downcast_fault::<io::Error>().unwrap();
	assert_eq!(fault.kind(), io::ErrorKind::WriteZero);
}

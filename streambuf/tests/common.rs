// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(dead_code, unused_macros)]

use std::fmt::{Arguments, Debug};
use std::iter;
use std::thread;
use std::time::{Duration, Instant};

macro_rules! qc_assert_eq {
	($left:expr,$right:expr) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, None)
			)
		}
	}};
    ($left:expr,$right:expr,$($arg:tt)+) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, Some(format_args!($($arg)+)))
			)
		}
	}};
}

pub fn format_qc_assert_error<L: Debug, R: Debug>(left: &L, right: &R, msg: Option<Arguments>) -> String {
	if let Some(msg) = msg {
		format!(
			"assertion failed `(left == right)`: {msg}\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	} else {
		format!(
			"assertion failed `(left == right)`:\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	}
}

/// Cycles through generated `sizes`, mapped into `1..=max`. Yields `max` forever
/// if `sizes` is empty.
pub fn chunk_sizes(sizes: &[u8], max: usize) -> impl Iterator<Item = usize> + '_ {
	let fallback = sizes.is_empty().then_some(max);
	sizes.iter()
		 .map(move |&size| 1 + size as usize % max)
		 .cycle()
		 .chain(iter::repeat(max).take_while(move |_| fallback.is_some()))
}

/// Returns `len` bytes counting up from zero, wrapping at 256.
pub fn counting(len: usize) -> Vec<u8> {
	(0..len).map(|i| i as u8).collect()
}

/// Polls `condition` until it holds, panicking after five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
	let deadline = Instant::now() + Duration::from_secs(5);
	while !condition() {
		assert!(Instant::now() < deadline, "timed out waiting for condition");
		thread::sleep(Duration::from_millis(1));
	}
}

/// Gives a blocked thread time to park.
pub fn settle() {
	thread::sleep(Duration::from_millis(20));
}

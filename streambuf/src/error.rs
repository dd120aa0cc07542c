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

use std::fmt;
use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A shared, fully-formed error value. Faults are captured once and handed out
/// to every caller that observes them, so they live behind an [`Arc`].
pub type Fault = Arc<dyn StdError + Send + Sync>;

pub trait OperationKind: Copy + Debug + Display {
	fn unknown() -> Self;
}

pub trait ErrorKind: Copy + Debug + Display {
	fn other(message: &'static str) -> Self;
}

#[derive(Clone, Debug)]
pub struct Error<O: OperationKind, E: ErrorKind> {
	op: O,
	pub(crate) kind: E,
	source: Option<Fault>,
}

impl<O: OperationKind, E: ErrorKind> Display for Error<O, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind, source } = self;
		if let Some(source) = source {
			write!(f, "{op} failed; {kind} ({source})")
		} else {
			write!(f, "{op} failed; {kind}")
		}
	}
}

impl<O: OperationKind, E: ErrorKind> StdError for Error<O, E> {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		if let Some(ref source) = self.source {
			Some(source.as_ref())
		} else {
			None
		}
	}
}

impl<O: OperationKind, K: ErrorKind> Error<O, K> {
	pub(crate) fn new(
		op: O,
		kind: K,
		source: Option<Fault>
	) -> Self {
		Self { op, kind, source }
	}

	/// Creates a new error with a custom message.
	pub fn other(
		op: O,
		message: &'static str,
		source: Option<Fault>
	) -> Self {
		Self::new(op, K::other(message), source)
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> O { self.op }

	/// Sets the operation kind.
	pub fn with_operation(mut self, op: O) -> Self {
		self.op = op;
		self
	}

	/// Returns the error kind.
	pub fn kind(&self) -> K { self.kind }

	/// Sets the error kind.
	pub fn with_kind(mut self, kind: K) -> Self {
		self.kind = kind;
		self
	}

	/// Returns the shared source of this error, if any. Unlike [`source`], this
	/// keeps the `Send + Sync` bounds and can be cloned out of the error.
	///
	/// [`source`]: StdError::source
	pub fn fault(&self) -> Option<&Fault> { self.source.as_ref() }

	/// Returns the source downcast into `T`, if possible.
	pub fn downcast_fault<T: StdError + 'static>(&self) -> Option<&T> {
		self.source.as_deref()?.downcast_ref()
	}
}

impl<O: OperationKind, K: ErrorKind> From<&'static str> for Error<O, K> {
	fn from(value: &'static str) -> Self {
		Self::other(O::unknown(), value, None)
	}
}

#[cfg(test)]
mod test {
	use std::error::Error as _;
	use std::io;
	use std::sync::Arc;
	use amplify_derive::Display;
	use super::{Error, ErrorKind, OperationKind};

	#[derive(Copy, Clone, Debug, Display)]
	enum Op {
		#[display("unknown operation")]
		Unknown,
		#[display("poke")]
		Poke,
	}

	#[derive(Copy, Clone, Debug, Display)]
	enum Kind {
		#[display("{0}")]
		Other(&'static str),
	}

	impl OperationKind for Op {
		fn unknown() -> Self { Self::Unknown }
	}

	impl ErrorKind for Kind {
		fn other(message: &'static str) -> Self { Self::Other(message) }
	}

	#[test]
	fn display() {
		let error = Error::<Op, Kind>::other(Op::Poke, "no thanks", None);
		assert_eq!(error.to_string(), "poke failed; no thanks");

		let error: Error<Op, Kind> = "huh".into();
		assert_eq!(error.to_string(), "unknown operation failed; huh");
	}

	#[test]
	fn source_is_shared() {
		let fault: super::Fault = Arc::new(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
		let error = Error::<Op, Kind>::other(Op::Poke, "no thanks", Some(fault.clone()));
		assert_eq!(error.to_string(), "poke failed; no thanks (gone)");
		assert!(error.source().is_some());
		assert_eq!(
			error.downcast_fault::<io::Error>().map(io::Error::kind),
			Some(io::ErrorKind::BrokenPipe)
		);
		assert!(Arc::ptr_eq(error.fault().unwrap(), &fault));
	}
}

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

//! ## How it works
//!
//! A [`StreamBuffer`] connects one *producer* thread to one *consumer* thread,
//! letting each run at its own pace and with its own chunk sizes. The buffer is
//! split into two handles, a [`Producer`] and a [`Consumer`], which cannot be
//! cloned; only one thread can write and only one can read.
//!
//! Bytes in flight are held in a [`CircularBuffer`], bounded by the stream's
//! *capacity*. When it's full, the producer blocks until the consumer reads;
//! when it's empty, the consumer blocks until the producer writes or closes the
//! stream. Both sides have blocking, exact-length operations (`write`, `read`)
//! and short variants (`try_write`, `try_read`) which return as soon as some
//! progress is made.
//!
//! ### Faults
//!
//! Either side can record a *fault*, an error of its own which is handed to the
//! other side. Once recorded, the peer's blocked or next call fails with that
//! fault as its source, even if bytes are still buffered; a fault abandons the
//! transfer. Each side keeps only its first fault. Dropping a handle before it
//! finishes its part records a fault too, so the peer never waits forever.
//!
//! ### Adapters
//!
//! The producer implements [`Write`] and the consumer implements [`Read`]. Push
//! style byte sources and sinks can be driven with [`Producer::pump_from`] and
//! [`Consumer::pump_into`].
//!
//! [`Write`]: std::io::Write
//! [`Read`]: std::io::Read

pub mod error;
pub mod ring;
pub mod stream;
mod std_io;

pub use error::Fault;
pub use ring::CircularBuffer;
pub use stream::{
	Abandoned,
	Consumer,
	DEFAULT_CAPACITY,
	Producer,
	Progress,
	Side,
	StreamBuffer,
	StreamOptions,
	StreamState,
};

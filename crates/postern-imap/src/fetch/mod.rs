//! Message data: section addresses, parsed FETCH results, and streaming or
//! chunked access to large bodies.
//!
//! [`FetchAddress`] is pure encoding. [`MessageStatus`] is what a FETCH or
//! STORE reports per message. [`LiteralStream`] and [`PartialFetch`] borrow
//! a [`Connection`](crate::connection::Connection) while they run.

mod address;
mod literal;
mod message;
mod partial;

pub use address::{FetchAddress, Part};
pub use literal::LiteralStream;
pub use message::MessageStatus;
pub(crate) use message::normalize_key;
pub use partial::{DEFAULT_CHUNK_SIZE, PartialFetch};

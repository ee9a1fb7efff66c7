#![forbid(unsafe_code)]
//! Wire-level building blocks of the wirecheck protocol: framing and envelope decoding.
//!
//! The target process speaks a line-oriented protocol. Every message is a byte sequence terminated by a delimiter
//! (a single newline by default). A message that parses as a JSON object with a `type` tag is an *envelope*:
//!
//! - `{"type": "Success"}` ends the current test as passed,
//! - `{"type": "Error", "err": <string>, "data": <any>}` ends it as failed,
//! - `{"type": "Info", "data": <string>}` reports progress.
//!
//! Anything else is opaque log text.
//!
//! ## Notes
//!
//! - This crate does **no IO** and holds no global state. The harness crate owns the socket and feeds bytes into a
//!   [`FrameBuffer`]; frames coming out are classified with [`Envelope::decode`].
//! - Decoding is total: it never fails, malformed input degrades to [`Envelope::Raw`].
//!
//! ## Examples
//! ```rust
//! use wirecheck_proto::{Delimiter, Envelope, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new(Delimiter::default());
//! buffer.extend(b"{\"type\":\"Info\",\"data\":\"warming up\"}\n{\"type\":\"Succ");
//! let frame = buffer.next_frame().unwrap().unwrap();
//! assert_eq!(Envelope::decode(frame.as_bytes()), Envelope::progress("warming up"));
//! assert!(buffer.next_frame().unwrap().is_none());
//! ```

pub mod delimiter;
pub mod envelope;
pub mod error;
pub mod frame;

pub use delimiter::Delimiter;
pub use envelope::{Envelope, Outcome, OutcomeKind, render_value};
pub use error::ProtoError;
pub use frame::{Frame, FrameBuffer};

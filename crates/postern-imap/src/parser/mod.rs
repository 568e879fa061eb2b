//! IMAP response parsing.
//!
//! # Architecture
//!
//! - **Lexer**: splits one framed response into tokens; reads literals by
//!   their declared length.
//! - **Response parser**: builds a [`Response`] from tokens, keeping data as
//!   nested [`Value`]s.
//! - **Tokenizer**: pulls framed responses off the stream and enforces that
//!   tagged completions match the command in flight.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use postern_imap::parser::{Keyword, Response, ResponseParser};
//!
//! let response = ResponseParser::parse(&Bytes::from_static(b"* 4 EXISTS\r\n")).unwrap();
//! match response {
//!     Response::Untagged(u) => {
//!         assert_eq!(u.keyword, Keyword::Exists);
//!         assert_eq!(u.count, Some(4));
//!     }
//!     _ => panic!("expected untagged"),
//! }
//! ```

pub mod lexer;
pub mod response;
mod tokenizer;

pub use lexer::{Lexer, Token};
pub use response::{Keyword, Response, ResponseCode, ResponseParser, Status, Untagged, Value};
pub use tokenizer::ResponseTokenizer;

//! String and number processing shared by every parse path.
//!
//! - [`escape`] - escape decoding, single-line validation, multiline dedent
//! - [`number`] - radix integers and floats with original-text retention

pub mod escape;
pub mod number;

pub use escape::{EscapeError, decode_escapes, process_multiline, validate_raw_single};
pub use number::{NumberError, ParsedFloat, parse_float, parse_integer};

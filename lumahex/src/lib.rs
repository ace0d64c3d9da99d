#[macro_use]
extern crate quick_error;

pub mod blob;
pub mod codec;
pub mod layout;
pub mod scan;

pub use codec::{decode, encode, encode_f64, FormatError, HEX_WIDTH};
pub use layout::{Layout, LayoutError, Segment};

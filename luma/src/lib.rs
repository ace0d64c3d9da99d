#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod builtin;
pub mod extract;
pub mod patch;
pub mod registry;
pub mod settings;
pub mod tone_curve;
pub mod values;

pub use registry::{Family, Level, Registry};

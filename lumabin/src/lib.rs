#[macro_use]
extern crate quick_error;

pub mod args;
pub mod pathutils;
pub mod report;

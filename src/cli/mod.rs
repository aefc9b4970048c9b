//! Command-line front end: argument parsing, file discovery, and
//! diagnostic rendering.

pub mod args;
pub mod driver;
pub mod reporter;

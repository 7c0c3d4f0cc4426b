//! Position Source Adapters

mod json_file;

pub use json_file::JsonFilePositionSource;

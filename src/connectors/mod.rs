// src/connectors/mod.rs

pub mod options_data;

pub use options_data::{DataError, OptionsData, DEFAULT_DATA_DIR};

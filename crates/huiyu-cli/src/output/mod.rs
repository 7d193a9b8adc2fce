//! Output formatters

pub mod terminal;

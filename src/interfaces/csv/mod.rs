//! CSV adapters used by the command-line driver.

pub mod decision_writer;
pub mod record_reader;

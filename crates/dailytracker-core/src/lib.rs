//! Core types: symptom records, sheet rows, tracing setup

pub mod record;
pub mod tracing;

pub use record::{
    Category, RecordError, SymptomCounts, SymptomRecord, header_row, parse_count,
    parse_count_assignment,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from the operating
//! system. Implementations live in adapters (e.g., pidlock-runtime) so the
//! lock logic can be tested against a fake process table.

pub mod process_table;

pub use process_table::{ProcessTable, ProcessTableError, ProcessTableResult, QueryFailure};

//! Request chunking and paced execution.
//!
//! - `chunk` - splitting of key lists and date ranges into provider-sized batches
//! - `executor` - strictly sequential batch execution with inter-batch delay

mod chunk;
mod executor;

pub use chunk::{chunk_date_range, chunk_keys, DateRange};
pub use executor::{run_sequential, BatchOutcome, BatchPolicy};

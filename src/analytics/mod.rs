//! Descriptive analytics over a loaded table
//!
//! Every function here is a pure read of the frame it is given; nothing
//! mutates the table or touches trainer state.

mod correlation;
mod distribution;
mod scatter;
mod summary;

pub use correlation::{correlation, CorrelationMatrix};
pub use distribution::{histogram, target_distribution, Histogram};
pub use scatter::{scatter, ScatterData, ScatterPoint};
pub use summary::{column_summaries, overview, ColumnSummary, Overview};

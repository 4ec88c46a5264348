//! Data models for metricwatch

mod metric;
mod notification;
mod status;

pub use metric::*;
pub use notification::*;
pub use status::*;

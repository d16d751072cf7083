mod log_detail;
mod log_event;

pub use log_detail::LogDetail;
pub use log_event::{record_counts_to_details, DetailSource, LogEvent, NewLogEvent};

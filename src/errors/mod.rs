pub mod types;
pub mod classification;
pub mod retry;

pub use types::StingrayError;
pub use classification::ErrorClassification;
pub use retry::{RetryPolicy, with_read_retry};

pub mod cli;
pub mod config;
pub mod distribution;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod reporting;
pub mod transport;

pub use errors::StingrayError;

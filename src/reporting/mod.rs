pub mod formatter;
pub mod writer;

pub use formatter::{format_run_summary, format_summary_table};
pub use writer::{
    aggregated_report_name, pdf_report_name, separate_report_name, write_json_report, write_pdf_report,
};

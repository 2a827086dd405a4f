use std::path::PathBuf;

use crate::cli::commands::ValidateArgs;
use crate::config;
use crate::errors::StingrayError;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), StingrayError> {
    let path = PathBuf::from(&args.config);
    let config = config::parse_config(&path).await?;
    let testcases = config
        .scan
        .as_ref()
        .and_then(|s| s.testcases.as_ref())
        .map_or(0, Vec::len);
    println!("Configuration is valid: {} ({} test cases)", args.config, testcases);
    Ok(())
}

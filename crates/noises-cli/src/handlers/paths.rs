//! Paths command handler.
//!
//! Prints every resolved location in `key = value` form.

use noises_core::ResolvedPaths;

use crate::error::CliError;

pub fn execute() -> Result<(), CliError> {
    let paths = ResolvedPaths::resolve()?;
    println!("{paths}");
    Ok(())
}

#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::Path;

use crate::client::CliError;

/// Collect keys from the command line followed by those listed in `file`.
pub fn collect_keys(inline: Vec<String>, file: Option<&Path>) -> Result<Vec<String>, CliError> {
    let mut keys = inline;
    if let Some(path) = file {
        let data = fs::read_to_string(path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        keys.extend(parse_key_list(&data));
    }
    Ok(keys)
}

fn parse_key_list(data: &str) -> impl Iterator<Item = String> + '_ {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

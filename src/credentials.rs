use crate::core::errors::ClientError;
use std::path::Path;

/// Split a credential file into tokens: one per non-blank line, trimmed,
/// in file order. Line rank + 1 becomes the account index.
pub fn parse(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Read the newline-delimited credential file.
pub async fn load(path: &Path) -> Result<Vec<String>, ClientError> {
    let data = tokio::fs::read_to_string(path).await?;
    Ok(parse(&data))
}

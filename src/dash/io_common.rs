use std::path::Path;

use crate::dash::*;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn read_input_bytes(path: &str) -> DashResult<Vec<u8>> {
    let content = fs::read(path).context(OpeningInputSnafu { path })?;
    info!(
        "read_input_bytes: {} bytes from {}",
        content.len(),
        simplify_file_name(path)
    );
    Ok(content)
}

/// Spreadsheet programs like to start their CSV exports with a byte order mark.
pub fn strip_bom(content: &[u8]) -> &[u8] {
    content.strip_prefix(UTF8_BOM).unwrap_or(content)
}

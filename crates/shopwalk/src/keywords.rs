//! Search keyword input.
//!
//! Keywords come from the first record of a CSV file (no header row), or
//! inline from the config. The shopping flow needs two of them.

use crate::result::{ShopwalkError, ShopwalkResult};
use std::path::Path;

/// The two search terms of a shopping run, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPair {
    /// Typed, then cleared
    pub first: String,
    /// Typed and submitted
    pub second: String,
}

impl KeywordPair {
    /// Take the first two non-empty cells
    pub fn from_cells<S: AsRef<str>>(cells: &[S], origin: &Path) -> ShopwalkResult<Self> {
        let mut words = cells
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty());
        let first = words.next().ok_or_else(|| missing("first keyword", origin))?;
        let second = words.next().ok_or_else(|| missing("second keyword", origin))?;
        Ok(Self {
            first: first.to_string(),
            second: second.to_string(),
        })
    }
}

fn missing(what: &str, path: &Path) -> ShopwalkError {
    ShopwalkError::DataSourceMissing {
        what: what.to_string(),
        path: path.to_path_buf(),
    }
}

/// Cells of the first record of a CSV file
pub fn read_first_row(path: &Path) -> ShopwalkResult<Vec<String>> {
    if !path.is_file() {
        return Err(missing("keyword file", path));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Load the keyword pair from a CSV file
pub fn load_keywords(path: &Path) -> ShopwalkResult<KeywordPair> {
    let row = read_first_row(path)?;
    let pair = KeywordPair::from_cells(&row, path)?;
    tracing::info!(
        path = %path.display(),
        first = %pair.first,
        second = %pair.second,
        "keywords loaded"
    );
    Ok(pair)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_first_row_only() {
        let file = csv_file("şort,gömlek\npantolon,ceket\n");
        let pair = load_keywords(file.path()).unwrap();
        assert_eq!(pair.first, "şort");
        assert_eq!(pair.second, "gömlek");
    }

    #[test]
    fn test_cells_are_trimmed() {
        let file = csv_file(" şort , gömlek ,\n");
        assert_eq!(read_first_row(file.path()).unwrap(), vec!["şort", "gömlek", ""]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_keywords(Path::new("/nonexistent/keywords.csv")).unwrap_err();
        assert!(matches!(err, ShopwalkError::DataSourceMissing { .. }));
        assert!(err.to_string().contains("keyword file"));
    }

    #[test]
    fn test_single_keyword_is_not_enough() {
        let file = csv_file("şort\n");
        let err = load_keywords(file.path()).unwrap_err();
        assert!(err.to_string().contains("second keyword"));
    }

    #[test]
    fn test_empty_file() {
        let file = csv_file("");
        let err = load_keywords(file.path()).unwrap_err();
        assert!(err.to_string().contains("first keyword"));
    }

    #[test]
    fn test_from_inline_cells_skips_blanks() {
        let pair =
            KeywordPair::from_cells(&["", "şort", " ", "gömlek"], Path::new("config")).unwrap();
        assert_eq!(pair.first, "şort");
        assert_eq!(pair.second, "gömlek");
    }
}

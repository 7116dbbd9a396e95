pub use crate::config::*;

use log::debug;

/// A builder for assembling a validated record table row by row.
///
/// The readers only need to provide the header and then the raw cells of each line.
///
/// ```
/// pub use cultures_map::builder::Builder;
/// # use cultures_map::MapErrors;
///
/// let mut builder = Builder::new(&["CODE_POSTAL".to_string(), "TYPO_CULTURE".to_string()])?;
///
/// builder.add_row(&["1000".to_string(), "Vigne".to_string()]);
/// builder.add_row(&["".to_string(), "Vigne".to_string()]);
///
/// let table = builder.build("digest".to_string());
/// assert_eq!(table.records[0].postal_code, "01000");
/// assert_eq!(table.dropped_rows, 1);
///
/// # Ok::<(), MapErrors>(())
/// ```
pub struct Builder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _postal_code_idx: usize,
    pub(crate) _culture_idx: usize,
    pub(crate) _email_idx: Option<usize>,
    pub(crate) _organization_idx: Option<usize>,
    pub(crate) _department_idx: Option<usize>,
    pub(crate) _records: Vec<Record>,
    pub(crate) _dropped: usize,
    pub(crate) _malformed: usize,
}

impl Builder {
    /// Fails with the list of all the missing required columns.
    pub fn new(columns: &[String]) -> Result<Builder, MapErrors> {
        let find = |name: &str| columns.iter().position(|c| c == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| find(c).is_none())
            .map(|c| c.to_string())
            .collect();
        match (find(POSTAL_CODE_COLUMN), find(CULTURE_COLUMN)) {
            (Some(postal_code_idx), Some(culture_idx)) => Ok(Builder {
                _columns: columns.to_vec(),
                _postal_code_idx: postal_code_idx,
                _culture_idx: culture_idx,
                _email_idx: find(EMAIL_COLUMN),
                _organization_idx: find(ORGANIZATION_COLUMN),
                _department_idx: find(DEPARTMENT_COLUMN),
                _records: Vec::new(),
                _dropped: 0,
                _malformed: 0,
            }),
            _ => Err(MapErrors::MissingColumns(missing)),
        }
    }

    /// Adds one line of the input. Missing trailing cells are treated as empty.
    ///
    /// Returns false if the row was dropped because a required field is empty.
    pub fn add_row(&mut self, cells: &[String]) -> bool {
        let cell = |idx: usize| -> Option<String> {
            cells
                .get(idx)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };
        let optional = |idx: Option<usize>| idx.and_then(cell);

        match (cell(self._postal_code_idx), cell(self._culture_idx)) {
            (Some(postal_code), Some(culture)) => {
                self._records.push(Record {
                    postal_code: normalize_postal_code(&postal_code),
                    culture,
                    email: optional(self._email_idx),
                    organization: optional(self._organization_idx),
                    department: optional(self._department_idx),
                });
                true
            }
            _ => {
                debug!("add_row: dropping row {:?}", cells);
                self._dropped += 1;
                false
            }
        }
    }

    /// Records a line that the reader could not decode.
    pub fn add_malformed(&mut self) {
        self._malformed += 1;
    }

    pub fn build(self, digest: String) -> RecordTable {
        RecordTable {
            columns: self._columns,
            records: self._records,
            dropped_rows: self._dropped,
            malformed_lines: self._malformed,
            digest,
        }
    }
}

/// Left-pads a postal code with zeros up to 5 characters.
///
/// Longer codes are returned unchanged.
pub fn normalize_postal_code(code: &str) -> String {
    format!("{:0>5}", code.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pads_short_postal_codes() {
        for code in ["1", "75", "690", "1000", "75001"] {
            let normalized = normalize_postal_code(code);
            assert_eq!(normalized.len(), 5, "{}", code);
            assert!(normalized.ends_with(code));
        }
        assert_eq!(normalize_postal_code(" 1000 "), "01000");
        assert_eq!(normalize_postal_code("123456"), "123456");
    }

    #[test]
    fn missing_culture_column() {
        let res = Builder::new(&strings(&["CODE_POSTAL", "EMAIL"]));
        assert_eq!(
            res.err(),
            Some(MapErrors::MissingColumns(strings(&["TYPO_CULTURE"])))
        );
    }

    #[test]
    fn missing_both_columns() {
        let res = Builder::new(&strings(&["code_postal", "typo_culture"]));
        assert_eq!(
            res.err(),
            Some(MapErrors::MissingColumns(strings(&[
                "CODE_POSTAL",
                "TYPO_CULTURE"
            ])))
        );
    }

    #[test]
    fn reads_optional_columns() {
        let mut builder = Builder::new(&strings(&[
            "EMAIL",
            "TYPO_CULTURE",
            "DEPARTEMENT",
            "CODE_POSTAL",
        ]))
        .unwrap();
        assert!(builder.add_row(&strings(&["a@b.fr", "Vigne", "Gironde", "33000"])));
        assert!(builder.add_row(&strings(&["", "Maraichage", "", "6000"])));
        assert!(!builder.add_row(&strings(&["x@y.fr", "  ", "Paris", "75001"])));
        assert!(!builder.add_row(&strings(&["x@y.fr", "Vigne"])));
        builder.add_malformed();
        let table = builder.build("abc".to_string());

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.dropped_rows, 2);
        assert_eq!(table.malformed_lines, 1);
        assert_eq!(table.records[0].department, Some("Gironde".to_string()));
        assert_eq!(table.records[1].postal_code, "06000");
        assert_eq!(table.records[1].email, None);
        assert_eq!(table.records[1].organization, None);
    }
}

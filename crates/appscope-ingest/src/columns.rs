use std::collections::HashMap;

use csv::{ByteRecord, StringRecord};

use crate::error::IngestError;

/// Header index keyed by canonical column name.
///
/// Headers are compared after trimming a byte-order mark, lowercasing and
/// mapping spaces and dashes to underscores, then resolved through `aliases`.
pub(crate) struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    pub(crate) fn from_headers(
        headers: &StringRecord,
        aliases: &[(&str, &str)],
        required: &[&str],
        context: &str,
    ) -> Result<Self, IngestError> {
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::EmptyFile {
                context: context.to_string(),
            });
        }

        let mut index = HashMap::new();
        for (position, raw) in headers.iter().enumerate() {
            let key = canonical_header(raw);
            let key = aliases
                .iter()
                .find(|(alias, _)| *alias == key)
                .map_or(key.clone(), |(_, canonical)| (*canonical).to_string());
            index.entry(key).or_insert(position);
        }

        for column in required {
            if !index.contains_key(*column) {
                return Err(IngestError::MissingColumn {
                    context: context.to_string(),
                    column: (*column).to_string(),
                });
            }
        }

        Ok(Self { index })
    }

    pub(crate) fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// The cell for `column`, or `""` when the column or cell is absent.
    pub(crate) fn get<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    }
}

/// Decodes a raw row, replacing invalid UTF-8 with U+FFFD.
///
/// The flag is `true` when any field needed replacing.
pub(crate) fn decode_lossy(row: &ByteRecord) -> (StringRecord, bool) {
    let mut lossy = false;
    let fields: Vec<String> = row
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(text) => text.to_string(),
            Err(_) => {
                lossy = true;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect();
    (StringRecord::from(fields), lossy)
}

fn canonical_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_store_headers() {
        assert_eq!(canonical_header("\u{feff}Content Rating"), "content_rating");
        assert_eq!(canonical_header(" Last Updated "), "last_updated");
    }

    #[test]
    fn resolves_aliases_and_reads_cells() {
        let headers = StringRecord::from(vec!["App", "Category"]);
        let columns =
            Columns::from_headers(&headers, &[("app", "name")], &["name", "category"], "test")
                .unwrap();
        let row = StringRecord::from(vec!["Maps", "TOOLS"]);
        assert_eq!(columns.get(&row, "name"), "Maps");
        assert_eq!(columns.get(&row, "rating"), "");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let row = ByteRecord::from(vec![&b"Caf\xe9"[..], &b"TOOLS"[..]]);
        let (decoded, lossy) = decode_lossy(&row);
        assert!(lossy);
        assert_eq!(&decoded[0], "Caf\u{fffd}");
        assert_eq!(&decoded[1], "TOOLS");

        let (_, lossy) = decode_lossy(&ByteRecord::from(vec!["Maps", "TOOLS"]));
        assert!(!lossy);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let headers = StringRecord::from(vec!["name"]);
        let err = Columns::from_headers(&headers, &[], &["name", "category"], "apps.csv")
            .err()
            .unwrap();
        assert!(
            matches!(err, IngestError::MissingColumn { ref column, .. } if column == "category")
        );
    }
}

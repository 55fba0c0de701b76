//! Upstream masterlist document schema and structural validation.
//!
//! Grounded on spec §6's schema table. Unknown keys are tolerated by
//! `serde`'s default `#[serde(default)]` fields on `MasterlistEntry`
//! (`#[serde(deny_unknown_fields)]` is deliberately not used).

use serde::{Deserialize, Serialize};

use crate::model::MasterlistEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterlistDocument {
    #[serde(default)]
    pub entries: Vec<MasterlistEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("masterlist document is not valid YAML: {0}")]
    Parse(String),
    #[error("entry at index {index} is missing a required field: {field}")]
    MissingField { index: usize, field: &'static str },
}

/// Parses and validates an upstream document. A document that fails
/// validation is rejected whole (spec §6): no partial entries are kept.
pub fn parse_and_validate(text: &str) -> Result<MasterlistDocument, SchemaError> {
    let doc: MasterlistDocument =
        serde_yaml::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;

    for (index, entry) in doc.entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(SchemaError::MissingField { index, field: "name" });
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_valid_document() {
        let yaml = r#"
entries:
  - name: SkyUI.esp
    requires: ["SKSE.esp"]
"#;
        let doc = parse_and_validate(yaml).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].name, "SkyUI.esp");
    }

    #[test]
    fn rejects_entry_missing_name() {
        let yaml = r#"
entries:
  - tags: ["texture"]
"#;
        assert!(parse_and_validate(yaml).is_err());
    }

    #[test]
    fn tolerates_unknown_keys() {
        let yaml = r#"
entries:
  - name: Foo.esp
    some_future_field: true
"#;
        let doc = parse_and_validate(yaml).unwrap();
        assert_eq!(doc.entries.len(), 1);
    }
}

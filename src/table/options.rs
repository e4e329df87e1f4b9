use std::path::Path;

use serde::{Deserialize, Serialize};

/// Knobs for how a `RecordTable` writes itself back out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableOptions {
    /// Write the new contents to `<name>.tmp` and rename it over the backing
    /// file, instead of truncating and rewriting the backing file in place.
    pub atomic_flush: bool,
    /// Sync the rewritten file in place. Ignored with `atomic_flush`, which
    /// always syncs the tmp file before renaming it.
    pub sync_on_flush: bool,
    /// Flush when the table is dropped without an explicit `flush`.
    pub flush_on_drop: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            atomic_flush: false,
            sync_on_flush: true,
            flush_on_drop: true,
        }
    }
}

impl TableOptions {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads options from a JSON file, falling back to the defaults when the
    /// file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Self::from_json(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TableOptions;

    #[test]
    fn test_partial_json() {
        let opts = TableOptions::from_json(r#"{"atomic_flush": true}"#).unwrap();
        assert_eq!(
            opts,
            TableOptions {
                atomic_flush: true,
                ..TableOptions::default()
            }
        );
        assert_eq!(TableOptions::from_json("{}").unwrap(), TableOptions::default());
        assert!(TableOptions::from_json(r#"{"atomic": true}"#).is_err());
    }

    #[test]
    fn test_load() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("options.json");
        assert_eq!(TableOptions::load(&path)?, TableOptions::default());

        let custom = TableOptions {
            atomic_flush: true,
            sync_on_flush: false,
            flush_on_drop: false,
        };
        std::fs::write(&path, serde_json::to_string(&custom)?)?;
        assert_eq!(TableOptions::load(&path)?, custom);
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::fs;

use crate::core::moderation::{KeywordLoadError, KeywordSet, KeywordStore};

/// Accepted shapes of the keyword file.
///
/// ```yaml
/// keywords:
///   - casino
///   - free money
/// ```
///
/// A bare top-level list of strings works too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordFile {
    Mapping { keywords: Vec<String> },
    List(Vec<String>),
}

/// Keyword list read from a YAML file on disk.
pub struct YamlKeywordStore {
    path: PathBuf,
}

impl YamlKeywordStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse(&self, text: &str) -> Result<KeywordSet, KeywordLoadError> {
        let file: KeywordFile =
            serde_yaml::from_str(text).map_err(|e| KeywordLoadError::Parse {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let keywords = match file {
            KeywordFile::Mapping { keywords } => keywords,
            KeywordFile::List(keywords) => keywords,
        };

        KeywordSet::new(keywords)
    }
}

#[async_trait]
impl KeywordStore for YamlKeywordStore {
    async fn load_keywords(&self) -> Result<KeywordSet, KeywordLoadError> {
        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| KeywordLoadError::Io {
                path: self.path.display().to_string(),
                source: e,
            })?;

        let keywords = self.parse(&text)?;
        tracing::info!(
            path = %self.path.display(),
            count = keywords.len(),
            "Loaded keywords"
        );
        Ok(keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_mapping_file_keeps_order() {
        let file = write_file("keywords:\n  - Casino\n  - free money\n  - casino\n");
        let store = YamlKeywordStore::new(file.path());

        let keywords = store.load_keywords().await.unwrap();

        assert_eq!(
            keywords.iter().collect::<Vec<_>>(),
            vec!["casino", "free money"]
        );
    }

    #[tokio::test]
    async fn test_load_bare_list() {
        let file = write_file("- spam\n- SCAM\n");
        let store = YamlKeywordStore::new(file.path());

        let keywords = store.load_keywords().await.unwrap();

        assert_eq!(keywords.iter().collect::<Vec<_>>(), vec!["spam", "scam"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = YamlKeywordStore::new(dir.path().join("nope.yaml"));

        let err = store.load_keywords().await.unwrap_err();

        assert!(matches!(err, KeywordLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_parse_error() {
        let file = write_file("keywords: 12\n");
        let store = YamlKeywordStore::new(file.path());

        let err = store.load_keywords().await.unwrap_err();

        assert!(matches!(err, KeywordLoadError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_empty_list_is_rejected() {
        let file = write_file("keywords: []\n");
        let store = YamlKeywordStore::new(file.path());

        let err = store.load_keywords().await.unwrap_err();

        assert!(matches!(err, KeywordLoadError::Empty));
    }
}

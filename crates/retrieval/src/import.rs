use std::path::{Path, PathBuf};

use crate::{Metadata, RetrievalEngine, RetrievalError};

/// The outcome of importing one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportEntry {
    /// The file was stored as a document.
    Loaded {
        /// Document id, taken from the file stem.
        id: String,
        /// Path of the imported file.
        file: PathBuf,
        /// Number of chunks stored.
        chunks: usize,
    },
    /// The file could not be read or embedded.
    Skipped {
        /// Path of the skipped file.
        file: PathBuf,
        /// Why the file was skipped.
        reason: String,
    },
}

/// The per-file results of a directory import.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// One entry per `.md` file, ordered by path.
    pub entries: Vec<ImportEntry>,
}

impl ImportReport {
    /// Returns the number of files that were stored.
    pub fn loaded(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, ImportEntry::Loaded { .. }))
            .count()
    }

    /// Returns the number of files that failed.
    pub fn skipped(&self) -> usize {
        self.entries.len() - self.loaded()
    }
}

impl RetrievalEngine {
    /// Imports every `.md` file directly under `dir`.
    ///
    /// The file stem becomes the document id. Subdirectories are not
    /// visited. A file that fails is reported as skipped and does not
    /// stop the import, only an unreadable `dir` is an error.
    pub async fn load_documents_from_dir(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<ImportReport, RetrievalError> {
        let dir = dir.as_ref();
        let io_error = |source| RetrievalError::Io {
            path: dir.to_owned(),
            source,
        };

        let mut files = vec![];
        let mut read_dir = tokio::fs::read_dir(dir).await.map_err(io_error)?;
        while let Some(entry) = read_dir.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|ty| ty.is_file())
                .unwrap_or(false);
            if is_file && path.extension().is_some_and(|ext| ext == "md") {
                files.push(path);
            }
        }
        files.sort();

        let mut report = ImportReport::default();
        for file in files {
            let entry = self.import_file(file).await;
            if let ImportEntry::Skipped { file, reason } = &entry {
                warn!("skipped {}: {reason}", file.display());
            }
            report.entries.push(entry);
        }
        info!(
            dir = %dir.display(),
            loaded = report.loaded(),
            skipped = report.skipped(),
            "documents imported"
        );
        Ok(report)
    }

    async fn import_file(&self, file: PathBuf) -> ImportEntry {
        let id = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = match tokio::fs::read_to_string(&file).await {
            Ok(content) => content,
            Err(err) => {
                return ImportEntry::Skipped {
                    file,
                    reason: err.to_string(),
                };
            }
        };

        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = Metadata::from([
            ("source".to_owned(), file.display().to_string()),
            ("file".to_owned(), file_name),
        ]);
        match self.add_document(&id, &content, metadata).await {
            Ok(chunks) => ImportEntry::Loaded { id, file, chunks },
            Err(err) => ImportEntry::Skipped {
                file,
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use relay_agent_test_model::TestEmbeddingProvider;

    use super::*;

    #[tokio::test]
    async fn test_load_documents_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("intro.md"), "# Intro\nHello.").unwrap();
        fs::write(dir.path().join("broken.md"), "contains FAIL").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("README.MD"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let engine = RetrievalEngine::new(
            Arc::new(TestEmbeddingProvider::default().fail_on("FAIL")),
            Default::default(),
        );
        let report = engine.load_documents_from_dir(dir.path()).await.unwrap();

        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.loaded(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            &report.entries[0],
            ImportEntry::Skipped { file, .. } if file.ends_with("broken.md")
        ));
        assert_eq!(
            report.entries[1],
            ImportEntry::Loaded {
                id: "intro".to_owned(),
                file: dir.path().join("intro.md"),
                chunks: 1,
            }
        );

        let results = engine.search("Hello", 1).await.unwrap();
        let chunk = &results[0].chunk;
        assert_eq!(chunk.id, "intro_chunk_0");
        assert_eq!(chunk.metadata["file"], "intro.md");
        assert!(chunk.metadata["source"].ends_with("intro.md"));
    }

    #[tokio::test]
    async fn test_missing_dir() {
        let engine = RetrievalEngine::new(
            Arc::new(TestEmbeddingProvider::default()),
            Default::default(),
        );
        let err = engine
            .load_documents_from_dir("/definitely/not/here")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Io { .. }));
    }
}

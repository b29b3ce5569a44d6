//! Content catalog import
//!
//! Stories are authored as JSON catalog files:
//!
//! ```json
//! {
//!   "stories":  [{ "story_id": "1", "title": "...", "level_jlpt": "N5", "root_chapter_id": "ch-1-1" }],
//!   "chapters": [{ "chapter_id": "ch-1-1", "story_id": "1", "chapter_number": 1, "content": "...",
//!                  "choices": [{ "choice_id": "choice-1-1-a", "choice_text": "...", "next_chapter_id": "ch-1-2a" }] }],
//!   "quizzes":  [{ "quiz_id": "quiz-1-1", "story_id": "1", "question_text": "...", "difficulty_level": "N5",
//!                  "choices": [{ "choice_id": "a", "choice_text": "...", "is_correct": true }] }]
//! }
//! ```
//!
//! Each file is identified by the SHA-256 of its bytes. A file whose hash is
//! already recorded in `catalog_imports` is skipped, so re-running an import
//! over the same directory is cheap.

use crate::db::{CatalogImport, Database};
use crate::error::{Error, Result};
use crate::types::{Chapter, Quiz, Story};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parsed catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

impl Catalog {
    /// Read and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes, path)
    }

    /// Parse catalog bytes; `path` is only used in error messages.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_slice(bytes).map_err(|e| Error::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        catalog.normalize();
        catalog.validate(path)?;
        Ok(catalog)
    }

    /// Hex SHA-256 of the raw file bytes.
    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Nested choices inherit their owning chapter's id.
    fn normalize(&mut self) {
        for chapter in &mut self.chapters {
            for choice in &mut chapter.choices {
                if choice.chapter_id.is_empty() {
                    choice.chapter_id = chapter.chapter_id.clone();
                }
            }
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let fail = |message: String| Error::Catalog {
            path: path.to_path_buf(),
            message,
        };

        let story_ids: HashSet<&str> = self.stories.iter().map(|s| s.story_id.as_str()).collect();
        if story_ids.len() != self.stories.len() {
            return Err(fail("duplicate story_id".to_string()));
        }

        // choice ids are unique across the whole choices table
        let mut chapter_ids = HashSet::new();
        let mut choice_ids = HashSet::new();
        for chapter in &self.chapters {
            if !chapter_ids.insert(chapter.chapter_id.as_str()) {
                return Err(fail(format!("duplicate chapter_id {}", chapter.chapter_id)));
            }
            if !story_ids.contains(chapter.story_id.as_str()) {
                return Err(fail(format!(
                    "chapter {} belongs to unknown story {}",
                    chapter.chapter_id, chapter.story_id
                )));
            }
            for choice in &chapter.choices {
                if !choice_ids.insert(choice.choice_id.as_str()) {
                    return Err(fail(format!(
                        "duplicate choice_id {} in chapter {}",
                        choice.choice_id, chapter.chapter_id
                    )));
                }
            }
        }

        let mut quiz_ids = HashSet::new();
        for quiz in &self.quizzes {
            if !quiz_ids.insert(quiz.quiz_id.as_str()) {
                return Err(fail(format!("duplicate quiz_id {}", quiz.quiz_id)));
            }
            if !story_ids.contains(quiz.story_id.as_str()) {
                return Err(fail(format!(
                    "quiz {} belongs to unknown story {}",
                    quiz.quiz_id, quiz.story_id
                )));
            }
            if quiz.choices.is_empty() {
                return Err(fail(format!("quiz {} has no choices", quiz.quiz_id)));
            }
            let mut answer_ids = HashSet::new();
            for choice in &quiz.choices {
                if !answer_ids.insert(choice.choice_id.as_str()) {
                    return Err(fail(format!(
                        "duplicate choice_id {} in quiz {}",
                        choice.choice_id, quiz.quiz_id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Totals for one [`CatalogImporter::import_dir`] run.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// Files whose content was written
    pub files_imported: usize,
    /// Files already imported with identical content
    pub files_skipped: usize,
    pub stories: usize,
    pub chapters: usize,
    pub quizzes: usize,
    /// Errors encountered (file path → error message)
    pub errors: Vec<(PathBuf, String)>,
}

/// Outcome for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileImport {
    Imported {
        stories: usize,
        chapters: usize,
        quizzes: usize,
    },
    /// Hash already recorded
    AlreadyImported { content_hash: String },
}

/// Loads catalog files into the database.
pub struct CatalogImporter<'a> {
    db: &'a Database,
}

impl<'a> CatalogImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Every `*.json` file directly inside `dir`, sorted by path.
    pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::Catalog {
                path: dir.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let pattern = dir.join("*.json");
        let entries = glob::glob(&pattern.to_string_lossy()).map_err(|e| Error::Catalog {
            path: dir.to_path_buf(),
            message: format!("invalid glob pattern: {}", e),
        })?;

        let mut files: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
        files.sort();
        Ok(files)
    }

    /// Import every catalog file in `dir`. A bad file is recorded in
    /// [`ImportResult::errors`] and does not stop the others.
    pub fn import_dir(&self, dir: &Path) -> Result<ImportResult> {
        let files = Self::discover_files(dir)?;
        tracing::info!(dir = %dir.display(), count = files.len(), "Discovered catalog files");

        let mut result = ImportResult::default();
        for path in files {
            match self.import_file(&path) {
                Ok(FileImport::Imported {
                    stories,
                    chapters,
                    quizzes,
                }) => {
                    result.files_imported += 1;
                    result.stories += stories;
                    result.chapters += chapters;
                    result.quizzes += quizzes;
                }
                Ok(FileImport::AlreadyImported { content_hash }) => {
                    tracing::debug!(
                        path = %path.display(),
                        content_hash = %content_hash,
                        "Catalog file skipped"
                    );
                    result.files_skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Catalog import failed");
                    result.errors.push((path, e.to_string()));
                }
            }
        }

        Ok(result)
    }

    pub fn import_file(&self, path: &Path) -> Result<FileImport> {
        let bytes = std::fs::read(path)?;
        let content_hash = Catalog::content_hash(&bytes);

        if self.db.get_catalog_import(&content_hash)?.is_some() {
            return Ok(FileImport::AlreadyImported { content_hash });
        }

        let catalog = Catalog::from_slice(&bytes, path)?;
        let import = CatalogImport {
            content_hash,
            source_path: path.to_string_lossy().to_string(),
            imported_at: Utc::now(),
            stories: catalog.stories.len() as i64,
            chapters: catalog.chapters.len() as i64,
            quizzes: catalog.quizzes.len() as i64,
        };
        self.db.apply_catalog(&catalog, &import)?;

        tracing::info!(
            path = %path.display(),
            stories = catalog.stories.len(),
            chapters = catalog.chapters.len(),
            quizzes = catalog.quizzes.len(),
            "Catalog file imported"
        );

        Ok(FileImport::Imported {
            stories: catalog.stories.len(),
            chapters: catalog.chapters.len(),
            quizzes: catalog.quizzes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ContentStore;

    const CATALOG: &str = r#"{
        "stories": [{
            "story_id": "1",
            "title": "はじめての駅",
            "level_jlpt": "N5",
            "level_cefr": "A1",
            "root_chapter_id": "ch-1-1"
        }],
        "chapters": [
            {
                "chapter_id": "ch-1-1",
                "story_id": "1",
                "chapter_number": 1,
                "content": "えきにいます。",
                "choices": [
                    { "choice_id": "choice-1-1-a", "choice_text": "きっぷをかう", "next_chapter_id": "ch-1-5", "display_order": 1 }
                ]
            },
            { "chapter_id": "ch-1-5", "story_id": "1", "chapter_number": 5, "content": "おわり。" }
        ],
        "quizzes": [{
            "quiz_id": "quiz-1-1",
            "story_id": "1",
            "question_text": "どこにいますか。",
            "difficulty_level": "N5",
            "choices": [
                { "choice_id": "a", "choice_text": "えき", "is_correct": true },
                { "choice_id": "b", "choice_text": "いえ", "is_correct": false }
            ]
        }]
    }"#;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_parse_fills_choice_source() {
        let catalog = Catalog::from_slice(CATALOG.as_bytes(), Path::new("t.json")).unwrap();
        assert_eq!(catalog.stories.len(), 1);
        assert_eq!(catalog.chapters[0].choices[0].chapter_id, "ch-1-1");
        assert!(catalog.chapters[1].choices.is_empty());
    }

    #[test]
    fn test_rejects_unknown_level() {
        let bad = CATALOG.replace("\"level_jlpt\": \"N5\"", "\"level_jlpt\": \"N6\"");
        let err = Catalog::from_slice(bad.as_bytes(), Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, Error::Catalog { .. }));
    }

    #[test]
    fn test_rejects_orphan_chapter() {
        let bad = CATALOG.replace("\"story_id\": \"1\", \"chapter_number\": 5", "\"story_id\": \"2\", \"chapter_number\": 5");
        assert!(Catalog::from_slice(bad.as_bytes(), Path::new("bad.json")).is_err());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = Catalog::content_hash(b"abc");
        assert_eq!(
            a,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(a, Catalog::content_hash(b"abd"));
    }

    #[test]
    fn test_import_dir_skips_known_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("story-1.json"), CATALOG).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let db = test_db();
        let importer = CatalogImporter::new(&db);

        let first = importer.import_dir(dir.path()).unwrap();
        assert_eq!(first.files_imported, 1);
        assert_eq!(first.stories, 1);
        assert_eq!(first.chapters, 2);
        assert_eq!(first.quizzes, 1);
        assert_eq!(first.errors.len(), 1);

        let second = importer.import_dir(dir.path()).unwrap();
        assert_eq!(second.files_imported, 0);
        assert_eq!(second.files_skipped, 1);

        let chapter = db.get_chapter("ch-1-1").unwrap().unwrap();
        assert_eq!(chapter.choices[0].next_chapter_id, "ch-1-5");
    }

    #[test]
    fn test_rejects_choice_id_reused_across_chapters() {
        let bad = CATALOG.replace(
            r#""content": "おわり。" }"#,
            r#""content": "おわり。",
                "choices": [{ "choice_id": "choice-1-1-a", "choice_text": "もどる", "next_chapter_id": "ch-1-1" }] }"#,
        );
        let err = Catalog::from_slice(bad.as_bytes(), Path::new("bad.json")).unwrap_err();
        assert!(err.to_string().contains("duplicate choice_id choice-1-1-a"), "{}", err);
    }

    #[test]
    fn test_rejects_duplicate_quizzes_and_answers() {
        let mut catalog = Catalog::from_slice(CATALOG.as_bytes(), Path::new("t.json")).unwrap();
        let quiz = catalog.quizzes[0].clone();
        catalog.quizzes.push(quiz);
        let err = catalog.validate(Path::new("t.json")).unwrap_err();
        assert!(err.to_string().contains("duplicate quiz_id quiz-1-1"), "{}", err);

        let bad = CATALOG.replace(r#""choice_id": "b""#, r#""choice_id": "a""#);
        let err = Catalog::from_slice(bad.as_bytes(), Path::new("bad.json")).unwrap_err();
        assert!(err.to_string().contains("duplicate choice_id a in quiz quiz-1-1"), "{}", err);
    }

    #[test]
    fn test_failed_file_writes_nothing() {
        let earlier = r#"{
            "stories": [{ "story_id": "9", "title": "先の話", "level_jlpt": "N1", "root_chapter_id": "ch-9-1" }],
            "chapters": [{
                "chapter_id": "ch-9-1", "story_id": "9", "chapter_number": 1, "content": "はじめ。",
                "choices": [{ "choice_id": "shared", "choice_text": "つぎへ", "next_chapter_id": "ch-9-5" }]
            }]
        }"#;
        // valid on its own, but its choice id is already taken in the database
        let clashing = CATALOG.replace("choice-1-1-a", "shared");

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), earlier).unwrap();
        std::fs::write(dir.path().join("b.json"), &clashing).unwrap();

        let db = test_db();
        let result = CatalogImporter::new(&db).import_dir(dir.path()).unwrap();
        assert_eq!(result.files_imported, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].0.ends_with("b.json"));

        assert!(db.get_story("9").unwrap().is_some());
        assert!(db.get_story("1").unwrap().is_none());
        assert!(db.get_chapter("ch-1-1").unwrap().is_none());
        assert!(db.get_chapter("ch-1-5").unwrap().is_none());
        assert!(db.get_quiz("quiz-1-1").unwrap().is_none());
        assert!(db
            .get_catalog_import(&Catalog::content_hash(clashing.as_bytes()))
            .unwrap()
            .is_none());

        let shared = db.get_chapter("ch-9-1").unwrap().unwrap();
        assert_eq!(shared.choices[0].choice_id, "shared");
    }

    #[test]
    fn test_import_missing_dir() {
        let db = test_db();
        let importer = CatalogImporter::new(&db);
        assert!(importer
            .import_dir(Path::new("/definitely/not/here"))
            .is_err());
    }
}

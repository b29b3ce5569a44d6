//! Database repository layer
//!
//! Provides query and insert operations for all entity types, and
//! implements the [`crate::store`] traits on top of SQLite.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::store::{AttemptStore, CompletionStore, ContentStore};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A catalog file that has already been imported.
#[derive(Debug, Clone)]
pub struct CatalogImport {
    /// SHA-256 of the file contents
    pub content_hash: String,
    pub source_path: String,
    pub imported_at: DateTime<Utc>,
    pub stories: i64,
    pub chapters: i64,
    pub quizzes: i64,
}

/// Row counts for status output.
#[derive(Debug, Clone, Default)]
pub struct ContentCounts {
    pub stories: i64,
    pub chapters: i64,
    pub quizzes: i64,
    pub attempts: i64,
    pub completions: i64,
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================
    // Content writes
    // ============================================

    /// Insert or update a story
    pub fn upsert_story(&self, story: &Story) -> Result<()> {
        let conn = self.connection();
        write_story(&conn, story)
    }

    /// Insert or update a chapter and replace its outgoing choices
    pub fn upsert_chapter(&self, chapter: &Chapter) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        write_chapter(&tx, chapter)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or update a quiz and replace its answer choices
    pub fn upsert_quiz(&self, quiz: &Quiz) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        write_quiz(&tx, quiz)?;
        tx.commit()?;
        Ok(())
    }

    /// Write a whole catalog file and its import checkpoint in one
    /// transaction. On error nothing from the file is kept.
    pub fn apply_catalog(&self, catalog: &Catalog, import: &CatalogImport) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        for story in &catalog.stories {
            write_story(&tx, story)?;
        }
        for chapter in &catalog.chapters {
            write_chapter(&tx, chapter)?;
        }
        for quiz in &catalog.quizzes {
            write_quiz(&tx, quiz)?;
        }
        write_catalog_import(&tx, import)?;
        tx.commit()?;
        Ok(())
    }

    // ============================================
    // Row mapping
    // ============================================

    fn row_to_story(row: &Row) -> rusqlite::Result<Story> {
        let level_jlpt: String = row.get("level_jlpt")?;
        let level_cefr: Option<String> = row.get("level_cefr")?;

        Ok(Story {
            story_id: row.get("story_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            level_jlpt: parse_column(&level_jlpt, 3)?,
            level_cefr: level_cefr
                .as_deref()
                .map(|c| parse_column(c, 4))
                .transpose()?,
            estimated_minutes: row.get("estimated_minutes")?,
            root_chapter_id: row.get("root_chapter_id")?,
        })
    }

    fn row_to_chapter(row: &Row) -> rusqlite::Result<Chapter> {
        Ok(Chapter {
            chapter_id: row.get("chapter_id")?,
            story_id: row.get("story_id")?,
            parent_chapter_id: row.get("parent_chapter_id")?,
            chapter_number: row.get("chapter_number")?,
            depth_level: row.get("depth_level")?,
            content: row.get("content")?,
            translation: row.get("translation")?,
            choices: Vec::new(),
        })
    }

    fn row_to_choice(row: &Row) -> rusqlite::Result<Choice> {
        Ok(Choice {
            choice_id: row.get("choice_id")?,
            chapter_id: row.get("chapter_id")?,
            choice_text: row.get("choice_text")?,
            next_chapter_id: row.get("next_chapter_id")?,
            display_order: row.get("display_order")?,
        })
    }

    fn row_to_quiz(row: &Row) -> rusqlite::Result<Quiz> {
        let level: String = row.get("difficulty_level")?;
        Ok(Quiz {
            quiz_id: row.get("quiz_id")?,
            story_id: row.get("story_id")?,
            question_text: row.get("question_text")?,
            difficulty_level: parse_column(&level, 3)?,
            choices: Vec::new(),
        })
    }

    fn row_to_attempt(row: &Row) -> rusqlite::Result<QuizAttempt> {
        let answered_at: String = row.get("answered_at")?;
        Ok(QuizAttempt {
            attempt_id: row.get("attempt_id")?,
            quiz_id: row.get("quiz_id")?,
            story_id: row.get("story_id")?,
            user_answer: row.get("user_answer")?,
            is_correct: row.get("is_correct")?,
            answered_at: parse_timestamp(&answered_at, 6)?,
        })
    }

    fn row_to_completion(row: &Row) -> rusqlite::Result<StoryCompletion> {
        let completed_at: String = row.get("completed_at")?;
        let chapters: String = row.get("chapters_completed")?;
        Ok(StoryCompletion {
            story_id: row.get("story_id")?,
            completed_at: parse_timestamp(&completed_at, 1)?,
            completion_percentage: row.get("completion_percentage")?,
            quiz_accuracy: row.get("quiz_accuracy")?,
            chapters_completed: serde_json::from_str(&chapters).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
            })?,
        })
    }

    fn load_choices(conn: &Connection, chapter_id: &str) -> rusqlite::Result<Vec<Choice>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM choices WHERE chapter_id = ? ORDER BY display_order, choice_id",
        )?;
        let rows = stmt.query_map([chapter_id], Self::row_to_choice)?;
        rows.collect()
    }

    fn load_quiz_choices(conn: &Connection, quiz_id: &str) -> rusqlite::Result<Vec<QuizChoice>> {
        let mut stmt =
            conn.prepare("SELECT * FROM quiz_choices WHERE quiz_id = ? ORDER BY position")?;
        let rows = stmt.query_map([quiz_id], |row| {
            Ok(QuizChoice {
                choice_id: row.get("choice_id")?,
                choice_text: row.get("choice_text")?,
                is_correct: row.get("is_correct")?,
                explanation: row.get("explanation")?,
            })
        })?;
        rows.collect()
    }

    // ============================================
    // Catalog import checkpoints
    // ============================================

    /// Get the import record for a catalog content hash
    pub fn get_catalog_import(&self, content_hash: &str) -> Result<Option<CatalogImport>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM catalog_imports WHERE content_hash = ?",
            [content_hash],
            |row| {
                let imported_at: String = row.get("imported_at")?;
                Ok(CatalogImport {
                    content_hash: row.get("content_hash")?,
                    source_path: row.get("source_path")?,
                    imported_at: parse_timestamp(&imported_at, 2)?,
                    stories: row.get("stories")?,
                    chapters: row.get("chapters")?,
                    quizzes: row.get("quizzes")?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Record a finished catalog import
    pub fn record_catalog_import(&self, import: &CatalogImport) -> Result<()> {
        let conn = self.connection();
        write_catalog_import(&conn, import)
    }

    // ============================================
    // Learner snapshot cache
    // ============================================

    /// Cache the most recent learner level
    pub fn save_learner_snapshot(&self, level: &LearnerLevel) -> Result<()> {
        let snapshot = serde_json::to_string(level)?;
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO learner_snapshots (id, computed_at, snapshot)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                computed_at = excluded.computed_at,
                snapshot = excluded.snapshot
            "#,
            params![Utc::now().to_rfc3339(), snapshot],
        )?;
        Ok(())
    }

    /// The cached learner level, if one was saved
    pub fn latest_learner_snapshot(&self) -> Result<Option<LearnerLevel>> {
        let snapshot: Option<String> = {
            let conn = self.connection();
            conn.query_row(
                "SELECT snapshot FROM learner_snapshots WHERE id = 1",
                [],
                |r| r.get(0),
            )
            .optional()?
        };
        snapshot
            .map(|s| serde_json::from_str(&s).map_err(Error::from))
            .transpose()
    }

    // ============================================
    // Stats
    // ============================================

    /// Row counts across content and history tables
    pub fn get_counts(&self) -> Result<ContentCounts> {
        let conn = self.connection();
        let count = |table: &str| -> Result<i64> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n)
        };
        Ok(ContentCounts {
            stories: count("stories")?,
            chapters: count("chapters")?,
            quizzes: count("quizzes")?,
            attempts: count("quiz_attempts")?,
            completions: count("story_completions")?,
        })
    }
}

impl ContentStore for Database {
    fn get_story(&self, story_id: &str) -> Result<Option<Story>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM stories WHERE story_id = ?",
            [story_id],
            Self::row_to_story,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_stories(&self) -> Result<Vec<Story>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT * FROM stories ORDER BY CAST(story_id AS INTEGER), story_id",
        )?;
        let rows = stmt.query_map([], Self::row_to_story)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn get_chapter(&self, chapter_id: &str) -> Result<Option<Chapter>> {
        let conn = self.connection();
        let chapter = conn
            .query_row(
                "SELECT * FROM chapters WHERE chapter_id = ?",
                [chapter_id],
                Self::row_to_chapter,
            )
            .optional()?;

        match chapter {
            Some(mut chapter) => {
                chapter.choices = Self::load_choices(&conn, &chapter.chapter_id)?;
                Ok(Some(chapter))
            }
            None => Ok(None),
        }
    }

    fn list_chapters(&self, story_id: &str) -> Result<Vec<Chapter>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT * FROM chapters WHERE story_id = ? ORDER BY chapter_number, chapter_id",
        )?;
        let chapters = stmt
            .query_map([story_id], Self::row_to_chapter)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        chapters
            .into_iter()
            .map(|mut chapter| {
                chapter.choices = Self::load_choices(&conn, &chapter.chapter_id)?;
                Ok(chapter)
            })
            .collect()
    }

    fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>> {
        let conn = self.connection();
        let quiz = conn
            .query_row(
                "SELECT * FROM quizzes WHERE quiz_id = ?",
                [quiz_id],
                Self::row_to_quiz,
            )
            .optional()?;

        match quiz {
            Some(mut quiz) => {
                quiz.choices = Self::load_quiz_choices(&conn, &quiz.quiz_id)?;
                Ok(Some(quiz))
            }
            None => Ok(None),
        }
    }

    fn list_quizzes(&self, story_id: &str) -> Result<Vec<Quiz>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM quizzes WHERE story_id = ? ORDER BY quiz_id")?;
        let quizzes = stmt
            .query_map([story_id], Self::row_to_quiz)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        quizzes
            .into_iter()
            .map(|mut quiz| {
                quiz.choices = Self::load_quiz_choices(&conn, &quiz.quiz_id)?;
                Ok(quiz)
            })
            .collect()
    }

    fn count_quizzes_by_level(&self) -> Result<BTreeMap<JlptLevel, u32>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT difficulty_level, COUNT(*) FROM quizzes GROUP BY difficulty_level")?;
        let rows = stmt.query_map([], |row| {
            let level: String = row.get(0)?;
            let count: u32 = row.get(1)?;
            Ok((parse_column::<JlptLevel>(&level, 0)?, count))
        })?;
        rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(Error::from)
    }
}

impl AttemptStore for Database {
    fn list_attempts(&self) -> Result<Vec<QuizAttempt>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM quiz_attempts ORDER BY seq")?;
        let rows = stmt.query_map([], Self::row_to_attempt)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn append_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO quiz_attempts (attempt_id, quiz_id, story_id, user_answer, is_correct, answered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                attempt.attempt_id,
                attempt.quiz_id,
                attempt.story_id,
                attempt.user_answer,
                attempt.is_correct,
                attempt.answered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl CompletionStore for Database {
    fn get_completion(&self, story_id: &str) -> Result<Option<StoryCompletion>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM story_completions WHERE story_id = ?",
            [story_id],
            Self::row_to_completion,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_completions(&self) -> Result<Vec<StoryCompletion>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM story_completions ORDER BY completed_at")?;
        let rows = stmt.query_map([], Self::row_to_completion)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    fn record_completion(&self, completion: &StoryCompletion) -> Result<bool> {
        let chapters = serde_json::to_string(&completion.chapters_completed)?;
        let conn = self.connection();
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO story_completions
                (story_id, completed_at, completion_percentage, quiz_accuracy, chapters_completed)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                completion.story_id,
                completion.completed_at.to_rfc3339(),
                completion.completion_percentage,
                completion.quiz_accuracy,
                chapters,
            ],
        )?;
        Ok(inserted > 0)
    }
}

fn write_story(conn: &Connection, story: &Story) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO stories (story_id, title, description, level_jlpt, level_cefr,
                             estimated_minutes, root_chapter_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(story_id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            level_jlpt = excluded.level_jlpt,
            level_cefr = excluded.level_cefr,
            estimated_minutes = excluded.estimated_minutes,
            root_chapter_id = excluded.root_chapter_id
        "#,
        params![
            story.story_id,
            story.title,
            story.description,
            story.level_jlpt.as_str(),
            story.level_cefr.map(|c| c.as_str()),
            story.estimated_minutes,
            story.root_chapter_id,
        ],
    )?;
    Ok(())
}

/// Caller owns the transaction; choices are replaced wholesale.
fn write_chapter(conn: &Connection, chapter: &Chapter) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO chapters (chapter_id, story_id, parent_chapter_id, chapter_number,
                              depth_level, content, translation)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(chapter_id) DO UPDATE SET
            story_id = excluded.story_id,
            parent_chapter_id = excluded.parent_chapter_id,
            chapter_number = excluded.chapter_number,
            depth_level = excluded.depth_level,
            content = excluded.content,
            translation = excluded.translation
        "#,
        params![
            chapter.chapter_id,
            chapter.story_id,
            chapter.parent_chapter_id,
            chapter.chapter_number,
            chapter.depth_level,
            chapter.content,
            chapter.translation,
        ],
    )?;
    conn.execute(
        "DELETE FROM choices WHERE chapter_id = ?",
        [&chapter.chapter_id],
    )?;

    let mut stmt = conn.prepare(
        r#"
        INSERT INTO choices (choice_id, chapter_id, choice_text, next_chapter_id, display_order)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )?;
    for choice in &chapter.choices {
        stmt.execute(params![
            choice.choice_id,
            chapter.chapter_id,
            choice.choice_text,
            choice.next_chapter_id,
            choice.display_order,
        ])?;
    }
    Ok(())
}

/// Caller owns the transaction; answer choices are replaced wholesale.
fn write_quiz(conn: &Connection, quiz: &Quiz) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO quizzes (quiz_id, story_id, question_text, difficulty_level)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(quiz_id) DO UPDATE SET
            story_id = excluded.story_id,
            question_text = excluded.question_text,
            difficulty_level = excluded.difficulty_level
        "#,
        params![
            quiz.quiz_id,
            quiz.story_id,
            quiz.question_text,
            quiz.difficulty_level.as_str(),
        ],
    )?;
    conn.execute("DELETE FROM quiz_choices WHERE quiz_id = ?", [&quiz.quiz_id])?;

    let mut stmt = conn.prepare(
        r#"
        INSERT INTO quiz_choices (choice_id, quiz_id, choice_text, is_correct, explanation, position)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )?;
    for (position, choice) in quiz.choices.iter().enumerate() {
        stmt.execute(params![
            choice.choice_id,
            quiz.quiz_id,
            choice.choice_text,
            choice.is_correct,
            choice.explanation,
            position as i64,
        ])?;
    }
    Ok(())
}

fn write_catalog_import(conn: &Connection, import: &CatalogImport) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO catalog_imports
            (content_hash, source_path, imported_at, stories, chapters, quizzes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            import.content_hash,
            import.source_path,
            import.imported_at.to_rfc3339(),
            import.stories,
            import.chapters,
            import.quizzes,
        ],
    )?;
    Ok(())
}

fn parse_column<T>(value: &str, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(value: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn story() -> Story {
        Story {
            story_id: "1".to_string(),
            title: "駅で".to_string(),
            description: "At the station".to_string(),
            level_jlpt: JlptLevel::N5,
            level_cefr: Some(CefrLevel::A1),
            estimated_minutes: 10,
            root_chapter_id: "ch-1-1".to_string(),
        }
    }

    fn chapter(id: &str, number: u32, choices: Vec<(&str, &str, u32)>) -> Chapter {
        Chapter {
            chapter_id: id.to_string(),
            story_id: "1".to_string(),
            parent_chapter_id: None,
            chapter_number: number,
            depth_level: number - 1,
            content: format!("content of {}", id),
            translation: None,
            choices: choices
                .into_iter()
                .map(|(choice_id, next, order)| Choice {
                    choice_id: choice_id.to_string(),
                    chapter_id: id.to_string(),
                    choice_text: choice_id.to_string(),
                    next_chapter_id: next.to_string(),
                    display_order: order,
                })
                .collect(),
        }
    }

    #[test]
    fn test_story_roundtrip() {
        let db = test_db();
        db.upsert_story(&story()).unwrap();

        let loaded = db.get_story("1").unwrap().unwrap();
        assert_eq!(loaded, story());
        assert!(db.get_story("2").unwrap().is_none());
    }

    #[test]
    fn test_chapter_choices_ordered_by_display_order() {
        let db = test_db();
        db.upsert_story(&story()).unwrap();
        db.upsert_chapter(&chapter(
            "ch-1-1",
            1,
            vec![("choice-b", "ch-1-2b", 2), ("choice-a", "ch-1-2a", 1)],
        ))
        .unwrap();

        let loaded = db.get_chapter("ch-1-1").unwrap().unwrap();
        let ids: Vec<_> = loaded.choices.iter().map(|c| c.choice_id.as_str()).collect();
        assert_eq!(ids, vec!["choice-a", "choice-b"]);
    }

    #[test]
    fn test_upsert_chapter_replaces_choices() {
        let db = test_db();
        db.upsert_story(&story()).unwrap();
        db.upsert_chapter(&chapter("ch-1-1", 1, vec![("choice-a", "ch-1-2a", 1)]))
            .unwrap();
        db.upsert_chapter(&chapter("ch-1-1", 1, vec![])).unwrap();

        let loaded = db.get_chapter("ch-1-1").unwrap().unwrap();
        assert!(loaded.choices.is_empty());
    }

    #[test]
    fn test_completion_write_once() {
        let db = test_db();
        let completion = StoryCompletion {
            story_id: "1".to_string(),
            completed_at: Utc::now(),
            completion_percentage: 100,
            quiz_accuracy: 75,
            chapters_completed: vec!["ch-1-1".to_string(), "ch-1-2a".to_string()],
        };

        assert!(db.record_completion(&completion).unwrap());
        assert!(!db.record_completion(&completion).unwrap());
        assert!(db.is_completed("1").unwrap());

        let loaded = db.get_completion("1").unwrap().unwrap();
        assert_eq!(loaded.chapters_completed.len(), 2);
        assert_eq!(db.list_completions().unwrap().len(), 1);
    }

    #[test]
    fn test_attempts_preserve_order() {
        let db = test_db();
        for (i, correct) in [true, false, true].iter().enumerate() {
            let attempt = QuizAttempt::new(format!("quiz-1-{}", i + 1), None, *correct);
            db.append_attempt(&attempt).unwrap();
        }

        let attempts = db.list_attempts().unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[1].quiz_id, "quiz-1-2");
        assert!(!attempts[1].is_correct);
    }

    #[test]
    fn test_learner_snapshot_cache() {
        let db = test_db();
        assert!(db.latest_learner_snapshot().unwrap().is_none());

        let level = LearnerLevel::default();
        db.save_learner_snapshot(&level).unwrap();
        db.save_learner_snapshot(&level).unwrap();
        assert_eq!(db.latest_learner_snapshot().unwrap(), Some(level));
    }

    #[test]
    fn test_quiz_counts_by_level() {
        let db = test_db();
        db.upsert_story(&story()).unwrap();
        for n in 1..=2 {
            db.upsert_quiz(&Quiz {
                quiz_id: format!("quiz-1-{}", n),
                story_id: "1".to_string(),
                question_text: "?".to_string(),
                difficulty_level: JlptLevel::N5,
                choices: vec![QuizChoice {
                    choice_id: "a".to_string(),
                    choice_text: "a".to_string(),
                    is_correct: true,
                    explanation: None,
                }],
            })
            .unwrap();
        }

        let counts = db.count_quizzes_by_level().unwrap();
        assert_eq!(counts.get(&JlptLevel::N5), Some(&2));
        assert_eq!(db.get_quiz("quiz-1-1").unwrap().unwrap().choices.len(), 1);
        assert_eq!(db.get_counts().unwrap().quizzes, 2);
    }
}

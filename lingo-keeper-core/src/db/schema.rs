//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: content catalog and learner history
    r#"
    -- ============================================
    -- Content (imported from catalog files)
    -- ============================================

    CREATE TABLE IF NOT EXISTS stories (
        story_id          TEXT PRIMARY KEY,
        title             TEXT NOT NULL,
        description       TEXT NOT NULL DEFAULT '',
        level_jlpt        TEXT NOT NULL,
        level_cefr        TEXT,
        estimated_minutes INTEGER NOT NULL DEFAULT 0,
        root_chapter_id   TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chapters (
        chapter_id        TEXT PRIMARY KEY,
        story_id          TEXT NOT NULL REFERENCES stories(story_id),
        parent_chapter_id TEXT,
        chapter_number    INTEGER NOT NULL,
        depth_level       INTEGER NOT NULL DEFAULT 0,
        content           TEXT NOT NULL,
        translation       TEXT
    );

    CREATE TABLE IF NOT EXISTS choices (
        choice_id         TEXT PRIMARY KEY,
        chapter_id        TEXT NOT NULL REFERENCES chapters(chapter_id),
        choice_text       TEXT NOT NULL,
        next_chapter_id   TEXT NOT NULL,
        display_order     INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS quizzes (
        quiz_id           TEXT PRIMARY KEY,
        story_id          TEXT NOT NULL REFERENCES stories(story_id),
        question_text     TEXT NOT NULL,
        difficulty_level  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS quiz_choices (
        choice_id         TEXT NOT NULL,
        quiz_id           TEXT NOT NULL REFERENCES quizzes(quiz_id),
        choice_text       TEXT NOT NULL,
        is_correct        INTEGER NOT NULL,
        explanation       TEXT,
        position          INTEGER NOT NULL,

        PRIMARY KEY (quiz_id, choice_id)
    );

    -- ============================================
    -- Learner history (append-only / write-once)
    -- ============================================

    CREATE TABLE IF NOT EXISTS quiz_attempts (
        seq               INTEGER PRIMARY KEY AUTOINCREMENT,
        attempt_id        TEXT NOT NULL UNIQUE,
        quiz_id           TEXT NOT NULL,
        story_id          TEXT,
        user_answer       TEXT,
        is_correct        INTEGER NOT NULL,
        answered_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS story_completions (
        story_id              TEXT PRIMARY KEY,
        completed_at          DATETIME NOT NULL,
        completion_percentage INTEGER NOT NULL,
        quiz_accuracy         INTEGER NOT NULL,
        chapters_completed    JSON NOT NULL
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_chapters_story ON chapters(story_id, chapter_number);
    CREATE INDEX IF NOT EXISTS idx_choices_chapter ON choices(chapter_id, display_order);
    CREATE INDEX IF NOT EXISTS idx_quizzes_story ON quizzes(story_id);
    CREATE INDEX IF NOT EXISTS idx_attempts_answered ON quiz_attempts(answered_at);
    "#,
    // Version 2: import checkpoints and cached learner snapshot
    r#"
    CREATE TABLE IF NOT EXISTS catalog_imports (
        content_hash      TEXT PRIMARY KEY,
        source_path       TEXT NOT NULL,
        imported_at       DATETIME NOT NULL,
        stories           INTEGER NOT NULL,
        chapters          INTEGER NOT NULL,
        quizzes           INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS learner_snapshots (
        id                INTEGER PRIMARY KEY CHECK (id = 1),
        computed_at       DATETIME NOT NULL,
        snapshot          JSON NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = [
            "stories",
            "chapters",
            "choices",
            "quizzes",
            "quiz_choices",
            "quiz_attempts",
            "story_completions",
            "catalog_imports",
            "learner_snapshots",
        ];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }
}

//! lingo-keeper - graded Japanese reader on the command line
//!
//! Import story catalogs, read branching stories, answer quizzes and track
//! your JLPT level.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use lingo_keeper_core::analytics::{
    overall_completion, Classification, ProgressPeriod, RecommendationSelector,
};
use lingo_keeper_core::story::{audit_story, AuditReport, StorySession};
use lingo_keeper_core::{
    CatalogImporter, Config, ContentStore, Database, JlptLevel, LearningService, LevelFilter, Quiz,
    StoryGraphNavigator,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lingo-keeper")]
#[command(about = "Read branching Japanese stories and track your JLPT level")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import every *.json catalog file in a directory
    Import {
        /// Directory containing catalog files
        dir: PathBuf,
    },

    /// List stories
    Stories {
        /// Level band, e.g. N3-B1, or "all"
        #[arg(short, long, default_value = "all")]
        level: String,
    },

    /// Show your current level
    Level {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show quiz questions: every quiz of a story, or one at random
    Quiz {
        /// Story whose quizzes to show (default: a random quiz)
        story_id: Option<String>,

        /// Fixed random seed (default: from config, else random)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Answer a quiz question
    Answer {
        quiz_id: String,
        choice_id: String,
    },

    /// Read a story, taking the given choices in order
    Read {
        story_id: String,

        /// Choice to take; repeat for each step
        #[arg(short, long = "choose")]
        choose: Vec<String>,
    },

    /// Suggest the next story to read
    Recommend {
        /// Number of additional suggestions (default: from config)
        #[arg(short, long)]
        count: Option<usize>,

        /// Fixed random seed (default: from config, else random)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show learning progress
    Progress {
        /// Graph window: week, month or year
        #[arg(short, long, default_value = "week")]
        period: String,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check story content for broken or unreachable chapters
    Audit {
        /// Story to check (default: all stories)
        story_id: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = lingo_keeper_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    // Open database
    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Import { dir } => cmd_import(&db, &dir),
        Command::Stories { level } => cmd_stories(&db, &config, &level),
        Command::Level { format } => cmd_level(&db, &config, format),
        Command::Quiz { story_id, seed } => {
            if seed.is_some() {
                config.recommendation.seed = seed;
            }
            cmd_quiz(&db, &config, story_id.as_deref())
        }
        Command::Answer { quiz_id, choice_id } => cmd_answer(&db, &config, &quiz_id, &choice_id),
        Command::Read { story_id, choose } => cmd_read(&db, &config, &story_id, &choose),
        Command::Recommend { count, seed } => {
            if seed.is_some() {
                config.recommendation.seed = seed;
            }
            if let Some(count) = count {
                config.recommendation.max_suggestions = count;
            }
            config.validate().context("invalid --count")?;
            cmd_recommend(&db, &config)
        }
        Command::Progress { period, format } => {
            let period: ProgressPeriod = period.parse().map_err(anyhow::Error::msg)?;
            cmd_progress(&db, &config, period, format)
        }
        Command::Audit { story_id } => cmd_audit(&db, &config, story_id.as_deref()),
    }
}

fn cmd_import(db: &Database, dir: &std::path::Path) -> Result<()> {
    let result = CatalogImporter::new(db)
        .import_dir(dir)
        .with_context(|| format!("failed to import catalogs from {}", dir.display()))?;

    println!(
        "Imported {} file(s), skipped {} unchanged",
        result.files_imported, result.files_skipped
    );
    println!(
        "  {} stories, {} chapters, {} quizzes",
        result.stories, result.chapters, result.quizzes
    );

    for (path, error) in &result.errors {
        eprintln!("  ! {}: {}", path.display(), error);
    }
    if !result.errors.is_empty() {
        anyhow::bail!("{} catalog file(s) failed to import", result.errors.len());
    }

    Ok(())
}

fn cmd_stories(db: &Database, config: &Config, level: &str) -> Result<()> {
    let filter: LevelFilter = level.parse()?;
    let service = LearningService::new(db, config);
    let stories = service.stories(filter)?;
    let completed = service.completed_story_ids()?;

    if stories.is_empty() {
        println!("No stories found.");
        println!("Run 'lingo-keeper import <dir>' to load a catalog.");
        return Ok(());
    }

    for story in &stories {
        let mark = if completed.contains(&story.story_id) {
            "x"
        } else {
            " "
        };
        let band = match story.level_cefr {
            Some(cefr) => format!("{}-{}", story.level_jlpt, cefr),
            None => story.level_jlpt.to_string(),
        };
        println!(
            "[{}] {:>3}  {:<6} {} ({} min)",
            mark, story.story_id, band, story.title, story.estimated_minutes
        );
    }

    let total = db.list_stories()?.len();
    println!(
        "\n{} of {} stories completed ({}%)",
        completed.len(),
        total,
        overall_completion(completed.len(), total)
    );
    Ok(())
}

fn cmd_level(db: &Database, config: &Config, format: Format) -> Result<()> {
    let service = LearningService::new(db, config);
    let classification = service.classify().context("failed to classify learner level")?;
    db.save_learner_snapshot(&classification.level)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&classification.level)?),
        Format::Text => print_level(&classification),
    }
    Ok(())
}

fn print_level(classification: &Classification) {
    let level = &classification.level;
    println!("Current level:   {}", level.current_level);
    println!("Confidence:      {}%", level.confidence);
    println!("Next level:      {}", level.recommended_next_level);
    println!();
    println!("Accuracy by level:");
    for jlpt in JlptLevel::ALL {
        let stats = classification.stats.get(&jlpt).copied().unwrap_or_default();
        if stats.total == 0 {
            println!("  {}   -    (no attempts)", jlpt);
        } else {
            println!(
                "  {}  {:>3}%  ({}/{})",
                jlpt,
                level.accuracy_by_level.get(&jlpt).copied().unwrap_or(0),
                stats.correct,
                stats.total
            );
        }
    }

    if classification.unparsed_attempts > 0 {
        println!(
            "\n{} attempt(s) skipped: no story could be determined",
            classification.unparsed_attempts
        );
    }
    if classification.unmapped_attempts > 0 {
        println!(
            "{} attempt(s) counted as {}: story has no level",
            classification.unmapped_attempts,
            JlptLevel::easiest()
        );
    }
}

fn cmd_quiz(db: &Database, config: &Config, story_id: Option<&str>) -> Result<()> {
    let service = LearningService::new(db, config);

    let quizzes = match story_id {
        Some(id) => {
            let quizzes = service.quizzes(id)?;
            if quizzes.is_empty() {
                println!("Story {} has no quizzes.", id);
                return Ok(());
            }
            quizzes
        }
        None => {
            let mut selector = RecommendationSelector::new(&config.recommendation);
            match service.random_quiz(selector.rng())? {
                Some(quiz) => vec![quiz],
                None => {
                    println!("No quizzes found.");
                    println!("Run 'lingo-keeper import <dir>' to load a catalog.");
                    return Ok(());
                }
            }
        }
    };

    for (i, quiz) in quizzes.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_quiz(quiz);
    }
    println!();
    println!("Answer with: lingo-keeper answer <quiz_id> <choice_id>");
    Ok(())
}

fn print_quiz(quiz: &Quiz) {
    println!("{} [{}] story {}", quiz.quiz_id, quiz.difficulty_level, quiz.story_id);
    println!("{}", quiz.question_text);
    for choice in &quiz.choices {
        println!("  {}  {}", choice.choice_id, choice.choice_text);
    }
}

fn cmd_answer(db: &Database, config: &Config, quiz_id: &str, choice_id: &str) -> Result<()> {
    let service = LearningService::new(db, config);
    let feedback = service
        .submit_answer(quiz_id, choice_id)
        .with_context(|| format!("failed to grade answer for {}", quiz_id))?;

    if feedback.is_correct {
        println!("Correct!");
    } else {
        println!("Incorrect.");
        if let Some(answer) = &feedback.sample_answer {
            println!("Answer: {}", answer);
        }
    }
    println!("{}", feedback.explanation);
    Ok(())
}

fn cmd_read(db: &Database, config: &Config, story_id: &str, choices: &[String]) -> Result<()> {
    let service = LearningService::new(db, config);
    let nav = service.navigator();

    let story = nav.get_story(story_id)?;
    println!("{} [{}]", story.title, story.level_jlpt);
    println!();

    let mut session = service.start_story(story_id)?;
    print_chapter(&nav, session.current_chapter_id())?;

    for choice_id in choices {
        service
            .choose(&mut session, choice_id)
            .with_context(|| format!("cannot take choice {}", choice_id))?;
        println!("> {}", choice_id);
        println!();
        print_chapter(&nav, session.current_chapter_id())?;
    }

    finish_reading(&service, &session)
}

fn print_chapter(nav: &StoryGraphNavigator<'_, Database>, chapter_id: &str) -> Result<()> {
    let chapter = nav.get_chapter(chapter_id)?;
    println!("{}", chapter.content);
    if let Some(translation) = &chapter.translation {
        println!("  ({})", translation);
    }
    println!();
    for choice in StoryGraphNavigator::<Database>::sorted_choices(&chapter) {
        println!("  {}  {}", choice.choice_id, choice.choice_text);
    }
    Ok(())
}

fn finish_reading(service: &LearningService<'_, Database>, session: &StorySession) -> Result<()> {
    if !session.is_completed() {
        println!();
        println!("Progress: {}%", session.progress());
        return Ok(());
    }

    match service.finish_story(session)? {
        Some(completion) => {
            println!("Story completed! Quiz accuracy: {}%", completion.quiz_accuracy);
        }
        None => println!("Story completed (already recorded)."),
    }
    Ok(())
}

fn cmd_recommend(db: &Database, config: &Config) -> Result<()> {
    let service = LearningService::new(db, config);
    let mut selector = RecommendationSelector::new(&config.recommendation);

    let Some(recommendation) = service.recommend(selector.rng())? else {
        println!("You have completed every story. Nothing left to recommend.");
        return Ok(());
    };

    let story = &recommendation.story;
    println!(
        "Next: {} {} [{}] - {}",
        story.story_id,
        story.title,
        story.level_jlpt,
        recommendation.reason.description()
    );

    let others: Vec<_> = service
        .suggestions(selector.rng())?
        .into_iter()
        .filter(|s| s.story_id != story.story_id)
        .collect();
    if !others.is_empty() {
        println!("\nAlso try:");
        for s in others {
            println!("  {} {} [{}]", s.story_id, s.title, s.level_jlpt);
        }
    }
    Ok(())
}

fn cmd_progress(db: &Database, config: &Config, period: ProgressPeriod, format: Format) -> Result<()> {
    let service = LearningService::new(db, config);
    let progress = service.progress()?;
    let graph = service.progress_graph(period, Utc::now())?;

    if format == Format::Json {
        let out = serde_json::json!({ "progress": progress, "graph": graph });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Answered {} quiz question(s), {} correct ({:.1}%)",
        progress.total_quizzes, progress.correct_count, progress.accuracy_rate
    );
    println!("Completed stories: {}", progress.completed_stories.len());
    println!();
    println!("Level  answered/available  accuracy");
    for (level, lp) in &progress.level_progress {
        println!(
            "  {}   {:>4}/{:<4}          {:>5.1}%",
            level, lp.completed, lp.total, lp.accuracy
        );
    }

    println!();
    println!("Last {} ({} day(s)):", period.as_str(), period.days());
    if graph.data_points.is_empty() {
        println!("  no activity");
    }
    for point in &graph.data_points {
        println!(
            "  {}  {}  {:>5.1}%  ({} answered)",
            point.date, point.level, point.accuracy_rate, point.attempts
        );
    }
    Ok(())
}

fn cmd_audit(db: &Database, config: &Config, story_id: Option<&str>) -> Result<()> {
    let story_ids: Vec<String> = match story_id {
        Some(id) => vec![id.to_string()],
        None => db.list_stories()?.into_iter().map(|s| s.story_id).collect(),
    };

    let mut total_issues = 0;
    for id in &story_ids {
        let report = audit_story(db, id, &config.story)?;
        total_issues += report.issues.len();
        print_audit(&report);
    }

    println!(
        "\nChecked {} story(ies), {} issue(s)",
        story_ids.len(),
        total_issues
    );
    Ok(())
}

fn print_audit(report: &AuditReport) {
    let status = if report.is_clean() { "ok" } else { "issues" };
    println!(
        "Story {}: {} ({} chapters, {} endings)",
        report.story_id, status, report.chapters, report.terminal_chapters
    );
    for issue in &report.issues {
        println!("  - {}", issue);
    }
}

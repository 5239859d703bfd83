mod config;
mod logging;

use std::fmt;
use std::sync::Arc;

use quiz_core::model::{Question, QuestionDraft, QuestionFilter, Subject, TagName, UserId};
use services::{Clock, QuestionService, SessionLoopService, SessionRequest, TestSession};
use storage::repository::Storage;

use crate::config::AppConfig;

const DEFAULT_SESSION_LIMIT: usize = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidLabel { flag: &'static str, raw: String },
    MissingUser,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLabel { flag, raw } => write!(f, "invalid {flag} value: {raw:?}"),
            ArgsError::MissingUser => {
                write!(f, "a learner is required: pass --user or set QUIZ_USER_ID")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(flag: &'static str, raw: &str) -> Result<usize, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_string(),
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz catalog [--db <sqlite_url>]");
    eprintln!("  quiz list    [--subject <name>] [--tag <name>...] [--db <sqlite_url>]");
    eprintln!("  quiz add     --text <prompt> --option <text>... --correct <index>");
    eprintln!("               [--explanation <text>] [--subject <name>] [--tag <name>...]");
    eprintln!("               [--db <sqlite_url>]");
    eprintln!("  quiz session [--user <id>] [--subject <name>] [--tag <name>...] [--limit <n>]");
    eprintln!("               [--no-new] [--answers <i,j,...>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", config::DEFAULT_DB_URL);
    eprintln!("  --limit {DEFAULT_SESSION_LIMIT}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_ENV (development|production), RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Catalog,
    List,
    Add,
    Session,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "catalog" => Some(Self::Catalog),
            "list" => Some(Self::List),
            "add" => Some(Self::Add),
            "session" => Some(Self::Session),
            _ => None,
        }
    }
}

/// Raw `--subject` / `--tag` flags shared by `list` and `session`.
#[derive(Debug, Default)]
struct FilterArgs {
    subject: Option<String>,
    tags: Vec<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<QuestionFilter, ArgsError> {
        let mut filter = QuestionFilter::all();
        if let Some(raw) = &self.subject {
            let subject = Subject::new(raw.as_str()).map_err(|_| ArgsError::InvalidLabel {
                flag: "--subject",
                raw: raw.clone(),
            })?;
            filter = filter.with_subject(subject);
        }
        let tags = self
            .tags
            .iter()
            .map(|raw| {
                TagName::new(raw.as_str()).map_err(|_| ArgsError::InvalidLabel {
                    flag: "--tag",
                    raw: raw.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(filter.with_tags(tags))
    }
}

#[derive(Debug, Default)]
struct SessionArgs {
    user: Option<String>,
    filter: FilterArgs,
    limit: Option<usize>,
    no_new: bool,
    answers: Vec<usize>,
}

#[derive(Debug)]
enum Action {
    Catalog,
    List(FilterArgs),
    Add(QuestionDraft),
    Session(SessionArgs),
}

#[derive(Debug)]
struct Args {
    db_url: Option<String>,
    action: Action,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = None;
        let mut draft = QuestionDraft::default();
        let mut correct = None;
        let mut filter = FilterArgs::default();
        let mut session = SessionArgs::default();

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                (Command::Add, "--text") => draft.text = require_value(args, "--text")?,
                (Command::Add, "--option") => draft.options.push(require_value(args, "--option")?),
                (Command::Add, "--correct") => {
                    correct = Some(parse_number("--correct", &require_value(args, "--correct")?)?);
                }
                (Command::Add, "--explanation") => {
                    draft.explanation = Some(require_value(args, "--explanation")?);
                }
                (Command::Add, "--subject") => {
                    draft.subject = Some(require_value(args, "--subject")?);
                }
                (Command::Add, "--tag") => draft.tags.push(require_value(args, "--tag")?),
                (Command::List | Command::Session, "--subject") => {
                    filter.subject = Some(require_value(args, "--subject")?);
                }
                (Command::List | Command::Session, "--tag") => {
                    filter.tags.push(require_value(args, "--tag")?);
                }
                (Command::Session, "--user") => session.user = Some(require_value(args, "--user")?),
                (Command::Session, "--limit") => {
                    session.limit = Some(parse_number("--limit", &require_value(args, "--limit")?)?);
                }
                (Command::Session, "--no-new") => session.no_new = true,
                (Command::Session, "--answers") => {
                    let raw = require_value(args, "--answers")?;
                    session.answers = raw
                        .split(',')
                        .filter(|part| !part.trim().is_empty())
                        .map(|part| parse_number("--answers", part))
                        .collect::<Result<_, _>>()?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let action = match cmd {
            Command::Catalog => Action::Catalog,
            Command::List => Action::List(filter),
            Command::Add => {
                draft.correct_answer = correct.ok_or(ArgsError::MissingFlag { flag: "--correct" })?;
                Action::Add(draft)
            }
            Command::Session => Action::Session(SessionArgs { filter, ..session }),
        };

        Ok(Self { db_url, action })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.contains("mode=memory") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn session_request(
    args: &SessionArgs,
    config: &AppConfig,
) -> Result<SessionRequest, ArgsError> {
    let raw_user = args
        .user
        .clone()
        .or_else(|| config.user_id.clone())
        .ok_or(ArgsError::MissingUser)?;
    let user_id = UserId::new(raw_user).map_err(|_| ArgsError::MissingUser)?;

    Ok(
        SessionRequest::new(user_id, args.limit.unwrap_or(DEFAULT_SESSION_LIMIT))
            .with_filter(args.filter.to_filter()?)
            .with_include_new(!args.no_new),
    )
}

fn print_question(position: usize, question: &Question) {
    let labels = question
        .tags()
        .iter()
        .map(TagName::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    match question.subject() {
        Some(subject) => println!("{position}. [{subject}] {}", question.text()),
        None => println!("{position}. {}", question.text()),
    }
    if !labels.is_empty() {
        println!("   tags: {labels}");
    }
    for (index, option) in question.options().iter().enumerate() {
        println!("   {index}) {option}");
    }
}

async fn run_session(
    loop_svc: &SessionLoopService,
    session: &mut TestSession,
    answers: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    for &choice in answers {
        if session.is_complete() {
            break;
        }
        let result = loop_svc.answer_current(session, choice).await?;
        let verdict = if result.answer.is_correct {
            "correct"
        } else {
            "incorrect"
        };
        println!(
            "{}: {verdict} (answer {}), mastery {} / next review {}",
            result.answer.question_id,
            result.answer.correct_answer,
            result.progress.mastery_level(),
            result.progress.next_review(),
        );
        if let Some(explanation) = &result.answer.explanation {
            println!("   {explanation}");
        }
    }

    let score = session.score();
    println!(
        "score: {}/{} correct, {} incorrect ({}%)",
        score.correct, score.total, score.incorrect, score.percent
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    logging::init_tracing(config.environment);

    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(ArgsError::MissingFlag { flag: "<command>" }.into());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            print_usage();
            ArgsError::UnknownArg(first)
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv).map_err(|e| {
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = normalize_sqlite_url(parsed.db_url.unwrap_or_else(|| config.db_url.clone()));
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    let clock = Clock::default();
    tracing::debug!(?cmd, %db_url, "storage ready");

    match parsed.action {
        Action::Catalog => {
            let catalog = QuestionService::new(clock, Arc::clone(&storage.questions))
                .catalog()
                .await?;
            println!("subjects:");
            for subject in &catalog.subjects {
                println!("  {subject}");
            }
            println!("tags:");
            for tag in &catalog.tags {
                println!("  {tag}");
            }
        }
        Action::List(args) => {
            let questions = QuestionService::new(clock, Arc::clone(&storage.questions))
                .list_questions(&args.to_filter()?)
                .await?;
            if questions.is_empty() {
                println!("no questions match");
            }
            for (position, question) in questions.iter().enumerate() {
                println!("{}", question.id());
                print_question(position + 1, question);
            }
        }
        Action::Add(draft) => {
            let question = QuestionService::new(clock, Arc::clone(&storage.questions))
                .add_question(draft)
                .await?;
            println!("{}", question.id());
        }
        Action::Session(args) => {
            let request = session_request(&args, &config)?;
            let loop_svc = SessionLoopService::from_storage(clock, &storage);
            let Some(mut session) = loop_svc.try_start_session(&request).await? else {
                println!("no questions available");
                return Ok(());
            };

            for (position, question) in session.questions().iter().enumerate() {
                print_question(position + 1, question);
            }
            if !args.answers.is_empty() {
                run_session(&loop_svc, &mut session, &args.answers).await?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

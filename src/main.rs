// 终端前端
// 导入课程、浏览分页内容、交互式做题

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coursequiz::commands::{self, AppState, QuizViewDto};
use coursequiz::config::AppConfig;
use coursequiz::models::Course;
use coursequiz::services::remote::{RestIdentity, RestStore};
use coursequiz::services::session::QuizState;
use coursequiz::services::store::{CourseStore, IdentityProvider, StaticIdentity};
use coursequiz::services::SqliteStore;
use coursequiz::utils::{get_platform, init_logging};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(name = "coursequiz")]
#[command(about = "Read course material page by page and take generated quizzes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the config file
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// User id used for progress records
    #[arg(short, long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a course from a text or markdown file
    Import {
        id: String,
        name: String,
        file: PathBuf,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List open courses, optionally filtered
    Courses { query: Option<String> },
    /// Print the pages of a course
    Pages {
        course_id: String,
        /// Only print this page (1-based)
        #[arg(short, long)]
        page: Option<u32>,
    },
    /// Take a quiz on a course
    Quiz {
        course_id: String,
        /// Seed for reproducible questions
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the course to continue learning
    Continue,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    init_logging(config.level_filter()).context("Failed to initialize logging")?;
    log::debug!("coursequiz {} on {}", env!("CARGO_PKG_VERSION"), get_platform());

    if let Commands::Import {
        id,
        name,
        file,
        description,
    } = &cli.command
    {
        return import_course(&config, id, name, file, description.clone());
    }

    let seed = match &cli.command {
        Commands::Quiz { seed, .. } => *seed,
        _ => None,
    };
    let (store, identity) = build_backend(&config, cli.user.clone())?;
    let state = AppState::new(config, store, identity).with_seed(seed);

    match cli.command {
        Commands::Courses { query } => list_courses(&state, query).await,
        Commands::Pages { course_id, page } => print_pages(&state, course_id, page).await,
        Commands::Quiz { course_id, .. } => run_quiz(&state, course_id).await,
        Commands::Continue => show_continue(&state).await,
        Commands::Import { .. } => Ok(()),
    }
}

/// 根据配置选择托管服务或本地数据库
fn build_backend(
    config: &AppConfig,
    user: Option<String>,
) -> Result<(Arc<dyn CourseStore>, Arc<dyn IdentityProvider>)> {
    if let Some(remote) = &config.remote {
        let store = RestStore::new(remote).context("Failed to create remote store client")?;
        let identity: Arc<dyn IdentityProvider> = match user {
            Some(id) => Arc::new(StaticIdentity::new(id)),
            None => Arc::new(RestIdentity::new(remote).context("Failed to create auth client")?),
        };
        log::info!("using remote store at {}", remote.url);
        return Ok((Arc::new(store), identity));
    }

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let identity = match user {
        Some(id) => StaticIdentity::new(id),
        None => {
            log::warn!("no --user given, progress will not be recorded");
            StaticIdentity::anonymous()
        }
    };
    Ok((Arc::new(store), Arc::new(identity)))
}

fn import_course(
    config: &AppConfig,
    id: &str,
    name: &str,
    file: &Path,
    description: Option<String>,
) -> Result<()> {
    if config.remote.is_some() {
        bail!("Importing is only supported for the local database");
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    store
        .add_course(&Course {
            id: id.to_string(),
            name: name.to_string(),
            description,
            content,
            status: "open".to_string(),
        })
        .context("Failed to save course")?;

    println!("Imported course {} ({})", name, id);
    Ok(())
}

async fn list_courses(state: &AppState, query: Option<String>) -> Result<()> {
    let courses = commands::get_courses(query, state).await.map_err(anyhow::Error::msg)?;
    if courses.is_empty() {
        println!("No courses found.");
        return Ok(());
    }

    for course in courses {
        match course.description {
            Some(description) => println!("{:<16} {}  - {}", course.id, course.name, description),
            None => println!("{:<16} {}", course.id, course.name),
        }
    }
    Ok(())
}

async fn print_pages(state: &AppState, course_id: String, only: Option<u32>) -> Result<()> {
    commands::open_course(course_id.clone(), state)
        .await
        .map_err(anyhow::Error::msg)?;
    let pages = commands::get_course_pages(course_id, state)
        .await
        .map_err(anyhow::Error::msg)?;

    for page in pages.iter().filter(|p| only.map_or(true, |n| n == p.page_number)) {
        println!("---- Page {} of {} ----", page.page_number, page.total_pages);
        println!("{}\n", page.content);
    }
    Ok(())
}

async fn show_continue(state: &AppState) -> Result<()> {
    match commands::get_continue_learning(state).await.map_err(anyhow::Error::msg)? {
        Some(progress) => println!(
            "Continue {}: page {} of {} ({}%)",
            progress.course_id, progress.current_page, progress.total_pages, progress.percentage
        ),
        None => println!("Nothing in progress."),
    }
    Ok(())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> Result<Option<String>> {
    println!("{}", text);
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

fn print_question(view: &QuizViewDto) {
    let (Some(number), Some(question)) = (view.question_number, &view.question) else {
        return;
    };
    println!("\nQuestion {} of {}", number, view.total_questions);
    println!("{}", question.question);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
}

async fn run_quiz(state: &AppState, course_id: String) -> Result<()> {
    let mut view = commands::start_quiz(course_id, state)
        .await
        .map_err(anyhow::Error::msg)?;
    let quiz_id = view.quiz_id.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if let QuizState::Finished { score } = view.state {
            println!("\nYou scored {} out of {}.", score, view.total_questions);
            if let Some(message) = &view.result_message {
                println!("{}", message);
            }
            match prompt(&mut lines, "Try again? [y/N]").await? {
                Some(answer) if answer.eq_ignore_ascii_case("y") => {
                    view = commands::retry_quiz(quiz_id.clone(), state)
                        .await
                        .map_err(anyhow::Error::msg)?;
                    continue;
                }
                _ => break,
            }
        }

        print_question(&view);
        let Some(answer) = prompt(&mut lines, "Your answer (1-4):").await? else {
            break;
        };
        let choice = match answer.parse::<usize>() {
            Ok(n) if n >= 1 => n - 1,
            _ => {
                println!("Please enter an option number.");
                continue;
            }
        };

        if let Err(e) = commands::select_answer(quiz_id.clone(), choice, state).await {
            println!("{}", e);
            continue;
        }
        let result = commands::submit_answer(quiz_id.clone(), state)
            .await
            .map_err(anyhow::Error::msg)?;
        if result.correct {
            println!("Correct!");
        } else {
            let text = result
                .view
                .question
                .as_ref()
                .and_then(|q| q.options.get(result.correct_answer))
                .map_or("", String::as_str);
            println!("Incorrect. The answer was: {}", text);
        }

        view = commands::next_question(quiz_id.clone(), state)
            .await
            .map_err(anyhow::Error::msg)?;
    }

    commands::close_quiz(quiz_id, state).await.map_err(anyhow::Error::msg)?;
    Ok(())
}

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aita_judge::config::default_db_path;
use aita_judge::judge::Judge;
use aita_judge::service::SubmissionService;
use aita_judge::store::{FeedQuery, SqliteSubmissionStore, DEFAULT_FEED_LIMIT};

#[derive(Parser)]
#[command(name = "aita", version, about = "Judge interpersonal situations: YTA or NTA")]
struct Cli {
    /// SQLite database (defaults to $AITA_DB_PATH, then ./aita.sqlite)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct JudgeOpts {
    /// Skip the AI provider even if one is configured
    #[arg(long)]
    rules_only: bool,
    /// Seed for rule-based response selection
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a situation without storing it
    Judge {
        situation: String,
        #[arg(long)]
        follow_up: Option<String>,
        #[command(flatten)]
        opts: JudgeOpts,
    },
    /// Register a user
    UserAdd {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Judge and store a situation
    Submit {
        /// Username or email of the submitter
        #[arg(long)]
        user: String,
        situation: String,
        #[arg(long)]
        anonymous: bool,
        #[arg(long)]
        private: bool,
        #[command(flatten)]
        opts: JudgeOpts,
    },
    /// Add context to one of your submissions and re-judge it
    FollowUp {
        #[arg(long)]
        user: String,
        #[arg(long)]
        id: i64,
        context: String,
        #[command(flatten)]
        opts: JudgeOpts,
    },
    /// Show one submission
    Show {
        #[arg(long)]
        id: i64,
        /// View as this user (needed for private submissions)
        #[arg(long = "as")]
        viewer: Option<String>,
    },
    /// List submissions, newest first
    Feed {
        #[arg(long = "as")]
        viewer: Option<String>,
        /// Only the viewer's own submissions
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value_t = DEFAULT_FEED_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "aita_judge=info,aita=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_judge(opts: JudgeOpts) -> Judge {
    let judge = if opts.rules_only {
        Judge::rules_only()
    } else {
        Judge::from_env()
    };
    match opts.seed {
        Some(seed) => judge.with_seed(seed),
        None => judge,
    }
}

fn open_service(
    db: Option<PathBuf>,
    judge: Judge,
) -> Result<SubmissionService<SqliteSubmissionStore>, Box<dyn std::error::Error>> {
    let path = db.unwrap_or_else(default_db_path);
    let store = SqliteSubmissionStore::new(path)?;
    Ok(SubmissionService::new(judge, Arc::new(store)))
}

fn emit<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Judge {
            situation,
            follow_up,
            opts,
        } => {
            if situation.trim().is_empty() {
                return Err("situation is required".into());
            }
            let judge = build_judge(opts);
            let outcome = judge.judge(situation.trim(), follow_up.as_deref()).await;
            emit(&outcome)?;
        }
        Commands::UserAdd { username, email } => {
            let service = open_service(cli.db, Judge::rules_only())?;
            let user = service.register(&username, &email).await?;
            emit(&user)?;
        }
        Commands::Submit {
            user,
            situation,
            anonymous,
            private,
            opts,
        } => {
            let service = open_service(cli.db, build_judge(opts))?;
            let user = service.user(&user).await?;
            let submission = service
                .submit(user.id, &situation, anonymous, !private)
                .await?;
            emit(&submission)?;
        }
        Commands::FollowUp {
            user,
            id,
            context,
            opts,
        } => {
            let service = open_service(cli.db, build_judge(opts))?;
            let user = service.user(&user).await?;
            let submission = service.follow_up(user.id, id, &context).await?;
            emit(&submission)?;
        }
        Commands::Show { id, viewer } => {
            let service = open_service(cli.db, Judge::rules_only())?;
            let viewer = match viewer {
                Some(login) => Some(service.user(&login).await?.id),
                None => None,
            };
            let submission = service.view(viewer, id).await?;
            emit(&submission)?;
        }
        Commands::Feed {
            viewer,
            mine,
            limit,
            offset,
        } => {
            let service = open_service(cli.db, Judge::rules_only())?;
            let viewer = match viewer {
                Some(login) => Some(service.user(&login).await?.id),
                None => None,
            };
            let page = service
                .feed(&FeedQuery {
                    viewer,
                    mine,
                    limit,
                    offset,
                })
                .await?;
            emit(&page)?;
        }
    }

    Ok(())
}

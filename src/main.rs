use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod db;
mod error;
mod memory;
mod models;
mod notify;
mod pipeline;
mod progress;
mod report;
mod store;

use models::UserInfo;
use pipeline::SubmissionPipeline;
use store::Store;

#[derive(Parser)]
#[command(name = "course-progress-pipeline")]
#[command(about = "Progress, achievement and cohort pipeline for quiz submissions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Record one quiz submission and run the derived-state pipeline
    Submit {
        #[arg(long)]
        email: String,
        #[arg(long)]
        module: Uuid,
        #[arg(long)]
        score: i32,
        #[arg(long)]
        total: i32,
    },
    /// Replay quiz submissions from a CSV file through the pipeline
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show completion, average score and tier for a learner in a course
    Progress {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course: Uuid,
    },
    /// Generate the instructor's learner report
    #[command(group(
        ArgGroup::new("format")
            .args(["out", "json"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List the badges a learner holds
    Badges {
        #[arg(long)]
        email: String,
    },
    /// Show the tier rosters for a course
    Batches {
        #[arg(long)]
        course: Uuid,
    },
    /// List a user's notifications, newest first
    Notifications {
        #[arg(long)]
        email: String,
    },
    /// Mark one notification as read
    MarkRead {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        email: String,
    },
    /// Run the full pipeline against an in-memory store and print the outcome
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Demo = cli.command {
        return run_demo().await;
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = Arc::new(db::PgStore::new(pool.clone()));
    let pipeline = SubmissionPipeline::new(Arc::clone(&store));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let summary = db::seed(&pool).await?;
            println!("Seed data inserted.");
            println!("Course: {} ({})", summary.course_title, summary.course_id);
            for module_id in &summary.module_ids {
                println!("- module {module_id}");
            }
            println!("Instructor: {}", summary.instructor_email);
            println!("Learners: {}", summary.learner_emails.join(", "));
        }
        Commands::Submit {
            email,
            module,
            score,
            total,
        } => {
            let learner = require_user(store.as_ref(), &email).await?;
            let result = pipeline.submit(learner.id, module, score, total).await?;
            println!(
                "Recorded attempt {}: {}/{} on module {}.",
                result.id, result.score, result.total_questions, result.module_id
            );
        }
        Commands::Import { csv } => {
            let recorded = import_csv(store.as_ref(), &pipeline, &csv).await?;
            println!("Recorded {recorded} attempts from {}.", csv.display());
        }
        Commands::Progress { email, course } => {
            let learner = require_user(store.as_ref(), &email).await?;
            let report = pipeline.report_for(learner.id, course).await?;
            println!(
                "{}: {}/{} modules ({}%), average {:.1} → {} tier",
                learner.email,
                report.progress.completed_modules,
                report.progress.total_modules,
                report.progress.percent,
                report.average,
                report.tier
            );
        }
        Commands::Report { email, out, json } => {
            let instructor = require_user(store.as_ref(), &email).await?;
            let summaries = report::learner_report(store.as_ref(), instructor.id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                let rendered = report::render_markdown(&instructor.email, &summaries);
                std::fs::write(&out, rendered)?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Badges { email } => {
            let learner = require_user(store.as_ref(), &email).await?;
            let badges = store.badges_of(learner.id).await?;
            if badges.is_empty() {
                println!("No badges yet.");
            } else {
                for badge in badges {
                    println!("- {}: {}", badge.name, badge.description);
                }
            }
        }
        Commands::Batches { course } => {
            let roster = store.batch_roster(course).await?;
            if roster.is_empty() {
                println!("No batches for this course.");
            } else {
                for (batch, members) in roster {
                    println!("{} batch ({} members):", batch.tier, members.len());
                    for member in members {
                        println!("- {} ({})", member.name, member.email);
                    }
                }
            }
        }
        Commands::Notifications { email } => {
            let user = require_user(store.as_ref(), &email).await?;
            let notifications = store.notifications_for(user.id).await?;
            if notifications.is_empty() {
                println!("No notifications.");
            } else {
                for notification in notifications {
                    let marker = if notification.is_read { " " } else { "*" };
                    println!(
                        "{marker} [{}] {} — {} ({})",
                        notification.kind,
                        notification.title,
                        notification.message,
                        notification.id
                    );
                }
            }
        }
        Commands::MarkRead { id, email } => {
            let user = require_user(store.as_ref(), &email).await?;
            if store.mark_notification_read(id, user.id).await? {
                println!("Notification marked as read.");
            } else {
                println!("No such notification for this user.");
            }
        }
        Commands::Demo => unreachable!(),
    }

    Ok(())
}

async fn require_user<S: Store>(store: &S, email: &str) -> anyhow::Result<UserInfo> {
    store
        .user_by_email(email)
        .await?
        .with_context(|| format!("no user with email {email}"))
}

async fn import_csv<S: Store>(
    store: &S,
    pipeline: &SubmissionPipeline<S>,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        module_id: Uuid,
        score: i32,
        total_questions: i32,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut recorded = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let Some(learner) = store.user_by_email(&row.email).await? else {
            tracing::warn!(email = %row.email, "skipping row for unknown user");
            continue;
        };
        match pipeline
            .submit(learner.id, row.module_id, row.score, row.total_questions)
            .await
        {
            Ok(_) => recorded += 1,
            Err(err) => {
                tracing::warn!(email = %row.email, module = %row.module_id, error = %err, "skipping row");
            }
        }
    }

    Ok(recorded)
}

async fn run_demo() -> anyhow::Result<()> {
    let store = Arc::new(memory::MemStore::new());
    let instructor = store.add_user("Maya Okafor", "maya.okafor@example.com").await;
    let learner = store.add_user("Avery Lee", "avery.lee@example.com").await;
    let course = store.add_course("Web Development Bootcamp", instructor).await;
    let first = store.add_module(course).await;
    let second = store.add_module(course).await;
    store.enroll(learner, course).await;

    let pipeline = SubmissionPipeline::new(Arc::clone(&store));
    pipeline.submit(learner, first, 10, 10).await?;
    pipeline.submit(learner, second, 9, 10).await?;

    let report = pipeline.report_for(learner, course).await?;
    println!(
        "Progress: {}/{} modules ({}%)",
        report.progress.completed_modules, report.progress.total_modules, report.progress.percent
    );
    println!("Average score: {:.1} → {} tier", report.average, report.tier);

    println!("Badges:");
    for badge in store.badges_of(learner).await? {
        println!("- {}", badge.name);
    }

    println!("Batches:");
    for (batch, members) in store.batch_roster(course).await? {
        let names: Vec<String> = members.into_iter().map(|m| m.name).collect();
        println!("- {}: {}", batch.tier, names.join(", "));
    }

    println!("Notifications (newest first):");
    for notification in store.notifications_for(learner).await? {
        println!("- [{}] {}", notification.kind, notification.message);
    }

    Ok(())
}

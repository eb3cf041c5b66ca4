use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod admin;
pub mod auth;
pub mod case;
pub mod patients;

use crate::cases::models::{
    AgeBracket, CaseComplexity, CasePresentation, CaseSeverity, LearnerLevel, VisitType,
};
use crate::client::ApiClient;
use crate::core::AppConfig;
use admin::AdminCommand;
use patients::PatientsCommand;

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value = "student")]
        level: LearnerLevel,
        #[arg(long)]
        institution: Option<String>,
    },
    /// Sign in and store the tokens
    Login {
        #[arg(long)]
        email: String,
    },
    /// Forget the stored tokens
    Logout {},
    /// Show the signed in user
    Me {},
    /// Show case statistics for the signed in user
    Stats {},
    /// Work through a new case interactively
    Case {
        #[arg(long, value_enum, default_value = "student")]
        level: LearnerLevel,
        /// Request a specific condition, e.g. `aom`
        #[arg(long)]
        condition: Option<String>,
        /// Minutes available for the case
        #[arg(long)]
        time: Option<u32>,
        #[arg(long, value_enum, default_value = "sick")]
        visit: VisitType,
        /// Patient age for well-child visits
        #[arg(long)]
        visit_age_months: Option<u32>,
        /// Generate a new patient from a teaching framework
        #[arg(long)]
        dynamic: bool,
        #[arg(long, value_enum, requires = "dynamic")]
        severity: Option<CaseSeverity>,
        #[arg(long, value_enum, requires = "dynamic")]
        age_bracket: Option<AgeBracket>,
        #[arg(long, value_enum, requires = "dynamic")]
        presentation: Option<CasePresentation>,
        #[arg(long, value_enum, requires = "dynamic")]
        complexity: Option<CaseComplexity>,
    },
    /// List the conditions a case can be requested for
    Frameworks {},
    /// Continue an unfinished case
    Resume {
        #[arg(long)]
        session_id: String,
    },
    /// List completed cases
    History {},
    /// List cases still in progress
    Active {},
    /// Show the debrief of a completed case
    Debrief {
        #[arg(long)]
        session_id: String,
    },
    /// Manage imported patients
    Patients {
        #[command(subcommand)]
        command: PatientsCommand,
    },
    /// Platform analytics (admin only)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        // Logs go to stderr, stdout carries the transcript
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Pretty print any response as JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Cli::parse();
    let config = AppConfig::default();
    let client = Arc::new(ApiClient::from_config(&config));

    match args.command {
        Some(Command::Register {
            email,
            name,
            level,
            institution,
        }) => {
            auth::register(&client, email, name, level, institution).await?;
        }
        Some(Command::Login { email }) => {
            auth::login(&client, &email).await?;
        }
        Some(Command::Logout {}) => {
            client.logout().await;
            println!("Logged out.");
        }
        Some(Command::Me {}) => {
            print_json(&client.get_me().await?)?;
        }
        Some(Command::Stats {}) => {
            print_json(&client.get_my_stats().await?)?;
        }
        Some(Command::Case {
            level,
            condition,
            time,
            visit,
            visit_age_months,
            dynamic,
            severity,
            age_bracket,
            presentation,
            complexity,
        }) => {
            let options = crate::cases::StartCaseOptions {
                level,
                condition_key: condition,
                time_constraint: time,
                visit_type: visit,
                visit_age_months,
                dynamic,
                severity,
                age_bracket,
                presentation,
                complexity,
            };
            case::run(client, Some(options), None).await?;
        }
        Some(Command::Frameworks {}) => {
            let list = client.list_frameworks().await?;
            for framework in list.frameworks.iter() {
                println!(
                    "{:<28} {}",
                    framework.key,
                    framework.topic.as_deref().unwrap_or("")
                );
            }
        }
        Some(Command::Resume { session_id }) => {
            case::run(client, None, Some(session_id)).await?;
        }
        Some(Command::History {}) => {
            print_json(&client.get_case_history().await?)?;
        }
        Some(Command::Active {}) => {
            print_json(&client.get_active_cases().await?)?;
        }
        Some(Command::Debrief { session_id }) => {
            print_json(&client.get_case_debrief(&session_id).await?)?;
        }
        Some(Command::Patients { command }) => {
            patients::run(&client, command).await?;
        }
        Some(Command::Admin { command }) => {
            admin::run(&client, command).await?;
        }
        None => {}
    }

    Ok(())
}

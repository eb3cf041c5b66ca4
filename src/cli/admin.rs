use anyhow::Result;
use clap::Subcommand;

use super::print_json;
use crate::admin::Page;
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Platform-wide usage metrics
    Metrics {},
    /// Where learners get stuck
    Struggles {},
    /// List users
    Users {
        #[arg(long, default_value = "50")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show one user
    User {
        #[arg(long)]
        id: String,
    },
    /// List cases across all users
    Cases {
        #[arg(long, default_value = "50")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show one case including its conversation
    Case {
        #[arg(long)]
        session_id: String,
    },
}

pub async fn run(client: &ApiClient, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Metrics {} => print_json(&client.get_admin_metrics().await?),
        AdminCommand::Struggles {} => print_json(&client.get_struggle_metrics().await?),
        AdminCommand::Users { limit, offset } => {
            print_json(&client.get_admin_users(Page { limit, offset }).await?)
        }
        AdminCommand::User { id } => print_json(&client.get_admin_user(&id).await?),
        AdminCommand::Cases { limit, offset } => {
            print_json(&client.get_admin_cases(Page { limit, offset }).await?)
        }
        AdminCommand::Case { session_id } => print_json(&client.get_admin_case(&session_id).await?),
    }
}

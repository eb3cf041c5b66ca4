use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;

use super::print_json;
use crate::client::ApiClient;
use crate::patients::MAX_BULK_FILES;

#[derive(Subcommand)]
pub enum PatientsCommand {
    /// List imported patients
    List {},
    /// Show one imported patient
    Show {
        #[arg(long)]
        id: String,
    },
    /// Import a C-CDA XML file
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Import several C-CDA XML files at once
    ImportBulk {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove an imported patient
    Delete {
        #[arg(long)]
        id: String,
    },
}

pub async fn run(client: &ApiClient, command: PatientsCommand) -> Result<()> {
    match command {
        PatientsCommand::List {} => print_json(&client.list_patients().await?)?,
        PatientsCommand::Show { id } => print_json(&client.get_patient(&id).await?)?,
        PatientsCommand::Import { file } => {
            let file_name = file_name(&file)?;
            let contents = tokio::fs::read(&file).await?;
            let imported = client.import_patient(&file_name, contents).await?;
            for warning in imported.parse_warnings.iter() {
                tracing::warn!("{}: {}", file_name, warning);
            }
            print_json(&imported.patient)?;
        }
        PatientsCommand::ImportBulk { files } => {
            if files.len() > MAX_BULK_FILES {
                bail!("At most {} files can be imported at once", MAX_BULK_FILES);
            }
            let mut uploads = Vec::with_capacity(files.len());
            for file in files.iter() {
                uploads.push((file_name(file)?, tokio::fs::read(file).await?));
            }
            let imported = client.import_patients(uploads).await?;
            for result in imported.results.iter().filter(|r| !r.success) {
                tracing::warn!(
                    "{}: {}",
                    result.filename,
                    result.error.as_deref().unwrap_or("import failed")
                );
            }
            println!(
                "Imported {} of {} files.",
                imported.successful, imported.total_files
            );
        }
        PatientsCommand::Delete { id } => {
            let deleted = client.delete_patient(&id).await?;
            println!("{}", deleted.message);
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or(anyhow!("Invalid file path: {}", path.display()))
}

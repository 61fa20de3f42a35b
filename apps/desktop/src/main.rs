use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ClientError, Confirm, DeleteOutcome, DirectorySink, DocumentUpload, FileCredentialStore,
    ListQuery, OnboardingClient, Preconfirmed,
};
use shared::{
    domain::{ApplicationId, DocumentId, DocumentType, FilterView, ReviewDecision, Role, UserId},
    protocol::NewApplication,
};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(name = "onboarding-review", about = "Review vendor onboarding applications")]
struct Args {
    /// Versioned API base, e.g. http://localhost:5001/api/v1
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Where the signed-in session is kept between runs.
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,
    /// Answer yes to confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        username: String,
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Logout,
    Whoami,
    Dashboard,
    /// List applications for a view (all, pending, approved, flagged).
    List {
        #[arg(long, default_value = "all")]
        view: FilterView,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    /// Submit a vendor application described by a JSON file.
    Submit {
        file: PathBuf,
    },
    Review {
        id: i64,
        decision: ReviewDecision,
        #[arg(long)]
        comment: Option<String>,
    },
    Comment {
        id: i64,
        text: String,
    },
    Upload {
        id: i64,
        file: PathBuf,
        #[arg(long = "type", default_value = "document")]
        file_type: DocumentType,
    },
    Documents {
        id: i64,
    },
    Download {
        application_id: i64,
        document_id: i64,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    DeleteDocument {
        application_id: i64,
        document_id: i64,
    },
    Users,
    SetRole {
        user_id: i64,
        role: Role,
    },
    DeleteUser {
        user_id: i64,
    },
    /// Export applications matching a view and search as CSV.
    Export {
        #[arg(long, default_value = "all")]
        view: FilterView,
        #[arg(long)]
        search: Option<String>,
    },
    Import,
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}: ");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn secret(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt_line(prompt),
    }
}

fn surfaced(err: ClientError) -> anyhow::Error {
    if err.requires_reauth() {
        return anyhow!(
            "{} Run `onboarding-review login <username>` to sign in again.",
            err.user_message()
        );
    }
    anyhow!(err.user_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let settings =
        config::load_settings().with_overrides(args.api_url.clone(), args.state_path.clone());
    let store = Arc::new(FileCredentialStore::new(&settings.state_path));
    let client = OnboardingClient::new(settings.client_options(), store)
        .map_err(surfaced)
        .context("failed to initialize client")?;
    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(Preconfirmed(true))
    } else {
        Box::new(StdinConfirm)
    };

    match args.command {
        Command::Login { username, password } => {
            let password = secret(password, "Password")?;
            let session = client
                .login(&username, &password)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Signed in as {}", render::whoami(session.user.as_ref()));
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            let password = secret(password, "Password")?;
            let confirm_password = secret(confirm_password, "Confirm password")?;
            let session = client
                .register(&username, &email, &password, &confirm_password)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Registered {}", render::whoami(session.user.as_ref()));
        }
        Command::Logout => {
            client.logout().await;
            println!("Signed out");
        }
        command => {
            let Some(session) = client.restore().await else {
                bail!("Not signed in. Run `onboarding-review login <username>` first.");
            };
            if matches!(command, Command::Whoami) {
                println!("{}", render::whoami(session.user.as_ref()));
                return Ok(());
            }
            run(&client, &settings, command, confirm.as_ref()).await?;
        }
    }

    Ok(())
}

async fn run(
    client: &OnboardingClient,
    settings: &config::Settings,
    command: Command,
    confirm: &dyn Confirm,
) -> Result<()> {
    let workflow = client.workflow();
    match command {
        Command::Dashboard => match client.dashboard().await {
            Some(summary) => println!("{}", render::dashboard(&summary)),
            None => println!("Dashboard unavailable"),
        },
        Command::List { view, search } => {
            let query = ListQuery::for_view(view).with_search(search.unwrap_or_default());
            client.search(query).await.map_err(surfaced)?;
            println!(
                "{}",
                render::application_list(&client.list().snapshot().await)
            );
        }
        Command::Show { id } => {
            let view = workflow.open(ApplicationId(id)).await.map_err(surfaced)?;
            let actions = workflow.available_actions().await;
            println!("{}", render::application_detail(&view, &actions));
        }
        Command::Submit { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let application: NewApplication = serde_json::from_str(&raw)
                .with_context(|| format!("invalid application in {}", file.display()))?;
            let outcome = client
                .submit_application(&application)
                .await
                .map_err(surfaced)?;
            println!("{}", render::submission(&outcome));
        }
        Command::Review {
            id,
            decision,
            comment,
        } => {
            let id = ApplicationId(id);
            workflow.open(id).await.map_err(surfaced)?;
            let status = workflow
                .set_status(id, decision, comment.as_deref())
                .await
                .map_err(surfaced)?;
            println!("Application {status} successfully!");
        }
        Command::Comment { id, text } => {
            let id = ApplicationId(id);
            workflow.open(id).await.map_err(surfaced)?;
            workflow.add_comment(id, &text).await.map_err(surfaced)?;
            if let Some(view) = workflow.current().await {
                let actions = workflow.available_actions().await;
                println!("{}", render::application_detail(&view, &actions));
            }
        }
        Command::Upload {
            id,
            file,
            file_type,
        } => {
            let upload = DocumentUpload::from_path(&file).await.map_err(surfaced)?;
            let record = workflow
                .upload_document(ApplicationId(id), Some(upload), file_type)
                .await
                .map_err(surfaced)?;
            println!(
                "Uploaded {} ({})",
                record.filename,
                render::file_size(record.file_size)
            );
        }
        Command::Documents { id } => {
            let documents = workflow
                .refresh_documents(ApplicationId(id))
                .await
                .map_err(surfaced)?;
            println!(
                "{}",
                render::documents(&client_core::Loadable::Loaded(documents))
            );
        }
        Command::Download {
            application_id,
            document_id,
            dir,
        } => {
            let document_id = DocumentId(document_id);
            let documents = workflow
                .refresh_documents(ApplicationId(application_id))
                .await
                .map_err(surfaced)?;
            let document = documents
                .iter()
                .find(|document| document.id == document_id)
                .ok_or_else(|| anyhow!("Document {document_id} not found"))?;
            let sink = DirectorySink::new(dir.unwrap_or_else(|| settings.export_dir.clone()));
            let path = workflow
                .download_document(document.id, &document.filename, &sink)
                .await
                .map_err(surfaced)?;
            println!("Saved {}", path.display());
        }
        Command::DeleteDocument {
            application_id,
            document_id,
        } => {
            let outcome = workflow
                .delete_document(
                    DocumentId(document_id),
                    ApplicationId(application_id),
                    confirm,
                )
                .await
                .map_err(surfaced)?;
            report_delete(outcome, "Document");
        }
        Command::Users => {
            let rows = client.admin().list_users().await.map_err(surfaced)?;
            println!("{}", render::users(&rows));
        }
        Command::SetRole { user_id, role } => {
            let user = client
                .admin()
                .update_user_role(UserId(user_id), role)
                .await
                .map_err(surfaced)?;
            println!("{} is now {}", user.username, user.role);
        }
        Command::DeleteUser { user_id } => {
            let outcome = client
                .admin()
                .delete_user(UserId(user_id), confirm)
                .await
                .map_err(surfaced)?;
            report_delete(outcome, "User");
        }
        Command::Export { view, search } => {
            // Establishes the active filter without printing it.
            let query = ListQuery::for_view(view).with_search(search.unwrap_or_default());
            client.search(query).await.map_err(surfaced)?;
            let path = client
                .export_csv(&DirectorySink::new(&settings.export_dir))
                .await
                .map_err(surfaced)?;
            println!("Exported {}", path.display());
        }
        Command::Import => {
            let summary = client.import_bulk().await.map_err(surfaced)?;
            println!("{}", render::import(&summary));
        }
        Command::Login { .. } | Command::Register { .. } | Command::Logout | Command::Whoami => {
            bail!("command does not operate on a restored session")
        }
    }
    Ok(())
}

fn report_delete(outcome: DeleteOutcome, what: &str) {
    match outcome {
        DeleteOutcome::Deleted => println!("{what} deleted"),
        DeleteOutcome::Cancelled => println!("Cancelled"),
    }
}

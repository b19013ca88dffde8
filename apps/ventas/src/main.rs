use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_api_url},
    ApiClient, ClientEditForm, ClientForm, MutationOutcome, SyncController, TaskEditForm,
    TaskForm,
};
use shared::domain::{Owner, RecordId, Status};
use storage::SqliteStore;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ventas", about = "Clients and daily tasks for Sergio and Isaac")]
struct Cli {
    /// Backend base url; overrides ventas.toml and VENTAS_API_URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Local cache database; overrides ventas.toml and VENTAS_DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "VENTAS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    Clients {
        #[command(subcommand)]
        action: ClientAction,
    },
    Tasks {
        /// Task list to work on; defaults to the logged-in user's.
        #[arg(long)]
        owner: Option<Owner>,
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand, Debug)]
enum ClientAction {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        price: String,
    },
    Edit {
        id: RecordId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        status: Option<Status>,
    },
    Status {
        id: RecordId,
        status: Status,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    List,
    Add {
        title: String,
        /// Whose list the task belongs to; defaults to the selected owner.
        #[arg(long = "for")]
        assignee: Option<Owner>,
    },
    Edit {
        id: RecordId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "for")]
        assignee: Option<Owner>,
        #[arg(long)]
        status: Option<Status>,
    },
    Status {
        id: RecordId,
        status: Status,
    },
    Delete {
        id: RecordId,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = normalize_api_url(&api_url)?;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let store = SqliteStore::new(&settings.database_url).await?;
    let api = ApiClient::new(&settings.api_url, settings.request_timeout())?;
    let mut controller = SyncController::new(api, Arc::new(store)).await;

    match cli.command {
        Command::Login { username, password } => {
            controller
                .login(&username, &password)
                .await
                .map_err(|err| anyhow!(err.banner_message()))?;
            if let Some(user) = controller.user() {
                println!("Sesión activa: {}", user.name);
            }
        }
        Command::Logout => {
            controller.logout().await;
            println!("Sesión cerrada");
        }
        Command::Whoami => {
            if controller.restore_session().await {
                if let Some(user) = controller.user() {
                    println!("{} ({})", user.name, user.username);
                }
            } else {
                println!("Sin sesión");
            }
        }
        Command::Clients { action } => {
            ensure_session(&mut controller).await;
            run_client_action(&mut controller, action).await?;
        }
        Command::Tasks { owner, action } => {
            ensure_session(&mut controller).await;
            if let Some(owner) = owner {
                if owner != controller.task_owner() || !controller.is_authenticated() {
                    controller.set_task_owner(owner).await;
                }
            }
            run_task_action(&mut controller, action).await?;
        }
    }

    Ok(())
}

/// Anonymous use still works against the local copy; every write will fall
/// back locally because the backend rejects unauthenticated requests.
async fn ensure_session(controller: &mut SyncController) {
    if !controller.restore_session().await {
        warn!("not logged in; showing the local copy");
    }
}

async fn run_client_action(controller: &mut SyncController, action: ClientAction) -> Result<()> {
    let outcome = match action {
        ClientAction::List => None,
        ClientAction::Add {
            name,
            description,
            price,
        } => Some(
            controller
                .create_client(&ClientForm {
                    name,
                    description,
                    price,
                })
                .await?,
        ),
        ClientAction::Edit {
            id,
            name,
            description,
            price,
            status,
        } => {
            let current = controller
                .clients()
                .iter()
                .find(|client| client.id == id)
                .map(ClientEditForm::from)
                .ok_or_else(|| anyhow!("no client with id {id}"))?;
            let form = ClientEditForm {
                name: name.unwrap_or(current.name),
                description: description.unwrap_or(current.description),
                price: price.unwrap_or(current.price),
                status: status.unwrap_or(current.status),
            };
            Some(controller.update_client(&id, &form).await?)
        }
        ClientAction::Status { id, status } => {
            Some(controller.set_client_status(&id, status).await?)
        }
        ClientAction::Delete { id } => Some(controller.delete_client(&id).await),
    };

    report(outcome);
    if controller.clients().is_empty() {
        println!("No hay clientes registrados.");
    }
    for client in controller.clients() {
        println!(
            "{}\t{}\t{}\t${} - {}",
            client.id, client.name, client.description, client.price, client.status
        );
    }
    Ok(())
}

async fn run_task_action(controller: &mut SyncController, action: TaskAction) -> Result<()> {
    let owner = controller.task_owner();
    let outcome = match action {
        TaskAction::List => None,
        TaskAction::Add { title, assignee } => Some(
            controller
                .create_task(&TaskForm {
                    title,
                    owner: assignee.unwrap_or(owner),
                })
                .await,
        ),
        TaskAction::Edit {
            id,
            title,
            assignee,
            status,
        } => {
            let current = controller
                .tasks()
                .iter()
                .find(|task| task.id == id)
                .map(TaskEditForm::from)
                .ok_or_else(|| anyhow!("no task with id {id} in {}'s list", owner.label()))?;
            let form = TaskEditForm {
                title: title.unwrap_or(current.title),
                owner: assignee.unwrap_or(current.owner),
                status: status.unwrap_or(current.status),
            };
            Some(controller.update_task(&id, &form).await)
        }
        TaskAction::Status { id, status } => Some(controller.set_task_status(&id, status).await?),
        TaskAction::Delete { id } => Some(controller.delete_task(&id).await),
    };

    report(outcome);
    println!("Tareas de {}:", owner.label());
    if controller.tasks().is_empty() {
        println!("No hay tareas para este usuario.");
    }
    for task in controller.tasks() {
        println!("{}\t{}\t{} - {}", task.id, task.title, task.owner, task.status);
    }
    Ok(())
}

fn report(outcome: Option<MutationOutcome>) {
    match outcome {
        Some(MutationOutcome::Synced) => println!("Guardado"),
        Some(MutationOutcome::LocalOnly { message }) => {
            eprintln!("{message} (cambio guardado solo en local)")
        }
        None => {}
    }
}

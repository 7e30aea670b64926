//! Pipewright CLI — import workflow definitions, run them, inspect runs.
//!
//! A thin clap front end over pipewright-core; every command opens the
//! SQLite store, wires `AppState` and calls into the engine.

use clap::{Parser, Subcommand};
use pipewright_cli::commands;

/// Pipewright — component workflow engine
#[derive(Parser)]
#[command(name = "pipewright", version, about = "Pipewright — component workflow engine")]
pub struct Cli {
    /// Path to the SQLite database file (defaults to pipewright.db)
    #[arg(long, env = "PIPEWRIGHT_DB_PATH")]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// Manage components
    Component {
        #[command(subcommand)]
        action: ComponentAction,
    },

    /// Manage chat-completion models
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Manage business contexts (operating manuals)
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Run a workflow and print the run record
    Run {
        /// Workflow ID
        workflow_id: String,
        /// Input payload as a JSON object
        #[arg(long)]
        payload: Option<String>,
        /// Identity the run executes on behalf of (enables usage records)
        #[arg(long)]
        user: Option<String>,
        /// Business context whose manual is injected into prompt skills
        #[arg(long)]
        context: Option<String>,
    },

    /// Inspect past runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },

    /// Manage skills
    Skill {
        #[command(subcommand)]
        action: SkillAction,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Import a workflow from a YAML or JSON file
    Import {
        file: String,
    },
    /// List workflows
    List,
    /// Check a stored workflow's step graph and component references
    Validate {
        /// Workflow ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ComponentAction {
    /// Import one component or a list of components from a YAML or JSON file
    Import {
        file: String,
    },
    /// List components
    List,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Register a model deployment
    Add {
        /// Model family name (used for cost estimates)
        #[arg(long)]
        name: String,
        /// Deployment name on the provider
        #[arg(long)]
        deployment: String,
        /// Provider API version
        #[arg(long, default_value = "2024-02-01")]
        api_version: String,
        #[arg(long)]
        description: Option<String>,
        /// Mark the model active
        #[arg(long)]
        active: bool,
    },
    /// Turn a model on (or off with --off)
    Activate {
        /// Model ID
        id: String,
        #[arg(long)]
        off: bool,
    },
    /// List models
    List,
}

#[derive(Subcommand)]
enum ContextAction {
    /// Create a business context
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: Option<String>,
        /// File holding the manual text
        #[arg(long)]
        manual_file: Option<String>,
        /// Workflow this context is meant for
        #[arg(long)]
        workflow: Option<String>,
    },
    /// List business contexts
    List,
}

#[derive(Subcommand)]
enum RunsAction {
    /// Show one run
    Show {
        /// Run ID
        id: String,
    },
    /// List runs, optionally for one workflow
    List {
        /// Workflow ID
        workflow_id: Option<String>,
        /// Maximum runs when no workflow is given
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show usage records and total estimated cost for a user
    Usage {
        /// User ID
        user: String,
    },
}

#[derive(Subcommand)]
enum SkillAction {
    /// Sync skill folders into the catalog
    Sync,
    /// List cataloged skills
    List {
        /// Only active skills
        #[arg(long)]
        active: bool,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipewright_core=info,pipewright_cli=info".into()),
        )
        .init();

    let Some(command) = cli.command else {
        // No subcommand — show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        return;
    };

    let state = commands::init_state(cli.db.as_deref());
    let result = match command {
        Commands::Workflow { action } => match action {
            WorkflowAction::Import { file } => {
                commands::workflow::import(&state, &file).await.map(|_| ())
            }
            WorkflowAction::List => commands::workflow::list(&state).await,
            WorkflowAction::Validate { id } => {
                match commands::workflow::validate(&state, &id).await {
                    Ok(problems) if problems.is_empty() => Ok(()),
                    Ok(problems) => Err(format!("{} problem(s) found", problems.len())),
                    Err(e) => Err(e),
                }
            }
        },

        Commands::Component { action } => match action {
            ComponentAction::Import { file } => {
                commands::component::import(&state, &file).await.map(|_| ())
            }
            ComponentAction::List => commands::component::list(&state).await,
        },

        Commands::Model { action } => match action {
            ModelAction::Add {
                name,
                deployment,
                api_version,
                description,
                active,
            } => commands::model::add(
                &state,
                &name,
                &deployment,
                &api_version,
                description.as_deref(),
                active,
            )
            .await
            .map(|_| ()),
            ModelAction::Activate { id, off } => {
                commands::model::activate(&state, &id, !off).await
            }
            ModelAction::List => commands::model::list(&state).await,
        },

        Commands::Context { action } => match action {
            ContextAction::Add {
                name,
                department,
                manual_file,
                workflow,
            } => commands::context::add(
                &state,
                &name,
                department.as_deref(),
                manual_file.as_deref(),
                workflow.as_deref(),
            )
            .await
            .map(|_| ()),
            ContextAction::List => commands::context::list(&state).await,
        },

        Commands::Run {
            workflow_id,
            payload,
            user,
            context,
        } => commands::run::execute(
            &state,
            &workflow_id,
            payload.as_deref(),
            user.as_deref(),
            context.as_deref(),
        )
        .await
        .map(|_| ()),

        Commands::Runs { action } => match action {
            RunsAction::Show { id } => commands::runs::show(&state, &id).await,
            RunsAction::List { workflow_id, limit } => {
                commands::runs::list(&state, workflow_id.as_deref(), limit).await
            }
            RunsAction::Usage { user } => commands::runs::usage(&state, &user).await,
        },

        Commands::Skill { action } => match action {
            SkillAction::Sync => commands::skill::sync(&state).await.map(|_| ()),
            SkillAction::List { active } => commands::skill::list(&state, active).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

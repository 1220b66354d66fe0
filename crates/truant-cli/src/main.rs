// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! truant - a command-line control plane for the session supervisor.
//!
//! Every invocation is short-lived: commands that need a live agent
//! bracket their work with `recover_sessions` (reattach every persisted
//! session) and `suspend_all_sessions` (detach and persist again) so no
//! agent subprocess outlives the command that touched it. Read-only
//! commands skip the bracket entirely and answer straight from the
//! persisted session table.

mod agents;
mod console_control_plane;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use truant_core::{ChannelId, SystemClock};
use truant_daemon::{CommandFacade, Config, SessionManager, SubprocessTracker};
use truant_storage::{FsMessageStore, FsProjectStore, FsSessionStore, MessageStore, ProjectStore, TemplateStore};

use console_control_plane::ConsoleControlPlane;

#[derive(Parser)]
#[command(name = "truant", version, about = "Supervise AI coding-agent sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, list, remove, or auto-initialize projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    /// Start a new session against a registered project
    New {
        project: String,
        #[arg(short, long)]
        verbose: bool,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        template: Option<String>,
    },
    /// List every known session
    Sessions,
    /// Send a text message into a session
    Send { channel_id: String, text: String },
    /// Show a session's current status
    Status { channel_id: String },
    /// Stop a session without merging its work
    Stop { channel_id: String },
    /// Merge a session's branch onto main and tear down its workspace
    Complete { channel_id: String },
    /// Answer a pending tool-permission request
    Permission {
        channel_id: String,
        request_id: String,
        #[arg(value_enum)]
        decision: Decision,
    },
    /// List available workspace templates
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    Add { name: String, path: PathBuf },
    List,
    Remove { name: String },
    /// Create `<BASE_PATH>/<name>` as a fresh repository and register it
    Init { name: String },
}

#[derive(Subcommand)]
enum TemplateCommand {
    List,
}

#[derive(Clone, clap::ValueEnum)]
enum Decision {
    Allow,
    Deny,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    let project_store: Arc<dyn ProjectStore> =
        Arc::new(FsProjectStore::open(config.projects_path.clone()).context("opening project store")?);
    let message_store: Arc<dyn MessageStore> =
        Arc::new(FsMessageStore::open(config.messages_dir.clone()).context("opening message store")?);
    let session_store = Arc::new(
        FsSessionStore::open(config.sessions_path.clone()).context("opening session store")?,
    );
    let template_store = Arc::new(TemplateStore::load(&config.templates_dir));

    let subprocess_tracker = Arc::new(SubprocessTracker::new());
    subprocess_tracker.set_pid_file(config.pid_path.clone());
    subprocess_tracker.cleanup_stale_pids();

    let session_manager = Arc::new(SessionManager::new(
        session_store,
        Arc::new(agents::default_registry()),
        truant_eventbus::EventBus::new(),
        Some(Arc::new(ConsoleControlPlane)),
        Vec::new(),
        SystemClock,
        config.logs_dir.clone(),
        Default::default(),
        subprocess_tracker,
    ));

    let facade = CommandFacade::new(
        session_manager,
        project_store,
        message_store,
        template_store,
        SystemClock,
        config.base_path.clone(),
        None,
        None,
    );

    run(&cli.command, &facade).await
}

async fn run(command: &Commands, facade: &CommandFacade) -> Result<()> {
    match command {
        Commands::Project { command } => project_command(command, facade).await,
        Commands::New {
            project,
            verbose,
            agent,
            template,
        } => {
            let info = facade
                .new_session(project, *verbose, None, agent.as_deref(), template.as_deref())
                .await?;
            facade.suspend_all_sessions().await?;
            println!(
                "created session {} (channel {}) for project {}",
                info.name, info.channel_id, info.project_name
            );
            Ok(())
        }
        Commands::Sessions => {
            for info in facade.list_sessions() {
                println!("{}\t{}\t{}\t{}", info.channel_id, info.name, info.project_name, info.state);
            }
            Ok(())
        }
        Commands::Send { channel_id, text } => {
            let channel_id = ChannelId::new(channel_id.as_str());
            facade.recover_sessions().await?;
            let sent = facade.send_message(&channel_id, text).await?;
            facade.suspend_all_sessions().await?;
            if !sent {
                return Err(anyhow!("no such session: {channel_id}"));
            }
            Ok(())
        }
        Commands::Status { channel_id } => {
            let channel_id = ChannelId::new(channel_id.as_str());
            let status = facade.get_status(&channel_id)?;
            println!(
                "{}\t{}\t{}\t{}",
                status.name,
                status.project_name,
                status.state,
                status.workspace_path.display()
            );
            Ok(())
        }
        Commands::Stop { channel_id } => {
            let channel_id = ChannelId::new(channel_id.as_str());
            facade.recover_sessions().await?;
            let stopped = facade.stop_session(&channel_id).await?;
            facade.suspend_all_sessions().await?;
            if !stopped {
                return Err(anyhow!("no such session: {channel_id}"));
            }
            Ok(())
        }
        Commands::Complete { channel_id } => {
            let channel_id = ChannelId::new(channel_id.as_str());
            facade.recover_sessions().await?;
            let (merged, detail) = facade.complete_session(&channel_id).await?;
            facade.suspend_all_sessions().await?;
            println!("{}", detail);
            if !merged {
                return Err(anyhow!("session left running: {detail}"));
            }
            Ok(())
        }
        Commands::Permission {
            channel_id,
            request_id,
            decision,
        } => {
            let channel_id = ChannelId::new(channel_id.as_str());
            let allowed = matches!(decision, Decision::Allow);
            facade.recover_sessions().await?;
            let handled = facade.permission_response(&channel_id, request_id, allowed).await?;
            facade.suspend_all_sessions().await?;
            if !handled {
                return Err(anyhow!("no pending permission request {request_id} on {channel_id}"));
            }
            Ok(())
        }
        Commands::Template { command } => match command {
            TemplateCommand::List => {
                for template in facade.list_templates() {
                    println!("{}\t{}", template.name, template.description);
                }
                Ok(())
            }
        },
    }
}

async fn project_command(command: &ProjectCommand, facade: &CommandFacade) -> Result<()> {
    match command {
        ProjectCommand::Add { name, path } => {
            let (_, message) = facade.add_project(name, path.clone())?;
            println!("{message}");
            Ok(())
        }
        ProjectCommand::List => {
            for project in facade.list_projects() {
                println!("{}\t{}", project.name, project.path.display());
            }
            Ok(())
        }
        ProjectCommand::Remove { name } => {
            let (_, message) = facade.remove_project(name)?;
            println!("{message}");
            Ok(())
        }
        ProjectCommand::Init { name } => {
            let (_, message) = facade.init_project(name).await?;
            println!("{message}");
            Ok(())
        }
    }
}

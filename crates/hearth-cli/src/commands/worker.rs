// SPDX-License-Identifier: MIT

//! `hearth worker` - read-only inspection of worker task rows (§4.7, §4.8).
//! This binary has no `WorkerBackend`, so it can observe and retire rows but
//! never spawn or cancel one — that is `hearthd`'s job.

use anyhow::Result;
use clap::{Args, Subcommand};
use hearth_core::{ConversationId, WorkerTask, WorkerTaskId};
use hearth_store::Store;

use crate::output::{emit, OutputFormat};

#[derive(Args)]
pub struct WorkerArgs {
    #[command(subcommand)]
    pub command: WorkerCommand,
}

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Show one worker task
    Status { id: String },
    /// List worker tasks for a conversation
    List {
        #[arg(long)]
        conversation: String,
    },
    /// Delete terminal rows older than the given age
    Cleanup {
        #[arg(long = "older-than-hours", default_value_t = 72)]
        older_than_hours: i64,
    },
}

pub fn run(store: &Store, args: WorkerArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        WorkerCommand::Status { id } => {
            let task = store.get_worker_task(parse_id(&id)?)?;
            print_task(format, &task)
        }
        WorkerCommand::List { conversation } => {
            let tasks = store.worker_tasks_for_conversation(&ConversationId::new(conversation));
            emit(format, &tasks, |tasks| {
                if tasks.is_empty() {
                    println!("No worker tasks found.");
                    return;
                }
                for task in tasks {
                    print_task_line(task);
                }
            })
        }
        WorkerCommand::Cleanup { older_than_hours } => {
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(older_than_hours);
            let deleted = store.cleanup_terminal_worker_tasks(cutoff)?;
            emit(format, &serde_json::json!({ "deleted": deleted }), |_| {
                println!("deleted {deleted} terminal worker task(s)");
            })
        }
    }
}

fn parse_id(raw: &str) -> Result<WorkerTaskId> {
    let uuid: uuid::Uuid = raw.parse()?;
    Ok(WorkerTaskId::from_uuid(uuid))
}

fn print_task(format: OutputFormat, task: &WorkerTask) -> Result<()> {
    emit(format, task, |t| print_task_line(t))
}

fn print_task_line(task: &WorkerTask) {
    println!(
        "{}  {:<10}  {:<8}  {}",
        task.task_id,
        task.status,
        task.model,
        task.task_description,
    );
}

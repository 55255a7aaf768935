//! `codepad tasks` - task board commands

use crate::cli::truncate;
use clap::Subcommand;
use codepad_foundation::{CodepadConfig, Error, Result};
use codepad_tasks::{Task, TaskClient};
use serde_json::{Map, Value};
use std::process::ExitCode;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List all tasks
    List {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one task
    Get { id: String },
    /// Create a task
    Create {
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Update a task
    Update {
        id: String,

        #[command(flatten)]
        fields: TaskFields,
    },
    /// Delete a task
    Delete { id: String },
}

/// Task fields given on the command line
#[derive(clap::Args, Debug, Default)]
pub struct TaskFields {
    /// Full JSON object to send; the flags below are merged on top
    #[arg(long)]
    json: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    status: Option<String>,
}

impl TaskFields {
    fn into_payload(self) -> Result<Value> {
        let mut payload = match self.json {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(Error::InvalidInput(format!(
                        "--json must be a JSON object, got {}",
                        other
                    )))
                }
                Err(e) => {
                    return Err(Error::InvalidInput(format!("--json is not valid JSON: {}", e)))
                }
            },
            None => Map::new(),
        };

        for (key, value) in [
            ("title", self.title),
            ("description", self.description),
            ("status", self.status),
        ] {
            if let Some(value) = value {
                payload.insert(key.to_string(), Value::String(value));
            }
        }

        if payload.is_empty() {
            return Err(Error::InvalidInput(
                "nothing to send: pass --json or at least one of --title, --description, --status"
                    .to_string(),
            ));
        }
        Ok(Value::Object(payload))
    }
}

pub async fn run(config: &CodepadConfig, command: TaskCommand) -> anyhow::Result<ExitCode> {
    let client = TaskClient::from_config(&config.api)?;

    match execute(&client, command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            report(&err, &config.api.base_url);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(client: &TaskClient, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List { json } => {
            let tasks = client.list_tasks().await?;
            if json {
                print_json(&tasks);
            } else {
                print_table(&tasks);
            }
        }
        TaskCommand::Get { id } => print_json(&client.get_task(id).await?),
        TaskCommand::Create { fields } => {
            let payload = fields.into_payload()?;
            print_json(&client.create_task(&payload).await?);
        }
        TaskCommand::Update { id, fields } => {
            let payload = fields.into_payload()?;
            print_json(&client.update_task(id, &payload).await?);
        }
        TaskCommand::Delete { id } => {
            let confirmation = client.delete_task(id).await?;
            if confirmation.is_null() {
                println!("Deleted.");
            } else {
                print_json(&confirmation);
            }
        }
    }
    Ok(())
}

fn report(err: &Error, base_url: &str) {
    eprintln!("{}", describe(err, base_url));
    if err.is_retryable() {
        eprintln!("  The service may be temporarily unavailable; try again.");
    }
}

fn describe(err: &Error, base_url: &str) -> String {
    match err {
        Error::Transport(msg) => {
            format!("Could not reach the task service at {}: {}", base_url, msg)
        }
        Error::HttpStatus { status, body } if !body.trim().is_empty() => {
            format!("Task service returned HTTP {}\n{}", status, body.trim())
        }
        Error::HttpStatus { status, .. } => format!("Task service returned HTTP {}", status),
        Error::InvalidResponse(msg) => format!("Unexpected response from task service: {}", msg),
        other if other.is_user_facing() => other.to_string(),
        other => format!("Task command failed: {}", other),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to format response: {}", e),
    }
}

fn print_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    println!("{:<12} {:<12} {:<40}", "ID", "Status", "Title");
    println!("{}", "-".repeat(64));
    for task in tasks {
        println!("{}", table_row(task));
    }
}

fn table_row(task: &Task) -> String {
    format!(
        "{:<12} {:<12} {:<40}",
        truncate(task.id.as_str(), 12),
        task.status().unwrap_or("-"),
        truncate(task.title().unwrap_or("(untitled)"), 40)
    )
    .trim_end()
    .to_string()
}

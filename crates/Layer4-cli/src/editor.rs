//! `codepad editor` - run Python through the execution session
//!
//! With a file (or `-` for stdin) the source runs once. Without one, an
//! interactive prompt feeds each entry to the same session, so names
//! defined in one entry stay visible in the next.

use crate::cli::print_outcome;
use codepad_foundation::CodepadConfig;
use codepad_runtime::PythonSession;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

pub async fn run(config: &CodepadConfig, file: Option<&Path>, json: bool) -> anyhow::Result<ExitCode> {
    let session = PythonSession::python(&config.runtime)?;

    let source = match file {
        None => {
            let exit = repl(&session).await;
            session.shutdown().await;
            return Ok(exit);
        }
        Some(path) if path == Path::new("-") => {
            let mut source = String::new();
            tokio::io::stdin().read_to_string(&mut source).await?;
            source
        }
        Some(path) => tokio::fs::read_to_string(path).await?,
    };

    let outcome = session.execute(&source).await;
    session.shutdown().await;

    let ok = if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        outcome.is_success()
    } else {
        print_outcome(&outcome)
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn repl(session: &PythonSession) -> ExitCode {
    eprintln!("Starting Python...");
    if let Err(e) = session.warm_up().await {
        eprintln!("Python failed to start: {}", e);
        return ExitCode::FAILURE;
    }
    eprintln!("Ready. End a block with an empty line, :quit or Ctrl-D to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut block = Block::default();

    loop {
        prompt(if block.is_open() { "... " } else { ">>> " });

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                return ExitCode::FAILURE;
            }
        };

        if !block.is_open() && matches!(line.trim(), ":q" | ":quit") {
            break;
        }

        if let Some(source) = block.push(&line) {
            let outcome = session.execute(&source).await;
            print_outcome(&outcome);
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}

/// Collects prompt lines into one source unit.
///
/// A plain line is a complete unit. A line ending in `:` (or a decorator)
/// opens a block that runs once an empty line is entered.
#[derive(Debug, Default)]
struct Block {
    lines: Vec<String>,
}

impl Block {
    fn is_open(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Feed one line; returns source ready to run
    fn push(&mut self, line: &str) -> Option<String> {
        if self.is_open() {
            if line.trim().is_empty() {
                return Some(self.take());
            }
            self.lines.push(line.to_string());
            return None;
        }

        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            return None;
        }
        if trimmed.ends_with(':') || trimmed.starts_with('@') || trimmed.ends_with('\\') {
            self.lines.push(line.to_string());
            return None;
        }
        Some(line.to_string())
    }

    fn take(&mut self) -> String {
        let mut source = self.lines.join("\n");
        source.push('\n');
        self.lines.clear();
        source
    }
}

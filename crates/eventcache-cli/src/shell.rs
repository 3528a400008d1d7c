//! Interactive shell. One coordinator lives for the whole session, so reads
//! hit the cache until entries go stale or a mutation invalidates them.

use std::io;

use anyhow::{bail, Result};
use clap::Parser;
use dialoguer::Input;
use tracing::info;

use crate::app::App;
use crate::cli::{ShellCommand, ShellLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// A failed command, including an interrupted prompt, is reported and the
/// session goes on.
fn after_command(result: Result<bool>) -> Flow {
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }
    Flow::Continue
}

pub async fn run(app: &mut App) -> Result<()> {
    info!("Shell session started");
    println!("Type `help` for commands, `exit` to leave.");

    loop {
        let line = match Input::<String>::new()
            .with_prompt(format!("eventcache {}", app.current_route()))
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        let args = match split_args(&line) {
            Ok(args) if args.is_empty() => continue,
            Ok(args) => args,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };

        let command = match ShellLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let flow = match command {
            ShellCommand::Event(command) => after_command(app.run(command).await),
            ShellCommand::Refresh => {
                app.refresh().await;
                Flow::Continue
            }
            ShellCommand::Status => {
                app.print_status();
                Flow::Continue
            }
            ShellCommand::Exit => Flow::Exit,
        };
        if flow == Flow::Exit {
            break;
        }
    }

    info!("Shell session ended");
    Ok(())
}

/// Split a command line into words. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
pub fn split_args(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => match chars.next() {
                Some(next) => {
                    current.push(next);
                    in_word = true;
                }
                None => bail!("trailing backslash"),
            },
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("unterminated {} quote", q);
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}

//! Interactive prompts on the controlling terminal.
//!
//! Questions go to stderr and answers are read line by line from stdin on a
//! blocking thread. Typing `q` or closing stdin cancels the operation that
//! asked; an empty answer to a yes/no question means no.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use nodeattach_core::AttachError;
use nodeattach_core::collab::Prompter;
use nodeattach_core::error::Result;
use tracing::warn;

/// Prompter reading answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// Print `prompt` and read one trimmed line. `q`, EOF and read failures cancel.
    async fn ask(prompt: String) -> Result<String> {
        let line = tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
            let mut stderr = io::stderr().lock();
            write!(stderr, "{prompt}")?;
            stderr.flush()?;

            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line.trim().to_string()))
        })
        .await;

        match line {
            Ok(Ok(Some(answer))) if answer != "q" => Ok(answer),
            Ok(Ok(_)) => Err(AttachError::UserCancelled),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read answer from terminal");
                Err(AttachError::UserCancelled)
            }
            Err(e) => {
                warn!(error = %e, "Prompt task failed");
                Err(AttachError::UserCancelled)
            }
        }
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm(&self, question: &str) -> Result<bool> {
        loop {
            let answer = Self::ask(format!("{question} [y/N/q] ")).await?;
            match parse_yes_no(&answer) {
                Some(yes) => return Ok(yes),
                None => eprintln!("Please answer y, n or q."),
            }
        }
    }

    async fn read_text(&self, prompt: &str, initial: Option<&str>) -> Result<String> {
        let shown = match initial {
            Some(initial) => format!("{prompt} [{initial}] "),
            None => format!("{prompt} "),
        };
        let answer = Self::ask(shown).await?;
        match (answer.is_empty(), initial) {
            (false, _) => Ok(answer),
            (true, Some(initial)) => Ok(initial.to_string()),
            (true, None) => Err(AttachError::UserCancelled),
        }
    }

    async fn choose(&self, prompt: &str, choices: &[&str]) -> Result<usize> {
        let mut menu = format!("{prompt}\n");
        for (i, choice) in choices.iter().enumerate() {
            menu.push_str(&format!("  {}) {choice}\n", i + 1));
        }
        menu.push_str("> ");
        loop {
            let answer = Self::ask(menu.clone()).await?;
            match parse_choice(&answer, choices.len()) {
                Some(index) => return Ok(index),
                None => eprintln!("Please pick a number between 1 and {}.", choices.len()),
            }
        }
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// 1-based menu answer to a 0-based index.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let picked: usize = answer.parse().ok()?;
    (1..=count).contains(&picked).then(|| picked - 1)
}

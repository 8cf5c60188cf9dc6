//! Terminal interaction with the operator.

use std::fmt::{Display, Write as _};

use cachebench_core::Prompter;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Asks questions on stdout and reads answers from stdin.
///
/// A closed stdin answers every question with "no".
pub struct TerminalPrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await.ok()?;
        stdout.flush().await.ok()?;
        self.lines.lock().await.next_line().await.ok().flatten()
    }

    /// Asks the operator to pick one of `choices`, by number or by name.
    ///
    /// Returns `None` once stdin is closed.
    pub async fn select<T: Copy + Display>(&self, title: &str, choices: &[T]) -> Option<T> {
        let mut prompt = format!("{title}\n");
        for (index, choice) in choices.iter().enumerate() {
            let _ = writeln!(prompt, "  {}) {choice}", index + 1);
        }
        prompt.push_str("> ");

        loop {
            let answer = self.ask(&prompt).await?;
            if let Some(choice) = parse_choice(answer.trim(), choices) {
                return Some(choice);
            }
        }
    }
}

fn parse_choice<T: Copy + Display>(answer: &str, choices: &[T]) -> Option<T> {
    if let Some(choice) = answer
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| choices.get(index))
    {
        return Some(*choice);
    }

    choices
        .iter()
        .find(|choice| choice.to_string().eq_ignore_ascii_case(answer))
        .copied()
}

fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Prompter for TerminalPrompter {
    async fn confirm(&self, message: &str) -> bool {
        let prompt = format!("{message} [y/n] ");
        loop {
            let Some(answer) = self.ask(&prompt).await else {
                return false;
            };
            if let Some(confirmed) = parse_confirmation(&answer) {
                return confirmed;
            }
        }
    }

    async fn acknowledge(&self, message: &str) {
        let prompt = format!("{message}\nPress Enter to proceed with this operation...\n");
        let _ = self.ask(&prompt).await;
    }
}

#[cfg(test)]
mod tests {
    use cachebench_core::Environment;

    use super::*;

    const ENVIRONMENTS: [Environment; 3] =
        [Environment::Gating, Environment::Lab, Environment::Custom];

    #[test]
    fn choices_match_by_number_or_name() {
        assert_eq!(parse_choice("2", &ENVIRONMENTS), Some(Environment::Lab));
        assert_eq!(parse_choice("custom", &ENVIRONMENTS), Some(Environment::Custom));
        assert_eq!(parse_choice("0", &ENVIRONMENTS), None);
        assert_eq!(parse_choice("4", &ENVIRONMENTS), None);
        assert_eq!(parse_choice("staging", &ENVIRONMENTS), None);
    }

    #[test]
    fn confirmations_accept_short_and_long_forms() {
        assert_eq!(parse_confirmation(" Y "), Some(true));
        assert_eq!(parse_confirmation("no"), Some(false));
        assert_eq!(parse_confirmation("maybe"), None);
    }
}

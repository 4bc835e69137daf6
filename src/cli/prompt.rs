//! Terminal prompts.

use crate::core::reconciler::{Choice, Prompter};
use crate::Result;
use dialoguer::console::Term;
use dialoguer::{Confirm, Input, MultiSelect, Password};

/// Interactive prompter on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn select_many(&self, message: &str, choices: &[Choice]) -> Result<Vec<usize>> {
        if choices.is_empty() {
            return Ok(Vec::new());
        }
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
        let defaults: Vec<bool> = choices.iter().map(|c| c.checked).collect();
        let selected = MultiSelect::new()
            .with_prompt(format!("{} (space to toggle, enter to accept)", message))
            .items(&labels)
            .defaults(&defaults)
            .interact_on(&Term::stderr())?;
        Ok(selected)
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(true)
            .interact_on(&Term::stderr())?)
    }
}

/// Ask for credentials, reusing a username given on the command line.
pub fn ask_credentials(server: &str, user: Option<&str>) -> Result<(String, String)> {
    let term = Term::stderr();
    let username = match user {
        Some(user) => user.to_string(),
        None => Input::<String>::new()
            .with_prompt(format!("Username for {}", server))
            .interact_text_on(&term)?,
    };
    let password = Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact_on(&term)?;
    Ok((username, password))
}

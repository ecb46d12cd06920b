//! Replica password acquisition

use anyhow::{Context, Result};
use replication::Password;
use std::fs;
use std::path::{Path, PathBuf};

/// Where the replica password comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PasswordSource {
    /// Ask on the terminal
    Prompt,
    /// Plain text file, surrounding whitespace trimmed
    File(PathBuf),
    /// Given directly
    Literal(Password),
}

impl PasswordSource {
    pub fn resolve(&self, user: &str) -> Result<Password> {
        match self {
            PasswordSource::Prompt => {
                let value = dialoguer::Password::new()
                    .with_prompt(format!("Enter replica MySQL password for {}", user))
                    .allow_empty_password(true)
                    .interact()
                    .context("Failed to read password from terminal")?;
                Ok(Password::new(value))
            }
            PasswordSource::File(path) => read_password_file(path),
            PasswordSource::Literal(password) => Ok(password.clone()),
        }
    }
}

/// Read a password file
pub fn read_password_file(path: &Path) -> Result<Password> {
    let path = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read password file {}", path.display()))?;
    Ok(Password::new(content.trim()))
}

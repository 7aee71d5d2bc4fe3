//! External editor support

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::Write;
use std::time::SystemTime;
use tokio::process::Command;
use tracing::debug;

/// Interactive document editing
#[async_trait]
pub trait Editor: Send + Sync {
    /// Let the user edit `document`
    ///
    /// Returns `None` when the editor exited without writing the file.
    async fn edit(&self, document: &str) -> Result<Option<String>>;
}

/// Editor command from `$VISUAL`, then `$EDITOR`, then `vi`
pub fn editor_command(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string())
}

/// The user's editor, run on a temporary file
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    /// Editor configured in the environment
    pub fn from_env() -> Self {
        Self::new(editor_command(|key| std::env::var(key).ok()))
    }

    /// Specific editor command; may include arguments (`code --wait`)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

fn modified(path: &std::path::Path) -> Result<SystemTime> {
    Ok(std::fs::metadata(path)?.modified()?)
}

#[async_trait]
impl Editor for ExternalEditor {
    async fn edit(&self, document: &str) -> Result<Option<String>> {
        let file = tempfile::Builder::new()
            .prefix("revstack-")
            .suffix(".md")
            .tempfile()?;
        {
            let mut handle = file.reopen()?;
            handle.write_all(document.as_bytes())?;
            handle.flush()?;
        }
        let path = file.into_temp_path();
        let before = modified(&path)?;

        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Editor("editor command is empty".to_string()))?;

        debug!(editor = %self.command, path = %path.display(), "opening editor");
        let status = Command::new(program)
            .args(parts)
            .arg(&path)
            .status()
            .await
            .map_err(|e| Error::Editor(format!("failed to start '{program}': {e}")))?;

        if !status.success() {
            return Err(Error::Editor(format!("'{}' exited with {status}", self.command)));
        }

        let edited = tokio::fs::read_to_string(&path).await?;
        if modified(&path)? == before && edited == document {
            debug!("editor closed without saving");
            return Ok(None);
        }
        Ok(Some(edited))
    }
}

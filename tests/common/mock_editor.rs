//! Scripted editor for testing

#![allow(dead_code)]

use async_trait::async_trait;
use revstack::error::Result;
use revstack::template::Editor;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted editor session
pub enum Reply {
    /// Quit without saving
    Cancel,
    /// Save the document unchanged
    Keep,
    /// Replace the whole document
    Replace(String),
    /// Edit the document that was presented
    Edit(Box<dyn Fn(&str) -> String + Send + Sync>),
}

impl Reply {
    /// Fill in the test plan and leave everything else alone
    pub fn fill_test_plan(plan: &'static str) -> Self {
        Self::Edit(Box::new(move |doc| {
            doc.replacen("[test-plan]\n", &format!("[test-plan]\n{plan}\n"), 1)
        }))
    }

    /// Fill in the test plan and reviewers
    pub fn fill(plan: &'static str, reviewers: &'static str) -> Self {
        Self::Edit(Box::new(move |doc| {
            doc.replacen("[test-plan]\n", &format!("[test-plan]\n{plan}\n"), 1)
                .replacen("[reviewers]\n", &format!("[reviewers]\n{reviewers}\n"), 1)
        }))
    }
}

/// Editor that replies from a script and records what it was shown
#[derive(Default)]
pub struct ScriptedEditor {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedEditor {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Documents presented so far
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Number of editor sessions
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Editor for ScriptedEditor {
    async fn edit(&self, document: &str) -> Result<Option<String>> {
        self.seen.lock().unwrap().push(document.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Cancel);
        Ok(match reply {
            Reply::Cancel => None,
            Reply::Keep => Some(document.to_string()),
            Reply::Replace(text) => Some(text),
            Reply::Edit(f) => Some(f(document)),
        })
    }
}

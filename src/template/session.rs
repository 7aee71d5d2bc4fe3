//! Generate / edit / validate / resume cycle

use super::{DraftStore, Editor, TemplateFields, ValidationRules, is_blank, parse, validate};
use crate::error::{Error, Result};
use tracing::{debug, info};

/// Where a session begins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// A freshly generated document
    Generate(String),
    /// The newest saved document for the branch
    Resume,
}

/// Step of a metadata session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Fresh document ready to present
    Generate(String),
    /// Saved document to reopen
    Resume,
    /// Document handed to the editor
    Edit(String),
    /// Document to parse and check
    Validate(String),
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Valid metadata
    Ready {
        /// Parsed fields
        fields: TemplateFields,
        /// Document they were parsed from
        document: String,
    },
    /// User backed out; nothing to submit
    Cancelled,
}

/// Drives one document through editing and validation
///
/// A document that fails validation is written to the draft store and the
/// session fails with [`Error::Validation`] naming the saved file.
pub struct MetadataSession<'a> {
    editor: &'a dyn Editor,
    store: &'a DraftStore,
    branch: &'a str,
    rules: ValidationRules<'a>,
    skip_editor: bool,
}

impl<'a> MetadataSession<'a> {
    /// Session for `branch`
    pub fn new(
        editor: &'a dyn Editor,
        store: &'a DraftStore,
        branch: &'a str,
        rules: ValidationRules<'a>,
    ) -> Self {
        Self {
            editor,
            store,
            branch,
            rules,
            skip_editor: false,
        }
    }

    /// Validate documents as they are, without opening the editor
    #[must_use]
    pub const fn skip_editor(mut self, skip: bool) -> Self {
        self.skip_editor = skip;
        self
    }

    fn present(&self, document: String) -> SessionState {
        if self.skip_editor {
            SessionState::Validate(document)
        } else {
            SessionState::Edit(document)
        }
    }

    /// Run the session to completion
    pub async fn run(&self, start: SessionStart) -> Result<EditOutcome> {
        let mut state = match start {
            SessionStart::Generate(document) => SessionState::Generate(document),
            SessionStart::Resume => SessionState::Resume,
        };

        loop {
            debug!(state = state_name(&state), "metadata session");
            state = match state {
                SessionState::Generate(document) => self.present(document),
                SessionState::Resume => {
                    let (draft, document) =
                        self.store.latest(self.branch).await?.ok_or_else(|| {
                            Error::Editor(format!(
                                "no saved review template for '{}'; run submit without --continue",
                                self.branch
                            ))
                        })?;
                    info!(path = %draft.path.display(), "resuming saved review template");
                    self.present(document)
                }
                SessionState::Edit(document) => match self.editor.edit(&document).await? {
                    Some(edited) => SessionState::Validate(edited),
                    None => return Ok(EditOutcome::Cancelled),
                },
                SessionState::Validate(document) => return self.finish(document).await,
            };
        }
    }

    async fn finish(&self, document: String) -> Result<EditOutcome> {
        if is_blank(&document) {
            return Ok(EditOutcome::Cancelled);
        }

        let fields = parse(&document);
        let errors = validate(&fields, &self.rules);
        if errors.is_empty() {
            return Ok(EditOutcome::Ready { fields, document });
        }

        let draft = self.store.save(self.branch, &document).await?;
        Err(Error::Validation { errors, draft })
    }
}

const fn state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Generate(_) => "generate",
        SessionState::Resume => "resume",
        SessionState::Edit(_) => "edit",
        SessionState::Validate(_) => "validate",
    }
}

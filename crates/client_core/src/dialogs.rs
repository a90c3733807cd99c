//! Add/edit dialogs, the delete confirmation countdown and the error dialog.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::debug;

use crate::{
    error::{ClientError, ValidationError},
    http::SsisClient,
    resource::{Draft, Resource},
};

/// The delete button stays disabled this long after the dialog opens.
pub const DELETE_COUNTDOWN: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Add,
    /// Editing the record currently stored under `original_key`.
    Edit { original_key: String },
}

impl DialogMode {
    /// "add" or "update", for messages about the save.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit { .. } => "update",
        }
    }
}

pub struct EditorDialog<E: Resource> {
    mode: DialogMode,
    pub draft: E::Draft,
    open: bool,
    in_flight: bool,
    error: Option<String>,
}

impl<E: Resource> EditorDialog<E> {
    pub fn add(draft: E::Draft) -> Self {
        Self::with_mode(DialogMode::Add, draft)
    }

    /// Prefilled from the record being edited.
    pub fn edit(record: &E) -> Self {
        Self::with_mode(
            DialogMode::Edit {
                original_key: record.key().to_string(),
            },
            record.to_draft(),
        )
    }

    fn with_mode(mode: DialogMode, draft: E::Draft) -> Self {
        Self {
            mode,
            draft,
            open: true,
            in_flight: false,
            error: None,
        }
    }

    pub fn mode(&self) -> &DialogMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Inline error shown above the form.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn validation(&self) -> Result<(), ValidationError> {
        self.draft.validate()
    }

    pub fn can_submit(&self) -> bool {
        self.open && !self.in_flight && self.validation().is_ok()
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Sends the draft. On success the dialog closes and `on_success` runs
    /// (typically the list refetch); on failure it stays open with the
    /// server's message inline.
    pub async fn submit<F, Fut>(
        &mut self,
        client: &SsisClient,
        on_success: F,
    ) -> Result<(), ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Err(err) = self.validation() {
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        self.in_flight = true;
        self.error = None;
        let draft = self.draft.clone();
        let result = match &self.mode {
            DialogMode::Add => client.create::<E>(draft).await,
            DialogMode::Edit { original_key } => client.update::<E>(original_key, draft).await,
        };
        self.in_flight = false;

        match result {
            Ok(()) => {
                debug!(resource = E::LABEL, mode = ?self.mode, "dialog saved");
                self.open = false;
                on_success().await;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.user_message(&format!(
                    "Failed to {} {}",
                    self.mode.verb(),
                    E::LABEL
                )));
                Err(err)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("delete is not available yet, wait {remaining_secs}s")]
pub struct CountdownPending {
    pub remaining_secs: u64,
}

/// Confirmation step in front of every delete. The destructive action is
/// refused until the countdown has run out.
#[derive(Debug, Clone)]
pub struct DeleteConfirmation {
    key: String,
    title: String,
    opened_at: Instant,
}

impl DeleteConfirmation {
    pub fn open(key: impl Into<String>, title: impl Into<String>, now: Instant) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            opened_at: now,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        DELETE_COUNTDOWN.saturating_sub(now.saturating_duration_since(self.opened_at))
    }

    /// Whole seconds left, rounded up, as shown on the button.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn is_armed(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    pub fn button_label(&self, now: Instant) -> String {
        match self.remaining_secs(now) {
            0 => "Delete".to_string(),
            secs => format!("Wait ({secs})"),
        }
    }

    /// The key to delete, once the countdown is over.
    pub fn confirm(&self, now: Instant) -> Result<&str, CountdownPending> {
        if self.is_armed(now) {
            Ok(&self.key)
        } else {
            Err(CountdownPending {
                remaining_secs: self.remaining_secs(now),
            })
        }
    }

    pub async fn wait_until_armed(&self) {
        tokio::time::sleep(self.remaining(Instant::now())).await;
    }
}

/// Modal that reports a failed action, e.g. a delete the server refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub title: String,
    pub description: String,
}

impl ErrorDialog {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
#[path = "tests/dialogs_tests.rs"]
mod tests;

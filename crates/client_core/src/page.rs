//! One list view: the query controller plus the dialogs opened from it.

use std::{collections::BTreeMap, time::Instant};

use shared::domain::{Gender, Program, Student, YEAR_LEVELS};
use tracing::{info, warn};

use crate::{
    dialogs::{CountdownPending, DeleteConfirmation, EditorDialog, ErrorDialog},
    error::{ClientError, ValidationError},
    http::SsisClient,
    query_state::{
        normalize_filters, FetchOutcome, Filters, ListSnapshot, QueryController, QueryState,
    },
    resource::Resource,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Choices offered per filter facet, in display order.
pub type FacetOptions = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The server refused; see [`ListPage::error_dialog`].
    Failed,
    NothingPending,
}

pub struct ListPage<E: Resource> {
    client: SsisClient,
    controller: QueryController<E, SsisClient>,
    editor: Option<EditorDialog<E>>,
    pending_delete: Option<DeleteConfirmation>,
    error_dialog: Option<ErrorDialog>,
}

impl<E: Resource> ListPage<E> {
    /// Sorted by the resource's default column. Nothing is fetched until
    /// [`ListPage::load`].
    pub fn new(client: SsisClient, limit: u32) -> Self {
        let mut query = QueryState::new(limit);
        query.sort_by = Some(E::DEFAULT_SORT.to_string());
        Self::from_parts(client, query)
    }

    /// Starts from a prepared query, e.g. one built from command-line flags.
    pub fn with_query(client: SsisClient, mut query: QueryState) -> Result<Self, ClientError> {
        query.filters = normalize_filters(query.filters);
        if let Some(column) = &query.sort_by {
            check_sort::<E>(column)?;
        }
        check_facets::<E>(&query.filters)?;
        Ok(Self::from_parts(client, query))
    }

    fn from_parts(client: SsisClient, query: QueryState) -> Self {
        let controller = QueryController::with_query(client.clone(), query)
            .with_load_error(format!("Failed to load {}s.", E::LABEL));
        Self {
            client,
            controller,
            editor: None,
            pending_delete: None,
            error_dialog: None,
        }
    }

    pub fn controller(&self) -> &QueryController<E, SsisClient> {
        &self.controller
    }

    pub async fn snapshot(&self) -> ListSnapshot<E> {
        self.controller.snapshot().await
    }

    pub async fn load(&self) -> Result<FetchOutcome, ClientError> {
        self.controller.refresh().await
    }

    /// Sorts by one of the resource's sortable columns.
    pub async fn sort_by(&self, column: &str) -> Result<FetchOutcome, ClientError> {
        check_sort::<E>(column)?;
        self.controller.set_sort(column).await
    }

    pub async fn filter(&self, filters: Filters) -> Result<FetchOutcome, ClientError> {
        check_facets::<E>(&filters)?;
        self.controller.set_filters(filters).await
    }

    pub fn open_add(&mut self, draft: E::Draft) -> &mut EditorDialog<E> {
        self.editor.insert(EditorDialog::add(draft))
    }

    /// Opens the edit dialog for `key`, taken from the displayed rows when
    /// present, otherwise fetched.
    pub async fn open_edit(&mut self, key: &str) -> Result<&mut EditorDialog<E>, ClientError> {
        let shown = self
            .controller
            .snapshot()
            .await
            .items
            .into_iter()
            .find(|record| record.key() == key);
        let record = match shown {
            Some(record) => record,
            None => self.client.get::<E>(key).await?,
        };
        Ok(self.editor.insert(EditorDialog::edit(&record)))
    }

    pub fn editor(&self) -> Option<&EditorDialog<E>> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorDialog<E>> {
        self.editor.as_mut()
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Submits the open dialog and refetches the list once it is saved.
    /// A failed save leaves the dialog open with its inline error.
    pub async fn submit(&mut self) -> Result<(), ClientError> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        let controller = &self.controller;
        editor
            .submit(&self.client, || async move {
                if let Err(err) = controller.refresh().await {
                    warn!(resource = E::LABEL, error = %err, "refetch after save failed");
                }
            })
            .await?;
        self.editor = None;
        Ok(())
    }

    pub fn request_delete(&mut self, key: &str, now: Instant) -> &DeleteConfirmation {
        let title = format!("Delete {} {key}?", E::LABEL);
        self.pending_delete
            .insert(DeleteConfirmation::open(key, title, now))
    }

    pub fn pending_delete(&self) -> Option<&DeleteConfirmation> {
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the pending record once its countdown is over. A refused
    /// delete opens the error dialog and leaves the list untouched.
    pub async fn confirm_delete(&mut self, now: Instant) -> Result<DeleteOutcome, CountdownPending> {
        let Some(pending) = self.pending_delete.as_ref() else {
            return Ok(DeleteOutcome::NothingPending);
        };
        let key = pending.confirm(now)?.to_string();
        self.pending_delete = None;

        match self.client.delete::<E>(&key).await {
            Ok(()) => {
                info!(resource = E::LABEL, %key, "deleted");
                if let Err(err) = self.controller.refresh().await {
                    warn!(resource = E::LABEL, error = %err, "refetch after delete failed");
                }
                Ok(DeleteOutcome::Deleted)
            }
            Err(err) => {
                warn!(resource = E::LABEL, %key, error = %err, "delete refused");
                self.error_dialog = Some(ErrorDialog::new(
                    "Unable to Delete",
                    err.user_message(&format!("Failed to delete {}", E::LABEL)),
                ));
                Ok(DeleteOutcome::Failed)
            }
        }
    }

    pub fn error_dialog(&self) -> Option<&ErrorDialog> {
        self.error_dialog.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error_dialog = None;
    }
}

fn check_sort<E: Resource>(column: &str) -> Result<(), ValidationError> {
    if E::SORT_COLUMNS.contains(&column) {
        return Ok(());
    }
    Err(ValidationError::single(
        "sort_by",
        format!(
            "cannot sort {}s by '{column}', expected one of: {}",
            E::LABEL,
            E::SORT_COLUMNS.join(", ")
        ),
    ))
}

fn check_facets<E: Resource>(filters: &Filters) -> Result<(), ValidationError> {
    match filters
        .keys()
        .find(|facet| !E::FACETS.contains(&facet.as_str()))
    {
        None => Ok(()),
        Some(facet) => Err(ValidationError::single(
            "filter",
            format!("{}s cannot be filtered by '{facet}'", E::LABEL),
        )),
    }
}

impl ListPage<Student> {
    /// Program codes come from the server; year levels and genders are
    /// fixed.
    pub async fn facet_options(&self) -> Result<FacetOptions, ClientError> {
        let mut programs: Vec<String> = self
            .client
            .fetch_all::<Program>()
            .await?
            .into_iter()
            .map(|program| program.program_code.0)
            .collect();
        programs.sort();
        programs.dedup();

        let mut options = FacetOptions::new();
        options.insert("program", programs);
        options.insert("year", YEAR_LEVELS.iter().map(u8::to_string).collect());
        options.insert(
            "gender",
            Gender::ALL.iter().map(|g| g.as_str().to_string()).collect(),
        );
        Ok(options)
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;

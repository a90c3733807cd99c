//! Interactive list view over one resource.

use std::{collections::BTreeSet, io::Write as _, time::Instant};

use anyhow::Context;
use client_core::{ClientError, DeleteOutcome, DialogMode, ListPage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

use crate::{forms::Form, render};

const HELP: &str = "\
commands:
  next | prev | page N        move between pages
  sort COLUMN                 sort by COLUMN, again to reverse
  search TEXT                 search (empty TEXT clears it)
  filter FACET=a,b            filter by facet values (empty list clears the facet)
  clear                       drop search and filters
  add | edit KEY              open the add or edit dialog
  delete KEY                  delete a record after confirmation
  show                        redraw the list
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Next,
    Prev,
    Page(u32),
    Sort(String),
    Search(String),
    Filter { facet: String, values: BTreeSet<String> },
    Clear,
    Add,
    Edit(String),
    Delete(String),
    Show,
    Help,
    Quit,
}

impl ShellCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));

        let command = match (word.to_ascii_lowercase().as_str(), rest) {
            ("next" | "n", "") => Self::Next,
            ("prev" | "p", "") => Self::Prev,
            ("page", n) => Self::Page(
                n.parse()
                    .map_err(|_| format!("'{n}' is not a page number"))?,
            ),
            ("sort", column) if !column.is_empty() => Self::Sort(column.to_string()),
            ("search", text) => Self::Search(text.to_string()),
            ("filter", raw) => {
                let (facet, values) = parse_filter(raw)?;
                Self::Filter { facet, values }
            }
            ("clear", "") => Self::Clear,
            ("add", "") => Self::Add,
            ("edit", key) if !key.is_empty() => Self::Edit(key.to_string()),
            ("delete", key) if !key.is_empty() => Self::Delete(key.to_string()),
            ("show" | "ls", "") => Self::Show,
            ("help" | "?", "") => Self::Help,
            ("quit" | "exit" | "q", "") => Self::Quit,
            _ => return Err(format!("unknown command '{line}', try 'help'")),
        };
        Ok(Some(command))
    }
}

/// Parses `FACET=a,b`; blank values are dropped.
pub fn parse_filter(raw: &str) -> Result<(String, BTreeSet<String>), String> {
    let (facet, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FACET=a,b, got '{raw}'"))?;
    let facet = facet.trim();
    if facet.is_empty() {
        return Err(format!("missing facet name in '{raw}'"));
    }
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((facet.to_string(), values))
}

pub struct Shell<E: Form, R> {
    page: ListPage<E>,
    lines: Lines<R>,
}

impl<E, R> Shell<E, R>
where
    E: Form,
    R: AsyncBufRead + Unpin,
{
    pub fn new(page: ListPage<E>, input: R) -> Self {
        Self {
            page,
            lines: input.lines(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        report(self.page.load().await);
        self.draw().await;

        loop {
            let Some(line) = self.prompt(&format!("{}s> ", E::LABEL)).await? else {
                return Ok(());
            };
            let command = match ShellCommand::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            };
            debug!(?command, "shell command");

            let controller = self.page.controller();
            match command {
                ShellCommand::Next => report(controller.next_page().await),
                ShellCommand::Prev => report(controller.previous_page().await),
                ShellCommand::Page(n) => report(controller.set_page(n).await),
                ShellCommand::Sort(column) => report(self.page.sort_by(&column).await),
                ShellCommand::Search(text) => report(controller.set_search_text(text).await),
                ShellCommand::Filter { facet, values } => {
                    let mut filters = controller.query().await.filters;
                    filters.insert(facet, values);
                    report(self.page.filter(filters).await);
                }
                ShellCommand::Clear => report(controller.clear_search_and_filters().await),
                ShellCommand::Add => {
                    let blank = vec![String::new(); E::FIELDS.len()];
                    self.edit_and_submit(None, blank).await?;
                }
                ShellCommand::Edit(key) => match self.page.open_edit(&key).await {
                    Ok(editor) => {
                        let current = E::values(&editor.draft);
                        self.edit_and_submit(Some(key), current).await?;
                    }
                    Err(err) => println!("! {}", err.user_message(&format!("{} not found", E::LABEL))),
                },
                ShellCommand::Delete(key) => {
                    let answer = {
                        let pending = self.page.request_delete(&key, Instant::now());
                        println!("{} This cannot be undone.", pending.title());
                        self.prompt("Type 'yes' to delete: ").await?
                    };
                    if answer.as_deref().map(str::trim) == Some("yes") {
                        if delete_pending(&mut self.page).await == DeleteOutcome::Deleted {
                            println!("Deleted {key}.");
                        }
                        if let Some(dialog) = self.page.error_dialog() {
                            println!("{}: {}", dialog.title, dialog.description);
                        }
                        self.page.dismiss_error();
                    } else {
                        self.page.cancel_delete();
                        println!("Cancelled.");
                    }
                }
                ShellCommand::Show => {}
                ShellCommand::Help => {
                    println!("{HELP}");
                    continue;
                }
                ShellCommand::Quit => return Ok(()),
            }
            self.draw().await;
        }
    }

    async fn draw(&self) {
        print!("{}", render::snapshot(&self.page.snapshot().await));
    }

    async fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush().context("failed to write prompt")?;
        self.lines.next_line().await.context("failed to read input")
    }

    /// Asks for every field, keeping the shown value on an empty answer,
    /// then submits. A rejected draft is reported and the dialog dropped.
    async fn edit_and_submit(&mut self, key: Option<String>, mut values: Vec<String>) -> anyhow::Result<()> {
        for (field, value) in E::FIELDS.iter().zip(values.iter_mut()) {
            let label = if value.is_empty() {
                format!("{field}: ")
            } else {
                format!("{field} [{value}]: ")
            };
            let Some(answer) = self.prompt(&label).await? else {
                self.page.close_editor();
                return Ok(());
            };
            if !answer.trim().is_empty() {
                *value = answer;
            }
        }

        let draft = match E::build(&values) {
            Ok(draft) => draft,
            Err(err) => {
                println!("! {err}");
                self.page.close_editor();
                return Ok(());
            }
        };
        match key {
            None => {
                self.page.open_add(draft);
            }
            Some(_) => {
                if let Some(editor) = self.page.editor_mut() {
                    editor.draft = draft;
                }
            }
        }

        let Some(mode) = self.page.editor().map(|editor| editor.mode().clone()) else {
            return Ok(());
        };
        match self.page.submit().await {
            Ok(()) => println!("{}", saved_message::<E>(&mode)),
            Err(_) => {
                if let Some(message) = self.page.editor().and_then(|editor| editor.error()) {
                    println!("! {message}");
                }
                self.page.close_editor();
            }
        }
        Ok(())
    }
}

pub fn saved_message<E: Form>(mode: &DialogMode) -> String {
    match mode {
        DialogMode::Add => format!("Added {}.", E::LABEL),
        DialogMode::Edit { original_key } => format!("Updated {} {original_key}.", E::LABEL),
    }
}

/// Confirms the pending delete, waiting out the countdown first. A refused
/// delete leaves its error dialog open for the caller.
pub async fn delete_pending<E: Form>(page: &mut ListPage<E>) -> DeleteOutcome {
    loop {
        match page.confirm_delete(Instant::now()).await {
            Ok(outcome) => return outcome,
            Err(pending) => {
                let Some(confirmation) = page.pending_delete() else {
                    return DeleteOutcome::NothingPending;
                };
                println!("Delete available in {}s...", pending.remaining_secs);
                confirmation.wait_until_armed().await;
            }
        }
    }
}

/// Fetch failures already show in the list banner; anything else is
/// printed here.
fn report<T>(result: Result<T, ClientError>) {
    match result {
        Ok(_) => {}
        Err(ClientError::Validation(err)) => println!("! {err}"),
        Err(err) => debug!(error = %err, "list update failed"),
    }
}

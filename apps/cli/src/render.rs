//! Plain-text tables, the page-link row and banners.

use std::fmt::Write as _;

use client_core::ListSnapshot;
use shared::domain::{College, DashboardStats, Program, Student};

/// A record that can be shown as one table row.
pub trait Row {
    const HEADERS: &'static [&'static str];
    fn cells(&self) -> Vec<String>;

    /// Labelled values for the single-record view; the table columns unless
    /// a record has more to show.
    fn details(&self) -> Vec<(&'static str, String)> {
        Self::HEADERS.iter().copied().zip(self.cells()).collect()
    }
}

impl Row for College {
    const HEADERS: &'static [&'static str] = &["Code", "Name"];

    fn cells(&self) -> Vec<String> {
        vec![self.college_code.to_string(), self.college_name.clone()]
    }
}

impl Row for Program {
    const HEADERS: &'static [&'static str] = &["Code", "Name", "College"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.program_code.to_string(),
            self.program_name.clone(),
            self.college_code.to_string(),
        ]
    }
}

impl Row for Student {
    const HEADERS: &'static [&'static str] = &["ID", "Name", "Program", "Year", "Gender"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.student_id.to_string(),
            self.display_name(),
            self.program_code.to_string(),
            self.year.to_string(),
            self.gender.clone(),
        ]
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        let mut details: Vec<_> = Self::HEADERS.iter().copied().zip(self.cells()).collect();
        let avatar = self.pfp_url.clone().unwrap_or_else(|| "none".into());
        details.push(("Avatar", avatar));
        details
    }
}

pub fn table<R: Row>(rows: &[R]) -> String {
    let cells: Vec<Vec<String>> = rows.iter().map(Row::cells).collect();
    let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let headers: Vec<String> = R::HEADERS.iter().map(|h| h.to_string()).collect();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Key/value listing for a single record.
pub fn record<R: Row>(row: &R) -> String {
    let details = row.details();
    let width = details.iter().map(|(h, _)| h.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (header, cell) in &details {
        let _ = writeln!(out, "{header:>width$}: {cell}");
    }
    out
}

/// The whole list view: banner, table or empty notice, then paging.
pub fn snapshot<R: Row>(snapshot: &ListSnapshot<R>) -> String {
    let mut out = String::new();
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {error}");
    }
    if snapshot.loading {
        out.push_str("Loading...\n");
    } else if snapshot.is_empty() {
        if snapshot.error.is_none() {
            out.push_str("No records found.\n");
        }
    } else {
        out.push_str(&table(&snapshot.items));
    }

    let window = snapshot.page_window();
    let _ = write!(
        out,
        "Page {} of {} ({} records)",
        snapshot.query.page,
        snapshot.total_pages().max(1),
        snapshot.total
    );
    if !window.is_empty() {
        let prev = if window.has_previous() { "<" } else { " " };
        let next = if window.has_next() { ">" } else { " " };
        let _ = write!(out, "   {prev} {window} {next}");
    }
    out.push('\n');

    let query = &snapshot.query;
    if let Some(sort_by) = &query.sort_by {
        let _ = write!(out, "sort: {sort_by} {}", query.sort_order);
    }
    if !query.search_text.is_empty() {
        let _ = write!(out, "  search: {:?}", query.search_text);
    }
    for (facet, values) in &query.filters {
        let joined: Vec<&str> = values.iter().map(String::as_str).collect();
        let _ = write!(out, "  {facet}: {}", joined.join(","));
    }
    out.push('\n');
    out
}

pub fn stats(stats: &DashboardStats) -> String {
    format!(
        "Students: {}\nColleges: {}\nPrograms: {}\n",
        stats.total_students, stats.total_colleges, stats.total_programs
    )
}

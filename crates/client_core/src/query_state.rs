//! Pagination, sort, search and filter state for one list view.
//!
//! Every mutator updates the state and issues exactly one fetch. Fetches are
//! numbered from a monotonic sequence; a response is applied only if its
//! number is still the latest issued, so a slow early request can never
//! overwrite the result of a newer one. In-flight requests are not cancelled,
//! their responses are simply dropped.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use shared::protocol::SortOrder;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::ClientError,
    list_adapter::PageResult,
    pagination::{self, PageWindow},
};

/// Selected values per facet. Facets with no selection are absent.
pub type Filters = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub search_text: String,
    pub filters: Filters,
}

impl QueryState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            sort_by: None,
            sort_order: SortOrder::Asc,
            search_text: String::new(),
            filters: Filters::new(),
        }
    }

    /// Query string pairs for the list endpoint. Facet selections are sent
    /// as one comma-separated value per facet.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by".to_string(), sort_by.clone()));
        }
        pairs.push(("sort_order".to_string(), self.sort_order.to_string()));
        pairs.push(("search".to_string(), self.search_text.clone()));
        for (facet, values) in &self.filters {
            let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(",");
            pairs.push((facet.clone(), joined));
        }
        pairs
    }

    pub fn active_filter_count(&self) -> usize {
        self.filters.values().map(BTreeSet::len).sum()
    }
}

/// Drops blank values and facets left without a selection.
pub fn normalize_filters(filters: Filters) -> Filters {
    filters
        .into_iter()
        .filter_map(|(facet, values)| {
            let values: BTreeSet<String> = values
                .into_iter()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect();
            (!values.is_empty()).then_some((facet, values))
        })
        .collect()
}

/// Where a list view gets its pages from.
#[async_trait]
pub trait ListSource<E>: Send + Sync {
    async fn fetch_page(&self, query: &QueryState) -> Result<PageResult<E>, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was the latest and is now displayed.
    Applied,
    /// A newer fetch was issued meanwhile; this response was dropped.
    Superseded,
}

/// Everything a view needs to render the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot<E> {
    pub query: QueryState,
    pub items: Vec<E>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl<E> ListSnapshot<E> {
    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total, self.query.limit)
    }

    pub fn page_window(&self) -> PageWindow {
        PageWindow::new(self.query.page, self.total_pages())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct ControllerInner<E> {
    query: QueryState,
    result: PageResult<E>,
    loading: bool,
    error: Option<String>,
}

struct FetchTicket {
    seq: u64,
    query: QueryState,
}

pub struct QueryController<E, S> {
    source: S,
    inner: Mutex<ControllerInner<E>>,
    issued: AtomicU64,
    load_error: String,
}

impl<E, S> QueryController<E, S>
where
    E: Clone + Send + 'static,
    S: ListSource<E>,
{
    pub fn new(source: S, limit: u32) -> Self {
        Self::with_query(source, QueryState::new(limit))
    }

    pub fn with_query(source: S, query: QueryState) -> Self {
        Self {
            source,
            inner: Mutex::new(ControllerInner {
                query,
                result: PageResult::empty(),
                loading: false,
                error: None,
            }),
            issued: AtomicU64::new(0),
            load_error: "Failed to load records.".to_string(),
        }
    }

    /// Banner text used when a fetch fails without a server message.
    pub fn with_load_error(mut self, message: impl Into<String>) -> Self {
        self.load_error = message.into();
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn query(&self) -> QueryState {
        self.inner.lock().await.query.clone()
    }

    pub async fn snapshot(&self) -> ListSnapshot<E> {
        let guard = self.inner.lock().await;
        ListSnapshot {
            query: guard.query.clone(),
            items: guard.result.items.clone(),
            total: guard.result.total,
            loading: guard.loading,
            error: guard.error.clone(),
        }
    }

    /// Refetches with the current state, e.g. after a record was added.
    pub async fn refresh(&self) -> Result<FetchOutcome, ClientError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    pub async fn set_search_text(
        &self,
        text: impl Into<String>,
    ) -> Result<FetchOutcome, ClientError> {
        let text = text.into();
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.query.search_text = text;
            guard.query.page = 1;
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    pub async fn set_filters(&self, filters: Filters) -> Result<FetchOutcome, ClientError> {
        let filters = normalize_filters(filters);
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.query.filters = filters;
            guard.query.page = 1;
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    /// Drops the search text and every filter in one fetch, back on page 1.
    pub async fn clear_search_and_filters(&self) -> Result<FetchOutcome, ClientError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            guard.query.search_text.clear();
            guard.query.filters.clear();
            guard.query.page = 1;
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    /// Same column flips the direction, a new column starts ascending.
    /// The current page is kept.
    pub async fn set_sort(&self, column: impl Into<String>) -> Result<FetchOutcome, ClientError> {
        let column = column.into();
        let ticket = {
            let mut guard = self.inner.lock().await;
            let query = &mut guard.query;
            if query.sort_by.as_deref() == Some(column.as_str()) {
                query.sort_order = query.sort_order.toggled();
            } else {
                query.sort_by = Some(column);
                query.sort_order = SortOrder::Asc;
            }
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    /// Moves to `page`, clamped to the pages known from the last result.
    pub async fn set_page(&self, page: u32) -> Result<FetchOutcome, ClientError> {
        let ticket = {
            let mut guard = self.inner.lock().await;
            let last_page = self.last_page(&guard);
            guard.query.page = page.clamp(1, last_page);
            self.issue(&mut guard)
        };
        self.run(ticket).await
    }

    pub async fn next_page(&self) -> Result<FetchOutcome, ClientError> {
        let target = {
            let guard = self.inner.lock().await;
            pagination::next_page(guard.query.page, self.last_page(&guard))
        };
        self.set_page(target).await
    }

    pub async fn previous_page(&self) -> Result<FetchOutcome, ClientError> {
        let target = pagination::previous_page(self.inner.lock().await.query.page);
        self.set_page(target).await
    }

    fn last_page(&self, inner: &ControllerInner<E>) -> u32 {
        pagination::total_pages(inner.result.total, inner.query.limit).max(1)
    }

    fn issue(&self, inner: &mut ControllerInner<E>) -> FetchTicket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        inner.loading = true;
        FetchTicket {
            seq,
            query: inner.query.clone(),
        }
    }

    async fn run(&self, mut ticket: FetchTicket) -> Result<FetchOutcome, ClientError> {
        loop {
            let result = self.source.fetch_page(&ticket.query).await;

            let mut guard = self.inner.lock().await;
            let latest = self.issued.load(Ordering::SeqCst);
            if ticket.seq != latest {
                debug!(seq = ticket.seq, latest, "discarding superseded list response");
                return Ok(FetchOutcome::Superseded);
            }

            guard.loading = false;
            match result {
                Ok(page) => {
                    guard.result = page;
                    guard.error = None;
                    let last_page = self.last_page(&guard);
                    if guard.query.page > last_page {
                        debug!(
                            page = guard.query.page,
                            last_page, "page out of range after fetch, clamping"
                        );
                        guard.query.page = last_page;
                        ticket = self.issue(&mut guard);
                        continue;
                    }
                    return Ok(FetchOutcome::Applied);
                }
                Err(err) => {
                    debug!(seq = ticket.seq, error = %err, "list fetch failed");
                    guard.result = PageResult::empty();
                    guard.error = Some(err.user_message(&self.load_error));
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/query_state_tests.rs"]
mod tests;

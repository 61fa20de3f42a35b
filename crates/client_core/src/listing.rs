//! Filtered application collections, independent of the workflow state.
//!
//! Filtering and search are entirely server-side: a query is passed through
//! as request parameters and the response replaces the displayed list.

use std::sync::Arc;

use shared::{
    domain::{ApplicationId, ApplicationStatus, FilterView},
    protocol::{ApplicationListQuery, ApplicationSummary, ExportQuery},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{error::ClientResult, gateway::ApiGateway, loadable::Loadable};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<ApplicationStatus>,
    pub search: String,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_view(view: FilterView) -> Self {
        Self {
            status: view.status(),
            search: String::new(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Sent verbatim; only an empty search is left out of the request.
    fn search_param(&self) -> Option<String> {
        (!self.search.is_empty()).then(|| self.search.clone())
    }

    pub fn to_wire(&self, per_page: u32) -> ApplicationListQuery {
        ApplicationListQuery {
            per_page,
            status: self.status,
            search: self.search_param(),
        }
    }

    pub fn to_export(&self) -> ExportQuery {
        ExportQuery {
            status: self.status,
            search: self.search_param(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    pub query: ListQuery,
    pub results: Loadable<Vec<ApplicationSummary>>,
}

impl ListSnapshot {
    /// Loaded and empty: the "no applications found" state, not an error.
    pub fn is_empty_result(&self) -> bool {
        self.results
            .as_loaded()
            .is_some_and(|applications| applications.is_empty())
    }

    pub fn status_of(&self, id: ApplicationId) -> Option<ApplicationStatus> {
        self.results
            .as_loaded()?
            .iter()
            .find(|application| application.id == id)
            .map(|application| application.status)
    }
}

#[derive(Default)]
struct ListState {
    query: ListQuery,
    generation: u64,
    results: Loadable<Vec<ApplicationSummary>>,
}

pub struct ApplicationListView {
    api: Arc<ApiGateway>,
    page_size: u32,
    state: Mutex<ListState>,
}

impl ApplicationListView {
    pub fn new(api: Arc<ApiGateway>, page_size: u32) -> Self {
        Self {
            api,
            page_size,
            state: Mutex::new(ListState::default()),
        }
    }

    /// Makes `query` the active query and issues exactly one request for it.
    /// A response is only displayed if no newer query was issued meanwhile;
    /// on failure the previous results stay on screen.
    pub async fn search(&self, query: ListQuery) -> ClientResult<Vec<ApplicationSummary>> {
        let generation = {
            let mut guard = self.state.lock().await;
            guard.query = query.clone();
            guard.generation += 1;
            guard.generation
        };

        let applications = self
            .api
            .list_applications(&query.to_wire(self.page_size))
            .await?;

        let mut guard = self.state.lock().await;
        if guard.generation == generation {
            info!(
                count = applications.len(),
                status = ?query.status,
                "list: applications loaded"
            );
            guard.results = Loadable::Loaded(applications.clone());
        } else {
            debug!(generation, latest = guard.generation, "list: dropping stale response");
        }
        Ok(applications)
    }

    /// Selecting a view clears the search text.
    pub async fn select_view(&self, view: FilterView) -> ClientResult<Vec<ApplicationSummary>> {
        self.search(ListQuery::for_view(view)).await
    }

    /// Re-runs the active query.
    pub async fn refresh(&self) -> ClientResult<Vec<ApplicationSummary>> {
        let query = self.state.lock().await.query.clone();
        self.search(query).await
    }

    pub async fn active_query(&self) -> ListQuery {
        self.state.lock().await.query.clone()
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let guard = self.state.lock().await;
        ListSnapshot {
            query: guard.query.clone(),
            results: guard.results.clone(),
        }
    }

    pub async fn reset(&self) {
        let mut guard = self.state.lock().await;
        let generation = guard.generation + 1;
        *guard = ListState {
            generation,
            ..ListState::default()
        };
    }
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;

//! Paging state shared by the strategies

use crate::http::Params;
use serde_json::Value;

/// What a strategy decided after reading a page
#[derive(Debug, Clone)]
pub enum NextPage {
    /// Request again with these parameters merged over the base query
    Continue {
        /// Replacement paging parameters
        params: Params,
    },
    /// Last page reached
    Done,
}

impl NextPage {
    pub fn with_params(params: Params) -> Self {
        Self::Continue { params }
    }

    pub fn with_param(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_params(Params::new().with(key, value))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn is_continue(&self) -> bool {
        !self.is_done()
    }
}

/// Counters carried between pages
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// `resultOffset` of the next feature page
    pub offset: u64,
    /// `nextStart` reported by the last sharing API page
    pub next_start: Option<i64>,
    /// Pages read
    pub pages: u32,
    /// Records read across all pages
    pub total_fetched: u64,
    /// Set once a strategy returns [`NextPage::Done`]
    pub done: bool,
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the walk complete
    pub(crate) fn finish(&mut self) -> NextPage {
        self.done = true;
        NextPage::Done
    }

    pub(crate) fn record_page(&mut self, records: usize) {
        self.pages += 1;
        self.total_fetched += records as u64;
    }
}

/// A paging scheme
pub trait Paginator: Send + Sync {
    /// Paging parameters of the first request
    fn initial_params(&self, state: &PaginationState) -> Params;

    /// Read a page holding `records_count` records and pick the next request
    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}

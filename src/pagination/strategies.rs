//! Pagination strategy implementations
//!
//! ArcGIS uses two paging schemes: the sharing API's `start`/`num` with a
//! `nextStart` cursor, and feature queries' `resultOffset`/`resultRecordCount`
//! with an `exceededTransferLimit` flag.

use super::types::{NextPage, PaginationState, Paginator};
use crate::http::Params;
use serde_json::Value;

// ============================================================================
// Start / Num Pagination
// ============================================================================

/// Portal search pagination
///
/// `?start=1&num=100`, continuing with `nextStart` until it is `-1`.
#[derive(Debug, Clone)]
pub struct StartPaginator {
    /// First record index (1-based)
    pub start: i64,
    /// Records per page
    pub num: u32,
}

impl Default for StartPaginator {
    fn default() -> Self {
        Self { start: 1, num: 100 }
    }
}

impl StartPaginator {
    /// Create a paginator starting at `start` with `num` records per page
    pub fn new(start: i64, num: u32) -> Self {
        Self { start, num }
    }
}

impl Paginator for StartPaginator {
    fn initial_params(&self, state: &PaginationState) -> Params {
        let start = state.next_start.unwrap_or(self.start);
        Params::new().with("start", start).with("num", self.num)
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.record_page(records_count);

        match body.get("nextStart").and_then(Value::as_i64) {
            Some(next) if next > 0 && records_count > 0 => {
                state.next_start = Some(next);
                NextPage::with_params(Params::new().with("start", next).with("num", self.num))
            }
            _ => state.finish(),
        }
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination
///
/// Feature layers page with `resultOffset`/`resultRecordCount` and flag
/// truncated results with `exceededTransferLimit`.
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Number of records per page
    pub limit_value: u32,
    /// Response flag that must be `true` for another page to exist;
    /// without one, a short page is the last
    pub more_flag: Option<String>,
}

impl OffsetPaginator {
    /// Create a new offset paginator
    pub fn new(
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
        limit_value: u32,
    ) -> Self {
        Self {
            offset_param: offset_param.into(),
            limit_param: limit_param.into(),
            limit_value,
            more_flag: None,
        }
    }

    /// Paginator for feature layer queries
    pub fn feature_query(page_size: u32) -> Self {
        Self {
            more_flag: Some("exceededTransferLimit".to_string()),
            ..Self::new("resultOffset", "resultRecordCount", page_size)
        }
    }

    fn page_params(&self, offset: u64) -> Params {
        Params::new()
            .with(self.offset_param.as_str(), offset)
            .with(self.limit_param.as_str(), self.limit_value)
    }
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, state: &PaginationState) -> Params {
        self.page_params(state.offset)
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.record_page(records_count);

        // servers cap pages at their maxRecordCount, so a short page only
        // ends the walk when there is no flag to say otherwise
        let more = match &self.more_flag {
            Some(flag) => body.get(flag).and_then(Value::as_bool) == Some(true),
            None => records_count >= self.limit_value as usize,
        };
        if records_count == 0 || !more {
            return state.finish();
        }

        state.offset += records_count as u64;
        NextPage::with_params(self.page_params(state.offset))
    }
}

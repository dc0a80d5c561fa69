//! Pagination module
//!
//! Supports: portal `start`/`num` (with `nextStart`) and feature query
//! `resultOffset`/`resultRecordCount` paging.
//!
//! # Overview
//!
//! Each strategy extracts the next page parameters from responses and tracks
//! when pagination is complete. [`pages`] turns a strategy into a stream of
//! response pages fetched sequentially.

mod strategies;
mod stream;
mod types;

pub use strategies::{OffsetPaginator, StartPaginator};
pub use stream::{fetch_all, pages, PageStream};
pub use types::{NextPage, PaginationState, Paginator};

#[cfg(test)]
mod tests;

//! Page streams driven by a paginator

use super::types::{NextPage, PaginationState, Paginator};
use crate::error::Result;
use crate::http::{HttpClient, Params};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use std::pin::Pin;
use tracing::debug;

/// Stream of raw response pages
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = Result<Value>> + Send + 'a>>;

/// Fetch pages of `url` one after another
///
/// `records_key` names the array counted on each page (`results`,
/// `features`, `items`, ...).
pub fn pages<'a, P>(
    client: &'a HttpClient,
    url: impl Into<String>,
    params: Params,
    paginator: P,
    records_key: impl Into<String>,
) -> PageStream<'a>
where
    P: Paginator + 'a,
{
    let url = url.into();
    let records_key = records_key.into();
    let state = PaginationState::new();
    let first = paginator.initial_params(&state);

    Box::pin(stream::try_unfold(
        (paginator, state, Some(first)),
        move |(paginator, mut state, next)| {
            let mut query = params.clone();
            let url = url.clone();
            let records_key = records_key.clone();
            async move {
                let Some(page_params) = next else {
                    return Ok(None);
                };
                query.merge(&page_params);

                let body = client.get_json(&url, query).await?;
                let count = record_count(&body, &records_key);
                debug!("Fetched page {} of {} ({} records)", state.pages + 1, url, count);

                let next = match paginator.process_response(&body, count, &mut state) {
                    NextPage::Continue { params } => Some(params),
                    NextPage::Done => None,
                };
                Ok(Some((body, (paginator, state, next))))
            }
        },
    ))
}

/// Collect the records of every page
pub async fn fetch_all<P: Paginator>(
    client: &HttpClient,
    url: &str,
    params: Params,
    paginator: P,
    records_key: &str,
) -> Result<Vec<Value>> {
    pages(client, url, params, paginator, records_key)
        .try_fold(Vec::new(), |mut records, page| async move {
            if let Some(Value::Array(items)) = page.get(records_key) {
                records.extend(items.iter().cloned());
            }
            Ok(records)
        })
        .await
}

fn record_count(body: &Value, records_key: &str) -> usize {
    body.get(records_key)
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

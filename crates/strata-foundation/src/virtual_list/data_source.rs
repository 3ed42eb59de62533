//! Asynchronous range-based data access.

use super::chunk::RangeRequest;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Failure reported by a data source. Never fatal to the list: the affected
/// chunk keeps its placeholder until it is fetched again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchError {
    message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

pub type FetchResult<V> = Result<V, FetchError>;

/// Local future resolving a fetch. Polled on the host thread only.
pub type FetchFuture<V> = Pin<Box<dyn Future<Output = FetchResult<V>>>>;

/// Result of starting a fetch: either already available or still in flight.
pub enum Fetch<V> {
    Ready(FetchResult<V>),
    Pending(FetchFuture<V>),
}

impl<V> Fetch<V> {
    pub fn ready(value: V) -> Self {
        Fetch::Ready(Ok(value))
    }

    pub fn failed(err: FetchError) -> Self {
        Fetch::Ready(Err(err))
    }

    pub fn pending(future: impl Future<Output = FetchResult<V>> + 'static) -> Self {
        Fetch::Pending(Box::pin(future))
    }
}

impl<V> fmt::Debug for Fetch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fetch::Ready(Ok(_)) => f.write_str("Fetch::Ready(Ok)"),
            Fetch::Ready(Err(err)) => write!(f, "Fetch::Ready(Err({err}))"),
            Fetch::Pending(_) => f.write_str("Fetch::Pending"),
        }
    }
}

/// Supplies list items by index range.
///
/// A source may return fewer items than requested near the end of the list.
/// Results for ranges the list no longer needs are discarded, so sources do
/// not have to support cancellation.
pub trait RangeDataSource<T> {
    fn fetch(&self, range: RangeRequest) -> Fetch<Vec<T>>;

    fn fetch_total(&self) -> Fetch<usize>;
}

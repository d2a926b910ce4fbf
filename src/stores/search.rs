// Streaming search protocol shared by all store backends
//
// A producer task pushes matching records into a bounded channel. The
// consumer reads them through `SearchStream`. Both ends share a cancellation
// token derived from the caller's context, so either side can stop the other.

use crate::core::error::StoreError;
use crate::models::user::User;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

pub type SearchItem = Result<User, StoreError>;

/// Records buffered between producer and consumer when not configured
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Producer half of a search
pub struct SearchSink {
    tx: mpsc::Sender<SearchItem>,
    token: CancellationToken,
}

impl SearchSink {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Deliver one record, waiting while the channel is full.
    ///
    /// Returns `false` once the search is cancelled or the consumer has gone
    /// away; the producer must stop and release its resources.
    pub async fn emit(&self, user: User) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.tx.send(Ok(user)) => sent.is_ok(),
        }
    }

    /// Terminate the search with an error. Nothing is sent after cancellation.
    pub async fn fail(self, err: StoreError) {
        if self.token.is_cancelled() {
            return;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {}
            _ = self.tx.send(Err(err)) => {}
        }
    }
}

/// Consumer half of a search.
///
/// Yields records until the producer finishes, fails, or the search is
/// cancelled. Dropping the stream cancels the producer.
pub struct SearchStream {
    rx: mpsc::Receiver<SearchItem>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl SearchStream {
    /// Run `producer` on its own task and return the stream it feeds.
    ///
    /// The producer observes a child of `ctx`: cancelling `ctx` or dropping
    /// the returned stream both stop it.
    pub fn spawn<F, Fut>(ctx: &CancellationToken, capacity: usize, producer: F) -> Self
    where
        F: FnOnce(SearchSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sink, stream) = channel(ctx, capacity);
        tokio::spawn(producer(sink));
        stream
    }

    /// Stop the producer. Already buffered records are discarded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for SearchStream {
    type Item = SearchItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            self.rx.close();
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

/// Create a connected sink/stream pair with a bounded buffer.
pub fn channel(ctx: &CancellationToken, capacity: usize) -> (SearchSink, SearchStream) {
    let token = ctx.child_token();
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let sink = SearchSink {
        tx,
        token: token.clone(),
    };
    let stream = SearchStream {
        rx,
        token: token.clone(),
        _guard: token.drop_guard(),
    };

    (sink, stream)
}

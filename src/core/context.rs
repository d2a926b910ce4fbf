// Per-request cancellation context

use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation token tied to the lifetime of one inbound request.
///
/// The token is cancelled when the context is dropped, which happens when
/// axum drops the handler future after the client disconnects, or when the
/// response body owning it goes away.
pub struct RequestContext {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestContext {
    pub fn new() -> Self {
        let token = CancellationToken::new();
        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    /// Like `new`, but also cancels once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> Self {
        let ctx = Self::new();
        let token = ctx.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => token.cancel(),
            }
        });

        ctx
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

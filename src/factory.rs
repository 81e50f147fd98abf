//! Handle lifecycle trait (bb8-style)
//!
//! The `ManageHandle` trait defines how to create, validate, recycle, and
//! destroy pooled handles. The pool stays agnostic to the resource type
//! behind a handle (socket, file, database session).

use async_trait::async_trait;

use crate::error::Result;

/// Lifecycle strategy for pooled handles.
///
/// Only `create` is required; the remaining operations default to
/// "always healthy" / "drop it".
#[async_trait]
pub trait ManageHandle: Send + Sync + 'static {
    /// The handle type leased out by the pool.
    type Handle: Send + 'static;

    /// Create a new handle.
    ///
    /// Failures propagate to the acquirer as
    /// [`Error::Creation`](crate::Error::Creation) and are never retried by
    /// the pool.
    async fn create(&self) -> Result<Self::Handle>;

    /// Check whether an idle handle is still usable before leasing it out.
    async fn validate(&self, _handle: &Self::Handle) -> bool {
        true
    }

    /// Reset a handle when it is released back to the pool.
    ///
    /// Returning `Err` destroys the handle instead of re-idling it; the
    /// error itself is never surfaced to the releasing caller.
    async fn recycle(&self, _handle: &mut Self::Handle) -> Result<()> {
        Ok(())
    }

    /// Tear down a handle that is leaving the pool permanently.
    async fn destroy(&self, handle: Self::Handle) {
        drop(handle);
    }
}

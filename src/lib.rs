//! # lease-pool
//!
//! Bounded async pool for opaque resource handles.
//!
//! A [`Pool`] owns at most `capacity` live handles created by a
//! caller-supplied [`ManageHandle`] factory. Acquisition waits (bounded by a
//! timeout) when the pool is exhausted, idle handles are re-validated before
//! reuse, release-time recycle failures destroy the handle and free its
//! slot, and [`Pool::shutdown`] fails parked waiters instead of hanging
//! them.
//!
//! ```
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use lease_pool::{ManageHandle, Pool, PoolConfig, Result};
//!
//! /// Stands in for a real dialer; handles would usually wrap a socket or
//! /// database session.
//! #[derive(Default)]
//! struct Dialer {
//!     next_id: AtomicU64,
//! }
//!
//! #[async_trait::async_trait]
//! impl ManageHandle for Dialer {
//!     type Handle = u64;
//!
//!     async fn create(&self) -> Result<Self::Handle> {
//!         Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let pool = Pool::new(Dialer::default(), PoolConfig::default())?;
//! let conn = pool.acquire().await?;
//! assert_eq!(*conn, 0);
//! // dropping the lease returns the handle to the pool
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod guard;
pub mod pool;

pub use config::{PoolConfig, Strategy};
pub use error::{Error, Result};
pub use factory::ManageHandle;
pub use guard::Lease;
pub use pool::{Pool, PoolStats};

//! Unit of Work
//!
//! Runs a read-mutate-write sequence as one storage transaction. The work
//! closure receives a repository bound to the transaction; `Ok` commits,
//! `Err` rolls back and the original error is returned unchanged.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

use super::{LedgerRepository, StoreError};

/// Future returned by a unit of work, borrowing the scoped repository
pub type ScopeFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Future of a commit or rollback
pub type StoreFuture = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;

/// One open storage transaction
pub trait TransactionScope: Send {
    /// Repository whose reads and writes belong to this transaction
    fn repository(&mut self) -> &mut dyn LedgerRepository;

    fn commit(self: Box<Self>) -> StoreFuture;

    fn rollback(self: Box<Self>) -> StoreFuture;
}

/// Storage able to open transactions
#[async_trait]
pub trait TransactionBackend: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TransactionScope>, StoreError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct UnitOfWork {
    backend: Arc<dyn TransactionBackend>,
}

impl UnitOfWork {
    pub fn new(backend: Arc<dyn TransactionBackend>) -> Self {
        Self { backend }
    }

    /// Run `work` inside a single transaction
    pub async fn run<T, F>(&self, work: F) -> AppResult<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a mut dyn LedgerRepository) -> ScopeFuture<'a, T> + Send,
    {
        let mut scope = self
            .backend
            .begin()
            .await
            .map_err(|e| AppError::storage("begin transaction", e))?;

        let outcome = work(scope.repository()).await;

        match outcome {
            Ok(value) => {
                scope
                    .commit()
                    .await
                    .map_err(|e| AppError::storage("commit transaction", e))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = scope.rollback().await {
                    tracing::error!(
                        backend = self.backend.name(),
                        error = %rollback_error,
                        original_error = %error,
                        "Rollback failed"
                    );
                }
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("backend", &self.backend.name())
            .finish()
    }
}

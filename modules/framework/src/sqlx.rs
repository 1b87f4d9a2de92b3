use tracing::{Instrument, info, info_span};

/// Handle to the Postgres pool. Every database operation of the workspace is a
/// `Processor` impl on this type.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    executor: sqlx::PgPool,
}

impl DatabaseProcessor {
    pub fn new(executor: sqlx::PgPool) -> Self {
        Self { executor }
    }

    pub fn db(&self) -> &sqlx::PgPool {
        info!(monotonic_counter.sql = 1);
        &self.executor
    }

    /// Open a transaction, recorded as its own span.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, sqlx::Error> {
        self.db()
            .begin()
            .instrument(info_span!("<Transaction Begin>"))
            .await
    }
}

/// Commit a transaction opened with [`DatabaseProcessor::begin`].
pub async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> Result<(), sqlx::Error> {
    tx.commit()
        .instrument(info_span!("<Transaction Commit>"))
        .await
}

/// Postgres `unique_violation`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505")
}

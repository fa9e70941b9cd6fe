use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionError,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// An in-memory SQLite URL only lives as long as its single connection, so
/// callers using `sqlite::memory:` must pin the pool to one connection.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("stockline_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs `f` inside a database transaction, committing on `Ok` and rolling
/// back on `Err`.
pub async fn transaction<F, T>(pool: &DbPool, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = std::time::Instant::now();

    debug!(transaction_id = %transaction_id, "Starting database transaction");
    counter!("stockline_db.transaction.started", 1);

    let result = pool.transaction::<F, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("stockline_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("stockline_db.transaction.committed", 1);
            debug!(transaction_id = %transaction_id, "Transaction committed in {:?}", elapsed);
        }
        Err(_) => {
            counter!("stockline_db.transaction.rolled_back", 1);
            warn!(transaction_id = %transaction_id, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(e) => ServiceError::db_error(e),
        TransactionError::Transaction(e) => e,
    })
}

/// Runs database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(|e: DbErr| ServiceError::MigrationError(e.to_string()));

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("stockline_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("stockline_db.connection_failures", 1);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Statement};

    async fn memory_pool() -> DbPool {
        establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn migrations_apply_and_connection_checks() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn failed_closure_rolls_back() {
        let pool = memory_pool().await;
        pool.execute(Statement::from_string(
            pool.get_database_backend(),
            "CREATE TABLE probe (id INTEGER)".to_owned(),
        ))
        .await
        .unwrap();

        let result: Result<(), ServiceError> = transaction(&pool, |txn| {
            Box::pin(async move {
                txn.execute(Statement::from_string(
                    txn.get_database_backend(),
                    "INSERT INTO probe (id) VALUES (1)".to_owned(),
                ))
                .await?;
                Err(ServiceError::InvalidOperation("abort".into()))
            })
        })
        .await;
        assert!(matches!(result, Err(ServiceError::InvalidOperation(_))));

        let row = pool
            .query_one(Statement::from_string(
                pool.get_database_backend(),
                "SELECT COUNT(*) AS n FROM probe".to_owned(),
            ))
            .await
            .unwrap()
            .unwrap();
        let count: i64 = row.try_get("", "n").unwrap();
        assert_eq!(count, 0);
    }
}

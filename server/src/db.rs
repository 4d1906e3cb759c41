use std::time::Duration;

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PoolError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Error, Debug)]
pub enum DbSetupError {
    #[error("Failed to create database pool: {0}")]
    Pool(#[from] PoolError),

    #[error("Failed to run database migrations: {0}")]
    Migrations(String),
}

/// Applies the store deadline to every pooled connection, so PostgreSQL
/// cancels (and rolls back) any statement that runs past it.
#[derive(Debug, Clone, Copy)]
pub struct StatementTimeout(pub Duration);

impl StatementTimeout {
    fn sql(&self) -> String {
        format!("SET statement_timeout = {}", self.0.as_millis())
    }
}

impl CustomizeConnection<PgConnection, r2d2::Error> for StatementTimeout {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), r2d2::Error> {
        diesel::sql_query(self.sql())
            .execute(conn)
            .map(|_| ())
            .map_err(r2d2::Error::QueryError)
    }
}

/// Build the connection pool and bring the schema up to date.
///
/// `store_timeout` bounds both pool checkout and every statement.
pub fn create_pool(database_url: &str, store_timeout: Duration) -> Result<DbPool, DbSetupError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .connection_timeout(store_timeout)
        .connection_customizer(Box::new(StatementTimeout(store_timeout)))
        .build(manager)?;

    // Run pending migrations on startup
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbSetupError::Migrations(e.to_string()))?;

    Ok(pool)
}

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use tracing::{error, info};

use crate::error::StoreError;

pub mod models;
pub mod schema;
pub mod store;

pub use store::{OrderStore, PgOrderStore};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_pool(database_url: &str) -> Result<PgPool, StoreError> {
    info!("Connecting to order database");

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    // Lambda instances serve one request at a time.
    let pool = Pool::builder().max_size(2).build(manager).map_err(|e| {
        error!("Failed to create database connection pool: {}", e);
        e
    })?;

    // Verify connection works
    let _conn = get_conn(&pool)?;

    info!("Successfully connected to database");
    Ok(pool)
}

pub fn get_conn(pool: &PgPool) -> Result<PgPooledConnection, StoreError> {
    pool.get().map_err(|e| {
        error!("Failed to get database connection from pool: {}", e);
        StoreError::from(e)
    })
}

use std::path::PathBuf;

use derivative::Derivative;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::auth;
use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::Result;
use crate::storage::DiskService;

pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct AppCtx {
    #[derivative(Debug = "ignore")]
    db: DbPool,
    pub disk: DiskService,
    pub assets_dir: PathBuf,
    #[derivative(Debug = "ignore")]
    pub secret_key: String,
}

impl AppCtx {
    pub fn new(config: &Config) -> Result<Self> {
        if let Some(cost) = config.bcrypt_cost {
            auth::set_cost(cost);
        }
        let db = db::build_pool(&config.database_url, config.pool_size)?;
        tracing::debug!(database_url = %config.database_url, "connection pool ready");
        Ok(Self {
            db,
            disk: DiskService::new(&config.storage_root),
            assets_dir: config.assets_dir.clone(),
            secret_key: config.secret_key_base.clone(),
        })
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.db.get()?)
    }
}

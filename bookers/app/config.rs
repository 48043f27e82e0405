use std::path::PathBuf;

use structopt::StructOpt;

/// Runtime settings. Every flag falls back to an environment variable, and
/// `.env` is loaded before parsing.
#[derive(Debug, Clone, StructOpt)]
pub struct Config {
    #[structopt(long, env = "DATABASE_URL", default_value = "db/development.sqlite3")]
    pub database_url: String,

    #[structopt(long, env = "POOL_SIZE", default_value = "5")]
    pub pool_size: u32,

    #[structopt(long, env = "STORAGE_ROOT", default_value = "storage", parse(from_os_str))]
    pub storage_root: PathBuf,

    #[structopt(long, env = "ASSETS_DIR", default_value = "assets", parse(from_os_str))]
    pub assets_dir: PathBuf,

    #[structopt(long, env = "SECRET_KEY_BASE", hide_env_values = true)]
    pub secret_key_base: String,

    #[structopt(long, env = "BCRYPT_COST", help = "bcrypt work factor (4-31)")]
    pub bcrypt_cost: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let config = Config::from_iter_safe(&[
            "bookers",
            "--database-url",
            ":memory:",
            "--secret-key-base",
            "s3cret",
            "--pool-size",
            "2",
            "--assets-dir",
            "/srv/assets",
        ])
        .unwrap();
        assert_eq!(config.database_url, ":memory:");
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.assets_dir, PathBuf::from("/srv/assets"));
        assert_eq!(config.secret_key_base, "s3cret");
    }
}

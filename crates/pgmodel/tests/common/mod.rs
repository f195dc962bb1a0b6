//! Shared setup for database-backed tests.
//!
//! Every test skips itself when `DATABASE_URL` is not set (a `.env` file is
//! honored).

#![allow(dead_code)]

use pgmodel::{Database, DatabaseConfig, ModelResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn try_connect(test: &str) -> ModelResult<Option<Database>> {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let config = match DatabaseConfig::from_env() {
        Ok(config) => config.max_size(4),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };

    let db = Database::connect(config)?;
    pgmodel::load_schema(&db, concat!(env!("CARGO_MANIFEST_DIR"), "/tests/schema.sql")).await?;
    Ok(Some(db))
}

/// A value no other test run uses, for tagging rows.
pub fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{nanos}_{n}", std::process::id())
}

//! One PostgreSQL server per test binary, one database per test.
//!
//! Set `TASKCAL_TEST_PG_URL` to reuse a server that is already running
//! (e.g. in CI). Otherwise a container is started through testcontainers
//! on first use and kept alive for the rest of the process.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use taskcal_db::{PgTaskStore, pool};

pub const EXTERNAL_URL_VAR: &str = "TASKCAL_TEST_PG_URL";

struct SharedServer {
    root_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<SharedServer> = OnceCell::const_new();

async fn start_server() -> SharedServer {
    if let Ok(url) = std::env::var(EXTERNAL_URL_VAR) {
        return SharedServer {
            root_url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("postgres container should start");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    SharedServer {
        root_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL, without a database name.
pub async fn pg_url() -> &'static str {
    &SERVER.get_or_init(start_server).await.root_url
}

async fn connect(url: &str, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {url}: {e}"))
}

/// A migrated throwaway database.
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
}

impl TestDb {
    pub fn store(&self) -> PgTaskStore {
        PgTaskStore::new(self.pool.clone())
    }

    /// Close the pool and drop the database.
    pub async fn cleanup(self) {
        self.pool.close().await;
        drop_test_db(&self.name).await;
    }
}

/// Create `taskcal_test_<uuid>` and apply the embedded migrations.
pub async fn create_test_db() -> TestDb {
    let root = pg_url().await;
    let admin = connect(&format!("{root}/postgres"), 1).await;

    let name = format!("taskcal_test_{}", Uuid::new_v4().simple());
    admin
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create {name}: {e}"));
    admin.close().await;

    let pool = connect(&format!("{root}/{name}"), 5).await;
    pool::run_migrations(&pool)
        .await
        .expect("migrations should apply to a fresh database");

    TestDb { pool, name }
}

/// Drop a database created by [`create_test_db`]. Missing databases are
/// ignored.
pub async fn drop_test_db(name: &str) {
    let admin = connect(&format!("{}/postgres", pg_url().await), 1).await;

    let _ = admin
        .execute(
            format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                 WHERE datname = '{name}' AND pid <> pg_backend_pid()"
            )
            .as_str(),
        )
        .await;
    let _ = admin
        .execute(format!("DROP DATABASE IF EXISTS {name}").as_str())
        .await;
    admin.close().await;
}

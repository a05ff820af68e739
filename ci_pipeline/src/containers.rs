use dagger_sdk::{Container, Directory, Query, Service};

pub const DB_USER: &str = "logbatch";
pub const DB_PASSWORD: &str = "logbatch_password";
pub const DB_NAME: &str = "logbatch_test";

/// Rust build container with libpq for diesel and shared cargo caches.
pub fn rust_base(client: &Query, source: Directory) -> Container {
    client
        .container()
        .from("rust:1.85-bookworm")
        .with_exec(vec!["apt-get", "update"])
        .with_exec(vec![
            "apt-get", "install", "-y",
            "libpq-dev", "pkg-config", "build-essential", "postgresql-client", "curl",
        ])
        .with_mounted_cache(
            "/usr/local/cargo/registry",
            client.cache_volume("logbatch-cargo-registry"),
        )
        .with_mounted_cache(
            "/usr/local/cargo/git",
            client.cache_volume("logbatch-cargo-git"),
        )
        .with_mounted_cache(
            "/app/target",
            client.cache_volume("logbatch-cargo-target"),
        )
        .with_workdir("/app")
        .with_directory("/app", source)
        .with_env_variable("CARGO_TARGET_DIR", "/app/target")
        .with_env_variable("RUST_BACKTRACE", "1")
}

/// Throwaway PostgreSQL for store and smoke tests.
pub fn postgres(client: &Query) -> Service {
    client
        .container()
        .from("postgres:18-alpine")
        .with_env_variable("POSTGRES_DB", DB_NAME)
        .with_env_variable("POSTGRES_USER", DB_USER)
        .with_env_variable("POSTGRES_PASSWORD", DB_PASSWORD)
        .with_exposed_port(5432)
        .as_service()
}

/// Connection string for the `db` service binding.
pub fn database_url() -> String {
    format!("postgres://{DB_USER}:{DB_PASSWORD}@db:5432/{DB_NAME}")
}

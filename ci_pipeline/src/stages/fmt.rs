use dagger_sdk::{Directory, Query};

use crate::containers;

/// Fail on any rustfmt drift.
pub async fn run(client: &Query, source: Directory) -> eyre::Result<String> {
    let output = containers::rust_base(client, source)
        .with_exec(vec!["rustup", "component", "add", "rustfmt"])
        .with_exec(vec!["cargo", "fmt", "--all", "--", "--check"])
        .stdout()
        .await?;

    Ok(format!("[fmt] No formatting drift.\n{output}"))
}

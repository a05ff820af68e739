use dagger_sdk::{Directory, Query};

use crate::containers;

/// Compile every target, tests included, without running anything.
pub async fn run(client: &Query, source: Directory) -> eyre::Result<String> {
    let output = containers::rust_base(client, source)
        .with_exec(vec!["cargo", "check", "--workspace", "--all-targets"])
        .stdout()
        .await?;

    Ok(format!("[check] Workspace compiles.\n{output}"))
}

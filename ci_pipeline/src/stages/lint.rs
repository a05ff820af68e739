use dagger_sdk::{Directory, Query};

use crate::containers;

/// Clippy over the server crate, tests included. Warnings fail the stage.
pub async fn run(client: &Query, source: Directory) -> eyre::Result<String> {
    let output = containers::rust_base(client, source)
        .with_exec(vec!["rustup", "component", "add", "clippy"])
        .with_exec(vec![
            "cargo", "clippy", "--package", "logbatch-server", "--all-targets",
            "--", "-D", "warnings",
        ])
        .stdout()
        .await?;

    Ok(format!("[lint] Clippy clean.\n{output}"))
}

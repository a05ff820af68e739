use dagger_sdk::{Directory, Query};

use crate::containers;

/// `cargo audit` against the lockfile. Advisories and yanked crates fail.
pub async fn run(client: &Query, source: Directory) -> eyre::Result<String> {
    let output = containers::rust_base(client, source)
        .with_exec(vec!["cargo", "install", "--locked", "cargo-audit"])
        .with_exec(vec!["cargo", "audit", "--deny", "warnings"])
        .stdout()
        .await?;

    Ok(format!("[security] No advisories.\n{output}"))
}

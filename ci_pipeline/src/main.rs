mod containers;
mod stages;

use clap::{Parser, Subcommand};
use dagger_sdk::{Directory, HostDirectoryOpts, Query};

#[derive(Parser)]
#[command(name = "logbatch-ci", about = "Logbatch CI Pipeline")]
struct Cli {
    /// Workspace root to build
    #[arg(long, global = true, default_value = ".")]
    source: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every target
    Check,
    /// Format check
    Fmt,
    /// Clippy lint
    Lint,
    /// Unit and in-memory pipeline tests
    Test,
    /// Postgres store tests and server smoke test
    #[command(name = "integration-test")]
    IntegrationTest,
    /// Dependency advisory audit
    #[command(name = "security-audit")]
    SecurityAudit,
    /// Full pipeline (check + fmt, then lint + test + audit, then integration)
    All,
}

fn host_directory(client: &Query, source: &str) -> Directory {
    client.host().directory_opts(
        source,
        HostDirectoryOpts {
            exclude: Some(vec!["target/", ".git/", "examples/"]),
            include: None,
            gitignore: None,
            no_cache: None,
        },
    )
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let Cli { source, command } = Cli::parse();

    dagger_sdk::connect(|client| async move {
        let src = host_directory(&client, &source);
        let out = match command {
            Command::Check => stages::check::run(&client, src).await?,
            Command::Fmt => stages::fmt::run(&client, src).await?,
            Command::Lint => stages::lint::run(&client, src).await?,
            Command::Test => stages::test::run(&client, src).await?,
            Command::IntegrationTest => stages::integration::run(&client, src).await?,
            Command::SecurityAudit => stages::security::run(&client, src).await?,
            Command::All => {
                println!("=== Phase 1: Fast Gates ===");
                let (check_out, fmt_out) = tokio::try_join!(
                    stages::check::run(&client, src.clone()),
                    stages::fmt::run(&client, src.clone()),
                )?;
                println!("{check_out}\n{fmt_out}");

                println!("=== Phase 2: Quality Gates ===");
                let (lint_out, test_out, audit_out) = tokio::try_join!(
                    stages::lint::run(&client, src.clone()),
                    stages::test::run(&client, src.clone()),
                    stages::security::run(&client, src.clone()),
                )?;
                println!("{lint_out}\n{test_out}\n{audit_out}");

                println!("=== Phase 3: Integration ===");
                let int_out = stages::integration::run(&client, src).await?;
                format!("{int_out}\n\n=== Full CI Pipeline Complete ===")
            }
        };
        println!("{out}");
        Ok(())
    })
    .await?;

    Ok(())
}

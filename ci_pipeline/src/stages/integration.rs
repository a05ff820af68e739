use dagger_sdk::{Directory, Query};

use crate::containers;

/// Postgres store tests, then a smoke run of the server against the same database.
/// Flow: wait for db -> ignored store tests -> start server -> post batch -> verify rows
pub async fn run(client: &Query, source: Directory) -> eyre::Result<String> {
    let pg = containers::postgres(client);
    let db_url = containers::database_url();

    let smoke_script = r#"
set -euo pipefail

BINARY="./target/release/logbatch"
PORT=9191

echo "=== Integration: Server Smoke Test ==="

echo "[1/4] Starting server..."
$BINARY --port "$PORT" > /tmp/logbatch.log 2>&1 &
SERVER_PID=$!
trap 'kill $SERVER_PID 2>/dev/null || true' EXIT
for i in $(seq 1 30); do
    curl -sf "http://127.0.0.1:$PORT/logs/health" > /dev/null && break
    sleep 1
done

echo "[2/4] Posting batch..."
curl -sf -X POST "http://127.0.0.1:$PORT/logs/api/batches" \
    -H 'content-type: application/json' \
    -d '[{"transactionId":"SMOKE-1","loggingLevel":"INFO","message":"one","tags":"a,b"},
         {"transactionId":"SMOKE-1","loggingLevel":"WARN","message":"two","tags":"b,c"}]'
echo ""

echo "[3/4] Re-posting batch..."
curl -sf -X POST "http://127.0.0.1:$PORT/logs/api/batches" \
    -H 'content-type: application/json' \
    -d '[{"transactionId":"SMOKE-1","loggingLevel":"INFO","message":"three"}]'
echo ""

echo "[4/4] Verifying rows..."
RUNS=$(psql "$DATABASE_URL" -t -c "SELECT COUNT(*) FROM log_runs WHERE transaction_id = 'SMOKE-1'" | tr -d ' ')
LINKS=$(psql "$DATABASE_URL" -t -c "SELECT COUNT(*) FROM log_tag_links l JOIN log_runs r ON l.target_kind = 'run' AND l.target_id = r.id WHERE r.transaction_id = 'SMOKE-1'" | tr -d ' ')
echo "Runs: $RUNS, run tag links: $LINKS"
if [ "$RUNS" != "1" ] || [ "$LINKS" != "3" ]; then
    cat /tmp/logbatch.log
    exit 1
fi

echo ""
echo "=== Integration Complete ==="
"#;

    let output = containers::rust_base(client, source)
        .with_service_binding("db", pg)
        .with_env_variable("DATABASE_URL", db_url.as_str())
        .with_env_variable("RUST_LOG", "info")
        .with_exec(vec![
            "sh", "-c",
            "for i in $(seq 1 30); do pg_isready -h db -p 5432 -U logbatch && break; sleep 1; done",
        ])
        .with_exec(vec![
            "cargo", "test", "--package", "logbatch-server", "--test", "pg_store",
            "--", "--ignored", "--test-threads=1",
        ])
        .with_exec(vec![
            "cargo", "build", "--release", "--package", "logbatch-server",
        ])
        .with_exec(vec!["bash", "-c", smoke_script])
        .stdout()
        .await?;

    Ok(format!("[integration] {output}"))
}

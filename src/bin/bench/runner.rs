use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::Command;
use tokio::time::Instant;

use crate::config::{BenchConfig, Step};
use crate::stats::StepResults;

pub struct BenchRunner {
    config: BenchConfig,
    command: Vec<String>,
    iterations: usize,
}

impl BenchRunner {
    pub fn new(config: BenchConfig, command: Vec<String>, iterations: usize) -> Self {
        Self {
            config,
            command,
            iterations,
        }
    }

    /// Spawns the server once and replays every step against it `iterations` times.
    pub async fn run(&self) -> Result<IndexMap<String, StepResults>> {
        let (program, args) = self
            .command
            .split_first()
            .context("No command specified")?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{program}'"))?;

        let mut stdin = child.stdin.take().context("Child stdin unavailable")?;
        let stdout = child.stdout.take().context("Child stdout unavailable")?;
        let mut lines = BufReader::new(stdout).lines();

        let results = self.run_iterations(&mut stdin, &mut lines).await;

        if let Err(e) = child.kill().await {
            tracing::warn!("Failed to stop server process: {e}");
        }
        results
    }

    pub async fn run_iterations<W, R>(
        &self,
        writer: &mut W,
        lines: &mut Lines<R>,
    ) -> Result<IndexMap<String, StepResults>>
    where
        W: AsyncWrite + Unpin,
        R: AsyncBufRead + Unpin,
    {
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let mut results: IndexMap<String, StepResults> = IndexMap::new();

        for iteration in 1..=self.iterations {
            if self.iterations > 1 {
                tracing::info!("Iteration {}/{}", iteration, self.iterations);
            }
            for step in &self.config.steps {
                let outcome = run_step(writer, lines, step, timeout)
                    .await
                    .with_context(|| format!("Step '{}' failed", step.name))?;
                tracing::info!(
                    "{:<25} | {:<6} | {:>5} req | {:>4} err | {:.3}ms",
                    step.name,
                    if step.bench { "BENCH" } else { "SETUP" },
                    outcome.requests,
                    outcome.errors,
                    outcome.wall.as_secs_f64() * 1000.0
                );
                if step.bench {
                    results.entry(step.name.clone()).or_default().merge(outcome);
                }
            }
        }

        Ok(results)
    }
}

const DEFAULT_BASE_ID: i64 = 1000;

/// Sends `step.tasks` copies of the payload, keeping at most
/// `step.concurrency` requests in flight. Request ids are rewritten to
/// `base + n`, where the base is the payload's integer id or 1000.
/// Payloads without an `id` are notifications and are sent without waiting.
pub async fn run_step<W, R>(
    writer: &mut W,
    lines: &mut Lines<R>,
    step: &Step,
    timeout: Duration,
) -> Result<StepResults>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    let step_start = Instant::now();
    let deadline = step_start + timeout;
    let mut results = StepResults {
        requests: step.tasks,
        ..StepResults::default()
    };

    let Some(payload_id) = step.payload.get("id") else {
        for _ in 0..step.tasks {
            send(writer, &step.payload).await?;
        }
        results.wall = step_start.elapsed();
        return Ok(results);
    };
    let base_id = payload_id.as_i64().unwrap_or(DEFAULT_BASE_ID);

    let window = step.concurrency.max(1);
    let mut pending: HashMap<i64, Instant> = HashMap::new();
    let mut sent = 0usize;

    while sent < step.tasks || !pending.is_empty() {
        while sent < step.tasks && pending.len() < window {
            let id = base_id + sent as i64;
            pending.insert(id, Instant::now());
            send(writer, &with_id(&step.payload, id)).await?;
            sent += 1;
        }

        let line = tokio::time::timeout_at(deadline, lines.next_line())
            .await
            .map_err(|_| anyhow!("Timed out with {} requests in flight", pending.len()))?
            .context("Failed to read server output")?
            .context("Server closed its output")?;
        let resp: Value = serde_json::from_str(&line).context("Server sent invalid JSON")?;

        let Some(sent_at) = resp
            .get("id")
            .and_then(Value::as_i64)
            .and_then(|id| pending.remove(&id))
        else {
            tracing::debug!("Ignoring unmatched message: {line}");
            continue;
        };

        results.latencies.push(sent_at.elapsed());
        if let Some(error) = resp.get("error") {
            results.errors += 1;
            tracing::warn!("ERROR in {}: {}", step.name, error);
        }
        tracing::trace!("Response for {}: {}", step.name, resp);
    }

    results.wall = step_start.elapsed();
    Ok(results)
}

fn with_id(payload: &Value, id: i64) -> Value {
    let mut payload = payload.clone();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("id".to_string(), Value::Number(id.into()));
    }
    payload
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, payload: &Value) -> Result<()> {
    let mut line = serde_json::to_string(payload)?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("Failed to write to server")?;
    writer.flush().await.context("Failed to flush server input")?;
    Ok(())
}

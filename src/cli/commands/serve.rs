//! serve command - Line-delimited JSON over stdin/stdout
//!
//! Each stdin line is one request. Requests are dispatched concurrently, so
//! a slow push does not hold up a status poll; a single writer task keeps
//! response lines from interleaving. The loop ends at end of input, after
//! every in-flight request has answered.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::dispatch::Dispatcher;

pub async fn serve(dispatcher: Dispatcher) -> Result<ExitCode> {
    let dispatcher = Arc::new(dispatcher);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = dispatcher.dispatch_json(&line).await;
            match serde_json::to_string(&response) {
                Ok(json) => {
                    // the writer only stops once every sender is gone
                    let _ = tx.send(json);
                }
                Err(err) => tracing::error!(%err, "failed to serialize response"),
            }
        });
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer
        .await
        .context("response writer panicked")?
        .context("failed to write response")?;
    tracing::debug!("input closed, serve loop done");
    Ok(ExitCode::SUCCESS)
}

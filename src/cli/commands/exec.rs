//! exec command - Run one JSON request

use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use crate::dispatch::Dispatcher;

/// Dispatch `request` (or stdin when it is `-`) and print the response.
///
/// Exits non-zero when the response reports an error.
pub async fn exec(dispatcher: &Dispatcher, request: &str) -> Result<ExitCode> {
    let text = if request == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read request from stdin")?;
        buf
    } else {
        request.to_string()
    };

    let response = dispatcher.dispatch_json(text.trim()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

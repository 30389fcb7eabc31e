//! Stdio host
//!
//! Serves one channel over newline-delimited JSON: each input line is a
//! request, each output line the matching response, in order. Host queries
//! may block, so every message is dispatched on the blocking pool.

use crate::channel::Messenger;
use crate::codec::json::WireResponse;
use crate::config::{ERROR_CHANNEL, ERROR_UNIMPLEMENTED, MAX_MESSAGE_SIZE};
use crate::error::{BridgeError, Result};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// Serve requests from `reader` until it is exhausted.
/// Returns the number of requests answered.
pub async fn serve_lines<R, W>(
    messenger: Arc<Messenger>,
    channel: &str,
    mut reader: R,
    mut writer: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let limit = MAX_MESSAGE_SIZE as u64 + 1;
    let mut line = Vec::new();
    let mut served = 0;

    loop {
        line.clear();
        let read = (&mut reader).take(limit).read_until(b'\n', &mut line).await?;
        if read == 0 {
            break;
        }

        let reply = if line.len() as u64 == limit && line.last() != Some(&b'\n') {
            tracing::warn!("Rejected message over {} bytes", MAX_MESSAGE_SIZE);
            skip_line(&mut reader).await?;
            serde_json::to_vec(&WireResponse::failure(
                ERROR_CHANNEL,
                Some(format!("Message exceeds {} bytes", MAX_MESSAGE_SIZE)),
            ))?
        } else {
            let message = line.trim_ascii();
            if message.is_empty() {
                continue;
            }
            dispatch(Arc::clone(&messenger), channel, message.to_vec()).await?
        };

        writer.write_all(&reply).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

/// Discard input up to and including the next newline
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<()> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Send one message through the messenger off the async runtime
async fn dispatch(
    messenger: Arc<Messenger>,
    channel: &str,
    message: Vec<u8>,
) -> Result<Vec<u8>> {
    let channel_name = channel.to_string();
    let reply = tokio::task::spawn_blocking(move || messenger.send(&channel_name, &message))
        .await
        .map_err(|e| BridgeError::Generic(format!("Dispatch task failed: {}", e)))?;

    match reply {
        Some(reply) => Ok(reply),
        None => Ok(serde_json::to_vec(&WireResponse::failure(
            ERROR_UNIMPLEMENTED,
            Some(format!("No handler registered on channel {}", channel)),
        ))?),
    }
}

/// Serve `channel` on this process's stdin and stdout
pub async fn serve_stdio(messenger: Arc<Messenger>, channel: &str) -> Result<usize> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(messenger, channel, stdin, stdout).await
}

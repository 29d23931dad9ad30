// stdio and HTTP(S) transports
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::post;
use axum_server::tls_rustls::RustlsConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::format::Clock;
use crate::handlers::{AppState, handle_raw, mcp_handler};

pub fn router(clock: Arc<dyn Clock>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/mcp/", post(mcp_handler))
        .with_state(AppState::new(clock))
}

/// Serves newline-delimited JSON-RPC until `reader` hits EOF.
///
/// Messages are handled in arrival order and each response is flushed
/// as a single line before the next message is read. Undecodable lines
/// are answered with a parse error and the loop keeps going.
pub async fn serve_stdio<R, W>(reader: R, mut writer: W, clock: Arc<dyn Clock>) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!("MCP server listening on stdio");
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // Non-UTF-8 lines must still reach handle_raw.
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read from stdin")?;
        if read == 0 {
            break;
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        let Some(response) = handle_raw(line, clock.as_ref()) else {
            continue;
        };
        let mut out = serde_json::to_string(&response).context("Failed to encode response")?;
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("Failed to write to stdout")?;
        writer.flush().await.context("Failed to flush stdout")?;
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}

pub async fn serve_http(
    addr: SocketAddr,
    tls: Option<(PathBuf, PathBuf)>,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let app = router(clock);

    match tls {
        Some((cert_path, key_path)) => {
            let config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS certificate/key from {} and {}",
                        cert_path.display(),
                        key_path.display()
                    )
                })?;
            tracing::info!("MCP server listening on https://{addr}");
            axum_server::bind_rustls(addr, config)
                .serve(app.into_make_service())
                .await
                .context("Failed to start HTTPS server")?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind to address {addr}"))?;
            tracing::info!("MCP server listening on http://{addr}");
            axum::serve(listener, app)
                .await
                .context("Failed to start HTTP server")?;
        }
    }
    Ok(())
}

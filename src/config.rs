// Command-line configuration
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST on /mcp
    Http,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MCP server exposing current timestamp and date tools",
    long_about = None
)]
pub struct Args {
    /// Transport to serve on
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,
    /// Address to bind when serving HTTP
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,
    /// Path to the TLS certificate file
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,
    /// Path to the TLS key file
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn tls(&self) -> Result<Option<(PathBuf, PathBuf)>> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Ok(Some((cert.clone(), key.clone()))),
            (None, None) => Ok(None),
            _ => bail!("Both --tls-cert and --tls-key must be provided together to enable TLS."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_stdio() {
        let args = Args::try_parse_from(["mcp-datetime-server"]).unwrap();
        assert_eq!(args.transport, Transport::Stdio);
        assert_eq!(args.bind, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(args.log_level, "info");
        assert!(args.tls().unwrap().is_none());
    }

    #[test]
    fn http_with_tls_pair() {
        let args = Args::try_parse_from([
            "mcp-datetime-server",
            "--transport",
            "http",
            "--bind",
            "127.0.0.1:8443",
            "--tls-cert",
            "cert.pem",
            "--tls-key",
            "key.pem",
        ])
        .unwrap();
        assert_eq!(args.transport, Transport::Http);
        let (cert, key) = args.tls().unwrap().unwrap();
        assert_eq!(cert, PathBuf::from("cert.pem"));
        assert_eq!(key, PathBuf::from("key.pem"));
    }

    #[test]
    fn lone_tls_flag_is_rejected() {
        let args =
            Args::try_parse_from(["mcp-datetime-server", "--tls-cert", "cert.pem"]).unwrap();
        assert!(args.tls().is_err());
    }

    #[test]
    fn unknown_transport_fails_to_parse() {
        assert!(Args::try_parse_from(["mcp-datetime-server", "--transport", "ws"]).is_err());
    }
}

//! Command line and environment configuration

use clap::{ArgAction, Parser, Subcommand};
use machindex_core::RecordKind;
use std::net::SocketAddr;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "machindex")]
#[command(about = "Identity index for bare-metal machines, BMCs and machine types")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print CRD manifests to stdout
    Crds,
    /// Watch the cluster and serve index lookups over HTTP
    Serve {
        /// Address the HTTP server listens on
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind_addr: SocketAddr,

        /// Restrict the index to one namespace (all namespaces if unset)
        #[arg(long, env = "WATCH_NAMESPACE")]
        namespace: Option<String>,

        /// Expose Prometheus metrics on /metrics
        #[arg(long, env = "METRICS_ENABLED", default_value_t = true, action = ArgAction::Set)]
        metrics: bool,
    },
    /// Resolve a MAC or UUID against a running index server
    Lookup {
        /// Base URL of the index server
        #[arg(long, env = "INDEX_SERVER", default_value = "http://127.0.0.1:8080")]
        server: Url,

        /// Which index to query: machine, bmc or machinetype
        #[arg(long, default_value = "machine", value_parser = parse_kind)]
        kind: RecordKind,

        #[arg(long)]
        mac: Option<String>,

        #[arg(long)]
        uuid: Option<String>,

        /// Maximum cached entries, 0 for unbounded
        #[arg(long, env = "INDEX_MAX_CACHE", default_value_t = 100)]
        max_cache: usize,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
    },
}

fn parse_kind(s: &str) -> Result<RecordKind, String> {
    s.parse()
        .map_err(|_| format!("unknown kind {s:?}, expected machine, bmc or machinetype"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["machindex", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { bind_addr, metrics, .. } => {
                assert_eq!(bind_addr, "0.0.0.0:8080".parse().unwrap());
                assert!(metrics);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_serve_disable_metrics() {
        let cli = Cli::try_parse_from(["machindex", "serve", "--metrics", "false", "--namespace", "lab"])
            .unwrap();
        match cli.command {
            Commands::Serve { namespace, metrics, .. } => {
                assert_eq!(namespace.as_deref(), Some("lab"));
                assert!(!metrics);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_lookup_args() {
        let cli = Cli::try_parse_from([
            "machindex",
            "lookup",
            "--server",
            "http://index.lab:8080",
            "--kind",
            "bmc",
            "--mac",
            "0c:c4:7a:00:00:01",
            "--max-cache",
            "0",
        ])
        .unwrap();
        match cli.command {
            Commands::Lookup { server, kind, mac, uuid, max_cache, timeout_secs } => {
                assert_eq!(server.as_str(), "http://index.lab:8080/");
                assert_eq!(kind, RecordKind::Bmc);
                assert_eq!(mac.as_deref(), Some("0c:c4:7a:00:00:01"));
                assert!(uuid.is_none());
                assert_eq!(max_cache, 0);
                assert_eq!(timeout_secs, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_lookup_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["machindex", "lookup", "--kind", "switch"]).is_err());
    }
}

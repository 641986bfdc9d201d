//! Startup configuration: CLI flags (`clap`) optionally layered over an
//! ini file (`rust-ini`), matching the teacher's dependency choices for
//! these two concerns. CLI flags always win over the file.

use std::path::PathBuf;

use clap::Parser;
use ini::Ini;

use crate::successor_list::DEFAULT_LEN as DEFAULT_SUCCESSOR_LIST_LEN;

#[derive(Parser, Debug)]
#[command(name = "chordring", about = "A Chord DHT ring node")]
pub struct Cli {
    /// Address this node's gRPC endpoint listens on, e.g. 127.0.0.1:3410.
    /// If omitted, the node discovers its first non-loopback IPv4
    /// interface and binds an ephemeral port.
    #[arg(long)]
    pub grpc: Option<String>,

    /// Bootstrap peer to join an existing ring. Omit to `create` a new one.
    #[arg(long)]
    pub peer: Option<String>,

    /// Optional ini config file; CLI flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of failover successors tracked per node, including the
    /// primary.
    #[arg(long)]
    pub successor_list_len: Option<usize>,

    #[arg(long)]
    pub stabilize_interval_ms: Option<u64>,

    #[arg(long)]
    pub fix_fingers_interval_ms: Option<u64>,

    #[arg(long)]
    pub check_predecessor_interval_ms: Option<u64>,

    #[arg(long)]
    pub rpc_timeout_ms: Option<u64>,

    /// Enables debugging commands in the shell.
    #[arg(long, default_value_t = false)]
    pub dev: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub grpc_address: Option<String>,
    pub peer: Option<String>,
    pub stabilize_interval_ms: u64,
    pub fix_fingers_interval_ms: u64,
    pub check_predecessor_interval_ms: u64,
    pub rpc_timeout_ms: u64,
    pub successor_list_len: usize,
    pub dev: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grpc_address: None,
            peer: None,
            stabilize_interval_ms: 1000,
            fix_fingers_interval_ms: 1000,
            check_predecessor_interval_ms: 1000,
            rpc_timeout_ms: 300,
            successor_list_len: DEFAULT_SUCCESSOR_LIST_LEN,
            dev: false,
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = Config::default();

        if let Some(path) = &cli.config {
            if let Ok(ini) = Ini::load_from_file(path) {
                if let Some(section) = ini.section(Some("chord")) {
                    if let Some(v) = section.get("stabilize_interval_ms").and_then(|s| s.parse().ok()) {
                        config.stabilize_interval_ms = v;
                    }
                    if let Some(v) = section.get("fix_fingers_interval_ms").and_then(|s| s.parse().ok()) {
                        config.fix_fingers_interval_ms = v;
                    }
                    if let Some(v) = section
                        .get("check_predecessor_interval_ms")
                        .and_then(|s| s.parse().ok())
                    {
                        config.check_predecessor_interval_ms = v;
                    }
                    if let Some(v) = section.get("rpc_timeout_ms").and_then(|s| s.parse().ok()) {
                        config.rpc_timeout_ms = v;
                    }
                    if let Some(v) = section.get("successor_list_len").and_then(|s| s.parse().ok()) {
                        config.successor_list_len = v;
                    }
                    if let Some(v) = section.get("peer") {
                        config.peer = Some(v.to_string());
                    }
                }
            }
        }

        config.grpc_address = cli.grpc.clone();
        if cli.peer.is_some() {
            config.peer = cli.peer.clone();
        }
        if let Some(v) = cli.stabilize_interval_ms {
            config.stabilize_interval_ms = v;
        }
        if let Some(v) = cli.fix_fingers_interval_ms {
            config.fix_fingers_interval_ms = v;
        }
        if let Some(v) = cli.check_predecessor_interval_ms {
            config.check_predecessor_interval_ms = v;
        }
        if let Some(v) = cli.rpc_timeout_ms {
            config.rpc_timeout_ms = v;
        }
        if let Some(v) = cli.successor_list_len {
            config.successor_list_len = v;
        }
        config.dev = cli.dev;

        config
    }
}

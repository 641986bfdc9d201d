//! The command driver: a line-oriented REPL over stdin, separate from the
//! core ring-maintenance subsystem. Modeled on a `bufio.Scanner`-style REPL
//! with one verb per shell command.

use std::time::Duration;

use log::{error, info};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tonic::transport::Server;

use crate::config::Config;
use crate::identifier::Identifier;
use crate::net;
use crate::rpc::chord_proto::chord_server::ChordServer;
use crate::rpc::client;
use crate::rpc::service::ChordService;
use crate::state::NodeState;

const HELP_TEXT: &str = "\
help:              Displays a list of commands
port <n>:          Sets the port this node should listen on
create:            Creates a new ring if no ring has been joined or exists
join <address>:    Joins an existing ring at the specified address
ping <address>:    Probes liveness of a peer
put <key> <value>: Inserts a key/value pair into the active ring
putrandom <n>:     Randomly generates n keys and associated values and stores them on the ring
get <key>:         Find the given key on the ring and return its value
delete <key>:      Deletes the given key from the ring
dump:              Display info about current node
quit:              Ends the program";

struct Running {
    state: NodeState,
    config: Config,
}

pub struct Shell {
    port: u16,
    config: Config,
    running: Option<Running>,
}

impl Shell {
    pub fn new(config: Config, default_port: u16) -> Self {
        Shell {
            port: default_port,
            config,
            running: None,
        }
    }

    /// Starts the ring non-interactively from CLI configuration before the
    /// REPL takes over: `--peer` joins, its absence creates. Lets the
    /// binary be driven by flags alone while keeping the shell commands
    /// available for everything after startup.
    pub async fn bootstrap(&mut self) {
        if let Some(peer) = self.config.peer.clone() {
            self.cmd_join(&["join", &peer]).await;
        } else {
            self.cmd_create().await;
        }
    }

    pub async fn run(mut self) {
        println!("Please enter a command:");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    error!("failed to read command: {err}");
                    break;
                }
            };
            let words: Vec<&str> = line.split_whitespace().collect();
            let Some(&verb) = words.first() else {
                continue;
            };

            match verb {
                "help" => println!("{HELP_TEXT}"),
                "port" => self.cmd_port(&words),
                "create" => self.cmd_create().await,
                "join" => self.cmd_join(&words).await,
                "ping" => self.cmd_ping(&words).await,
                "put" => self.cmd_put(&words).await,
                "putrandom" => self.cmd_putrandom(&words).await,
                "get" => self.cmd_get(&words).await,
                "delete" => self.cmd_delete(&words).await,
                "dump" => self.cmd_dump(),
                "quit" => {
                    println!("bye");
                    std::process::exit(0);
                }
                other => println!("unknown command: {other} (type 'help' for a list)"),
            }
        }
    }

    fn cmd_port(&mut self, words: &[&str]) {
        if self.running.is_some() {
            println!("cannot change port after create/join");
            return;
        }
        match words.get(1).and_then(|w| w.parse::<u16>().ok()) {
            Some(port) => {
                self.port = port;
                println!("port set to {port}");
            }
            None => println!("usage: port <n>"),
        }
    }

    async fn cmd_create(&mut self) {
        if self.running.is_some() {
            println!("ring already started");
            return;
        }
        let address = match net::resolve_grpc_address(self.config.grpc_address.as_deref(), self.port) {
            Ok(address) => address,
            Err(err) => {
                println!("startup failed: {err}");
                std::process::exit(1);
            }
        };

        let state = NodeState::create(address.clone(), self.config.successor_list_len);
        self.start(state).await;
        println!("created ring at {address}");
    }

    async fn cmd_join(&mut self, words: &[&str]) {
        if self.running.is_some() {
            println!("ring already started");
            return;
        }
        let Some(peer) = words.get(1) else {
            println!("usage: join <address>");
            return;
        };

        let address = match net::resolve_grpc_address(self.config.grpc_address.as_deref(), self.port) {
            Ok(address) => address,
            Err(err) => {
                println!("startup failed: {err}");
                std::process::exit(1);
            }
        };

        let timeout = Duration::from_millis(self.config.rpc_timeout_ms);
        match client::join(peer, &address, timeout).await {
            Ok(successor) => {
                let state = NodeState::join(address.clone(), successor.clone(), self.config.successor_list_len);
                self.start(state).await;
                println!("joined ring via {peer}, successor is {successor}");
            }
            Err(err) => println!("join failed: {err}"),
        }
    }

    async fn start(&mut self, state: NodeState) {
        let address = state.address.clone();
        let listen_addr = match address.parse() {
            Ok(addr) => addr,
            Err(err) => {
                println!("invalid listen address {address}: {err}");
                std::process::exit(1);
            }
        };

        let rpc_timeout = Duration::from_millis(self.config.rpc_timeout_ms);
        let service = ChordService::new(state.clone(), rpc_timeout);
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(crate::rpc::FILE_DESCRIPTOR_SET)
            .build()
            .expect("reflection descriptor set is well-formed");
        tokio::spawn(async move {
            if let Err(err) = Server::builder()
                .add_service(ChordServer::new(service))
                .add_service(reflection_service)
                .serve(listen_addr)
                .await
            {
                error!("gRPC server on {listen_addr} stopped: {err}");
            }
        });

        let maintenance_state = state.clone();
        let maintenance_config = self.config.clone();
        tokio::spawn(async move {
            crate::maintenance::run(maintenance_state, maintenance_config).await;
        });

        info!("node {address} started");
        self.running = Some(Running {
            state,
            config: self.config.clone(),
        });
    }

    async fn cmd_ping(&self, words: &[&str]) {
        let Some(address) = words.get(1) else {
            println!("usage: ping <address>");
            return;
        };
        let timeout = Duration::from_millis(self.config.rpc_timeout_ms);
        match client::ping(address, timeout).await {
            Ok(true) => println!("{address} is alive"),
            Ok(false) => println!("{address} responded but reported not alive"),
            Err(err) => println!("{address} unreachable: {err}"),
        }
    }

    async fn cmd_put(&self, words: &[&str]) {
        let (Some(key), Some(value)) = (words.get(1), words.get(2)) else {
            println!("usage: put <key> <value>");
            return;
        };
        self.route_and_put(key, value).await;
    }

    async fn cmd_putrandom(&self, words: &[&str]) {
        let Some(n) = words.get(1).and_then(|w| w.parse::<u32>().ok()) else {
            println!("usage: putrandom <n>");
            return;
        };
        let mut rng = rand::thread_rng();
        for _ in 0..n {
            let key: String = (0..8).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect();
            let value: String = (0..8).map(|_| rng.sample(rand::distributions::Alphanumeric) as char).collect();
            self.route_and_put(&key, &value).await;
        }
        println!("inserted {n} random key/value pairs");
    }

    async fn route_and_put(&self, key: &str, value: &str) {
        let Some(running) = &self.running else {
            println!("no active ring, run 'create' or 'join' first");
            return;
        };
        let timeout = Duration::from_millis(running.config.rpc_timeout_ms);
        let target = Identifier::hash(key);
        match crate::routing::find(&running.state, target, timeout).await {
            Ok(owner) => match client::put(&owner, key, value, timeout).await {
                Ok(()) => println!("put {key}={value} on {owner}"),
                Err(err) => println!("put failed: {err}"),
            },
            Err(err) => println!("routing failed: {err}"),
        }
    }

    async fn cmd_get(&self, words: &[&str]) {
        let Some(running) = &self.running else {
            println!("no active ring, run 'create' or 'join' first");
            return;
        };
        let Some(key) = words.get(1) else {
            println!("usage: get <key>");
            return;
        };
        let timeout = Duration::from_millis(running.config.rpc_timeout_ms);
        let target = Identifier::hash(key);
        match crate::routing::find(&running.state, target, timeout).await {
            Ok(owner) => match client::get(&owner, key, timeout).await {
                Ok(value) => println!("{value}"),
                Err(err) => println!("get failed: {err}"),
            },
            Err(err) => println!("routing failed: {err}"),
        }
    }

    async fn cmd_delete(&self, words: &[&str]) {
        let Some(running) = &self.running else {
            println!("no active ring, run 'create' or 'join' first");
            return;
        };
        let Some(key) = words.get(1) else {
            println!("usage: delete <key>");
            return;
        };
        let timeout = Duration::from_millis(running.config.rpc_timeout_ms);
        let target = Identifier::hash(key);
        match crate::routing::find(&running.state, target, timeout).await {
            Ok(owner) => match client::delete(&owner, key, timeout).await {
                Ok(()) => println!("deleted {key} on {owner}"),
                Err(err) => println!("delete failed: {err}"),
            },
            Err(err) => println!("routing failed: {err}"),
        }
    }

    fn cmd_dump(&self) {
        let Some(running) = &self.running else {
            println!("no active ring, run 'create' or 'join' first");
            return;
        };
        let state = &running.state;
        println!("address: {}", state.address);
        println!("id: {}", state.pos);
        println!("predecessor: {:?}", state.predecessor_address());
        let successors = state.successors.lock().unwrap();
        println!("successors: {:?}", successors.as_wire());
        drop(successors);

        let finger_table = state.finger_table.lock().unwrap();
        for (i, entry) in finger_table.entries().iter().enumerate() {
            if let Some(address) = &entry.address {
                println!("finger[{i}] start={} -> {address}", entry.start);
            }
        }
        drop(finger_table);

        let bucket = state.bucket.lock().unwrap();
        println!("bucket ({} entries):", bucket.len());
        for key in bucket.keys() {
            println!("  {key}");
        }
    }
}

//! Configuration for the layerstack demo harness.
//!
//! Handles command-line parsing and sensible defaults. The tool works with
//! ZERO arguments: it runs a server and a client in one process over
//! loopback TCP, with address markers derived deterministically from the
//! seed so runs are reproducible.

use layerstack_core::{CipherKey, MacAddr, NetAddr, SessionId, StackConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Which end(s) of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Server and client in one process over loopback (default).
    Demo,
    /// Accept connections and echo responses.
    Server,
    /// Connect and send generated requests.
    Client,
}

/// Which end of a connection a stack controller is built for.
/// The two ends see each other's markers mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,

    /// TCP host to bind (server) or connect to (client).
    pub host: String,

    /// TCP port. 0 lets the demo pick an ephemeral port.
    pub port: u16,

    /// Session identifier both ends must share.
    pub session: String,

    /// Cipher key both ends must share.
    pub key: String,

    /// How many request messages the client sends.
    pub messages: usize,

    /// Approximate request body size in bytes.
    pub payload_bytes: usize,

    /// Seed for generated bodies and derived address markers.
    pub seed: u64,

    /// Whether to print the resolved configuration.
    pub print_config: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no `--seed` is given, a time-based seed is used and printed so
    /// the run can be reproduced.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut role = Role::Demo;
        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut session: Option<String> = None;
        let mut key: Option<String> = None;
        let mut messages: Option<usize> = None;
        let mut payload_bytes: Option<usize> = None;
        let mut seed: Option<u64> = None;
        let mut print_config = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--role" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--role requires server|client|demo".to_string());
                    }
                    role = match args[i].as_str() {
                        "demo" => Role::Demo,
                        "server" => Role::Server,
                        "client" => Role::Client,
                        other => return Err(format!("unknown role: {other}")),
                    };
                }
                "--host" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--host requires an address".to_string());
                    }
                    host = Some(args[i].clone());
                }
                "--port" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--port requires a number".to_string());
                    }
                    port = Some(args[i].parse().map_err(|_| "invalid port")?);
                }
                "--session" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--session requires a token".to_string());
                    }
                    session = Some(args[i].clone());
                }
                "--key" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--key requires a value".to_string());
                    }
                    key = Some(args[i].clone());
                }
                "--messages" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--messages requires a number".to_string());
                    }
                    messages = Some(args[i].parse().map_err(|_| "invalid messages")?);
                }
                "--payload-bytes" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--payload-bytes requires a number".to_string());
                    }
                    payload_bytes = Some(args[i].parse().map_err(|_| "invalid payload-bytes")?);
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Explicit seed, or time-based (printed later for reproducibility).
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0)
        });

        Ok(Config {
            role,
            host: host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: port.unwrap_or(match role {
                Role::Demo => 0,
                _ => 12345,
            }),
            session: session.unwrap_or_else(|| "sess-1".to_string()),
            key: key.unwrap_or_else(|| "k1".to_string()),
            messages: messages.unwrap_or(8),
            payload_bytes: payload_bytes.unwrap_or(2048),
            seed,
            print_config,
        })
    }

    /// Build the stack configuration for one side of the connection.
    ///
    /// Address and MAC markers are derived from the seed; the client side
    /// gets a locally-administered MAC variant and the mirrored address
    /// pair, so the two ends agree on who is who.
    pub fn stack_config(&self, side: Side) -> Result<StackConfig, String> {
        let (server_addr, client_addr, server_mac, client_mac) = derive_markers(self.seed);

        let (local_addr, remote_addr, local_mac, remote_mac) = match side {
            Side::Server => (server_addr, client_addr, server_mac, client_mac),
            Side::Client => (client_addr, server_addr, client_mac, server_mac),
        };

        let cipher_key = CipherKey::new(self.key.as_bytes().to_vec())
            .map_err(|e| format!("invalid cipher key: {e}"))?;

        Ok(StackConfig {
            session_id: SessionId::new(self.session.clone()),
            cipher_key,
            local_addr,
            remote_addr,
            local_mac,
            remote_mac,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        let (server_addr, client_addr, server_mac, client_mac) = derive_markers(self.seed);

        println!("=== Configuration ===");
        println!("Role: {:?}", self.role);
        println!("Endpoint: {}:{}", self.host, self.port);
        println!("Session: {:?}", self.session);
        println!("Seed: {}", self.seed);
        println!();
        println!("Messages: {} x ~{} bytes", self.messages, self.payload_bytes);
        println!();
        println!("=== Derived Markers ===");
        println!("Server: {server_addr} / {server_mac}");
        println!("Client: {client_addr} / {client_mac}");
        println!();
    }
}

/// Derive illustrative address markers from the seed.
///
/// The client MAC sets the locally-administered bit on the server's, and
/// the client address is the next host in the same /24, never colliding
/// with the server's.
fn derive_markers(seed: u64) -> (NetAddr, NetAddr, MacAddr, MacAddr) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut mac = [0u8; 6];
    rng.fill(&mut mac);
    let server_mac = MacAddr(mac);
    let mut client_mac = mac;
    client_mac[0] |= 0x02;
    if client_mac == mac {
        client_mac[5] = client_mac[5].wrapping_add(1);
    }

    let host: u8 = rng.gen_range(1..=254);
    let server_addr = NetAddr([10, 0, 0, host]);
    let client_host = if host == 254 { 1 } else { host + 1 };
    let client_addr = NetAddr([10, 0, 0, client_host]);

    (server_addr, client_addr, server_mac, MacAddr(client_mac))
}

fn print_help() {
    println!("layerstack: educational seven-layer encapsulation stack demo");
    println!();
    println!("USAGE:");
    println!("    layerstack [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --role <demo|server|client>  What to run (default: demo)");
    println!("    --host <ADDR>                Bind/connect address (default: 127.0.0.1)");
    println!("    --port <N>                   TCP port (default: ephemeral for demo, 12345 otherwise)");
    println!();
    println!("    --session <TOKEN>            Session identifier (default: sess-1)");
    println!("    --key <KEY>                  Cipher key (default: k1)");
    println!();
    println!("    --messages <N>               Requests the client sends (default: 8)");
    println!("    --payload-bytes <N>          Approximate request body size (default: 2048)");
    println!("    --seed <N>                   Seed for bodies and derived markers");
    println!();
    println!("    --print-config               Print resolved configuration");
    println!("    --help, -h                   Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    layerstack                              # In-process demo over loopback");
    println!("    layerstack --seed 42 --print-config      # Deterministic run");
    println!("    layerstack --role server --port 9000     # One end of a two-process run");
    println!("    layerstack --role client --port 9000");
    println!();
}

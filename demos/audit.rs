//! Fleet audit example
//!
//! Runs one complete audit batch against real devices and prints the idle
//! ports found on each.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example audit -- --hosts 192.168.1.0/24 --user auditor --password secret
//! ```
//!
//! Host specs may mix single addresses, dash ranges, and CIDR blocks:
//!
//! ```bash
//! cargo run --example audit -- --hosts 10.0.0.5,10.0.1.1-10.0.1.50,10.0.2.0/26 \
//!     --user auditor --password secret --min-weeks 12
//! ```

use std::env;
use std::sync::Arc;

use idleport::{AuditConfig, LogSink, Outcome, SshDialer, addresses, run_batch};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== Idleport Fleet Audit Example ===\n");

    let candidates = addresses::expand_all(args.hosts.split(','))?;
    println!("Expanded {} candidate addresses", candidates.len());

    let config = Arc::new(
        AuditConfig::new(&args.user, args.password.clone())
            .with_management_port(args.port)
            .with_min_weeks(args.min_weeks),
    );

    let report = run_batch(config, SshDialer, candidates, Arc::new(LogSink)).await;

    println!("\n=== Results ===");
    for (address, result) in &report {
        match &result.outcome {
            Outcome::Success => {
                println!(
                    "{} ({}): uptime {}, {} idle port(s)",
                    result.display_name(),
                    address,
                    result.uptime_summary(),
                    result.idle_ports.len()
                );
                for record in &result.idle_ports {
                    println!("    {} last input {}", record.interface, record.last_input);
                }
            }
            Outcome::UptimeInsufficient => {
                println!(
                    "{address}: skipped, uptime {} below {} weeks",
                    result.uptime_summary(),
                    args.min_weeks
                );
            }
            Outcome::NoIdlePorts => {
                println!("{}: no notconnect interfaces", result.display_name());
            }
            Outcome::Failed(reason) => {
                println!("{address}: failed ({reason})");
            }
        }
    }

    Ok(())
}

struct Args {
    hosts: String,
    user: String,
    password: String,
    port: u16,
    min_weeks: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut hosts = String::new();
        let mut user = env::var("USER").unwrap_or_else(|_| "auditor".to_string());
        let mut password = None;
        let mut port = 22u16;
        let mut min_weeks = 12u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--hosts" | "-H" => {
                    i += 1;
                    if i < args.len() {
                        hosts = args[i].clone();
                    }
                }
                "--user" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        user = args[i].clone();
                    }
                }
                "--password" | "-P" => {
                    i += 1;
                    if i < args.len() {
                        password = Some(args[i].clone());
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--min-weeks" | "-w" => {
                    i += 1;
                    if i < args.len() {
                        min_weeks = args[i].parse().unwrap_or(12);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    Self::print_help();
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        if hosts.is_empty() {
            eprintln!("Error: --hosts is required");
            Self::print_help();
            std::process::exit(1);
        }
        let Some(password) = password else {
            eprintln!("Error: --password is required");
            Self::print_help();
            std::process::exit(1);
        };

        Self {
            hosts,
            user,
            password,
            port,
            min_weeks,
        }
    }

    fn print_help() {
        println!("Usage: audit --hosts <specs> --password <password> [options]");
        println!();
        println!("Options:");
        println!("  --hosts, -H <specs>     Comma-separated addresses, ranges, CIDR blocks");
        println!("  --user, -u <user>       Username (default: $USER)");
        println!("  --password, -P <pass>   Password");
        println!("  --port, -p <port>       Management port (default: 22)");
        println!("  --min-weeks, -w <n>     Uptime/idle threshold in weeks (default: 12)");
        println!("  --help                  Show this help");
    }
}

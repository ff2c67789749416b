//! HMS control client
//!
//! Drives the admin endpoints of a running mock server.
//!
//! Usage:
//!   hms-ctl --url http://127.0.0.1:9191 expect rule.json
//!   cat rule.json | hms-ctl expect -
//!   hms-ctl verify
//!   hms-ctl shutdown

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::{Client, StatusCode};
use std::io::Read;
use std::time::Duration;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "hms-ctl")]
#[command(author, version, about = "Control a running HMS mock server", long_about = None)]
struct Args {
    /// Base URL of the mock server
    #[arg(short, long, env = "HMS_URL", default_value = "http://127.0.0.1:9191")]
    url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register an expectation from a JSON file ("-" reads stdin)
    Expect { file: String },
    /// Verify all expectations and reset the server
    Verify,
    /// Stop the server
    Shutdown,
}

fn read_payload(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("Failed to read payload from stdin")?;
        Ok(payload)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/');
    let client = Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    match &args.command {
        Command::Expect { file } => {
            let payload = read_payload(file)?;
            let resp = client
                .post(format!("{base}/__expect"))
                .header("Content-Type", "application/json")
                .body(payload)
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?;
            let status = resp.status();
            let text = resp.text().await?;
            if !status.is_success() {
                bail!("{RED}{text}{RESET}");
            }
            println!("{GREEN}{text}{RESET}");
        }
        Command::Verify => {
            let resp = client
                .get(format!("{base}/__check"))
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?;
            match resp.status() {
                StatusCode::OK => println!("{GREEN}{}{RESET}", resp.text().await?),
                StatusCode::CONFLICT => {
                    let failures: Vec<String> = resp.json().await?;
                    for failure in &failures {
                        eprintln!("{RED}✗{RESET} {failure}");
                    }
                    bail!("{} unmet expectation(s)", failures.len());
                }
                status => bail!("Unexpected status {status}: {}", resp.text().await?),
            }
        }
        Command::Shutdown => {
            let resp = client
                .post(format!("{base}/__shutdown"))
                .send()
                .await
                .with_context(|| format!("Failed to reach {base}"))?;
            let status = resp.status();
            let text = resp.text().await?;
            if status != StatusCode::ACCEPTED {
                bail!("Unexpected status {status}: {text}");
            }
            println!("{text}");
        }
    }

    Ok(())
}

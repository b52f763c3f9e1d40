//! Live status monitor.
//!
//! Demonstrates:
//! - Connecting to a controller with default options
//! - Querying the firmware version
//! - Streaming typed status events until Ctrl+C or disconnect
//!
//! Usage:
//!   cargo run --example monitor -- 192.168.1.50
//!   cargo run --example monitor -- 192.168.1.50 --port 3001 --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;
use vantage_control::{ConnectOptions, Control, Result, StatusEvent};

// ============================================================================
// Constants
// ============================================================================

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    host: String,
    port: Option<u16>,
    debug: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let host = args.iter().find(|a| !a.starts_with("--"))?.clone();
        let port = args
            .iter()
            .position(|a| a == "--port")
            .and_then(|i| args.get(i + 1))
            .and_then(|p| p.parse().ok());

        Some(Self {
            host,
            port,
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let Some(args) = Args::parse() else {
        eprintln!("usage: monitor <host> [--port <port>] [--debug]");
        std::process::exit(2);
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "vantage_control=trace"
    } else {
        "vantage_control=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    println!("=== Vantage Monitor ===\n");

    let mut options = ConnectOptions::default();
    if let Some(port) = args.port {
        options = options.with_port(port);
    }

    println!("[1] Connecting to {}:{}...", args.host, options.port);
    let control = Control::connect(&args.host, &options).await?;
    println!("    ✓ Connected\n");

    println!("[2] Reading firmware version...");
    match control
        .send_and_wait_timeout("VERSION", "R:VERSION", VERSION_TIMEOUT)
        .await
    {
        Ok(reply) => println!("    ✓ {reply}\n"),
        Err(e) if e.is_timeout() => println!("    - no reply, continuing\n"),
        Err(e) => return Err(e),
    }

    println!("[3] Streaming events (Ctrl+C to exit)...");
    let mut events = control.events();

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => print_event(&event),
                None => {
                    println!("    ! Connection lost");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n    ✓ Interrupted");
                break;
            }
        }
    }

    control.close();
    Ok(())
}

fn print_event(event: &StatusEvent) {
    match event {
        StatusEvent::Load(e) => println!("    load   {:>6}  {:.1}%", e.vid, e.percent),
        StatusEvent::Led(e) => println!(
            "    led    {:>6}  state={} rgb=({},{},{}) rate={}",
            e.vid,
            e.state.state,
            e.state.color.red,
            e.state.color.green,
            e.state.color.blue,
            e.state.blink_rate.as_str()
        ),
        StatusEvent::Task(e) => println!("    task   {:>6}  state={}", e.vid, e.state),
        StatusEvent::Button(e) => println!("    button {:>6}  {}", e.vid, e.action.as_str()),
        StatusEvent::Temperature(e) => {
            println!("    therm  {:>6}  {} {:.1}", e.vid, e.sensor, e.value)
        }
    }
}

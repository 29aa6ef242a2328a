//! Clock device status CLI
//!
//! Usage:
//!   cargo run --example clock_status -- --args type=snapshot,file=octoclock.json [--sensors]
//!   cargo run --example clock_status -- --args file=octoclock.json --watch 500
//!

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use usrp_clock::{DeviceAddr, MultiUsrpClock};

#[derive(Parser, Debug)]
#[command(name = "clock-status")]
#[command(about = "Print status of attached clock reference boards")]
struct Args {
    /// Device address arguments (key=value,...)
    #[arg(short, long, default_value = "")]
    args: DeviceAddr,

    /// Only report this board
    #[arg(short, long)]
    board: Option<usize>,

    /// Dump every sensor of each board
    #[arg(short, long)]
    sensors: bool,

    /// Poll board times every N milliseconds until Ctrl-C
    #[arg(short, long, value_name = "MS")]
    watch: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> usrp_clock::Result<()> {
    let clock = MultiUsrpClock::make(&args.args)?;

    print!("{}", clock.get_pp_string()?);

    let boards: Vec<usize> = match args.board {
        Some(board) => vec![board],
        None => (0..clock.get_num_boards()).collect(),
    };

    if args.sensors {
        for &board in &boards {
            println!("Board {} sensors:", board);
            for name in clock.get_sensor_names(board) {
                println!("  {}", clock.get_sensor(&name, board)?);
            }
        }
    }

    match args.watch {
        Some(interval) => watch_times(&clock, &boards, Duration::from_millis(interval)),
        None => {
            for &board in &boards {
                println!("Board {} time: {}", board, clock.get_time(board)?);
            }
            Ok(())
        }
    }
}

fn watch_times(
    clock: &MultiUsrpClock,
    boards: &[usize],
    interval: Duration,
) -> usrp_clock::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to install Ctrl-C handler: {}", e);
    }

    println!("Polling board times (Ctrl-C to stop)");
    while running.load(Ordering::SeqCst) {
        let mut line = String::new();
        for &board in boards {
            line.push_str(&format!("[{}] {:>10}  ", board, clock.get_time(board)?));
        }
        println!("{}", line.trim_end());
        std::thread::sleep(interval);
    }

    Ok(())
}

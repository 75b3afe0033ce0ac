// irq_mon.rs - Prints the value of a GPIO line every time an edge interrupt
// occurs, until SIGINT, SIGTERM, SIGUSR1 or SIGUSR2 is caught.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use log::debug;

use sysgpio::config::Config;
use sysgpio::gpio::{self, Direction, Edge, EdgeWaiter, GpioLine, Polarity, Sysfs, WaitOutcome};
use sysgpio::signal::{self, ShutdownFlag};

/// Print the value of a GPIO line on every edge interrupt.
#[derive(Parser, Debug)]
#[command(name = "irq_mon", version, about, disable_help_flag = true)]
struct Cli {
    /// Set polarity of GPIO pin to high.
    #[arg(short = 'h', long, conflicts_with = "active_low")]
    active_high: bool,

    /// Set polarity of GPIO pin to low.
    #[arg(short = 'l', long)]
    active_low: bool,

    /// Edges that trigger an interrupt: rising, falling or both.
    #[arg(short, long, default_value = "both")]
    edge: Edge,

    /// Directory containing the sysfs GPIO export and unexport files.
    /// Defaults to $SYSGPIO_SYSFS_ROOT, or /sys/class/gpio.
    #[arg(long, value_name = "DIR")]
    sysfs_root: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// GPIO number.
    gpio: String,
}

impl Cli {
    fn polarity(&self) -> Option<Polarity> {
        if self.active_high {
            Some(Polarity::ActiveHigh)
        } else if self.active_low {
            Some(Polarity::ActiveLow)
        } else {
            None
        }
    }

    // --sysfs-root takes precedence over the environment.
    fn config(&self) -> Config {
        match self.sysfs_root {
            Some(ref root) => Config {
                sysfs_root: root.clone(),
            },
            None => Config::from_env(),
        }
    }

    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    if let Err(err) = signal::install_handlers() {
        eprintln!("Unable to install signal handlers: {}", err);
        return ExitCode::FAILURE;
    }

    let shutdown = signal::shutdown_flag();
    let config = cli.config();

    match run(&cli, &config, shutdown) {
        Ok(WaitOutcome::Shutdown) => ExitCode::SUCCESS,
        // A termination signal usually arrives while we're blocked.
        Ok(WaitOutcome::Interrupted) if shutdown.is_set() => ExitCode::SUCCESS,
        Ok(WaitOutcome::Interrupted) => ExitCode::FAILURE,
        Ok(WaitOutcome::Failed(err)) => {
            eprintln!("Waiting for GPIO interrupts failed: {} (errno {})", err, err.errno());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{} (errno {})", err, err.errno());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &Config, shutdown: &ShutdownFlag) -> gpio::Result<WaitOutcome> {
    if cli.edge == Edge::None {
        return Err(gpio::Error::InvalidArgument(
            "edge must be rising, falling or both".to_owned(),
        ));
    }

    let mut line = GpioLine::with_control_files(&cli.gpio, config.sysfs())?;

    let outcome = monitor(&mut line, cli, shutdown);

    // The line is released on every path once it has been acquired.
    if let Err(err) = line.release() {
        debug!("Release reported: {}", err);
    }

    outcome
}

fn monitor(
    line: &mut GpioLine<Sysfs>,
    cli: &Cli,
    shutdown: &ShutdownFlag,
) -> gpio::Result<WaitOutcome> {
    line.set_direction(Direction::In)?;

    if let Some(polarity) = cli.polarity() {
        line.set_polarity(polarity)?;
    }

    line.set_edge(cli.edge)?;

    let mut waiter = EdgeWaiter::new(&*line)?;

    println!("Waiting for GPIO interrupts...");

    Ok(gpio::wait_for_edges(line, &mut waiter, shutdown, |value| {
        println!("IRQ: {}", value as char)
    }))
}

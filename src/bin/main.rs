use clap::Parser;
use ledstrip_simulator::browser;
use ledstrip_simulator::cli::Cli;
use ledstrip_simulator::error::SimError;
use ledstrip_simulator::netinfo;
use ledstrip_simulator::simulator::Simulator;

fn main() {
    let args = Cli::parse();
    init_logging(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(debug)))
        .init();
}

/// `--debug` raises only this crate; dependencies stay at `info`.
fn log_filter(debug: bool) -> &'static str {
    if debug {
        "info,ledstrip_simulator=debug"
    } else {
        "info"
    }
}

fn run(args: &Cli) -> Result<(), SimError> {
    let simulator = Simulator::start(&args.simulator_config())?;

    // Ctrl+C handler
    let shutdown = simulator.shutdown_handle();
    ctrlc::set_handler(move || {
        if shutdown.request() {
            println!("\nShutting down.");
        }
    })?;

    if args.led_public {
        netinfo::log_reachable("LED strip", "udp://", simulator.led_addr().port());
    }
    if args.http_public {
        netinfo::log_reachable("Web interface", "http://", simulator.http_addr().port());
    }

    if !args.no_browser {
        browser::open(&args.browser_url());
    }

    println!("Receiving LED frames on {}", simulator.led_addr());
    println!("Press Ctrl+C to stop.");

    simulator.run()
}

use clap::Parser;
use ledstrip_simulator::packet::{FrameLayout, PixelSender, Rgb, MAX_LED_COUNT};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "test-sender",
    about = "Stream a moving rainbow to an LED strip simulator"
)]
struct Args {
    /// Simulator IP address
    #[arg(short = 't', long = "target", default_value = "127.0.0.1")]
    target: String,

    /// UDP port
    #[arg(short, long, default_value_t = 7777)]
    port: u16,

    /// Number of LEDs per frame
    #[arg(short, long, default_value_t = 300)]
    leds: usize,

    /// Frames per second
    #[arg(short, long, default_value_t = 30)]
    fps: u32,

    /// Stop after this many frames (0 runs until Ctrl+C)
    #[arg(short, long, default_value_t = 0)]
    count: u64,
}

/// Classic 0..=255 color wheel.
fn wheel(pos: u8) -> Rgb {
    match pos {
        0..=84 => [255 - pos * 3, pos * 3, 0],
        85..=169 => {
            let p = pos - 85;
            [0, 255 - p * 3, p * 3]
        }
        _ => {
            let p = pos - 170;
            [p * 3, 0, 255 - p * 3]
        }
    }
}

fn rainbow(leds: usize, shift: u64) -> Vec<Rgb> {
    (0..leds)
        .map(|i| wheel(((i as u64 * 256 / leds.max(1) as u64 + shift) % 256) as u8))
        .collect()
}

fn main() {
    let args = Args::parse();
    if args.leds > MAX_LED_COUNT {
        eprintln!("Error: at most {MAX_LED_COUNT} LEDs fit into one frame");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Failed to set Ctrl+C handler");

    let sender = match PixelSender::new(&args.target, args.port, FrameLayout::DEFAULT) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error creating UDP socket: {e}");
            std::process::exit(1);
        }
    };

    println!("Sending {} LEDs to {}", args.leds, sender.target());
    println!("Press Ctrl+C to stop.");

    let interval = Duration::from_secs(1) / args.fps.max(1);
    let mut sent = 0u64;
    while running.load(Ordering::SeqCst) && (args.count == 0 || sent < args.count) {
        if let Err(e) = sender.send(&rainbow(args.leds, sent)) {
            eprintln!("UDP send error: {e}");
        }
        sent += 1;
        std::thread::sleep(interval);
    }

    println!("\nSent {sent} frames.");
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use softuart_rs::hal::SimPlatform;
use softuart_rs::serial::HoldPlanner;
use softuart_rs::{init_logger, log_info, SerialConfig, SoftwareSerial};
use std::path::PathBuf;
use std::sync::Arc;

const LOOPBACK_TX_PIN: u8 = 12;
const LOOPBACK_RX_PIN: u8 = 14;

#[derive(Parser)]
#[command(name = "softuart-cli")]
#[command(about = "Exercise the software UART on a simulated platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send text from one simulated port to another wired to it
    Loopback {
        text: String,
        #[arg(short, long, default_value = "9600")]
        baud: u32,
        #[arg(long)]
        invert: bool,
        /// Mask interrupts while bits are being timed
        #[arg(long)]
        no_int_tx: bool,
    },
    /// Print the level holds used to transmit one byte
    Timing {
        /// Byte value, decimal or 0x-prefixed hex
        byte: String,
        #[arg(short, long, default_value = "9600")]
        baud: u32,
        #[arg(short, long, default_value = "80000000")]
        clock: u32,
    },
    /// Load and print a JSON port configuration
    Config { path: PathBuf },
}

fn parse_byte(text: &str) -> Result<u8> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16),
        None => text.parse(),
    };
    value.with_context(|| format!("not a byte value: {text}"))
}

fn loopback(text: &str, baud: u32, invert: bool, no_int_tx: bool) -> Result<()> {
    let sim = Arc::new(SimPlatform::new());
    sim.connect(LOOPBACK_TX_PIN, LOOPBACK_RX_PIN);

    let tx_config = SerialConfig::new(None, Some(LOOPBACK_TX_PIN))
        .with_invert(invert)
        .with_interrupts_during_tx(!no_int_tx);
    let rx_config = SerialConfig::new(Some(LOOPBACK_RX_PIN), None)
        .with_invert(invert)
        .with_buffer_capacity(text.len() + 1);

    let mut sender = SoftwareSerial::new(sim.clone(), tx_config);
    let mut receiver = SoftwareSerial::new(sim.clone(), rx_config);
    sender.begin(baud)?;
    receiver.begin(baud)?;

    let sent = sender.write(text.as_bytes());
    log_info(&format!("Sent {sent} byte(s) at {} baud", sender.baud_rate()));

    let mut received = Vec::with_capacity(sent);
    while receiver.available() > 0 {
        received.extend(receiver.read());
    }
    if receiver.overflow() {
        log_info("Receiver reported overflow");
    }

    println!("text: {}", String::from_utf8_lossy(&received));
    println!("hex:  {}", hex::encode(&received));
    if received != text.as_bytes() {
        bail!(
            "loopback mismatch: sent {}, got {}",
            hex::encode(text),
            hex::encode(&received)
        );
    }
    Ok(())
}

fn timing(byte: &str, baud: u32, clock: u32) -> Result<()> {
    let value = parse_byte(byte)?;
    if baud == 0 || baud > clock {
        bail!("baud {baud} not representable with a {clock} Hz clock");
    }
    let bit_cycles = clock / baud;
    println!("byte 0x{value:02x}, {bit_cycles} cycles per bit");
    for hold in HoldPlanner::new(&[value], bit_cycles, false) {
        let level = if hold.high { "high" } else { "low " };
        println!("{level} {:>8} cycles ({} bits)", hold.cycles, hold.cycles / bit_cycles);
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Loopback {
            text,
            baud,
            invert,
            no_int_tx,
        } => loopback(&text, baud, invert, no_int_tx)?,
        Commands::Timing { byte, baud, clock } => timing(&byte, baud, clock)?,
        Commands::Config { path } => {
            let config = SerialConfig::from_json_file(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            println!("{}", config.to_json_pretty()?);
        }
    }

    Ok(())
}

use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use pipelink_client::{PipeTransport, TransportConfig};

/// Interactive CLI for poking at a local endpoint by hand
struct InteractiveCli {
    transport: PipeTransport,
    endpoint:  String,
}

impl InteractiveCli {
    fn new(endpoint: String) -> Self {
        Self {
            transport: PipeTransport::new(TransportConfig::from_env()),
            endpoint,
        }
    }

    fn print_help() {
        println!("Commands:");
        println!("  open              - Connect to the endpoint");
        println!("  send <text>       - Write <text> as one frame");
        println!("  hex <bytes>       - Write hex bytes, e.g. 'hex 01 02 03'");
        println!("  read              - Read whatever has arrived (never blocks)");
        println!("  status            - Show connection status");
        println!("  close             - Close the connection");
        println!("  help              - Show this help");
        println!("  quit/exit         - Exit");
    }

    fn run(&mut self) -> Result<()> {
        Self::print_help();
        println!();

        loop {
            print!("pipelink> ");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let line = input.trim();
            let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

            match command {
                "" => continue,
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "help" => Self::print_help(),
                "open" => match self.transport.open(&self.endpoint) {
                    Ok(()) => println!("Connected to {}", self.endpoint),
                    Err(e) => eprintln!("Open failed: {e}"),
                },
                "send" => self.send(rest.as_bytes()),
                "hex" => match parse_hex(rest) {
                    Ok(bytes) => self.send(&bytes),
                    Err(e) => eprintln!("{e}"),
                },
                "read" => {
                    let mut buf = vec![0u8; 64 * 1024];
                    match self.transport.read_frame(&mut buf) {
                        Ok(0) => println!("Nothing yet"),
                        Ok(n) => {
                            println!("{n} bytes: {:02x?}", &buf[..n]);
                            println!("as text: {}", String::from_utf8_lossy(&buf[..n]));
                        }
                        Err(e) => eprintln!("Read failed: {e}"),
                    }
                }
                "status" => {
                    println!("Endpoint:  {}", self.endpoint);
                    println!("Connected: {}", self.transport.is_connected());
                    println!("Busy wait: {:?}", self.transport.config().busy_timeout);
                }
                "close" => {
                    self.transport.close();
                    println!("Closed");
                }
                other => eprintln!("Unknown command '{other}'. Type 'help'."),
            }
        }

        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) {
        match self.transport.write_frame(bytes) {
            Ok(()) => println!("Sent {} bytes", bytes.len()),
            Err(e) => eprintln!("Send failed: {e}"),
        }
    }
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    input
        .split_whitespace()
        .map(|byte| {
            u8::from_str_radix(byte, 16).with_context(|| format!("Invalid hex byte '{byte}'"))
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("Usage: cli <endpoint>"))?;

    InteractiveCli::new(endpoint).run()
}

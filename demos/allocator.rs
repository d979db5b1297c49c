//! An interactive shell around a simulated address space.
//!
//! Run with `cargo run --example allocator -- [MEMORY_SIZE]`. Set `RUST_LOG`
//! to see what the allocator does under the hood.

use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;

use anyhow::{bail, Context, Result};
use contiguous_allocator::{Command, Memory, Reply};

const HELP: &str = "\
Memory Allocator Commands:
RQ <processName> <size> <strategy(F/B/W)>: Request memory allocation
RL <processName>: Release allocated memory
C: Compact memory
STAT: Print memory status
X: Exit the program";

fn prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
    write!(out, "{}", text)?;
    out.flush()
}

fn parse_size(text: &str) -> Result<NonZeroUsize> {
    text.trim()
        .parse()
        .with_context(|| format!("Invalid input for memory size: {:?}", text.trim()))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.contains(&"--help".to_owned()) {
        println!("USAGE: {} [MEMORY_SIZE]", args[0]);
        println!();
        println!("{}", HELP);
        return Ok(());
    }

    env_logger::init();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let size = match args.get(1) {
        Some(arg) => parse_size(arg)?,
        None => {
            prompt(&mut out, "Enter the initial memory size: ")?;
            match lines.next() {
                Some(line) => parse_size(&line?)?,
                None => bail!("No memory size given"),
            }
        }
    };
    log::info!("Starting with {} bytes of memory", size);

    let mut memory = Memory::new(size);
    writeln!(out, "\n{}", HELP)?;

    loop {
        prompt(&mut out, "allocator> ")?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(out, "Error: {}", e)?;
                continue;
            }
        };

        match command.run(&mut memory) {
            Ok(Reply::Exiting) => break,
            Ok(Reply::Status(report)) => writeln!(out, "\n{}\n", report)?,
            Ok(reply) => writeln!(out, "{}", reply)?,
            Err(e) => writeln!(out, "Error: {}", e)?,
        }
    }

    let (validity, stats) = memory.stats();
    log::info!("Exiting with {:?}", stats);
    debug_assert!(validity.is_valid());
    Ok(())
}

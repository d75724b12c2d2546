// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fs;

use clap::Parser;
use fitsync::{Cli, GlobalArgs};

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.global);

    match fitsync::run(&cli.global, cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_logging(global: &GlobalArgs) {
    use tracing_subscriber::EnvFilter;

    let default = if global.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Fall back to stderr when the log file cannot be opened
    let file = global
        .log_file
        .as_ref()
        .and_then(|path| fs::OpenOptions::new().create(true).append(true).open(path).ok());

    if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

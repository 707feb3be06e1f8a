//! Registrar maintenance CLI entry point.

use clap::Parser;
use log::error;
use registrar_cli::{run, Cli};
use registrar_core::{init_logging, LogConfig};
use std::process;

fn main() {
    let cli = Cli::parse();

    // The CLI works without logging; a bad level only loses diagnostics.
    if let Err(err) = init_logging(&LogConfig {
        level: cli.log_level.clone(),
        log_dir: None,
        echo_stderr: true,
    }) {
        eprintln!("warning: logging disabled: {err}");
    }

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(&cli, &mut stdout) {
        error!("event=cli_command module=cli status=error error={err:#}");
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

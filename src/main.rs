mod cli;
mod config;
mod disk;
mod error;
mod install;
mod process;
mod prompt;
mod system;
#[cfg(test)]
mod testing;
mod ui;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);
    if cli.debug {
        ui::emit(ui::Level::Debug, "debug.enabled", "Debug mode is on", None);
    }

    if let Err(err) = cli::run(cli).await {
        cli::report_error(&err);
        std::process::exit(cli::exit_code(&err));
    }
}

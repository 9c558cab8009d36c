use color_eyre::Result;

use ragchat::cli::{parse_args, run, CliCommand, USAGE};
use ragchat::logging::init_logging;

fn main() -> Result<()> {
    let cli = match parse_args(std::env::args()) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {}\n\n{}", err, USAGE);
            std::process::exit(2);
        }
    };

    color_eyre::install()?;

    // Version and help print without logging
    if !matches!(cli.command, CliCommand::Version | CliCommand::Help) {
        init_logging(cli.verbose)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli.command))
}

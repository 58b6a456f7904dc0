use clap::Parser;

use command_helper::{
    cli::{report_error, run, Cli},
    logging,
};

fn main() {
    let cli = Cli::parse();
    logging::init();
    let error_format = cli.error_format;
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            report_error(&error, error_format);
            std::process::exit(1);
        }
    }
}

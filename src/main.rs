// Entrypoint for the CLI application.
// - Keeps `main` small: parse the subcommand, set up logging and hand over
//   to the UI flows in `ui`.
// - Any unknown command prints the usage text; a missing one also exits
//   with a failure code.

use std::path::Path;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use konfuzio_sdk::{logging, ui};

#[derive(Parser, Debug)]
#[command(
    name = "konfuzio_sdk",
    about = "Set up a working directory for the Konfuzio SDK",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Ask for credentials and a project and write the .env file
    Init,
    /// Download files and page images of all training and test documents
    #[command(name = "download_data")]
    DownloadData,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            println!("{}", ui::CLI_ERROR);
            return ExitCode::SUCCESS;
        }
    };

    let Some(command) = cli.command else {
        println!("{}", ui::CLI_ERROR);
        return ExitCode::FAILURE;
    };

    logging::init_tracing();

    // Commands run inside the user's working directory.
    let project_folder = Path::new(".");
    let result = match command {
        Command::Init => ui::init(project_folder),
        Command::DownloadData => ui::download_data(project_folder),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_subcommands() {
        let init = Cli::try_parse_from(["konfuzio_sdk", "init"]).unwrap();
        assert_eq!(init.command, Some(Command::Init));
        let download = Cli::try_parse_from(["konfuzio_sdk", "download_data"]).unwrap();
        assert_eq!(download.command, Some(Command::DownloadData));
    }

    #[test]
    fn missing_command_is_none_and_unknown_is_an_error() {
        assert_eq!(Cli::try_parse_from(["konfuzio_sdk"]).unwrap().command, None);
        assert!(Cli::try_parse_from(["konfuzio_sdk", "download-data"]).is_err());
    }
}

mod cli;
mod doctor;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Command, RunArgs};
use pungi::{exit_code_for_provision_error, GitCli, Orchestrator, ProvisionError, SystemRuntime};

fn main() -> ExitCode {
    // A missing .env is fine; PUNGI_* can come from the real environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    pungi::telemetry_init(cli.verbose);

    match &cli.command {
        Command::Doctor => {
            if doctor::run_doctor(cli.config.as_deref()) {
                ExitCode::from(0)
            } else {
                ExitCode::from(1)
            }
        }
        Command::Run(args) => run(args, cli.config.as_deref(), cli.verbose),
    }
}

fn run(args: &RunArgs, config_file: Option<&Path>, verbose: bool) -> ExitCode {
    let config = match pungi::load_config(config_file, args.to_layer()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("pungi: error: {e}");
            return ExitCode::from(exit_code_for_provision_error(&e));
        }
    };

    if verbose || args.dry_run {
        eprintln!("pungi: repo: {}", config.remote_url);
        eprintln!("pungi: staging root: {}", config.staging_root.display());
        eprintln!("pungi: workdir mode: {}", config.workdir_mode);
    }
    if args.dry_run {
        match pungi::preview(&config) {
            Ok(lines) => {
                for line in lines {
                    eprintln!("pungi: would run: {line}");
                }
                eprintln!("pungi: dry-run requested; not executing.");
                return ExitCode::from(0);
            }
            Err(e) => {
                eprintln!("pungi: error: {e}");
                return ExitCode::from(exit_code_for_provision_error(&e));
            }
        }
    }

    let git = GitCli::new(config.timeout);
    let runtime = SystemRuntime::new(config.timeout);
    pungi::signals::install_handlers();
    let result = Orchestrator::new(config, &git, &runtime).run();

    if let Some(sig) = pungi::signals::pending() {
        if let Err(e) = &result {
            eprintln!("pungi: error: {e}");
        }
        eprintln!("pungi: interrupted by signal {sig}; staging root removed");
        return ExitCode::from(u8::try_from(128 + sig).unwrap_or(1));
    }

    match result {
        Ok(output) => {
            if emit(&output) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        // The script ran: its failure is part of the report, not a failure of the run.
        Err(e @ ProvisionError::ExecutionFailed { .. }) => {
            let report = format!("{e}\n{}", e.captured_output().unwrap_or_default());
            if !emit(&report) {
                ExitCode::from(1)
            } else if args.propagate_exit_code {
                ExitCode::from(exit_code_for_provision_error(&e))
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("pungi: error: {e}");
            ExitCode::from(exit_code_for_provision_error(&e))
        }
    }
}

/// Write `text` to stdout. False when the write failed, e.g. on a closed pipe.
fn emit(text: &str) -> bool {
    let mut stdout = io::stdout().lock();
    match stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
    {
        Ok(()) => true,
        Err(e) => {
            eprintln!("pungi: error: cannot write output: {e}");
            false
        }
    }
}

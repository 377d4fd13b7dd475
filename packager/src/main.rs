//! Release packager CLI entrypoint.
//!
//! Loads the packaging configuration, then archives staged repositories or
//! runs discovery and population against the distribution host.

use clap::Parser;
use log::LevelFilter;
use release_packager::archive::{ArchiveOutcome, ArchiveReport, Archiver, backend_for};
use release_packager::cli::{ArchiveArgs, Cli, Command, DiscoverArgs, PopulateArgs};
use release_packager::config::PackagingConfig;
use release_packager::error::Result;
use release_packager::exec::SystemCommandExecutor;
use release_packager::inspector::{directories_that_contain_packages, unique_directories};
use release_packager::populator::populate_repo_directory;
use release_packager::remote::SshRunner;
use std::error::Error;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity, cli.quiet);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn init_logging(verbosity: u8, quiet: bool) {
    let level = match (quiet, verbosity) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let config = PackagingConfig::load(&cli.config)?;
    match &cli.command {
        Command::Archive(args) => run_archive(&config, args, stdout),
        Command::Populate(args) => run_populate(&config, args, stdout),
        Command::Discover(args) => run_discover(&config, args, stdout),
    }
}

fn ssh_runner(config: &PackagingConfig) -> SshRunner {
    let executor = SystemCommandExecutor::with_timeout(config.ssh.timeout());
    SshRunner::new(config.ssh.connection.clone(), executor)
}

fn run_archive(config: &PackagingConfig, args: &ArchiveArgs, stdout: &mut dyn Write) -> Result<()> {
    let backend = backend_for(config)?;
    let archiver = Archiver::new(config, backend.as_ref());
    let project = args.project.as_deref().unwrap_or(&config.project);
    let report = archiver.create_all_repo_archives(project, args.mode, args.policy)?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        writeln!(stdout, "{json}")?;
    } else {
        write_report(&report, stdout)?;
    }
    Ok(())
}

fn write_report(report: &ArchiveReport, stdout: &mut dyn Write) -> std::io::Result<()> {
    for entry in &report.platforms {
        match &entry.outcome {
            ArchiveOutcome::Created(created) => {
                writeln!(stdout, "{}  {}", created.sha256, created.path)?;
            }
            ArchiveOutcome::Skipped { reason } => {
                writeln!(stdout, "skipped {}: {reason}", entry.archive_name)?;
            }
        }
    }
    Ok(())
}

fn run_populate(
    config: &PackagingConfig,
    args: &PopulateArgs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let runner = ssh_runner(config);
    let output = populate_repo_directory(
        &runner,
        &config.distribution_server,
        &args.artifact_parent_directory,
    )?;
    stdout.write_all(output.stdout.as_bytes())?;
    Ok(())
}

fn run_discover(
    config: &PackagingConfig,
    args: &DiscoverArgs,
    stdout: &mut dyn Write,
) -> Result<()> {
    let runner = ssh_runner(config);
    let directories = directories_that_contain_packages(
        &runner,
        &config.distribution_server,
        &args.artifact_directory,
        &args.extension,
    )?;

    if args.unique {
        for directory in unique_directories(&directories) {
            writeln!(stdout, "{directory}")?;
        }
    } else {
        for directory in &directories {
            writeln!(stdout, "{directory}")?;
        }
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_error_chain(stderr, &err);
            1
        }
    }
}

fn write_error_chain(stderr: &mut dyn Write, err: &dyn Error) {
    let mut message = format!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}

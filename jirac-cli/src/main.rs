use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use anyhow::Result;
use jirac_config::{
    default_config_path, resolve, validate, Environment, PersistedConfig, UsageError,
};
use jirac_jira::JiraClient;

mod cli_args;
mod dispatch;
#[cfg(test)]
mod mock;
mod render;
mod telemetry;

use cli_args::Cli;
use render::Renderer;

fn main() -> ExitCode {
    let cli = match cli_args::parse_cli() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = default_config_path();
    let persisted = PersistedConfig::load_from_path(&config_path)?;
    telemetry::init(cli.debug || persisted.debug);
    tracing::debug!(path = %config_path.display(), "config loaded");

    let (options, command) = resolve(persisted, &Environment::from_process(), cli.into_overrides())?;
    tracing::debug!(command = command.name(), options = ?options.redacted(), "resolved options");
    validate(command, &options)?;

    let client = JiraClient::from_options(&options)?;
    let stdout = io::stdout();
    let renderer = Renderer::new(options.output, stdout.is_terminal());
    let mut out = stdout.lock();
    dispatch::dispatch(&client, &options, command, renderer, &mut out)
}

fn report(error: &anyhow::Error) {
    eprintln!("error: {error:#}");
    if error.downcast_ref::<UsageError>().is_some() {
        eprintln!();
        eprintln!("{}", cli_args::help_text());
    }
}

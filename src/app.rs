use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use crate::capture::SourceDriver;
use crate::cli::Cli;
use crate::console::{self, ConsolePresenter};
use crate::core::logging::{init_logging, LoggingError};
use crate::core::settings::SettingsError;
use crate::recording::JsonlWriterFactory;
use crate::session::{AppConfig, ExitStatus, SessionController};
use crate::shared::paths::get_settings_path;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Headless mode enabled but no streams enabled. This will not do anything useful.")]
    NothingToStream,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match run_with(&cli) {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!(target: "session", "{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_with(cli: &Cli) -> Result<ExitStatus, AppError> {
    let config = cli.load_config()?;
    let _guards = init_logging(&cli.logging_config())?;

    if config.headless && !config.streaming.any_streams_enabled() {
        return Err(AppError::NothingToStream);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let settings_path = cli.config.clone().unwrap_or_else(get_settings_path);
    let status = runtime.block_on(run_session(config, settings_path));

    // stdin reader may still be parked on a blocking read
    runtime.shutdown_background();
    Ok(status)
}

async fn run_session(config: AppConfig, settings_path: PathBuf) -> ExitStatus {
    let headless = config.headless;
    let mut controller = SessionController::new(
        config,
        Arc::new(SourceDriver::default()),
        Arc::new(JsonlWriterFactory),
    );
    let handle = controller.handle();

    if !headless {
        let (presenter, done) = ConsolePresenter::create();
        controller = controller.with_presenter(presenter.clone());
        tokio::spawn(console::run_console(handle.clone(), settings_path));
        tokio::spawn(console::report_rates(presenter, handle.subscribe(), done));
    }

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_handle.request_exit();
        }
    });

    match tokio::task::spawn_blocking(move || controller.run()).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(target: "session", "[CONTROL] Control loop panicked: {}", e);
            ExitStatus::Failure
        }
    }
}

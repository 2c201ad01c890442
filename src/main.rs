use std::process::ExitCode;

use config::DockwatchConfig;
use dockwatch::{EventWatcher, UnixSocketClient};

mod cli;
mod config;
mod output;
mod signals;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init();

    let args = cli::get_cli_args();
    let config = match DockwatchConfig::try_init(&args.config) {
        Ok(config) => config.apply_args(args),
        Err(e) => {
            log::error!("Unable to read config {:?}: {e}", args.config);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Watching daemon at {:?}", config.socket);
    let daemon = UnixSocketClient::new(&config.socket);
    let mut handle = EventWatcher::new(daemon)
        .since(config.since)
        .spawn(config.capacity);

    if let Err(e) = signals::handle_stop(handle.cancel.clone()) {
        log::error!("Unable to install signal handlers: {e}");
        return ExitCode::FAILURE;
    }
    signals::notify_ready();

    while let Some(event) = handle.events.recv().await {
        match output::render(&event, args.format) {
            Ok(line) => println!("{line}"),
            Err(e) => log::error!("Unable to render event {}: {e}", event.id),
        }
    }

    match handle.task.await {
        Ok(Ok(summary)) => {
            log::info!("Watch ended: {:?}", summary.outcome);
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Watch task failed: {e}");
            ExitCode::FAILURE
        }
    }
}

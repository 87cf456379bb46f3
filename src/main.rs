use clap::Parser;
use heating_bridge::config::{self, Config};
use heating_bridge::console::ConsoleCommand;
use heating_bridge::host::{CharacteristicSink, LogSink};
use heating_bridge::platform::Platform;
use log::{error, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Scheduled / HTTP-backed heating thermostats.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, env = "HEATING_CONFIG")]
    config: Option<PathBuf>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env before reading any environment-backed arguments
    let dotenv_vars = config::load_dotenv();
    let args = Args::parse();

    init_logger();
    info!("Starting Heating Bridge");
    if dotenv_vars > 0 {
        info!("Loaded {} variables from .env", dotenv_vars);
    }

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Configuration loaded from {}: {} device(s)",
        config_path.display(),
        config.devices.len()
    );

    let platform = Platform::start(&config, |device| -> Arc<dyn CharacteristicSink> {
        Arc::new(LogSink::new(device.name.as_str()))
    });

    info!("Heating Bridge is running");
    info!("  - Commands: <device-id> off|heat|auto|status");
    info!("  - Press Ctrl+C to exit");

    // Stdin blocks, so it is read on a dedicated thread; commands are
    // executed here, one at a time
    let (command_tx, mut command_rx) = mpsc::channel::<ConsoleCommand>(32);
    let stdin_reader = std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                match ConsoleCommand::parse(&line) {
                    Some(Ok(command)) => {
                        if command_tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => warn!("{}", e),
                    None => {}
                }
            }
        });
    if let Err(e) = &stdin_reader {
        warn!("Failed to start stdin reader, commands disabled: {}", e);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break;
            }
            command = command_rx.recv() => match command {
                Some(command) => {
                    if let Err(e) = command.execute(&platform).await {
                        warn!("Command failed: {}", e);
                    }
                }
                None => {
                    info!("Stdin closed, waiting for Ctrl+C");
                    // keep serving timers until interrupted
                    if let Err(e) = (&mut shutdown).await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                    break;
                }
            },
        }
    }

    platform.shutdown().await;

    info!("Heating Bridge stopped");
}

// SPDX-License-Identifier: Apache-2.0

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Appends to `log_file`, or to stderr when the file cannot be opened.
pub fn init_tracing(log_file: &Path, level: &str, json: bool) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let file = OpenOptions::new().create(true).append(true).open(log_file);
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match (file, json) {
        (Ok(file), true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
        (Ok(file), false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
        (Err(err), _) => {
            eprintln!(
                "cannot open log file {}: {err}; logging to stderr",
                log_file.display()
            );
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                    .try_init()
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                    .try_init()
            }
        }
    };
    if let Err(err) = installed {
        eprintln!("tracing already initialised: {err}");
    }
}

// In: src/logging.rs

//! The opt-in `env_logger` backend for the crate's `log` output.
//!
//! The engines only use the `log` facade. Applications that already install a
//! logger need nothing from here; everyone else can call
//! `enable_verbose_logging` once at startup.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::AseError;

static INIT_LOGGER: Once = Once::new();

/// Installs a `[LEVEL] message` logger at `level`, writing to stderr or, when
/// `log_file` is given, appending to that file.
///
/// Only the first call has any effect. If another logger is already
/// installed, that logger stays in place.
pub fn enable_verbose_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), AseError> {
    // A bad path is reported even when the logger is already installed.
    let sink = log_file
        .map(|path| OpenOptions::new().append(true).create(true).open(path))
        .transpose()?;

    INIT_LOGGER.call_once(move || {
        if build_logger(level, sink).try_init().is_err() {
            log::debug!("a logger is already installed; keeping it");
        }
    });
    Ok(())
}

fn build_logger(level: LevelFilter, sink: Option<File>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .is_test(false)
        .filter_level(level)
        .format(|out, record| writeln!(out, "[{}] {}", record.level(), record.args()));
    if let Some(file) = sink {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder
}

/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

//! A small `log::Log` implementation, same shape as the teacher's
//! `Logger`, always writing to stderr so diagnostics never land on the
//! shell-evalable stdout stream (§6: "Stdout ... Stderr: Diagnostics,
//! filtered by -v/-q"). The effective level is the louder of `-v`'s
//! occurrence count and the `EUPS_DEBUG` floor.

use std::boxed::Box;

pub struct Logger {
    log_level: log::LevelFilter,
}

impl Logger {
    pub fn new(log_level: log::LevelFilter) -> Box<Logger> {
        Box::new(Logger { log_level })
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.log_level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn level_for(verbosity: u64, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Installs the global logger. `cli_verbosity` is the `-v` occurrence
/// count; the actual level used is `max(cli_verbosity, EUPS_DEBUG)`, per
/// §6's description of `EUPS_DEBUG` as a verbosity floor. `-q` always
/// wins regardless of `EUPS_DEBUG`.
pub fn install(cli_verbosity: u64, quiet: bool, debug_floor: u64) {
    let verbosity = cli_verbosity.max(debug_floor);
    let level = level_for(verbosity, quiet);
    let _ = log::set_boxed_logger(Logger::new(level));
    log::set_max_level(level);
}

/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

/*!
  `eups_core` is the library backing the `eups` command: version algebra,
  the table-file parser/evaluator, the product database, the dependency
  resolver, the environment-mutation engine, and session bookkeeping, plus
  the CLI glue (argument parsing, context assembly, per-shell rendering)
  that turns those into the `eups` verbs.
*/
#[doc(hidden)]
#[macro_use]
extern crate clap;
#[doc(hidden)]
#[macro_use]
extern crate log;

pub mod argparse;
pub mod config;
pub mod context;
pub mod db;
pub mod declare;
pub mod diag;
pub mod env_engine;
pub mod error;
pub mod list;
pub mod logger;
pub mod resolver;
pub mod session;
pub mod setup;
pub mod shell;
pub mod table;
pub mod version;

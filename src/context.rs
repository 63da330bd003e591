/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! Assembles the ambient pieces every verb needs -- the stack path, the
//! active flavor, the output shell, and the logger -- from global CLI
//! flags layered over the environment (§6). Kept separate from
//! `argparse` so a verb only has to ask for a `Context`, not repeat this
//! env/flag-merging dance itself.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::argparse::ArgMatches;
use crate::config::{self, Shell};
use crate::db::DB;
use crate::error::{EupsError, EupsResult};

pub struct Context {
    pub db: DB,
    pub flavor: String,
    pub shell: Shell,
    pub env_snapshot: HashMap<String, String>,
}

/// Installs the logger and builds a `Context` from the merged global +
/// subcommand `ArgMatches`. `-Z`/`-z`/`-U`/`-S` reshape the stack path;
/// `-f` overrides the flavor; everything else falls back to the
/// environment per §6.
pub fn build(main_args: &ArgMatches, sub_args: &ArgMatches) -> EupsResult<Context> {
    let verbosity = main_args.occurrences_of("verbose");
    let quiet = main_args.is_present("quiet");
    crate::logger::install(verbosity, quiet, config::debug_floor_from_env());

    let mut stacks: Vec<PathBuf> = if let Some(explicit) = sub_args.value_of("database") {
        explicit
            .split(':')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    } else if main_args.is_present("nosys") {
        vec![]
    } else {
        config::stack_path_from_env()?
    };

    if let Some(token) = sub_args.value_of("filter") {
        stacks = config::filter_stack_path(stacks, token);
    }

    let user_root = if main_args.is_present("nouser") {
        None
    } else {
        config::user_stack_root()
    };

    let db = DB::new(stacks, user_root);

    let flavor = sub_args
        .value_of("flavor")
        .map(|s| s.to_string())
        .unwrap_or_else(|| config::flavor_from_env(config::default_flavor()));

    let shell = config::shell_from_env()?;
    let env_snapshot: HashMap<String, String> = std::env::vars().collect();

    Ok(Context {
        db,
        flavor,
        shell,
        env_snapshot,
    })
}

pub fn require_product<'a>(sub_args: &'a ArgMatches) -> EupsResult<&'a str> {
    sub_args
        .value_of("product")
        .ok_or_else(|| EupsError::Usage("a product name is required".to_string()))
}

pub fn require_version<'a>(sub_args: &'a ArgMatches) -> EupsResult<&'a str> {
    sub_args
        .value_of("version")
        .ok_or_else(|| EupsError::Usage("a version is required".to_string()))
}

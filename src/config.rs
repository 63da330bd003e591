/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  Resolves the ambient configuration surface named in §6: `EUPS_PATH`/
  `EUPS_DIR`, `EUPS_FLAVOR`, `EUPS_SHELL`, `EUPS_DEBUG`, and the caller's
  home directory (for the user tag overlay). Generalizes the teacher's
  `cogs.rs`, which only ever read the first `EUPS_PATH` entry; here the
  whole colon-separated list becomes the ordered stack path §3 requires.
*/

use std::env;
use std::path::PathBuf;

use crate::error::{EupsError, EupsResult};

/// The shell syntaxes `cli::shell` knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Sh,
    Csh,
    Zsh,
    Fish,
}

impl Shell {
    pub fn parse(name: &str) -> EupsResult<Shell> {
        match name {
            "sh" => Ok(Shell::Sh),
            "csh" => Ok(Shell::Csh),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            other => Err(EupsError::Usage(format!(
                "unrecognized EUPS_SHELL `{}`, expected sh/csh/zsh/fish",
                other
            ))),
        }
    }
}

/// Ordered stack roots plus the ambient settings that shape a resolve.
/// `-Z`/`-z` at the CLI layer narrow `stacks` before this is built; this
/// struct itself only ever reflects the final, already-filtered list.
pub struct Config {
    pub stacks: Vec<PathBuf>,
    pub flavor: String,
    pub shell: Shell,
    pub debug_floor: u64,
    pub home: Option<PathBuf>,
}

/// Reads `EUPS_PATH` (colon-separated) falling back to the single-entry
/// `EUPS_DIR`, per §6. An empty/unset `EUPS_PATH` with no `EUPS_DIR`
/// either is a `USAGE_ERROR`: there is nowhere to resolve against.
pub fn stack_path_from_env() -> EupsResult<Vec<PathBuf>> {
    if let Ok(path) = env::var("EUPS_PATH") {
        let stacks: Vec<PathBuf> = path
            .split(':')
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        if !stacks.is_empty() {
            return Ok(stacks);
        }
    }
    if let Ok(dir) = env::var("EUPS_DIR") {
        return Ok(vec![PathBuf::from(dir)]);
    }
    Err(EupsError::Usage(
        "neither EUPS_PATH nor EUPS_DIR is set".to_string(),
    ))
}

/// `-z <token>` filters a stack path down to entries whose path contains
/// `token` as a substring (§6).
pub fn filter_stack_path(stacks: Vec<PathBuf>, token: &str) -> Vec<PathBuf> {
    stacks
        .into_iter()
        .filter(|p| p.to_string_lossy().contains(token))
        .collect()
}

pub fn flavor_from_env(default: &str) -> String {
    env::var("EUPS_FLAVOR").unwrap_or_else(|_| default.to_string())
}

pub fn shell_from_env() -> EupsResult<Shell> {
    match env::var("EUPS_SHELL") {
        Ok(name) => Shell::parse(&name),
        Err(_) => Ok(Shell::Sh),
    }
}

/// `EUPS_DEBUG` is a verbosity *floor*: the effective level is the louder
/// of it and however many `-v` flags were passed on the command line.
pub fn debug_floor_from_env() -> u64 {
    env::var("EUPS_DEBUG")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
}

pub fn home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    users::get_user_by_uid(users::get_current_uid()).and_then(|u| {
        let dir = u.home_dir().to_path_buf();
        if dir.as_os_str().is_empty() {
            None
        } else {
            Some(dir)
        }
    })
}

/// The per-user tag overlay root named in §4.3: `<home>/.eups/ups_db`.
pub fn user_stack_root() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".eups"))
}

pub fn current_username() -> String {
    users::get_user_by_uid(users::get_current_uid())
        .and_then(|u| u.name().to_str().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Best-effort platform flavor guess, used only as the hardcoded default
/// when neither `-f` nor `EUPS_FLAVOR` supplies one. Real deployments
/// always set `EUPS_FLAVOR` explicitly; this exists so a bare invocation
/// in a test environment still has something sane to substitute into
/// table-file `FLAVOR` terminals.
pub fn default_flavor() -> &'static str {
    if cfg!(target_os = "macos") {
        "DarwinX86"
    } else {
        "Linux64"
    }
}

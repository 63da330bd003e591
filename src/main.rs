/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

/*!
  `eups` is a dependency resolver, table-file evaluator, and
  environment-mutation engine for Unix shells. It manages loading and
  unloading declared software products and their dependencies into a
  shell environment, so a coherent set of versions is active on a
  per-shell basis.

  `eups setup <product> [version]` prints a line of shell code that
  activates a product and its dependencies; it is meant to be consumed
  by a shell function that wraps it in `eval`, e.g. `eval "$(eups setup
  foo)"`. `eups unsetup <product>` does the reverse. `eups list`,
  `declare`, `undeclare`, `tags`, `flavor`, `expandtable`, and `path` are
  read/write diagnostics over the product database; see `eups <verb>
  --help` for each one's options.
*/

use std::io::Write;
use std::process::ExitCode;

use eups_core::argparse;
use eups_core::declare;
use eups_core::diag;
use eups_core::error::EupsResult;
use eups_core::list;
use eups_core::setup;

fn handle_result<W: Write>(res: EupsResult<()>, stderr: &mut W) -> ExitCode {
    match res {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            let _ = writeln!(stderr, "FATAL: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn main() -> ExitCode {
    let args = argparse::parse_args();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut err = std::io::stderr();

    match args.subcommand() {
        ("setup", Some(m)) => handle_result(setup::setup_command(m, &args, &mut out), &mut err),
        ("unsetup", Some(m)) => handle_result(setup::unsetup_command(m, &args, &mut out), &mut err),
        ("list", Some(m)) => handle_result(list::list_command(m, &args, &mut out), &mut err),
        ("declare", Some(m)) => handle_result(declare::declare_command(m, &args, &mut out), &mut err),
        ("undeclare", Some(m)) => {
            handle_result(declare::undeclare_command(m, &args, &mut out), &mut err)
        }
        ("tags", Some(m)) => handle_result(declare::tags_command(m, &args, &mut out), &mut err),
        ("flavor", Some(m)) => handle_result(diag::flavor_command(m, &args, &mut out), &mut err),
        ("expandtable", Some(m)) => {
            handle_result(diag::expandtable_command(m, &args, &mut out), &mut err)
        }
        ("path", Some(m)) => handle_result(diag::path_command(m, &args, &mut out), &mut err),
        _ => {
            let _ = writeln!(err, "{}", args.usage());
            ExitCode::from(2)
        }
    }
}

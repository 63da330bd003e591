/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

//! `flavor`/`expandtable`/`path` (§4.2, §4.3): read-only diagnostics over
//! the active flavor, a product's fully-substituted table file, and a
//! declared product's resolved directory.

use std::io::Write;

use crate::argparse::ArgMatches;
use crate::context;
use crate::error::{EupsError, EupsResult};
use crate::table::{Action, Table};

pub fn flavor_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    writeln!(writer, "{}", ctx.flavor).map_err(EupsError::Io)
}

/// Resolves `version` (bare string) or, if absent, the `current` tag for
/// `product`.
fn resolve_version(ctx: &context::Context, sub_args: &ArgMatches, product: &str) -> EupsResult<String> {
    match sub_args.value_of("version") {
        Some(v) => Ok(v.to_string()),
        None => ctx.db.resolve_tag(product, "current"),
    }
}

pub fn expandtable_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let product = context::require_product(sub_args)?;
    let version = resolve_version(&ctx, sub_args, product)?;

    let record = ctx.db.locate_product(product, &version, &ctx.flavor)?;
    let table_path = crate::db::resolved_table_path(&record);
    let table = Table::from_file(&table_path)?;

    let vars = crate::resolver::substitution_vars(
        product,
        &version,
        &ctx.flavor,
        &record.prod_dir,
        &record.ups_dir,
        record.stack.root.display().to_string().as_str(),
    );
    let actions = table.evaluate(&ctx.flavor, None, &vars, &ctx.env_snapshot);

    for action in actions {
        writeln!(writer, "{}", format_action(&action)).map_err(EupsError::Io)?;
    }
    Ok(())
}

fn format_action(action: &Action) -> String {
    match action {
        Action::EnvSet { var, value } => format!("envSet({}, {})", var, value),
        Action::EnvUnset { var } => format!("envUnset({})", var),
        Action::EnvPrepend { var, value, delim } => {
            format!("envPrepend({}, {}, {})", var, value, delim)
        }
        Action::EnvAppend { var, value, delim } => {
            format!("envAppend({}, {}, {})", var, value, delim)
        }
        Action::EnvRemove { var, value, delim } => {
            format!("envRemove({}, {}, {})", var, value, delim)
        }
        Action::PathPrepend { var, value } => format!("pathPrepend({}, {})", var, value),
        Action::PathAppend { var, value } => format!("pathAppend({}, {})", var, value),
        Action::PathRemove { var, value } => format!("pathRemove({}, {})", var, value),
        Action::AddAlias { name, value } => format!("addAlias({}, {})", name, value),
        Action::SetupRequired { spec } => format!("setupRequired({})", spec),
        Action::SetupOptional { spec } => format!("setupOptional({})", spec),
        Action::Deprecated { directive } => format!("# deprecated: {}", directive),
    }
}

pub fn path_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let product = context::require_product(sub_args)?;
    let version = resolve_version(&ctx, sub_args, product)?;

    let record = ctx.db.locate_product(product, &version, &ctx.flavor)?;
    writeln!(writer, "{}", record.prod_dir).map_err(EupsError::Io)
}

/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

//! `declare`/`undeclare`/`tags` (§4.3): writes or removes a product
//! version declaration, or assigns/removes/lists tags against one.

use std::io::Write;

use crate::argparse::ArgMatches;
use crate::context;
use crate::db::Stack;
use crate::error::{EupsError, EupsResult};

/// Picks the stack a write verb (`declare`/`undeclare`/`tags`) targets:
/// the first system stack in `-Z`/`EUPS_PATH` order, falling back to the
/// user stack unless `-U` disabled it.
fn target_stack(ctx: &context::Context) -> EupsResult<&Stack> {
    ctx.db
        .stacks
        .first()
        .or(ctx.db.user_stack.as_ref())
        .ok_or_else(|| {
            EupsError::Usage("no writable stack available (check -Z/EUPS_PATH or -U)".to_string())
        })
}

pub fn declare_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let stack = target_stack(&ctx)?;

    let product = context::require_product(sub_args)?;
    let version = context::require_version(sub_args)?;
    let root = sub_args
        .value_of("root")
        .ok_or_else(|| EupsError::Usage("-r/--root is required".to_string()))?;
    let ups_dir = sub_args.value_of("ups-dir").unwrap_or("ups");
    let table_file = sub_args
        .value_of("tablefile")
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("{}.table", product));

    ctx.db
        .declare(stack, product, version, &ctx.flavor, root, ups_dir, &table_file)?;

    if let Some(tag) = sub_args.value_of("tag") {
        ctx.db.tag(stack, product, version, tag)?;
    }

    writeln!(writer, "declared {} {}", product, version).map_err(EupsError::Io)?;
    Ok(())
}

pub fn undeclare_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let stack = target_stack(&ctx)?;

    let product = context::require_product(sub_args)?;
    let version = context::require_version(sub_args)?;

    ctx.db.undeclare(stack, product, version)?;
    writeln!(writer, "undeclared {} {}", product, version).map_err(EupsError::Io)?;
    Ok(())
}

pub fn tags_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let product = context::require_product(sub_args)?;

    if let Some(tag) = sub_args.value_of("tag") {
        if sub_args.is_present("remove") {
            let stack = target_stack(&ctx)?;
            ctx.db.untag(stack, product, tag)?;
            writeln!(writer, "removed tag {} from {}", tag, product).map_err(EupsError::Io)?;
            return Ok(());
        }
        let version = context::require_version(sub_args)?;
        let stack = target_stack(&ctx)?;
        ctx.db.tag(stack, product, version, tag)?;
        writeln!(writer, "tagged {} {} as {}", product, version, tag).map_err(EupsError::Io)?;
        return Ok(());
    }

    for (tag, version, is_user) in ctx.db.product_tag_summaries(product) {
        let scope = if is_user { "user" } else { "system" };
        writeln!(writer, "{:<16} {:<16} {}", tag, version, scope).map_err(EupsError::Io)?;
    }
    Ok(())
}

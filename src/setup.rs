/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

/*!
  `setup`/`unsetup` (C7 over C4/C5/C6): resolves a plan, applies it
  against a snapshot `Env`, and prints the resulting delta in the
  caller's shell syntax. §3's invariant -- setting up a second version
  of an already-active product first tears down the old one -- is
  handled here by running an inverse pass over the currently recorded
  session before the new forward plan is applied.
*/

use std::io::Write;
use std::path::Path;

use crate::argparse::ArgMatches;
use crate::context;
use crate::env_engine::{Env, Mode};
use crate::error::{EupsError, EupsResult};
use crate::resolver::{self, ResolveOptions, ResolveRequest};
use crate::session::SessionMarker;
use crate::shell;
use crate::version::VersionExpr;

pub fn setup_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let product = context::require_product(sub_args)?;

    let version_expr = VersionExpr::parse(sub_args.value_of("version").unwrap_or(""));
    let tag = sub_args.value_of("tag");
    let local_root = sub_args.value_of("relative").map(Path::new);

    let options = ResolveOptions {
        just_this: sub_args.is_present("just"),
        only_dependencies: sub_args.is_present("onlydeps"),
        ignore_explicit: sub_args.is_present("ignore"),
    };

    let request = ResolveRequest {
        product,
        version_expr,
        tag,
        flavor: &ctx.flavor,
        build_type: None,
        local_root,
    };

    let plan = resolver::resolve(&ctx.db, &ctx.env_snapshot, &request, options)
        .map_err(|e| resolve_error_into(e))?;

    // `-D` strips the root product's own frame out of `plan.products`, so
    // its version is read off `root_version` rather than re-finding it
    // there -- the root is still resolved even when it won't appear in
    // the applied action/product lists.
    let root_version = plan
        .root_version
        .clone()
        .ok_or_else(|| EupsError::NoSuchProduct(product.to_string()))?;

    let mut env = Env::new(ctx.env_snapshot.clone(), Default::default());

    let force = sub_args.is_present("force");
    if let Some(existing) = active_marker(&ctx.env_snapshot, product)? {
        if existing.version != root_version && !force {
            let teardown = resolver::resolve_unsetup(&ctx.db, &ctx.env_snapshot, product, &existing)?;
            for planned in teardown.actions.iter().rev() {
                env.apply(&planned.action, Mode::Inverse);
            }
        }
    }

    for planned in &plan.actions {
        env.apply(&planned.action, Mode::Forward);
    }

    for warning in &plan.warnings {
        log::warn!("{}", warning);
    }

    let mutations = env.diff();
    writeln!(writer, "{}", shell::render(&mutations, ctx.shell)).map_err(EupsError::Io)?;
    Ok(())
}

pub fn unsetup_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;
    let product = context::require_product(sub_args)?;

    let marker = active_marker(&ctx.env_snapshot, product)?.ok_or_else(|| {
        EupsError::NoSuchProduct(format!("`{}` is not currently setup", product))
    })?;

    let mut plan = resolver::resolve_unsetup(&ctx.db, &ctx.env_snapshot, product, &marker)?;
    if sub_args.is_present("just") {
        plan.actions.retain(|a| a.product == product);
    }

    let mut env = Env::new(ctx.env_snapshot.clone(), Default::default());
    for planned in plan.actions.iter().rev() {
        env.apply(&planned.action, Mode::Inverse);
    }

    for warning in &plan.warnings {
        log::warn!("{}", warning);
    }

    let mutations = env.diff();
    writeln!(writer, "{}", shell::render(&mutations, ctx.shell)).map_err(EupsError::Io)?;
    Ok(())
}

fn active_marker(
    env_snapshot: &std::collections::HashMap<String, String>,
    product: &str,
) -> EupsResult<Option<SessionMarker>> {
    let var = SessionMarker::env_var_name(product);
    match env_snapshot.get(&var) {
        None => Ok(None),
        Some(value) => Ok(Some(SessionMarker::decode(
            &product.to_ascii_uppercase(),
            value,
        )?)),
    }
}

fn resolve_error_into(e: resolver::ResolveError) -> EupsError {
    log::error!("{}", crate::error::report_fatal(&e.error, &e.frames));
    e.error
}

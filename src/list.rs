/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

//! `list` (§4.3's `listProducts`): prints declared versions, their tags,
//! and whether each is currently active in this shell.

use std::io::Write;

use crate::argparse::ArgMatches;
use crate::context;
use crate::error::{EupsError, EupsResult};
use crate::session;

pub fn list_command<W: Write>(
    sub_args: &ArgMatches,
    main_args: &ArgMatches,
    writer: &mut W,
) -> EupsResult<()> {
    let ctx = context::build(main_args, sub_args)?;

    let active = session::active_products(&ctx.env_snapshot);
    let active_versions: std::collections::HashMap<String, String> = active
        .iter()
        .filter_map(|(p, m)| m.as_ref().ok().map(|m| (p.clone(), m.version.clone())))
        .collect();

    if sub_args.is_present("setup") {
        for (product, marker) in &active {
            match marker {
                Ok(m) => writeln!(writer, "{:<24} {:<16} setup", product, m.version)
                    .map_err(EupsError::Io)?,
                Err(e) => writeln!(writer, "{:<24} {}", product, e).map_err(EupsError::Io)?,
            };
        }
        return Ok(());
    }

    if sub_args.is_present("local") {
        for (product, marker) in &active {
            if let Ok(m) = marker {
                if m.is_local() {
                    writeln!(writer, "{:<24} {}", product, m.version).map_err(EupsError::Io)?;
                }
            }
        }
        return Ok(());
    }

    let products = if let Some(name) = sub_args.value_of("product") {
        vec![name.to_string()]
    } else {
        ctx.db.all_products()
    };

    for product in products {
        let versions = ctx.db.product_versions(&product);
        if versions.is_empty() {
            continue;
        }
        let tag_summaries = ctx.db.product_tag_summaries(&product);
        for version in &versions {
            let tags: Vec<&str> = tag_summaries
                .iter()
                .filter(|(_, v, _)| v == version)
                .map(|(t, _, _)| t.as_str())
                .collect();
            let is_current = active_versions
                .get(&product)
                .map(|v| v == version)
                .unwrap_or(false);
            let marker = if is_current { "Setup" } else { "" };
            let tag_str = if tags.is_empty() {
                String::new()
            } else {
                tags.join(" ")
            };
            writeln!(
                writer,
                "{:<24} {:<16} {:<12} {}",
                product, version, tag_str, marker
            )
            .map_err(EupsError::Io)?;
        }
    }
    Ok(())
}

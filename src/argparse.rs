/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2018*/

//! Builds the clap command-line surface named in §6: the nine verbs
//! (`setup unsetup list declare undeclare tags flavor expandtable path`)
//! plus the options common to all of them.

#[doc(no_inline)]
pub use clap::ArgMatches;
use clap::{App, Arg, SubCommand};

/// Options shared by every verb: `-f -Z -z -v -q`. Individual verbs add
/// their own on top of this.
fn common_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("flavor")
            .short("f")
            .long("flavor")
            .takes_value(true)
            .help("Override the active flavor"),
    )
    .arg(
        Arg::with_name("database")
            .short("Z")
            .long("database")
            .takes_value(true)
            .help("Colon-separated list of stack paths to use, overriding EUPS_PATH"),
    )
    .arg(
        Arg::with_name("filter")
            .short("z")
            .long("filter")
            .takes_value(true)
            .help("Filter the stack path down to entries containing this substring"),
    )
}

fn build_setup<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("setup"))
        .about("Activate a product and its dependencies")
        .arg(
            Arg::with_name("product")
                .help("Product to setup")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .help("Version expression, e.g. '>= 3.450' or a bare version")
                .index(2),
        )
        .arg(
            Arg::with_name("just")
                .help("Just this product, no dependencies")
                .short("j")
                .long("just"),
        )
        .arg(
            Arg::with_name("onlydeps")
                .help("Only dependencies, not this product")
                .short("D")
                .long("only-dependencies"),
        )
        .arg(
            Arg::with_name("relative")
                .help("Setup a local directory instead of a declared version (no database entry)")
                .short("r")
                .long("relative")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tag")
                .help("Use this tag instead of current")
                .short("t")
                .long("tag")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tablefile")
                .help("Explicit table file to use, or 'none'")
                .short("m")
                .long("table")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("force")
                .help("Force, overriding existing session state")
                .short("F")
                .long("force"),
        )
        .arg(
            Arg::with_name("ignore")
                .help("Ignore explicit versions named in child table files")
                .short("i")
                .long("ignore-versions"),
        )
}

fn build_unsetup<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("unsetup"))
        .about("Deactivate a product and whatever it recursively activated")
        .arg(
            Arg::with_name("product")
                .help("Product to unsetup")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("just")
                .help("Just this product, no dependencies")
                .short("j")
                .long("just"),
        )
}

fn build_list<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("list"))
        .about("List products known to the database, or currently setup")
        .arg(
            Arg::with_name("product")
                .help("Name of product to list (optional)")
                .index(1),
        )
        .arg(
            Arg::with_name("setup")
                .help("List only products that are currently setup")
                .short("s")
                .long("setup")
                .conflicts_with("product"),
        )
        .arg(
            Arg::with_name("local")
                .help("List only products currently setup from a local directory")
                .short("l")
                .long("local")
                .conflicts_with_all(&["product", "setup"]),
        )
}

fn build_declare<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("declare"))
        .about("Declare a new product version to the database")
        .arg(
            Arg::with_name("product")
                .required(true)
                .help("Product name")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .required(true)
                .help("Version to declare")
                .index(2),
        )
        .arg(
            Arg::with_name("root")
                .required(true)
                .help("Product directory")
                .short("r")
                .long("root")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("ups-dir")
                .help("ups directory, relative to root (default 'ups')")
                .long("ups-dir")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tablefile")
                .help("Table file, relative to <root>/<ups-dir>, or 'none'")
                .short("m")
                .long("table")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tag")
                .help("Tag to assign to this declaration")
                .short("t")
                .long("tag")
                .takes_value(true),
        )
}

fn build_undeclare<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("undeclare"))
        .about("Remove a declared product version from the database")
        .arg(
            Arg::with_name("product")
                .required(true)
                .help("Product name")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .required(true)
                .help("Version to remove")
                .index(2),
        )
}

fn build_tags<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("tags"))
        .about("Assign, remove, or list tags for a product")
        .arg(
            Arg::with_name("product")
                .required(true)
                .help("Product name")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .help("Version to tag (omit to just list existing tags)")
                .index(2),
        )
        .arg(
            Arg::with_name("tag")
                .help("Tag name to assign")
                .short("t")
                .long("tag")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("remove")
                .help("Remove the named tag instead of assigning it")
                .short("u")
                .long("untag"),
        )
}

fn build_flavor<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("flavor")
        .about("Print the active flavor (from -f, EUPS_FLAVOR, or the platform default)")
        .arg(
            Arg::with_name("flavor")
                .short("f")
                .long("flavor")
                .takes_value(true)
                .help("Override the active flavor"),
        )
}

fn build_expandtable<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("expandtable"))
        .about("Print a product's table file, fully substituted for one flavor")
        .arg(
            Arg::with_name("product")
                .required(true)
                .help("Product name")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .help("Version to expand (default: resolve the current tag)")
                .index(2),
        )
}

fn build_path<'a, 'b>() -> App<'a, 'b> {
    common_args(SubCommand::with_name("path"))
        .about("Print the resolved product directory for a declared version")
        .arg(
            Arg::with_name("product")
                .required(true)
                .help("Product name")
                .index(1),
        )
        .arg(
            Arg::with_name("version")
                .help("Version to locate (default: resolve the current tag)")
                .index(2),
        )
}

/// Builds the full command-line surface for the program, including every
/// verb and the options global to all of them (`-v`/`-q`, `-U`/`-S`).
pub fn build_cli() -> App<'static, 'static> {
    App::new("eups")
        .author("Nate Lust")
        .about("Dependency resolver, table-file evaluator, and environment-mutation engine")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("verbose")
                .global(true)
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increase verbosity (may be repeated)"),
        )
        .arg(
            Arg::with_name("quiet")
                .global(true)
                .short("q")
                .long("quiet")
                .help("Suppress all but error-level diagnostics"),
        )
        .arg(
            Arg::with_name("nouser")
                .global(true)
                .short("U")
                .long("nouser")
                .help("Disable the per-user stack overlay"),
        )
        .arg(
            Arg::with_name("nosys")
                .global(true)
                .short("S")
                .long("nosys")
                .help("Disable loading the system stack path from the environment"),
        )
        .subcommand(build_setup())
        .subcommand(build_unsetup())
        .subcommand(build_list())
        .subcommand(build_declare())
        .subcommand(build_undeclare())
        .subcommand(build_tags())
        .subcommand(build_flavor())
        .subcommand(build_expandtable())
        .subcommand(build_path())
}

/// Parses `argv` into an `ArgMatches` object.
pub fn parse_args<'a>() -> ArgMatches<'a> {
    build_cli().get_matches()
}

use std::io::Cursor;

use eups_core::argparse;
use eups_core::db::DB;
use eups_core::declare;
use eups_core::list;
use tempfile::tempdir;

fn declare_product(stack_root: &str, product: &str, version: &str, tag: Option<&str>) {
    let mut args = vec!["eups", "declare", product, version, "-r", "/opt/foo"];
    if let Some(t) = tag {
        args.push("-t");
        args.push(t);
    }
    args.push("-Z");
    args.push(stack_root);
    let app = argparse::build_cli();
    let matches = app.get_matches_from(args);
    let (_, sub) = matches.subcommand();
    let mut out = Cursor::new(vec![]);
    declare::declare_command(sub.unwrap(), &matches, &mut out).unwrap();
}

#[test]
fn list_shows_declared_versions_and_tags() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    declare_product(&root, "afoo", "1.0", Some("current"));
    declare_product(&root, "afoo", "2.0", None);

    let app = argparse::build_cli();
    let matches = app.get_matches_from(vec!["eups", "list", "afoo", "-Z", root.as_str()]);
    let (_, sub) = matches.subcommand();

    let mut out = Cursor::new(vec![]);
    list::list_command(sub.unwrap(), &matches, &mut out).unwrap();
    let output = String::from_utf8(out.into_inner()).unwrap();

    assert!(output.contains("1.0"));
    assert!(output.contains("2.0"));
    assert!(output.contains("current"));
}

#[test]
fn list_defaults_to_every_declared_product() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();

    declare_product(&root, "afoo", "1.0", None);
    declare_product(&root, "bbar", "3.1", None);

    let app = argparse::build_cli();
    let matches = app.get_matches_from(vec!["eups", "list", "-Z", root.as_str()]);
    let (_, sub) = matches.subcommand();

    let mut out = Cursor::new(vec![]);
    list::list_command(sub.unwrap(), &matches, &mut out).unwrap();
    let output = String::from_utf8(out.into_inner()).unwrap();

    assert!(output.contains("afoo"));
    assert!(output.contains("bbar"));
}

#[test]
fn list_setup_reports_nothing_when_env_is_empty() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_str().unwrap().to_string();
    let _db = DB::new(vec![dir.path().to_path_buf()], None);

    let app = argparse::build_cli();
    let matches = app.get_matches_from(vec!["eups", "list", "-s", "-Z", root.as_str()]);
    let (_, sub) = matches.subcommand();

    let mut out = Cursor::new(vec![]);
    list::list_command(sub.unwrap(), &matches, &mut out).unwrap();
    let output = String::from_utf8(out.into_inner()).unwrap();
    assert_eq!(output, "");
}

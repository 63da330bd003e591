use std::fs;
use std::io::Cursor;

use eups_core::argparse;
use eups_core::declare;
use eups_core::setup;
use tempfile::tempdir;

fn write_table(prod_dir: &std::path::Path, product: &str, body: &str) {
    let ups_dir = prod_dir.join("ups");
    fs::create_dir_all(&ups_dir).unwrap();
    fs::write(ups_dir.join(format!("{}.table", product)), body).unwrap();
}

fn declare_product(stack_root: &str, product: &str, version: &str, prod_dir: &str) {
    let args = vec![
        "eups", "declare", product, version, "-r", prod_dir, "-Z", stack_root,
    ];
    let app = argparse::build_cli();
    let matches = app.get_matches_from(args);
    let (_, sub) = matches.subcommand();
    let mut out = Cursor::new(vec![]);
    declare::declare_command(sub.unwrap(), &matches, &mut out).unwrap();
}

#[test]
fn setup_emits_envset_for_declared_product() {
    let stack_dir = tempdir().unwrap();
    let prod_dir = tempdir().unwrap();
    let stack_root = stack_dir.path().to_str().unwrap().to_string();
    let prod_root = prod_dir.path().to_str().unwrap().to_string();

    write_table(prod_dir.path(), "afoo", "Flavor = ANY\n  envSet(AFOO_GREETING, hello)\n");
    declare_product(&stack_root, "afoo", "1.0", &prod_root);

    let app = argparse::build_cli();
    let matches = app.get_matches_from(vec!["eups", "setup", "afoo", "1.0", "-Z", stack_root.as_str()]);
    let (_, sub) = matches.subcommand();

    let mut out = Cursor::new(vec![]);
    setup::setup_command(sub.unwrap(), &matches, &mut out).unwrap();
    let output = String::from_utf8(out.into_inner()).unwrap();

    assert!(output.contains("AFOO_GREETING"));
    assert!(output.contains("hello"));
    assert!(output.contains("SETUP_AFOO"));
}

#[test]
fn setup_rejects_unknown_product() {
    let stack_dir = tempdir().unwrap();
    let stack_root = stack_dir.path().to_str().unwrap().to_string();

    let app = argparse::build_cli();
    let matches = app.get_matches_from(vec!["eups", "setup", "nope", "-Z", stack_root.as_str()]);
    let (_, sub) = matches.subcommand();

    let mut out = Cursor::new(vec![]);
    let result = setup::setup_command(sub.unwrap(), &matches, &mut out);
    assert!(result.is_err());
}

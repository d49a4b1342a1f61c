use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use toml::Value;

use oramig::error::MigrateError;
use oramig::prepare::preparer::Preparer;
use oramig::prepare::template::parameter_scope;

fn write_install(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn prod_scope() -> HashMap<String, String> {
    let params: Value = "rate = \"1.0\"\nschema = \"APP\"\n[prod]\nrate = \"0.07\"\nschema = \"APP_PROD\"\n"
        .parse()
        .unwrap();
    parameter_scope("prod", &params)
}

#[test]
fn renders_install_trees_into_their_publish_directories() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_install(
        root,
        "functions.install/FNC_CALC.sql",
        "CREATE OR REPLACE FUNCTION FNC_CALC RETURN NUMBER IS\nBEGIN\n  RETURN {rate} * 100;\nEND;\n",
    );
    write_install(
        root,
        "packages.install/PKG_REPORTS.sql",
        "CREATE OR REPLACE PACKAGE {schema}.PKG_REPORTS AS\n  PROCEDURE run;\nEND;\n",
    );
    write_install(
        root,
        "packages.install/PKG_REPORTS_BODY.sql",
        "CREATE OR REPLACE PACKAGE BODY {schema}.PKG_REPORTS AS\n  PROCEDURE run IS BEGIN NULL; END;\nEND;\n",
    );
    write_install(
        root,
        "packages.install/reporting/PKG_NESTED.sql",
        "CREATE OR REPLACE PACKAGE PKG_NESTED AS\nEND;\n",
    );
    // Only .sql files are picked up.
    write_install(root, "functions.install/README.txt", "not a source");

    let preparer = Preparer::new(vec![root.to_path_buf()], prod_scope()).unwrap();
    let written = preparer.run(false).unwrap();
    assert_eq!(written, 4);

    let calc = fs::read_to_string(root.join("functions/FNC_CALC.sql")).unwrap();
    assert_eq!(
        calc,
        "CREATE OR REPLACE FUNCTION FNC_CALC RETURN NUMBER IS\nBEGIN\n  RETURN 0.07 * 100;\nEND;\n"
    );

    let spec = fs::read_to_string(root.join("packages/PKG_REPORTS.sql")).unwrap();
    assert!(spec.starts_with("CREATE OR REPLACE PACKAGE APP_PROD.PKG_REPORTS"));

    // Nested directories are mirrored under the publish tree.
    assert!(root.join("packages/reporting/PKG_NESTED.sql").is_file());
    assert!(!root.join("functions/README.txt").exists());
}

#[test]
fn unknown_tokens_survive_rendering_untouched() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_install(
        root,
        "views.install/VW_BALANCE.sql",
        "CREATE OR REPLACE VIEW VW_BALANCE AS SELECT {rate}, {unknown} FROM DUAL\n",
    );

    let preparer = Preparer::new(vec![root.to_path_buf()], prod_scope()).unwrap();
    preparer.run(false).unwrap();

    let rendered = fs::read_to_string(root.join("views/VW_BALANCE.sql")).unwrap();
    assert_eq!(
        rendered,
        "CREATE OR REPLACE VIEW VW_BALANCE AS SELECT 0.07, {unknown} FROM DUAL\n"
    );
}

#[test]
fn listing_suppresses_body_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_install(root, "packages.install/PKG_REPORTS.sql", "spec\n");
    write_install(root, "packages.install/PKG_REPORTS_BODY.sql", "body\n");
    write_install(root, "packages.install/pkg_other_body.sql", "body too\n");

    let preparer = Preparer::new(vec![root.to_path_buf()], HashMap::new()).unwrap();
    let files = preparer.discover().unwrap();
    assert_eq!(files.len(), 3);

    let names = Preparer::listed_names(&files);
    assert_eq!(names, vec!["PKG_REPORTS".to_string()]);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_install(root, "procedures.install/SP_NIGHTLY.sql", "BEGIN NULL; END;\n");

    let preparer = Preparer::new(vec![root.to_path_buf()], HashMap::new()).unwrap();
    let written = preparer.run(true).unwrap();

    assert_eq!(written, 0);
    assert!(!root.join("procedures").exists());
}

#[test]
fn a_root_without_install_trees_is_a_clean_noop() {
    let dir = TempDir::new().unwrap();

    let preparer = Preparer::new(vec![dir.path().to_path_buf()], HashMap::new()).unwrap();
    assert_eq!(preparer.run(false).unwrap(), 0);
}

#[test]
fn at_least_one_root_is_required() {
    let err = Preparer::new(Vec::new(), HashMap::new()).unwrap_err();
    assert!(matches!(err, MigrateError::Config(_)));
}

#[test]
fn rendering_overwrites_a_previously_published_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_install(root, "functions.install/FNC_CALC.sql", "RETURN {rate};\n");
    write_install(root, "functions/FNC_CALC.sql", "RETURN 1.0;\n");

    let preparer = Preparer::new(vec![root.to_path_buf()], prod_scope()).unwrap();
    preparer.run(false).unwrap();

    let rendered = fs::read_to_string(root.join("functions/FNC_CALC.sql")).unwrap();
    assert_eq!(rendered, "RETURN 0.07;\n");
}

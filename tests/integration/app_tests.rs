use clap::Parser;
use dupetree::cli::Cli;
use dupetree::config::Config;
use dupetree::error::ExitCode;
use dupetree::scan_paths;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

fn config_file(dir: &Path) -> String {
    let path = dir.join("dupetree.toml");
    fs::write(&path, "").unwrap();
    path.to_string_lossy().into_owned()
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["dupetree", "--quiet"];
    argv.extend_from_slice(args);
    dupetree::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_scan_reports_copies_across_roots() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(first.path(), "music/a.mp3", b"la la la");
    write(first.path(), "music-copy/a.mp3", b"la la la");
    write(second.path(), "unique/b", b"b");

    let config = Config::default();
    let report = scan_paths(
        &config,
        &[first.path().to_path_buf(), second.path().to_path_buf()],
        true,
    )
    .unwrap();

    assert_eq!(report.roots.len(), 2);
    assert_eq!(report.roots[0].pairs.len(), 1);
    assert_eq!(report.roots[0].pairs[0].path_a, "music");
    assert_eq!(report.roots[0].files, 2);
    assert!(report.roots[1].pairs.is_empty());
    assert_eq!(report.exit_code(), ExitCode::Success);
}

#[test]
fn test_run_app_exit_codes() {
    let dir = tempdir().unwrap();
    let cfg = config_file(dir.path());

    let data = dir.path().join("data");
    write(&data, "x/f", b"same");
    write(&data, "y/f", b"other");
    let data = data.to_string_lossy().into_owned();

    let code = run(&["--config", &cfg, "scan", &data, "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::NoRedundancy);

    write(Path::new(&data), "z/f", b"same");
    let code = run(&["--config", &cfg, "scan", &data, "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_run_app_missing_root_fails() {
    let dir = tempdir().unwrap();
    let cfg = config_file(dir.path());
    let missing = dir.path().join("missing").to_string_lossy().into_owned();

    let err = run(&["--config", &cfg, "scan", &missing, "-o", "json"]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{:#}", err).contains("Failed to scan"));
}

#[test]
fn test_config_init_writes_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("new/config.toml");
    let path_str = path.to_string_lossy().into_owned();

    let code = run(&["--config", &path_str, "config", "--init"]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(Config::load_from_path(&path).is_ok());
}

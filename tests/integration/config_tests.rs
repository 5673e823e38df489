use dupetree::cli::OutputFormat;
use dupetree::config::Config;
use dupetree::scanner::DigestAlgorithm;
use figment::providers::{Format, Serialized, Toml};
use figment::{Figment, Jail};
use std::path::Path;

#[test]
fn test_config_load_defaults() {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.output, OutputFormat::Text);
}

#[test]
fn test_config_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
digest = "blake3"
threads = 8
output = "json"

[walker]
skip_hidden = true
archive_extensions = ["zip", "jar"]
"#,
        )?;

        let config = Config::load_from_path(Path::new("config.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.digest, DigestAlgorithm::Blake3);
        assert_eq!(config.threads, 8);
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.walker.skip_hidden);
        assert_eq!(config.walker.archive_extensions, vec!["zip", "jar"]);
        // untouched keys keep their defaults
        assert_eq!(config.walker.skip_dir_names, vec!["__MACOSX"]);
        assert_eq!(config.identical_threshold, 0.99);
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "threads = 8\ndigest = \"sha256\"\n")?;
        jail.set_env("DUPETREE_THREADS", 2);
        jail.set_env("DUPETREE_DIGEST", "blake3");
        jail.set_env("DUPETREE_WALKER__SKIP_HIDDEN", true);

        let config = Config::load(Some(Path::new("config.toml"))).map_err(|e| e.to_string())?;
        assert_eq!(config.threads, 2);
        assert_eq!(config.digest, DigestAlgorithm::Blake3);
        assert!(config.walker.skip_hidden);
        Ok(())
    });
}

#[test]
fn test_invalid_toml_is_an_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "threads = \"many\"")?;
        assert!(Config::load_from_path(Path::new("config.toml")).is_err());
        Ok(())
    });
}

#[test]
fn test_out_of_range_threshold_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "identical_threshold = 1.5")?;
        let err = Config::load_from_path(Path::new("config.toml")).unwrap_err();
        assert!(err.to_string().contains("identical_threshold"));
        Ok(())
    });
}

#[test]
fn test_saved_config_round_trips_through_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.threads = 0;
    config.walker.ignore_patterns = vec!["*.tmp".into()];
    config.save(&path).unwrap();

    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}

// Configuration loading, persistence, and validation

use tempfile::tempdir;
use trade_cost_sim::{Config, ConfigError};

#[test]
fn test_round_trip_through_toml() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.feed.symbol = "ETH-USDT-SWAP".to_string();
    config.simulator.cache_capacity = 64;
    config.to_file(&path).expect("write config");

    let loaded = Config::from_file(&path).expect("read config");
    assert_eq!(loaded.feed.symbol, "ETH-USDT-SWAP");
    assert_eq!(loaded.simulator.cache_capacity, 64);
    assert_eq!(loaded.fee_tiers.len(), config.fee_tiers.len());
    assert_eq!(loaded.volatility.ewma_lambda, config.volatility.ewma_lambda);
}

#[test]
fn test_load_or_create_writes_default() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    assert!(!path.exists());

    let created = Config::load_or_create(&path).expect("create");
    assert!(path.exists());
    assert_eq!(created.feed.symbol, "BTC-USDT-SWAP");

    // Second load reads the file instead of recreating it
    let reloaded = Config::load_or_create(&path).expect("reload");
    assert_eq!(reloaded.feed.symbol, created.feed.symbol);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = Config::from_file("/nonexistent/config.toml");
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.volatility.ewma_lambda = 2.0;
    // Persist without validation to simulate a hand-edited file
    let content = toml::to_string_pretty(&config).expect("serialize");
    std::fs::write(&path, content).expect("write");

    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_unparsable_file_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "feed = not valid toml [").expect("write");

    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::Parse(_))
    ));
}

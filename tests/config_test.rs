use crawl_frontier::config::{Config, FrontierConfig};
use crawl_frontier::config::secrets::ExposeSecret;
use crawl_frontier::error::Error;
use crawl_frontier::queue::Discipline;
use std::time::Duration;

// Env-var tests share process state, so they run as one test.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("CRAWL_GROUP");
        std::env::remove_var("FRONTIER_CONFIG");
        std::env::remove_var("QUEUE_DISCIPLINE");
        std::env::remove_var("BLOOMFILTER_BIT");
        std::env::remove_var("BLOOMFILTER_HASH_NUMBER");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("REDIS_URL", "redis://127.0.0.1:6379/0");
        std::env::set_var("CRAWL_GROUP", "taptap");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.redis_url.expose_secret(), "redis://127.0.0.1:6379/0");
    assert_eq!(config.frontier.queue_key(), "taptap:queue");
    assert_eq!(config.frontier.filter_key(), "taptap:dedup");
    assert_eq!(config.frontier.discipline, Discipline::Priority);
    assert_eq!(config.frontier.filter.bit, 30);
    assert_eq!(config.frontier.filter.hash_number, 6);
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("QUEUE_DISCIPLINE", "lifo");
        std::env::set_var("BLOOMFILTER_BIT", "20");
        std::env::set_var("BLOOMFILTER_HASH_NUMBER", "4");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.frontier.discipline, Discipline::Lifo);
    assert_eq!(config.frontier.filter.bit, 20);
    assert_eq!(config.frontier.filter.hash_number, 4);

    unsafe {
        std::env::set_var("BLOOMFILTER_BIT", "40");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("BLOOMFILTER_BIT", "lots");
    }
    assert!(Config::from_env().is_err());

    // Clean up
    unsafe {
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("CRAWL_GROUP");
        std::env::remove_var("QUEUE_DISCIPLINE");
        std::env::remove_var("BLOOMFILTER_BIT");
        std::env::remove_var("BLOOMFILTER_HASH_NUMBER");
    }
}

#[test]
fn frontier_config_from_toml() {
    let config = FrontierConfig::from_toml_str(
        r#"
        [frontier]
        group = "reviews"
        queue_key = "{group}:requests"
        discipline = "fifo"
        poll_interval_ms = 250

        [frontier.filter]
        bit = 24
        "#,
    )
    .unwrap();

    assert_eq!(config.queue_key(), "reviews:requests");
    assert_eq!(config.filter_key(), "reviews:dedup");
    assert_eq!(config.discipline, Discipline::Fifo);
    assert_eq!(config.filter.bit, 24);
    assert_eq!(config.filter.hash_number, 6);
    assert_eq!(config.queue_config().poll_interval, Duration::from_millis(250));
}

#[test]
fn frontier_config_rejects_zero_poll_interval() {
    let err = FrontierConfig::from_toml_str("[frontier]\npoll_interval_ms = 0").unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let mut config = FrontierConfig::new("reviews");
    assert!(config.validate().is_ok());
    config.poll_interval_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn frontier_config_rejects_bad_toml() {
    assert!(FrontierConfig::from_toml_str("[frontier]\ndiscipline = \"random\"").is_err());
    assert!(FrontierConfig::from_toml_str("no table here").is_err());
}

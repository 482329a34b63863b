//! Loading the shipped configuration files and env overrides.

use std::io::Write;

use serial_test::serial;
use tender_radar::config::portals::{load_portals_default, load_portals_from, ENV_PORTALS_PATH};
use tender_radar::config::{AiConfig, RunConfig, StrategyKind};

#[test]
fn shipped_portals_file_is_valid() {
    let file = load_portals_from(std::path::Path::new("config/portals.toml")).unwrap();
    assert_eq!(file.triggers.len(), 17);
    assert!(file.triggers.contains(&"licitación pública".to_string()));
    assert_eq!(file.portals.len(), 7);

    let aysa = file.portals.iter().find(|p| p.name == "aysa.com.ar").unwrap();
    assert_eq!(aysa.strategy, StrategyKind::Interactive);
    assert_eq!(aysa.sections.len(), 2);

    let ypf = file.portals.iter().find(|p| p.name == "proveedores.ypf.com").unwrap();
    assert!(!ypf.enabled);
    assert!(ypf.requires_auth);

    let boletin = file.portals.iter().find(|p| p.name == "boletinoficial.gob.ar").unwrap();
    assert!(boletin.fallback_to_base);
}

#[test]
#[serial]
fn env_path_overrides_default_location() {
    let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        tmp,
        r#"{{"triggers":["concurso de precios"],"portals":[{{"name":"a","url":"https://a.test","strategy":"static"}}]}}"#
    )
    .unwrap();
    std::env::set_var(ENV_PORTALS_PATH, tmp.path());
    let file = load_portals_default();
    std::env::remove_var(ENV_PORTALS_PATH);

    let file = file.unwrap();
    assert_eq!(file.triggers, vec!["concurso de precios".to_string()]);
    assert_eq!(file.portals[0].strategy, StrategyKind::Static);
}

#[test]
#[serial]
fn env_path_to_missing_file_is_an_error() {
    std::env::set_var(ENV_PORTALS_PATH, "/no/such/portals.toml");
    let res = load_portals_default();
    std::env::remove_var(ENV_PORTALS_PATH);
    assert!(res.is_err());
}

#[test]
#[serial]
fn shipped_ai_config_and_overrides() {
    std::env::set_var("GEMINI_API_KEY", "test-key");
    std::env::set_var("GEMINI_ENABLE_CACHE", "false");
    std::env::set_var("GEMINI_CACHE_TTL_HOURS", "6");
    let cfg = AiConfig::load_or_default("config/ai.json").unwrap();
    for k in ["GEMINI_API_KEY", "GEMINI_ENABLE_CACHE", "GEMINI_CACHE_TTL_HOURS"] {
        std::env::remove_var(k);
    }

    assert_eq!(cfg.api_key, "test-key");
    assert!(!cfg.cache_enabled);
    assert_eq!(cfg.cache_ttl(), chrono::Duration::hours(6));
    assert_eq!(cfg.max_prompt_chars, 10_000);
}

#[test]
#[serial]
fn run_config_reads_browser_and_http_env() {
    std::env::set_var("SCRAPER_TIMEOUT", "30");
    std::env::set_var("SCRAPER_USER_AGENT", "  ");
    std::env::set_var("BROWSERLESS_URL", "http://browserless:3000");
    let cfg = RunConfig::from_env();
    for k in ["SCRAPER_TIMEOUT", "SCRAPER_USER_AGENT", "BROWSERLESS_URL"] {
        std::env::remove_var(k);
    }

    assert_eq!(cfg.http_timeout, std::time::Duration::from_secs(30));
    assert_eq!(cfg.user_agent, tender_radar::config::DEFAULT_USER_AGENT);
    assert_eq!(cfg.browserless_url.as_deref(), Some("http://browserless:3000"));
    assert!(cfg.browserless_token.is_none());
}

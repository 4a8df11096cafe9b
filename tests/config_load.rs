use relaymq::config::load_config;
use relaymq::Config;

#[test]
fn load_config_matches_toml() {
    let cfg: Config = load_config("relaymq.toml").expect("failed to load config");

    assert_eq!(cfg.server.bind_addr, "127.0.0.1:8443");
    assert_eq!(cfg.server.max_connections, 100);
    assert_eq!(cfg.auth.api_key.as_deref(), Some("supersecretkey"));
    assert_eq!(cfg.subscriptions.max_backlog, 0);
}

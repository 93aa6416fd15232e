use hmdp_server::ServerBuilder;
use hmdp_server::config::loader::load_config;
use hmdp_server::observability::init_tracing_with;

#[tokio::main]
async fn main() {
    // A missing .env is fine; a malformed one is worth a warning.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let config_path = config_path();
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing_with(&cfg.logging);
    tracing::info!(path = %config_path, strategy = ?cfg.shop.strategy, "Configuration loaded");

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }
}

/// `--config <path>`, then `HMDP_CONFIG`, then `hmdp.toml`.
fn config_path() -> String {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return path;
            }
        }
    }
    std::env::var("HMDP_CONFIG")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "hmdp.toml".to_string())
}

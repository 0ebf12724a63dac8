use clap::Args;

use strongbox_daemon::state::{AppState, CIPHERTEXT_DIR_NAME};

#[derive(Args, Debug, Clone)]
pub struct Health;

fn presence(path: &std::path::Path) -> &'static str {
    if path.exists() {
        "OK"
    } else {
        "MISSING"
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check state directory
        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:       {}", state.state_dir.display()));
                lines.push("  config.toml:     OK".to_string());
                lines.push(format!("  db.sqlite:       {}", presence(&state.db_path)));
                lines.push(format!(
                    "  signing_key.pem: {}",
                    presence(&state.signing_key_path)
                ));
                if let object_store::ObjectStoreConfig::Local { path } =
                    &state.config.ciphertext_store
                {
                    lines.push(format!("  {CIPHERTEXT_DIR_NAME}/:     {}", presence(path)));
                }
                lines.push(format!(
                    "  ciphertext:      {}",
                    state.config.ciphertext_store.kind()
                ));
                lines.push(format!("  api_port:        {}", state.config.api_port));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check daemon liveness and readiness
        lines.push(String::new());
        lines.push(format!("Daemon ({}):", ctx.remote));

        for (probe, path) in [("livez: ", "/_status/livez"), ("readyz:", "/_status/readyz")] {
            match ctx.client.get(ctx.endpoint(path)).send().await {
                Ok(resp) if resp.status().is_success() => {
                    lines.push(format!("  {probe} OK"));
                }
                Ok(resp) => {
                    lines.push(format!("  {probe} UNHEALTHY ({})", resp.status()));
                }
                Err(_) => {
                    lines.push(format!("  {probe} NOT REACHABLE"));
                }
            }
        }

        Ok(lines.join("\n"))
    }
}

use std::env;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            env::var("GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:8089".to_string());

        Ok(GatewayConfig { bind_addr })
    }
}

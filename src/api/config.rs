use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_json_payload_size: usize,
    /// Shared secret the capture hooks must present in `X-Hook-Secret`.
    /// `None` leaves the hooks open to anything that can reach the server.
    pub hook_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_json_payload_size: 1024 * 1024, // 1MB
            hook_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let max_json_payload_size = env::var("MAX_JSON_PAYLOAD_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_json_payload_size);

        let hook_secret = env::var("HOOK_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .or(defaults.hook_secret);

        Self {
            host,
            port,
            max_json_payload_size,
            hook_secret,
        }
    }

    pub fn print_info(&self) {
        println!("📋 Server Configuration:");
        println!("   Host: {}", self.host);
        println!("   Port: {}", self.port);
        println!("   JSON Payload Limit: {} KB", self.max_json_payload_size / 1024);
        println!(
            "   Hook Secret: {}",
            if self.hook_secret.is_some() { "set" } else { "not set" }
        );
        println!();
    }
}

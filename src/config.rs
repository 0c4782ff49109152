// src/config.rs
// Plain key = value configuration files for the hub and the clients.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: u64,
    pub poll_interval: u64,
    pub player_name: String,
    pub strips: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4100,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4100,
            timeout: 30,
            poll_interval: 2,
            player_name: "Player".to_string(),
            strips: 1,
        }
    }
}

fn get_string(map: &HashMap<String, String>, key: &str, fallback: &str) -> String {
    map.get(key).cloned().unwrap_or_else(|| fallback.to_string())
}

fn get_parsed<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, fallback: T) -> T {
    map.get(key)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(fallback)
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let map = parse_config(&content);
        let defaults = Self::default();

        Ok(ServerConfig {
            host: get_string(&map, "host", &defaults.host),
            port: get_parsed(&map, "port", defaults.port),
        })
    }

    pub fn load_or_default() -> Self {
        let config_path = "conf/server.conf";
        match Self::from_file(config_path) {
            Ok(config) => {
                println!("Loaded server configuration from {config_path}");
                config
            }
            Err(e) => {
                println!("Could not load server config from {config_path}: {e}. Using defaults.");
                Self::default()
            }
        }
    }
}

impl ClientConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let map = parse_config(&content);
        let defaults = Self::default();

        Ok(ClientConfig {
            host: get_string(&map, "host", &defaults.host),
            port: get_parsed(&map, "port", defaults.port),
            timeout: get_parsed(&map, "timeout", defaults.timeout),
            poll_interval: get_parsed(&map, "poll_interval", defaults.poll_interval),
            player_name: get_string(&map, "player_name", &defaults.player_name),
            strips: get_parsed(&map, "strips", defaults.strips),
        })
    }

    pub fn load_or_default() -> Self {
        let config_path = "conf/client.conf";
        match Self::from_file(config_path) {
            Ok(config) => {
                println!("Loaded client configuration from {config_path}");
                config
            }
            Err(e) => {
                println!("Could not load client config from {config_path}: {e}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// key = value lines; empty lines and # comments skipped.
fn parse_config(content: &str) -> HashMap<String, String> {
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            config.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    config
}

use serde::Deserialize;

/// Server-level settings shared by every Brontie service.
///
/// Embedded by each service's own config as `common`; port 0 binds an
/// ephemeral port, which the test harnesses rely on.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

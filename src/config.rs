use serde::{Deserialize, Serialize};
use std::{io, net::SocketAddr, path::Path, time::Duration};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to bind, e.g. `0.0.0.0:50051`.
    pub address: String,
    /// Deadline for unary calls; unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
    /// Capacity of the channels behind built-in streaming functions.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_stream_buffer() -> usize {
    16
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                address: String::from("0.0.0.0:50051"),
                call_timeout_secs: None,
                stream_buffer: default_stream_buffer(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid listen address '{0}'")]
    Address(String),

    #[error("cannot overwrite configuration file: {0}")]
    Exists(String),
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address
            .parse()
            .map_err(|_| ConfigError::Address(self.address.clone()))
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

pub fn default_conf() -> String {
    String::from(
        r##"[server]
address = "0.0.0.0:50051"
# call_timeout_secs = 60
stream_buffer = 16
"##,
    )
}

/// Writes `content` to `path`, refusing to replace an existing file.
pub fn create_template(path: &str, content: &str) -> Result<(), ConfigError> {
    if Path::new(path).exists() {
        return Err(ConfigError::Exists(path.to_owned()));
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_parses() {
        let settings = Settings::from_toml(&default_conf()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.server.socket_addr().unwrap(),
            "0.0.0.0:50051".parse().unwrap()
        );
        assert_eq!(settings.server.call_timeout(), None);
    }

    #[test]
    fn optional_fields() {
        let settings = Settings::from_toml(
            r#"[server]
address = "127.0.0.1:7000"
call_timeout_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(settings.server.call_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(settings.server.stream_buffer, 16);

        let bad = Settings::from_toml("[server]\naddress = \"nowhere\"\n").unwrap();
        assert!(matches!(
            bad.server.socket_addr(),
            Err(ConfigError::Address(_))
        ));
        assert!(matches!(
            Settings::from_toml("[server]\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}

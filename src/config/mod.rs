use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::WikiError;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";
const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Which database the page store talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Sqlite,
}

/// Application configuration, read from `config.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dbuser: String,
    pub dbpass: String,
    /// `host` or `host:port` of the MySQL server
    pub dbaddr: String,
    pub dbname: String,
    pub backend: Backend,
    /// Database file for the sqlite backend
    pub dbpath: Option<PathBuf>,
    pub listen: String,
    pub max_connections: u32,
    pub create_schema: bool,
    pub template_dir: Option<PathBuf>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            dbuser: String::new(),
            dbpass: String::new(),
            dbaddr: format!("127.0.0.1:{}", DEFAULT_MYSQL_PORT),
            dbname: String::new(),
            backend: Backend::Mysql,
            dbpath: None,
            listen: DEFAULT_LISTEN.to_string(),
            max_connections: 5,
            create_schema: false,
            template_dir: None,
        }
    }

    /// Read and parse a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, WikiError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WikiError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&raw)
            .map_err(|e| WikiError::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, WikiError> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| WikiError::Config(e.to_string()))?;
        if config.max_connections == 0 {
            return Err(WikiError::Config("max_connections must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Get the socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, WikiError> {
        self.listen
            .parse()
            .map_err(|e| WikiError::Config(format!("invalid listen address {:?}: {}", self.listen, e)))
    }

    /// Split `dbaddr` into host and port, defaulting the port to 3306
    pub fn mysql_host_port(&self) -> Result<(String, u16), WikiError> {
        match self.dbaddr.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    WikiError::Config(format!("invalid port in dbaddr {:?}", self.dbaddr))
                })?;
                Ok((host.to_string(), port))
            }
            None => Ok((self.dbaddr.clone(), DEFAULT_MYSQL_PORT)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_original_field_names() {
        let config = Config::from_json(
            r#"{"dbuser":"wiki","dbpass":"secret","dbaddr":"db.local:3307","dbname":"gowiki"}"#,
        )
        .unwrap();
        assert_eq!(config.dbuser, "wiki");
        assert_eq!(config.dbpass, "secret");
        assert_eq!(config.dbname, "gowiki");
        assert_eq!(config.backend, Backend::Mysql);
        assert_eq!(config.mysql_host_port().unwrap(), ("db.local".to_string(), 3307));
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn sqlite_backend() {
        let config = Config::from_json(
            r#"{"backend":"sqlite","dbpath":"wiki.db","listen":"127.0.0.1:8080","create_schema":true}"#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.dbpath.as_deref(), Some(Path::new("wiki.db")));
        assert!(config.create_schema);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn dbaddr_without_port() {
        let config = Config { dbaddr: "localhost".into(), ..Config::new() };
        assert_eq!(config.mysql_host_port().unwrap(), ("localhost".to_string(), 3306));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_json(r#"{"backend":"oracle"}"#).is_err());
        assert!(Config::from_json(r#"{"max_connections":0}"#).is_err());
        let config = Config { dbaddr: "db:port".into(), ..Config::new() };
        assert!(config.mysql_host_port().is_err());
        let config = Config { listen: ":3000".into(), ..Config::new() };
        assert!(config.socket_addr().is_err());
    }
}

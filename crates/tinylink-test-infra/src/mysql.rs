use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

/// Database, user and password of the throwaway server.
const CREDENTIAL: &str = "tinylink";
const MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    /// Tag of the `mysql` image.
    #[builder(default = "8.4".to_string())]
    tag: String,
    /// How many times [`MySqlServer::pool`] tries to connect before giving up.
    #[builder(default = 20)]
    connect_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    retry_delay: Duration,
    #[builder(default = 8)]
    max_connections: u32,
}

/// A disposable MySQL server, removed when dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", CREDENTIAL)
            .with_env_var("MYSQL_USER", CREDENTIAL)
            .with_env_var("MYSQL_PASSWORD", CREDENTIAL)
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// Opens a pool, retrying while the server finishes its first boot.
    ///
    /// MySQL logs "ready for connections" once for the temporary init server
    /// too, so the first few attempts may be refused.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        let url = format!("mysql://{CREDENTIAL}:{CREDENTIAL}@{host}:{port}/{CREDENTIAL}");

        let mut last_error = String::from("no connection attempt made");
        for _ in 0..self.config.connect_attempts {
            match MySqlPoolOptions::new()
                .max_connections(self.config.max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(err) => {
                    last_error = err.to_string();
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }

        Err(TestInfraError::NotReady {
            attempts: self.config.connect_attempts,
            last_error,
        })
    }
}

use crate::{Result, TestInfraError};
use testcontainers::core::{CmdWaitFor, ExecCommand, IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

/// Settings for a disposable MySQL server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    /// Name of the default database; partition databases are named
    /// `{database}_{selector}`.
    #[builder(default = "linkshard".to_string(), setter(into))]
    database: String,
    #[builder(default = "linkshard".to_string(), setter(into))]
    root_password: String,
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
}

/// One MySQL server that can host a separate database per partition, so a
/// single container backs a multi-partition registry.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    /// Starts the server and waits until it listens on its TCP port.
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(3306_u16.tcp())
            // the init server also logs "ready for connections", on port 0
            .with_wait_for(WaitFor::message_on_stderr("port: 3306"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", config.root_password.as_str())
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn host(&self) -> Result<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(3306).await?)
    }

    /// DSN of the default database.
    pub async fn database_url(&self) -> Result<String> {
        self.url_for(&self.config.database).await
    }

    /// DSN of the database backing the partition for `selector`, created on
    /// first use.
    pub async fn partition_url(&self, selector: char) -> Result<String> {
        if !(selector.is_ascii_digit() || selector.is_ascii_lowercase()) {
            return Err(TestInfraError::InvalidSelector(selector));
        }

        let database = format!("{}_{}", self.config.database, selector);
        let statement = format!("CREATE DATABASE IF NOT EXISTS `{database}`");
        let password = format!("-p{}", self.config.root_password);
        self.container
            .exec(
                ExecCommand::new(["mysql", "-uroot", password.as_str(), "-e", statement.as_str()])
                    .with_cmd_ready_condition(CmdWaitFor::exit_code(0)),
            )
            .await?;

        self.url_for(&database).await
    }

    async fn url_for(&self, database: &str) -> Result<String> {
        Ok(format!(
            "mysql://root:{}@{}:{}/{}",
            self.config.root_password,
            self.host().await?,
            self.port().await?,
            database
        ))
    }
}

use anyhow::Result;
use serde::Deserialize;

use qrl_common::utils::config::load_layered_config;
use qrl_common::utils::logging::LoggingConfig;
use qrl_rpc::{ClientConfig, SchemaPolicy, TransportSecurity};

use crate::cli::{Cli, Commands};

#[derive(Debug, Deserialize, Default)]
pub struct CliConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults, then the config file, then `QRL_*` env vars, then flags.
pub fn load_cli_config(cli: &Cli) -> Result<CliConfig> {
    let mut config: CliConfig = load_layered_config(cli.config.as_deref())?;
    apply_overrides(&mut config, cli);
    Ok(config)
}

/// Client settings for one command.
///
/// `node-info` and `schema` report on the node's schema themselves, so they
/// connect without the compatibility gate.
pub fn client_config_for(config: &CliConfig, command: &Commands) -> ClientConfig {
    let mut client = config.client.clone();
    if matches!(command, Commands::NodeInfo | Commands::Schema { .. }) {
        client.schema_policy = SchemaPolicy::Off;
    }
    client
}

fn apply_overrides(config: &mut CliConfig, cli: &Cli) {
    let client = &mut config.client;

    if let Some(node) = &cli.node {
        client.node = node.clone();
    }

    if cli.tls || cli.ca_cert.is_some() || cli.domain.is_some() {
        let (file_ca, file_domain) = match &client.security {
            TransportSecurity::Tls { ca_cert, domain } => (ca_cert.clone(), domain.clone()),
            TransportSecurity::Insecure => (None, None),
        };
        client.security = TransportSecurity::Tls {
            ca_cert: cli.ca_cert.clone().or(file_ca),
            domain: cli.domain.clone().or(file_domain),
        };
    }

    client.allow_insecure_remote |= cli.allow_insecure_remote;

    if let Some(policy) = cli.schema_policy {
        client.schema_policy = policy;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

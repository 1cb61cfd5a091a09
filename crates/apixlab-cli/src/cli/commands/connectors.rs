//! Connector listing.

use apixlab_core::config::{Config, ConnectorConfig};

pub fn list(config: &Config) {
    let connectors = &config.wallet.connectors;
    if connectors.is_empty() {
        println!("No wallet connectors configured.");
        return;
    }

    for (i, connector) in connectors.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!(
            "{marker} {:<12} {} ({})",
            connector.id,
            connector.name,
            key_source(connector)
        );
    }
}

fn key_source(connector: &ConnectorConfig) -> String {
    match (&connector.key_env, &connector.key_file) {
        (Some(var), _) => format!("env {var}"),
        (None, Some(file)) => format!("file {file}"),
        (None, None) => "no key source".to_string(),
    }
}

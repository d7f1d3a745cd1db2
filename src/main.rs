use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use openstack_usage_exporter::config::Config;
use openstack_usage_exporter::datastore::{Datastore, MySqlDatastore};
use openstack_usage_exporter::registry::{Registry, RegistryState};
use openstack_usage_exporter::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let domains = config.domains()?;

    // nova and nova-trait share one pool.
    let mut stores: HashMap<&'static str, Arc<dyn Datastore>> = HashMap::new();
    let mut registry = Registry::default();
    for domain in &domains {
        let database = domain.database();
        let store = match stores.get(database) {
            Some(store) => store.clone(),
            None => {
                let store: Arc<dyn Datastore> = Arc::new(
                    MySqlDatastore::connect(&config.dsn_for(database), database, config.db_max_connections)
                        .await
                        .with_context(|| format!("failed to initialize {} exporter", domain.name()))?,
                );
                stores.insert(database, store.clone());
                store
            }
        };

        registry
            .register_collector(Box::new(domain.collector(store)))
            .with_context(|| format!("failed to register {} exporter", domain.name()))?;
        info!(exporter = domain.name(), %database, "exporter enabled");
    }

    if registry.state() == RegistryState::Unconfigured {
        warn!("no exporter enabled, /metrics will be empty");
    }

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("starting OpenStack usage exporter");

    server::serve(listener, Arc::new(registry))
        .await
        .context("server error")
}

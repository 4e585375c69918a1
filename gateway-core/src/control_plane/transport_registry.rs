//! Identifier-keyed registry of the transports available to the gateway.

use crate::api::transport::Transport;
use crate::config::TransportConfig;
use crate::error::{GatewayError, Result};
use crate::observability::events;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const COMPONENT: &str = "transport_registry";

/// Source of transport implementations scanned by [`TransportRegistry::reinitialize`].
pub trait TransportCatalog: Send + Sync {
    fn discover(&self) -> Vec<Arc<dyn Transport>>;
}

/// Catalog over a fixed, explicitly assembled set of transports.
#[derive(Clone, Default)]
pub struct StaticTransportCatalog {
    transports: Vec<Arc<dyn Transport>>,
}

impl StaticTransportCatalog {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self { transports }
    }

    pub fn with(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }
}

impl TransportCatalog for StaticTransportCatalog {
    fn discover(&self) -> Vec<Arc<dyn Transport>> {
        self.transports.clone()
    }
}

pub struct TransportRegistry {
    catalog: Arc<dyn TransportCatalog>,
    config: TransportConfig,
    transports: RwLock<HashMap<String, Arc<dyn Transport>>>,
}

impl TransportRegistry {
    /// Builds the registry and performs the initial scan.
    pub async fn new(catalog: Arc<dyn TransportCatalog>, config: TransportConfig) -> Result<Self> {
        let registry = Self {
            catalog,
            config,
            transports: RwLock::new(HashMap::new()),
        };
        registry.reinitialize().await?;
        Ok(registry)
    }

    /// Rescans the catalog and swaps in the new identifier map. On failure the
    /// previous map stays in place.
    pub async fn reinitialize(&self) -> Result<usize> {
        let discovered = self.catalog.discover();
        if discovered.is_empty() {
            error!(
                event = events::REGISTRY_NO_TRANSPORTS,
                component = COMPONENT,
                "no transport implementations found"
            );
            return Err(GatewayError::configuration("no transport implementations found"));
        }

        let mut scanned: HashMap<String, Arc<dyn Transport>> = HashMap::new();
        for transport in discovered {
            let transport_id = transport.identifier().to_string();
            if scanned.contains_key(&transport_id) {
                error!(
                    event = events::REGISTRY_DUPLICATE_TRANSPORT,
                    component = COMPONENT,
                    transport_id = %transport_id,
                    "two transports share an identifier"
                );
                return Err(GatewayError::configuration(format!(
                    "duplicate transport identifier '{transport_id}'"
                )));
            }
            scanned.insert(transport_id, transport);
        }

        let count = scanned.len();
        *self.transports.write().await = scanned;

        info!(
            event = events::REGISTRY_REINITIALIZED,
            component = COMPONENT,
            transports = count,
            default_transport = %self.config.default,
            "transport registry initialized"
        );
        Ok(count)
    }

    /// Looks up `transport_id`, falling back to the default transport when it
    /// is absent or unknown. `None` only if the default is missing too.
    pub async fn resolve(&self, transport_id: Option<&str>) -> Option<Arc<dyn Transport>> {
        let transports = self.transports.read().await;
        transport_id
            .and_then(|transport_id| transports.get(transport_id))
            .or_else(|| transports.get(&self.config.default))
            .cloned()
    }

    /// Resolves the configured transport. Missing even the default is fatal.
    pub async fn resolve_configured(&self) -> Result<Arc<dyn Transport>> {
        let selected = self.config.selected.as_deref();
        let Some(transport) = self.resolve(selected).await else {
            error!(
                event = events::REGISTRY_RESOLVE_FAILED,
                component = COMPONENT,
                selected = ?selected,
                default_transport = %self.config.default,
                "neither the configured nor the default transport is registered"
            );
            return Err(GatewayError::configuration(format!(
                "default transport '{}' is not registered",
                self.config.default
            )));
        };

        if let Some(selected) = selected {
            if transport.identifier() != selected {
                warn!(
                    event = events::REGISTRY_FALLBACK_TO_DEFAULT,
                    component = COMPONENT,
                    selected,
                    transport_id = transport.identifier(),
                    "configured transport not found, using default"
                );
            }
        }
        Ok(transport)
    }

    pub fn default_id(&self) -> &str {
        &self.config.default
    }

    /// Registered identifiers in sorted order.
    pub async fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.transports.read().await.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }
}

#[cfg(test)]
mod tests {
    use super::{StaticTransportCatalog, TransportCatalog, TransportRegistry};
    use crate::api::transport::{Transport, TransportContext};
    use crate::config::TransportConfig;
    use crate::error::{GatewayError, Result};
    use crate::model::Message;
    use crate::routing::RoutingDescriptor;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct NoopTransport {
        id: &'static str,
    }

    #[async_trait]
    impl Transport for NoopTransport {
        fn identifier(&self) -> &str {
            self.id
        }

        async fn register_inbound_handler(&self, _context: Arc<TransportContext>) -> Result<()> {
            Ok(())
        }

        async fn send_consumer_side(&self, _: &RoutingDescriptor, _: &Message) -> Result<()> {
            Ok(())
        }

        async fn send_provider_side(&self, _: &RoutingDescriptor, _: &Message) -> Result<()> {
            Ok(())
        }

        async fn shutdown(&self, _context: &TransportContext) -> Result<()> {
            Ok(())
        }
    }

    fn noop(id: &'static str) -> Arc<dyn Transport> {
        Arc::new(NoopTransport { id })
    }

    fn config(selected: Option<&str>, default: &str) -> TransportConfig {
        TransportConfig {
            selected: selected.map(str::to_string),
            default: default.to_string(),
        }
    }

    struct SwappableCatalog {
        transports: Mutex<Vec<Arc<dyn Transport>>>,
    }

    impl TransportCatalog for SwappableCatalog {
        fn discover(&self) -> Vec<Arc<dyn Transport>> {
            self.transports.lock().expect("lock").clone()
        }
    }

    #[tokio::test]
    async fn duplicate_identifier_is_a_configuration_error() {
        let catalog = StaticTransportCatalog::default()
            .with(noop("as4"))
            .with(noop("as4"));

        let err = TransportRegistry::new(Arc::new(catalog), config(None, "as4"))
            .await
            .err()
            .expect("duplicate must fail");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[tokio::test]
    async fn empty_catalog_is_a_configuration_error() {
        let result =
            TransportRegistry::new(Arc::new(StaticTransportCatalog::default()), config(None, "as4"))
                .await;
        assert!(result.err().expect("empty must fail").is_fatal());
    }

    #[tokio::test]
    async fn unknown_identifier_resolves_to_default() {
        let catalog = StaticTransportCatalog::new(vec![noop("as4"), noop("as2")]);
        let registry = TransportRegistry::new(Arc::new(catalog), config(None, "as4"))
            .await
            .expect("registry");

        let resolved = registry.resolve(Some("unknown-id")).await.expect("default");
        assert_eq!(resolved.identifier(), "as4");
        let explicit = registry.resolve(Some("as2")).await.expect("as2");
        assert_eq!(explicit.identifier(), "as2");
        assert_eq!(registry.identifiers().await, vec!["as2", "as4"]);
    }

    #[tokio::test]
    async fn configured_transport_falls_back_then_fails_without_default() {
        let catalog = StaticTransportCatalog::new(vec![noop("as4")]);
        let registry = TransportRegistry::new(Arc::new(catalog.clone()), config(Some("as2"), "as4"))
            .await
            .expect("registry");
        assert_eq!(
            registry.resolve_configured().await.expect("fallback").identifier(),
            "as4"
        );

        let broken = TransportRegistry::new(Arc::new(catalog), config(Some("as2"), "missing"))
            .await
            .expect("registry");
        let err = broken
            .resolve_configured()
            .await
            .err()
            .expect("no default to fall back to");
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn failed_rescan_keeps_previous_transports() {
        let catalog = Arc::new(SwappableCatalog {
            transports: Mutex::new(vec![noop("as4")]),
        });
        let registry = TransportRegistry::new(catalog.clone(), config(None, "as4"))
            .await
            .expect("registry");

        *catalog.transports.lock().expect("lock") = vec![noop("as4"), noop("as4")];
        assert!(registry.reinitialize().await.is_err());
        assert_eq!(registry.identifiers().await, vec!["as4"]);

        *catalog.transports.lock().expect("lock") = vec![noop("as4"), noop("as2")];
        assert_eq!(registry.reinitialize().await.expect("rescan"), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn lookups_run_concurrently_with_rescans() {
        let catalog = StaticTransportCatalog::new(vec![noop("as4"), noop("as2")]);
        let registry = Arc::new(
            TransportRegistry::new(Arc::new(catalog), config(None, "as4"))
                .await
                .expect("registry"),
        );

        let mut tasks = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if i % 4 == 0 {
                        registry.reinitialize().await.expect("rescan");
                    } else {
                        assert!(registry.resolve(Some("as2")).await.is_some());
                    }
                }
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }
    }
}

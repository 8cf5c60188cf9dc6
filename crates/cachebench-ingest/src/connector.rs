//! Construction of warehouse clients from an ingestion configuration.

use cachebench_core::{Result, SharedWarehouse};

use crate::config::IngestionConfig;

/// Opens a warehouse client for one ingestion phase.
///
/// Closures returning a [`SharedWarehouse`] implement this trait, which is
/// how tests plug in an in-memory warehouse.
#[async_trait::async_trait]
pub trait WarehouseConnector: Send + Sync {
    async fn connect(&self, config: &IngestionConfig) -> Result<SharedWarehouse>;
}

#[async_trait::async_trait]
impl<F> WarehouseConnector for F
where
    F: Fn(&IngestionConfig) -> Result<SharedWarehouse> + Send + Sync,
{
    async fn connect(&self, config: &IngestionConfig) -> Result<SharedWarehouse> {
        self(config)
    }
}

#[cfg(feature = "reqwest")]
mod kusto {
    use std::sync::Arc;

    use cachebench_core::{Error, Result, SharedWarehouse};

    use super::WarehouseConnector;
    use crate::config::IngestionConfig;
    use crate::kusto::{KustoClient, KustoConfig};

    /// Connects [`KustoClient`]s to the endpoints of the configuration.
    #[derive(Debug, Clone, Default)]
    pub struct KustoConnector {
        config: KustoConfig,
    }

    impl KustoConnector {
        pub fn new(config: KustoConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait::async_trait]
    impl WarehouseConnector for KustoConnector {
        async fn connect(&self, config: &IngestionConfig) -> Result<SharedWarehouse> {
            let client = KustoClient::new(
                self.config.clone(),
                &config.warehouse_uri,
                &config.ingest_uri,
            )
            .map_err(|e| Error::configuration(format!("cannot create warehouse client: {e}")))?;

            Ok(Arc::new(client))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use kusto::KustoConnector;

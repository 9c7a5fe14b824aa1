pub mod azure;
pub mod endpoints;

use std::path::PathBuf;
use std::sync::Arc;

use blob_store::{BlobStore, LocalFileBlobStore};

use crate::store::azure::AzureBlobStore;
use crate::store::endpoints::AccountEndpoints;

/// Where the account's data actually lives.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Azure Blob Storage (or an emulator) with shared-key credentials.
    Azure { access_key: String },
    /// A local directory shared by both endpoints.
    Local { root: PathBuf },
}

#[derive(Debug, Clone)]
pub enum StoreBackends {
    Azure(AzureBlobStore),
    Local(LocalFileBlobStore),
}

impl StoreBackends {
    /// Erases the backend type so both replicas can be handed around as one trait object.
    pub fn into_shared(self) -> Arc<dyn BlobStore> {
        match self {
            StoreBackends::Azure(a) => Arc::new(a),
            StoreBackends::Local(b) => Arc::new(b),
        }
    }
}

/// The two endpoint-scoped stores of one account.
#[derive(Debug, Clone)]
pub struct ReplicaPair {
    pub primary: StoreBackends,
    pub secondary: StoreBackends,
}

impl ReplicaPair {
    pub fn connect(backend: &BackendConfig, endpoints: &AccountEndpoints) -> Self {
        match backend {
            BackendConfig::Azure { access_key } => {
                tracing::info!(
                    "using azure endpoints {} (primary) and {} (secondary)",
                    endpoints.primary,
                    endpoints.secondary
                );
                Self {
                    primary: StoreBackends::Azure(AzureBlobStore::new(
                        &endpoints.account,
                        access_key,
                        endpoints.primary.clone(),
                    )),
                    secondary: StoreBackends::Azure(AzureBlobStore::new(
                        &endpoints.account,
                        access_key,
                        endpoints.secondary.clone(),
                    )),
                }
            }
            BackendConfig::Local { root } => {
                tracing::info!("using local blob store at {}", root.display());
                Self {
                    primary: StoreBackends::Local(LocalFileBlobStore::new(root.clone(), endpoints.primary.clone())),
                    secondary: StoreBackends::Local(LocalFileBlobStore::new(root.clone(), endpoints.secondary.clone())),
                }
            }
        }
    }
}

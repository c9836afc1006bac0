// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration. The sled backend opens one database and shares it between
//! the collection provider, the directory and the platform replica.

use std::sync::Arc;

use tracing::info;

use crate::domain::repository::{
    CollectionProvider, DirectoryIndex, PlatformReplica, RepositoryError, StorageBackend,
};
use crate::infrastructure::repositories::sled_store::{
    open_database, SledCollectionProvider, SledDirectoryIndex, SledPlatformReplica,
};
use crate::infrastructure::repositories::{
    InMemoryCollectionProvider, InMemoryDirectoryIndex, InMemoryPlatformReplica,
};

/// The persistence collaborators of one audit core instance
#[derive(Clone)]
pub struct Repositories {
    pub provider: Arc<dyn CollectionProvider>,
    pub directory: Arc<dyn DirectoryIndex>,
    pub platform: Arc<dyn PlatformReplica>,
}

/// Creates all repositories for the configured backend
pub fn create_repositories(backend: &StorageBackend) -> Result<Repositories, RepositoryError> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory storage backend");
            Ok(Repositories {
                provider: Arc::new(InMemoryCollectionProvider::new()),
                directory: Arc::new(InMemoryDirectoryIndex::new()),
                platform: Arc::new(InMemoryPlatformReplica::new()),
            })
        }
        StorageBackend::Sled(config) => {
            info!(path = %config.path.display(), "Using sled storage backend");
            let db = open_database(config)?;
            Ok(Repositories {
                directory: Arc::new(SledDirectoryIndex::new(&db)?),
                platform: Arc::new(SledPlatformReplica::new(&db)?),
                provider: Arc::new(SledCollectionProvider::new(db)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{OpenMode, SledConfig};
    use crate::domain::tenant::{DirectoryEntry, TenantId};

    #[tokio::test]
    async fn test_sled_repositories_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StorageBackend::Sled(SledConfig {
            path: dir.path().join("db"),
        });
        let tenant = TenantId::parse("u1").unwrap();

        {
            let repos = create_repositories(&backend).unwrap();
            repos
                .directory
                .insert(DirectoryEntry::new(tenant.clone(), Default::default()))
                .await
                .unwrap();
            repos.provider.open(&tenant, OpenMode::CreateIfMissing).await.unwrap();
            repos.provider.flush().await.unwrap();
        }

        let repos = create_repositories(&backend).unwrap();
        assert_eq!(repos.directory.list_tenants().await.unwrap(), vec![tenant.clone()]);
        assert_eq!(repos.provider.list_collections().await.unwrap(), vec![tenant]);
    }

    #[tokio::test]
    async fn test_in_memory_repositories_start_empty() {
        let repos = create_repositories(&StorageBackend::InMemory).unwrap();
        assert!(repos.directory.list_tenants().await.unwrap().is_empty());
        assert!(repos.platform.list_tenants().await.unwrap().is_empty());
        assert!(repos.provider.list_collections().await.unwrap().is_empty());
    }
}

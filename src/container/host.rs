// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::info;

use crate::container::traits::ContainerProbe;

/// Containers the host has reported as mounted in its UI tree
#[derive(Default)]
pub struct HostContainers {
    mounted: RwLock<HashSet<String>>,
}

impl HostContainers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mounted container. Returns false if it was already known.
    pub async fn mount(&self, container_id: &str) -> bool {
        let inserted = self.mounted.write().await.insert(container_id.to_string());
        if inserted {
            info!(container_id = %container_id, "Container mounted");
        }
        inserted
    }

    /// Forget a container. Returns false if it was not mounted.
    pub async fn unmount(&self, container_id: &str) -> bool {
        let removed = self.mounted.write().await.remove(container_id);
        if removed {
            info!(container_id = %container_id, "Container unmounted");
        }
        removed
    }

    pub async fn mounted_count(&self) -> usize {
        self.mounted.read().await.len()
    }
}

#[async_trait]
impl ContainerProbe for HostContainers {
    async fn is_available(&self, container_id: &str) -> bool {
        self.mounted.read().await.contains(container_id)
    }
}

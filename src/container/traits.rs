// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

#[async_trait]
pub trait ContainerProbe: Send + Sync {
    /// Whether the host UI currently holds a container element with this id
    async fn is_available(&self, container_id: &str) -> bool;
}

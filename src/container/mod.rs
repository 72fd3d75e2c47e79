// SPDX-License-Identifier: GPL-3.0-only
pub mod host;
pub mod traits;
pub mod wait;

pub use host::HostContainers;
pub use traits::ContainerProbe;
pub use wait::{wait_for_container, WaitError, WaitPolicy};

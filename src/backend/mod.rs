// SPDX-License-Identifier: GPL-3.0-only
pub mod memory;
pub mod traits;

pub use memory::InMemoryBackend;
pub use traits::{GeoObject, MapBackend, MapInstance};

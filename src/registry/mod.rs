// SPDX-License-Identifier: GPL-3.0-only
pub mod models;
pub mod tables;

pub use tables::{GeoObjectEntry, MapEntry, Registry};

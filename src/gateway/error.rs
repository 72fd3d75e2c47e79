// SPDX-License-Identifier: GPL-3.0-only
use crate::container::WaitError;
use crate::registry::models::GeoObjectKind;

/// Faults returned to the host. The `Display` form is the fault string the
/// host sees.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("Map not initialized")]
    MapNotInitialized,

    #[error("{0} not found")]
    NotFound(GeoObjectKind),

    #[error("{0} already exists")]
    AlreadyExists(GeoObjectKind),

    #[error("Invalid geometry for {0}")]
    InvalidGeometry(GeoObjectKind),

    #[error("Unknown map type: {0}")]
    UnknownMapType(String),

    #[error("Container '{0}' not available")]
    ContainerTimeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Fault raised by the mapping library, forwarded unchanged
    #[error(transparent)]
    Backend(anyhow::Error),

    /// Fault raised by the geocoding service, forwarded unchanged
    #[error(transparent)]
    Geocoder(anyhow::Error),
}

impl GatewayError {
    /// Raised before any call into the mapping library
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GatewayError::MapNotInitialized
                | GatewayError::NotFound(_)
                | GatewayError::AlreadyExists(_)
                | GatewayError::InvalidGeometry(_)
                | GatewayError::UnknownMapType(_)
        )
    }
}

impl From<WaitError> for GatewayError {
    fn from(error: WaitError) -> Self {
        match error {
            WaitError::TimedOut(id) => GatewayError::ContainerTimeout(id),
            WaitError::Cancelled(_) => GatewayError::Cancelled,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// SPDX-License-Identifier: GPL-3.0-only
pub mod traits;
pub mod yandex;

pub use traits::{
    FoundGeoObject, GeocodeOptions, GeocodeRequest, GeocodingService, SuggestEntry, SuggestOptions,
};
pub use yandex::YandexGeocoder;

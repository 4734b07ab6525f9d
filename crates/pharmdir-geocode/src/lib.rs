//! Forward geocoding for pharmacy searches.
//!
//! [`MapboxClient`] talks to the mapping provider and reshapes its response;
//! [`Geocoder`] layers the fallback chain on top so a geocoding failure never
//! blocks a search.

mod cities;
pub mod client;
pub mod error;
pub mod geocoder;
pub mod types;

pub use client::MapboxClient;
pub use error::GeocodeError;
pub use geocoder::{parse_coordinate_literal, GeocodeStrategy, Geocoded, Geocoder};
pub use types::{AddressComponent, GeocodeResult, Position};

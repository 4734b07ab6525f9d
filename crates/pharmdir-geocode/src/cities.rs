//! Offline fallback table of major cities per country.

use pharmdir_core::{Coordinates, Country};

struct City {
    name: &'static str,
    lat: f64,
    lng: f64,
}

const fn city(name: &'static str, lat: f64, lng: f64) -> City {
    City { name, lat, lng }
}

const US_CITIES: &[City] = &[
    city("los angeles", 34.0522, -118.2437),
    city("new york", 40.7128, -74.0060),
    city("chicago", 41.8781, -87.6298),
    city("houston", 29.7604, -95.3698),
    city("phoenix", 33.4484, -112.0740),
    city("philadelphia", 39.9526, -75.1652),
    city("san antonio", 29.4241, -98.4936),
    city("san diego", 32.7157, -117.1611),
    city("dallas", 32.7767, -96.7970),
    city("san jose", 37.3382, -121.8863),
    city("austin", 30.2672, -97.7431),
    city("seattle", 47.6062, -122.3321),
    city("denver", 39.7392, -104.9903),
    city("boston", 42.3601, -71.0589),
    city("miami", 25.7617, -80.1918),
];

const CA_CITIES: &[City] = &[
    city("toronto", 43.6532, -79.3832),
    city("montreal", 45.5017, -73.5673),
    city("montréal", 45.5017, -73.5673),
    city("vancouver", 49.2827, -123.1207),
    city("calgary", 51.0447, -114.0719),
    city("edmonton", 53.5461, -113.4938),
    city("ottawa", 45.4215, -75.6972),
    city("winnipeg", 49.8951, -97.1384),
    city("quebec city", 46.8139, -71.2080),
    city("hamilton", 43.2557, -79.8711),
    city("kitchener", 43.4516, -80.4925),
    city("london", 42.9849, -81.2453),
    city("victoria", 48.4284, -123.3656),
    city("halifax", 44.6488, -63.5752),
    city("saskatoon", 52.1332, -106.6700),
    city("regina", 50.4452, -104.6189),
];

/// First table city whose name appears in `input`, case-insensitively.
pub(crate) fn lookup(input: &str, country: Country) -> Option<Coordinates> {
    let haystack = input.to_lowercase();
    let table = match country {
        Country::Us => US_CITIES,
        Country::Ca => CA_CITIES,
    };
    table
        .iter()
        .find(|c| haystack.contains(c.name))
        .map(|c| Coordinates::new(c.lat, c.lng))
}

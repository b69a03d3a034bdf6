use super::config::AnalysisConfig;
use super::{AnalysisError, Vote};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two (latitude, longitude) pairs in degrees.
pub fn haversine_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let delta_lat = lat2 - lat1;
    let delta_lon = lon2 - lon1;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Vote for a measured distance. Both thresholds are inclusive on the stricter side.
pub fn classify(distance_meters: f64, config: &AnalysisConfig) -> Vote {
    if distance_meters >= config.mismatch_meters {
        Vote::Red
    } else if distance_meters >= config.warning_meters {
        Vote::Yellow
    } else {
        Vote::Green
    }
}

pub(crate) fn validate(label: &'static str, (latitude, longitude): (f64, f64)) -> Result<(), AnalysisError> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::InvalidCoordinates {
            label,
            latitude,
            longitude,
        })
    }
}

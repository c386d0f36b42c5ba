use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// GPS readings older than this are treated as stale.
const MAX_LOCATION_AGE_SECS: i64 = 5 * 60;
/// Accuracy (meters) beyond which a reading is rejected outright.
const MAX_ACCEPTABLE_ACCURACY: f64 = 100.0;
/// Default movement threshold (meters) for path sampling.
pub const MOVEMENT_THRESHOLD_METERS: f64 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LocationValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Runs every check unconditionally so the caller sees all problems at once,
/// not just the first one.
pub fn validate_location(loc: &RawLocation) -> LocationValidation {
    let mut errors = Vec::new();

    if !(-90.0..=90.0).contains(&loc.latitude) {
        errors.push(format!("Latitude {} is out of range [-90, 90]", loc.latitude));
    }
    if !(-180.0..=180.0).contains(&loc.longitude) {
        errors.push(format!(
            "Longitude {} is out of range [-180, 180]",
            loc.longitude
        ));
    }
    if loc.accuracy < 0.0 {
        errors.push(format!("Accuracy {} must not be negative", loc.accuracy));
    }
    if loc.accuracy > MAX_ACCEPTABLE_ACCURACY {
        errors.push(format!(
            "Accuracy {}m exceeds the acceptable limit of {}m",
            loc.accuracy, MAX_ACCEPTABLE_ACCURACY
        ));
    }
    match loc.timestamp {
        None => errors.push("Timestamp is missing".to_string()),
        Some(ts) => {
            let age = Utc::now().signed_duration_since(ts).num_seconds();
            if age > MAX_LOCATION_AGE_SECS {
                errors.push(format!(
                    "Location reading is {}s old (limit {}s)",
                    age, MAX_LOCATION_AGE_SECS
                ));
            }
        }
    }

    LocationValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Great-circle distance in meters between two coordinates (haversine).
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let r = 6371000.0;
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    r * c
}

pub fn has_significant_movement(
    prev_lat: f64,
    prev_lng: f64,
    curr_lat: f64,
    curr_lng: f64,
    threshold: f64,
) -> bool {
    calculate_distance(prev_lat, prev_lng, curr_lat, curr_lng) >= threshold
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Approximate bounding box around a point. One degree of latitude is taken
/// as 111.32 km; longitude degrees shrink by cos(latitude).
pub fn bounding_box(lat: f64, lng: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.32;
    let lng_delta = radius_km / (111.32 * lat.to_radians().cos());

    BoundingBox {
        north: lat + lat_delta,
        south: lat - lat_delta,
        east: lng + lng_delta,
        west: lng - lng_delta,
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AccuracyLevel {
    pub level: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

pub fn accuracy_level(accuracy: f64) -> AccuracyLevel {
    if accuracy <= 5.0 {
        AccuracyLevel {
            level: "EXCELLENT",
            color: "green",
            description: "GPS fix is precise to a few meters",
        }
    } else if accuracy <= 10.0 {
        AccuracyLevel {
            level: "GOOD",
            color: "lightgreen",
            description: "GPS fix is reliable for attendance",
        }
    } else if accuracy <= 20.0 {
        AccuracyLevel {
            level: "FAIR",
            color: "yellow",
            description: "GPS fix is usable but imprecise",
        }
    } else if accuracy <= 50.0 {
        AccuracyLevel {
            level: "POOR",
            color: "orange",
            description: "GPS fix is weak, move to open sky",
        }
    } else {
        AccuracyLevel {
            level: "VERY POOR",
            color: "red",
            description: "GPS fix is unreliable",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationQuality {
    pub score: i32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Scores a reading out of 100, deducting for poor accuracy and staleness.
pub fn analyze_location_quality(loc: &RawLocation) -> LocationQuality {
    let mut score = 100;
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if loc.accuracy > 50.0 {
        score -= 40;
        issues.push(format!("Very low GPS accuracy ({}m)", loc.accuracy));
        recommendations.push("Move to an open area away from buildings".to_string());
    } else if loc.accuracy > 20.0 {
        score -= 20;
        issues.push(format!("Low GPS accuracy ({}m)", loc.accuracy));
        recommendations.push("Wait a moment for the GPS fix to improve".to_string());
    } else if loc.accuracy > 10.0 {
        score -= 10;
        issues.push(format!("Moderate GPS accuracy ({}m)", loc.accuracy));
    }

    if let Some(ts) = loc.timestamp {
        if Utc::now().signed_duration_since(ts).num_seconds() > MAX_LOCATION_AGE_SECS {
            score -= 20;
            issues.push("Location reading is stale".to_string());
            recommendations.push("Refresh the GPS reading before submitting".to_string());
        }
    }

    LocationQuality {
        score: score.max(0),
        issues,
        recommendations,
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimSearch {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Serialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

const GEOCODING_USER_AGENT: &str = "fieldforce-backend/0.1 (attendance)";

/// Resolves a coordinate to an address. Never fails: any problem with the
/// upstream service degrades to the raw coordinate string.
pub async fn reverse_geocode(
    http: &reqwest::Client,
    config: &Config,
    latitude: f64,
    longitude: f64,
) -> String {
    let fallback = format!("{:.6}, {:.6}", latitude, longitude);
    let url = format!(
        "{}/reverse?lat={}&lon={}&format=json",
        config.geocoding_url, latitude, longitude
    );

    let response = match http
        .get(&url)
        .header(reqwest::header::USER_AGENT, GEOCODING_USER_AGENT)
        .send()
        .await
    {
        Ok(r) if r.status().is_success() => r,
        _ => return fallback,
    };

    match response.json::<NominatimReverse>().await {
        Ok(body) if body.error.is_none() => body.display_name.unwrap_or(fallback),
        _ => fallback,
    }
}

/// Forward geocoding; returns None instead of erroring when the upstream
/// service fails or has no match.
pub async fn geocode(
    http: &reqwest::Client,
    config: &Config,
    query: &str,
) -> Option<GeocodeResult> {
    let url = format!(
        "{}/search?q={}&format=json&limit=1",
        config.geocoding_url,
        urlencode(query)
    );

    let response = http
        .get(&url)
        .header(reqwest::header::USER_AGENT, GEOCODING_USER_AGENT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }

    let results = response.json::<Vec<NominatimSearch>>().await.ok()?;
    let first = results.into_iter().next()?;
    Some(GeocodeResult {
        latitude: first.lat.parse().ok()?,
        longitude: first.lon.parse().ok()?,
        display_name: first.display_name,
    })
}

fn urlencode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fresh(latitude: f64, longitude: f64, accuracy: f64) -> RawLocation {
        RawLocation {
            latitude,
            longitude,
            accuracy,
            timestamp: Some(Utc::now()),
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(calculate_distance(12.97, 77.59, 12.97, 77.59), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let d1 = calculate_distance(12.9716, 77.5946, 13.0827, 80.2707);
        let d2 = calculate_distance(13.0827, 80.2707, 12.9716, 77.5946);
        assert!((d1 - d2).abs() < 1e-6);
    }

    #[test]
    fn distance_matches_known_value() {
        // Bangalore to Chennai is roughly 290 km
        let d = calculate_distance(12.9716, 77.5946, 13.0827, 80.2707);
        assert!(d > 280_000.0 && d < 300_000.0, "got {}", d);
    }

    #[test]
    fn validation_accepts_edge_coordinates() {
        for (lat, lng) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            let v = validate_location(&fresh(lat, lng, 0.0));
            assert!(v.is_valid, "{lat},{lng}: {:?}", v.errors);
        }
    }

    #[test]
    fn validation_flags_each_failure_independently() {
        let v = validate_location(&RawLocation {
            latitude: 91.0,
            longitude: 181.0,
            accuracy: -1.0,
            timestamp: None,
        });
        assert!(!v.is_valid);
        // lat, lng, negative accuracy, missing timestamp
        assert_eq!(v.errors.len(), 4);

        let v = validate_location(&fresh(-91.0, -181.0, 5.0));
        assert_eq!(v.errors.len(), 2);
    }

    #[test]
    fn validation_rejects_low_accuracy_and_stale_readings() {
        let v = validate_location(&fresh(10.0, 10.0, 150.0));
        assert!(!v.is_valid);

        let stale = RawLocation {
            timestamp: Some(Utc::now() - Duration::minutes(6)),
            ..fresh(10.0, 10.0, 5.0)
        };
        let v = validate_location(&stale);
        assert!(!v.is_valid);
    }

    #[test]
    fn movement_threshold_is_inclusive() {
        // ~0.00045 degrees of latitude is ~50m
        assert!(has_significant_movement(12.0, 77.0, 12.001, 77.0, 50.0));
        assert!(!has_significant_movement(12.0, 77.0, 12.0001, 77.0, 50.0));
    }

    #[test]
    fn bounding_box_is_centered() {
        let bb = bounding_box(12.0, 77.0, 10.0);
        assert!(bb.north > 12.0 && bb.south < 12.0);
        assert!(bb.east > 77.0 && bb.west < 77.0);
        assert!((bb.north - 12.0 - (12.0 - bb.south)).abs() < 1e-9);
        // longitude spread widens away from the equator
        let wider = bounding_box(60.0, 77.0, 10.0);
        assert!(wider.east - wider.west > bb.east - bb.west);
    }

    #[test]
    fn accuracy_buckets() {
        assert_eq!(accuracy_level(3.0).level, "EXCELLENT");
        assert_eq!(accuracy_level(5.0).level, "EXCELLENT");
        assert_eq!(accuracy_level(10.0).level, "GOOD");
        assert_eq!(accuracy_level(20.0).level, "FAIR");
        assert_eq!(accuracy_level(50.0).level, "POOR");
        assert_eq!(accuracy_level(51.0).level, "VERY POOR");
    }

    #[test]
    fn quality_score_deductions() {
        assert_eq!(analyze_location_quality(&fresh(12.0, 77.0, 5.0)).score, 100);
        assert_eq!(analyze_location_quality(&fresh(12.0, 77.0, 15.0)).score, 90);
        assert_eq!(analyze_location_quality(&fresh(12.0, 77.0, 30.0)).score, 80);
        assert_eq!(analyze_location_quality(&fresh(12.0, 77.0, 60.0)).score, 60);

        let stale_and_inaccurate = RawLocation {
            timestamp: Some(Utc::now() - Duration::minutes(10)),
            ..fresh(12.0, 77.0, 60.0)
        };
        let q = analyze_location_quality(&stale_and_inaccurate);
        assert_eq!(q.score, 40);
        assert_eq!(q.issues.len(), 2);
    }

    #[test]
    fn urlencode_escapes_reserved_characters() {
        assert_eq!(urlencode("MG Road, Bengaluru"), "MG+Road%2C+Bengaluru");
    }
}

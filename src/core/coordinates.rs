//! Geographic coordinates and their placement on the globe sphere.
//!
//! Latitude/longitude arrive from the position API as decimal-degree strings. They are
//! validated here (parseable, finite, inside the geographic range) and then mapped onto
//! a sphere of a given radius in the globe's local space, z pointing to the north pole.

use bevy::math::{DVec3, Vec3};
use std::f64::consts::PI;
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// Which half of a coordinate pair a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordField {
    Latitude,
    Longitude,
}

impl CoordField {
    pub fn range(self) -> RangeInclusive<f64> {
        match self {
            CoordField::Latitude => LATITUDE_RANGE,
            CoordField::Longitude => LONGITUDE_RANGE,
        }
    }
}

impl fmt::Display for CoordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordField::Latitude => f.write_str("latitude"),
            CoordField::Longitude => f.write_str("longitude"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field} {value:?}: {reason}")]
pub struct CoordError {
    pub field: CoordField,
    pub value: String,
    pub reason: &'static str,
}

/// Validated geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Out-of-range values are rejected, never clamped.
    pub fn from_degrees(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        Ok(GeoCoordinate {
            latitude: check_component(CoordField::Latitude, latitude)?,
            longitude: check_component(CoordField::Longitude, longitude)?,
        })
    }

    /// Parse the decimal-degree strings used on the wire.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, CoordError> {
        Ok(GeoCoordinate {
            latitude: parse_component(CoordField::Latitude, latitude)?,
            longitude: parse_component(CoordField::Longitude, longitude)?,
        })
    }

    pub fn as_radians(&self) -> (f64, f64) {
        (self.latitude * PI / 180.0, self.longitude * PI / 180.0)
    }

    /// Spherical to Cartesian at a fixed radius.
    pub fn to_cartesian(&self, radius: f64) -> CartesianPoint {
        let (lat, lng) = self.as_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lng, cos_lng) = lng.sin_cos();
        CartesianPoint {
            x: radius * cos_lat * cos_lng,
            y: radius * cos_lat * sin_lng,
            z: radius * sin_lat,
        }
    }
}

fn parse_component(field: CoordField, raw: &str) -> Result<f64, CoordError> {
    let value: f64 = raw.trim().parse().map_err(|_| CoordError {
        field,
        value: raw.to_string(),
        reason: "not a number",
    })?;
    check_component(field, value)
}

fn check_component(field: CoordField, value: f64) -> Result<f64, CoordError> {
    if !value.is_finite() {
        return Err(CoordError {
            field,
            value: value.to_string(),
            reason: "not a finite number",
        });
    }
    if !field.range().contains(&value) {
        return Err(CoordError {
            field,
            value: value.to_string(),
            reason: "out of range",
        });
    }
    Ok(value)
}

/// Point on the marker sphere in the globe's local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub fn length(&self) -> f64 {
        DVec3::from(*self).length()
    }

    /// Narrow to the renderer's f32 space.
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl From<CartesianPoint> for DVec3 {
    fn from(p: CartesianPoint) -> Self {
        DVec3::new(p.x, p.y, p.z)
    }
}

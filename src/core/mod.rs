//! Core geometry shared by the poller and the renderer.

pub mod coordinates;

pub use coordinates::{CartesianPoint, CoordError, CoordField, GeoCoordinate};

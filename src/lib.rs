#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

mod cfg;
mod coordinate;
mod doppler;
mod error;
mod measurement;
mod pose;
mod residual;
mod weight;

pub mod constants;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::cfg::ErrorParameters;
    pub use crate::coordinate::{
        ecef_to_geodetic, geodetic_to_ecef, Coordinate, GeoType, LocalFrame,
    };
    pub use crate::doppler::{
        earth_rotation_range_rate_m_s, DopplerError, DopplerPrediction, ParameterGroup,
    };
    pub use crate::error::Error;
    pub use crate::measurement::{GnssMeasurement, Observation, SatelliteState};
    pub use crate::pose::{
        AmbientPose, PoseIncrement, PoseLocalParameterization, PoseParameterization,
    };
    pub use crate::residual::{JacobianSlots, ResidualBlock};
    pub use crate::weight::Weighting;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

pub use error::Error;

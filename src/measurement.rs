//! Satellite states and Doppler observations
use nalgebra::Vector3;

use crate::prelude::{Epoch, SV};

/// [SatelliteState] at signal transmission, as resolved from ephemerides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteState {
    /// [SV] identity. Its constellation selects the noise ratio.
    pub sv: SV,

    /// Position in ECEF meters
    pub position_ecef_m: Vector3<f64>,

    /// Velocity in ECEF m.s⁻¹
    pub velocity_ecef_m_s: Vector3<f64>,

    /// Broadcast clock frequency offset (clock drift), expressed in m.s⁻¹
    pub frequency_offset_m_s: f64,
}

impl SatelliteState {
    /// Builds a new [SatelliteState] from ECEF position (m) and velocity (m.s⁻¹)
    pub fn new(sv: SV, position_ecef_m: Vector3<f64>, velocity_ecef_m_s: Vector3<f64>) -> Self {
        Self {
            sv,
            position_ecef_m,
            velocity_ecef_m_s,
            frequency_offset_m_s: 0.0,
        }
    }

    /// Copies and returns [SatelliteState] with updated frequency offset (m.s⁻¹)
    pub fn with_frequency_offset_m_s(&self, offset_m_s: f64) -> Self {
        let mut s = *self;
        s.frequency_offset_m_s = offset_m_s;
        s
    }
}

/// Doppler [Observation], expressed as a range rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Sampling [Epoch]
    pub epoch: Epoch,

    /// Doppler measurement, in m.s⁻¹
    pub doppler_m_s: f64,
}

impl Observation {
    pub fn new(epoch: Epoch, doppler_m_s: f64) -> Self {
        Self { epoch, doppler_m_s }
    }
}

/// [GnssMeasurement] gathers all satellites observed at one [Epoch].
/// Satellite states and observations share the same indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct GnssMeasurement {
    /// Sampling [Epoch]
    pub epoch: Epoch,

    satellites: Vec<SatelliteState>,
    observations: Vec<Observation>,
}

impl GnssMeasurement {
    /// Builds an empty [GnssMeasurement]
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            satellites: Vec::new(),
            observations: Vec::new(),
        }
    }

    /// Appends a new satellite with its Doppler measurement (m.s⁻¹),
    /// returns its index within this [GnssMeasurement].
    pub fn push(&mut self, satellite: SatelliteState, doppler_m_s: f64) -> usize {
        self.satellites.push(satellite);
        self.observations.push(Observation::new(self.epoch, doppler_m_s));
        self.satellites.len() - 1
    }

    /// Copies and returns [GnssMeasurement] with one more satellite.
    pub fn with_satellite(&self, satellite: SatelliteState, doppler_m_s: f64) -> Self {
        let mut s = self.clone();
        s.push(satellite, doppler_m_s);
        s
    }

    /// Number of satellites
    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// Returns [SatelliteState] and [Observation] at this index
    pub fn get(&self, index: usize) -> Option<(&SatelliteState, &Observation)> {
        Some((self.satellites.get(index)?, self.observations.get(index)?))
    }

    /// Iterates over all ([SatelliteState], [Observation])
    pub fn iter(&self) -> impl Iterator<Item = (&SatelliteState, &Observation)> + '_ {
        self.satellites.iter().zip(self.observations.iter())
    }
}

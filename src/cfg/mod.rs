//! Doppler noise configuration
use std::collections::HashMap;

use itertools::Itertools;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::{Constellation, Error};

/// Default Doppler (range rate) error factor, in m.s⁻¹
const fn default_doppler_error_factor() -> f64 {
    0.5
}

fn default_system_error_ratio() -> HashMap<Constellation, f64> {
    HashMap::from([
        (Constellation::GPS, 1.0),
        (Constellation::Galileo, 1.0),
        (Constellation::BeiDou, 1.0),
        (Constellation::QZSS, 1.0),
        (Constellation::Glonass, 1.5),
    ])
}

/// [ErrorParameters] describe the Doppler measurement noise.
/// The variance of one observation is (factor × ratio)², where ratio
/// depends on the satellite [Constellation].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorParameters {
    /// Global Doppler error factor, in m.s⁻¹.
    #[cfg_attr(feature = "serde", serde(default = "default_doppler_error_factor"))]
    pub doppler_error_factor: f64,

    /// Per constellation error ratio, applied to the global factor.
    #[cfg_attr(feature = "serde", serde(default = "default_system_error_ratio"))]
    pub system_error_ratio: HashMap<Constellation, f64>,
}

impl Default for ErrorParameters {
    fn default() -> Self {
        Self {
            doppler_error_factor: default_doppler_error_factor(),
            system_error_ratio: default_system_error_ratio(),
        }
    }
}

impl std::fmt::Display for ErrorParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let ratios = self
            .system_error_ratio
            .iter()
            .map(|(constellation, ratio)| format!("{}={}", constellation, ratio))
            .sorted()
            .join(", ");

        write!(
            f,
            "doppler factor={}m.s⁻¹ ratios=[{}]",
            self.doppler_error_factor, ratios
        )
    }
}

impl ErrorParameters {
    /// Copies and returns [ErrorParameters] with updated global Doppler error factor.
    pub fn with_doppler_error_factor(&self, factor: f64) -> Self {
        let mut s = self.clone();
        s.doppler_error_factor = factor;
        s
    }

    /// Copies and returns [ErrorParameters] with updated error ratio
    /// for this [Constellation].
    pub fn with_system_error_ratio(&self, constellation: Constellation, ratio: f64) -> Self {
        let mut s = self.clone();
        s.system_error_ratio.insert(constellation, ratio);
        s
    }

    /// Verifies this configuration leads to a positive definite covariance
    /// for the given [Constellation].
    pub fn validate(&self, constellation: Constellation) -> Result<(), Error> {
        let ratio = self
            .system_error_ratio
            .get(&constellation)
            .ok_or(Error::MissingSystemErrorRatio(constellation))?;

        let factor = self.doppler_error_factor;

        if !factor.is_finite() || !ratio.is_finite() || factor <= 0.0 || *ratio <= 0.0 {
            return Err(Error::DegenerateWeighting);
        }

        Ok(())
    }

    /// Doppler standard deviation (m.s⁻¹) for this [Constellation].
    pub fn doppler_sigma_m_s(&self, constellation: Constellation) -> Result<f64, Error> {
        self.validate(constellation)?;
        let ratio = self.system_error_ratio[&constellation];
        Ok(self.doppler_error_factor * ratio)
    }
}

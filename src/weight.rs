//! Measurement weighting
use nalgebra::{allocator::Allocator, Cholesky, DefaultAllocator, DimName, OMatrix, U1};

use crate::prelude::{Constellation, Error, ErrorParameters};

/// [Weighting] whitens residuals and Jacobians so the solver
/// faces a unit weighted least squares problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighting<D: DimName>
where
    DefaultAllocator: Allocator<D, D>,
{
    covariance: OMatrix<f64, D, D>,
    information: OMatrix<f64, D, D>,
    square_root_information: OMatrix<f64, D, D>,
    square_root_information_inverse: OMatrix<f64, D, D>,
}

impl<D: DimName> Weighting<D>
where
    DefaultAllocator: Allocator<D, D>,
{
    /// Builds [Weighting] from measurement covariance.
    /// The square root information is the upper triangular Cholesky factor,
    /// so that sqrt_infoᵀ · sqrt_info = information.
    pub fn new(covariance: OMatrix<f64, D, D>) -> Result<Self, Error> {
        if covariance.iter().any(|c| !c.is_finite()) {
            return Err(Error::DegenerateWeighting);
        }

        let information = covariance
            .clone()
            .try_inverse()
            .ok_or(Error::DegenerateWeighting)?;

        let lower = Cholesky::new(information.clone())
            .ok_or(Error::DegenerateWeighting)?
            .unpack();

        let square_root_information = lower.transpose();

        let square_root_information_inverse = square_root_information
            .clone()
            .try_inverse()
            .ok_or(Error::DegenerateWeighting)?;

        Ok(Self {
            covariance,
            information,
            square_root_information,
            square_root_information_inverse,
        })
    }

    pub fn covariance(&self) -> &OMatrix<f64, D, D> {
        &self.covariance
    }

    pub fn information(&self) -> &OMatrix<f64, D, D> {
        &self.information
    }

    pub fn square_root_information(&self) -> &OMatrix<f64, D, D> {
        &self.square_root_information
    }

    pub fn square_root_information_inverse(&self) -> &OMatrix<f64, D, D> {
        &self.square_root_information_inverse
    }
}

impl Weighting<U1> {
    /// Builds the Doppler [Weighting] for a satellite of this [Constellation].
    pub fn doppler(params: &ErrorParameters, constellation: Constellation) -> Result<Self, Error> {
        let sigma = params.doppler_sigma_m_s(constellation)?;
        Self::new(OMatrix::<f64, U1, U1>::new(sigma * sigma))
    }

    /// Scalar square root information
    pub(crate) fn scalar_square_root_information(&self) -> f64 {
        self.square_root_information[(0, 0)]
    }
}

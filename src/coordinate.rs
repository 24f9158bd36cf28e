//! Earth fixed (ECEF), geodetic and local tangent (ENU) coordinates
use std::sync::Arc;

use anise::{
    constants::frames::EARTH_ITRF93,
    prelude::{Frame, Orbit},
    structure::planetocentric::ellipsoid::Ellipsoid,
};
use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::{
    constants::{EARTH_EQUATORIAL_RADIUS_KM, EARTH_POLAR_RADIUS_KM},
    prelude::{Epoch, Error},
};

/// Supported coordinate frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoType {
    /// Earth Centered Earth Fixed, meters
    Ecef,
    /// East North Up local tangent frame, meters
    Enu,
    /// Geodetic latitude (ddeg), longitude (ddeg), height (m) on WGS84
    Lla,
}

impl std::fmt::Display for GeoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ecef => write!(f, "ECEF"),
            Self::Enu => write!(f, "ENU"),
            Self::Lla => write!(f, "LLA"),
        }
    }
}

/// Body fixed Earth [Frame] on the WGS84 ellipsoid
fn wgs84_frame() -> Frame {
    EARTH_ITRF93.with_ellipsoid(Ellipsoid::from_spheroid(
        EARTH_EQUATORIAL_RADIUS_KM,
        EARTH_POLAR_RADIUS_KM,
    ))
}

/// Static positions: the [Epoch] only tags the [Orbit].
fn static_epoch() -> Epoch {
    Epoch::from_tai_seconds(0.0)
}

/// Static [Orbit] at this ECEF position (m)
fn static_orbit(ecef_m: &Vector3<f64>) -> Orbit {
    Orbit::from_position(
        ecef_m[0] / 1.0E3,
        ecef_m[1] / 1.0E3,
        ecef_m[2] / 1.0E3,
        static_epoch(),
        wgs84_frame(),
    )
}

/// Converts geodetic coordinates (ddeg, ddeg, m) to ECEF meters (WGS84).
pub fn geodetic_to_ecef(lat_ddeg: f64, long_ddeg: f64, alt_m: f64) -> Result<Vector3<f64>, Error> {
    let orbit = Orbit::try_latlongalt(
        lat_ddeg,
        long_ddeg,
        alt_m / 1.0E3,
        0.0,
        static_epoch(),
        wgs84_frame(),
    )
    .map_err(Error::Physics)?;

    Ok(orbit.radius_km * 1.0E3)
}

/// Converts ECEF meters to geodetic coordinates (ddeg, ddeg, m) (WGS84).
/// Longitude is within ]-180, 180].
pub fn ecef_to_geodetic(ecef_m: &Vector3<f64>) -> Result<(f64, f64, f64), Error> {
    // closed form solution is singular on the polar axis
    if ecef_m[0] == 0.0 && ecef_m[1] == 0.0 {
        let lat_ddeg = if ecef_m[2] < 0.0 { -90.0 } else { 90.0 };
        let alt_m = ecef_m[2].abs() - EARTH_POLAR_RADIUS_KM * 1.0E3;
        return Ok((lat_ddeg, 0.0, alt_m));
    }

    let orbit = static_orbit(ecef_m);
    let (lat_ddeg, _, alt_km) = orbit.latlongalt().map_err(Error::Physics)?;

    Ok((lat_ddeg, orbit.longitude_deg(), alt_km * 1.0E3))
}

/// ENU to ECEF rotation matrix, at this geodetic location.
/// Columns are the East, North and Up unit vectors expressed in ECEF.
pub fn rotation_ecef_enu(lat_rad: f64, long_rad: f64) -> Matrix3<f64> {
    Matrix3::<f64>::new(
        -long_rad.sin(),
        -long_rad.cos() * lat_rad.sin(),
        lat_rad.cos() * long_rad.cos(),
        long_rad.cos(),
        -lat_rad.sin() * long_rad.sin(),
        lat_rad.cos() * long_rad.sin(),
        0.0_f64,
        lat_rad.cos(),
        lat_rad.sin(),
    )
}

/// [LocalFrame] is a local tangent (ENU) frame whose origin has been established.
/// It is immutable, and is typically shared (see [Coordinate::local_frame]) by
/// all residual blocks of one estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// Origin in ECEF meters
    origin_ecef_m: Vector3<f64>,
    /// Origin as geodetic (ddeg, ddeg, m)
    origin_lat_long_alt: (f64, f64, f64),
    /// ENU to ECEF rotation
    r_ecef_enu: Matrix3<f64>,
}

impl LocalFrame {
    /// Builds a [LocalFrame] centered on this geodetic location (ddeg, ddeg, m).
    pub fn from_geodetic(lat_ddeg: f64, long_ddeg: f64, alt_m: f64) -> Result<Self, Error> {
        Ok(Self {
            origin_ecef_m: geodetic_to_ecef(lat_ddeg, long_ddeg, alt_m)?,
            origin_lat_long_alt: (lat_ddeg, long_ddeg, alt_m),
            r_ecef_enu: rotation_ecef_enu(lat_ddeg.to_radians(), long_ddeg.to_radians()),
        })
    }

    /// Builds a [LocalFrame] centered on this ECEF location (m).
    pub fn from_ecef(origin_ecef_m: Vector3<f64>) -> Result<Self, Error> {
        let (lat_ddeg, long_ddeg, alt_m) = ecef_to_geodetic(&origin_ecef_m)?;
        Ok(Self {
            origin_ecef_m,
            origin_lat_long_alt: (lat_ddeg, long_ddeg, alt_m),
            r_ecef_enu: rotation_ecef_enu(lat_ddeg.to_radians(), long_ddeg.to_radians()),
        })
    }

    /// Origin, in ECEF meters
    pub fn origin_ecef_m(&self) -> Vector3<f64> {
        self.origin_ecef_m
    }

    /// Origin, as geodetic (ddeg, ddeg, m)
    pub fn origin_geodetic(&self) -> (f64, f64, f64) {
        self.origin_lat_long_alt
    }

    /// Rotation matrix from ENU to ECEF
    pub fn rotation_ecef_enu(&self) -> &Matrix3<f64> {
        &self.r_ecef_enu
    }

    /// Converts an ENU position to ECEF
    pub fn enu_to_ecef(&self, enu_m: &Vector3<f64>) -> Vector3<f64> {
        self.origin_ecef_m + self.r_ecef_enu * enu_m
    }

    /// Converts an ECEF position to ENU
    pub fn ecef_to_enu(&self, ecef_m: &Vector3<f64>) -> Vector3<f64> {
        self.r_ecef_enu.transpose() * (ecef_m - self.origin_ecef_m)
    }

    /// Rotates a vector (velocity, offset..) from ENU to ECEF
    pub fn rotate_enu_to_ecef(&self, enu: &Vector3<f64>) -> Vector3<f64> {
        self.r_ecef_enu * enu
    }

    /// Rotates a vector (velocity, offset..) from ECEF to ENU
    pub fn rotate_ecef_to_enu(&self, ecef: &Vector3<f64>) -> Vector3<f64> {
        self.r_ecef_enu.transpose() * ecef
    }

    /// Azimuth and elevation angles (ddeg) of an ECEF target,
    /// resolved in the topocentric (SEZ) frame of this origin.
    /// Azimuth is counted clockwise from North, within [0, 360[.
    /// None when that frame is not defined (origin within 1 m of the polar axis)
    /// or when the target is the origin itself.
    pub fn azimuth_elevation_deg(
        &self,
        target_ecef_m: &Vector3<f64>,
    ) -> Result<Option<(f64, f64)>, Error> {
        let origin = static_orbit(&self.origin_ecef_m);
        let rho_km = (target_ecef_m - self.origin_ecef_m) / 1.0E3;

        if origin.radius_km[0].hypot(origin.radius_km[1]) < 1.0E-3 || rho_km.norm() == 0.0 {
            return Ok(None);
        }

        let sez_dcm = origin
            .dcm3x3_from_topocentric_to_body_fixed()
            .map_err(Error::Physics)?;

        let rho_sez = sez_dcm.rot_mat.transpose() * rho_km;

        let elevation = (rho_sez[2] / rho_sez.norm()).asin().to_degrees();
        let azimuth = rho_sez[1].atan2(-rho_sez[0]).to_degrees().rem_euclid(360.0);

        Ok(Some((azimuth, elevation)))
    }
}

/// [Coordinate] converts positions and vectors between [GeoType]s.
/// Its local (ENU) origin is established once, prior to any
/// local frame usage. Conversions that do not involve the local frame
/// are always available.
#[derive(Debug, Default, Clone)]
pub struct Coordinate {
    frame: Option<Arc<LocalFrame>>,
}

impl Coordinate {
    /// Builds a [Coordinate] without local origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a [Coordinate] with local origin at this geodetic location (ddeg, ddeg, m).
    pub fn with_origin(lat_ddeg: f64, long_ddeg: f64, alt_m: f64) -> Result<Self, Error> {
        let mut s = Self::new();
        s.set_origin(lat_ddeg, long_ddeg, alt_m)?;
        Ok(s)
    }

    /// Establishes the local origin at this geodetic location (ddeg, ddeg, m).
    /// Handles previously returned by [Self::local_frame] keep the former origin.
    pub fn set_origin(&mut self, lat_ddeg: f64, long_ddeg: f64, alt_m: f64) -> Result<(), Error> {
        let frame = LocalFrame::from_geodetic(lat_ddeg, long_ddeg, alt_m)?;
        debug!(
            "local origin: lat={}° long={}° alt={}m",
            lat_ddeg, long_ddeg, alt_m
        );
        self.frame = Some(Arc::new(frame));
        Ok(())
    }

    /// Establishes the local origin at this ECEF location (m).
    pub fn set_origin_ecef(&mut self, origin_ecef_m: Vector3<f64>) -> Result<(), Error> {
        let frame = LocalFrame::from_ecef(origin_ecef_m)?;
        debug!("local origin: ecef={}", origin_ecef_m.transpose());
        self.frame = Some(Arc::new(frame));
        Ok(())
    }

    /// True once the local origin has been established
    pub fn is_origin_set(&self) -> bool {
        self.frame.is_some()
    }

    /// Returns a shared handle on the originated [LocalFrame].
    pub fn local_frame(&self) -> Result<Arc<LocalFrame>, Error> {
        self.frame.clone().ok_or(Error::MissingCoordinateReference)
    }

    fn frame(&self) -> Result<&LocalFrame, Error> {
        self.frame
            .as_deref()
            .ok_or(Error::MissingCoordinateReference)
    }

    /// Converts a position from one [GeoType] to another.
    /// [GeoType::Lla] points are expressed as (ddeg, ddeg, m).
    pub fn convert(
        &self,
        point: &Vector3<f64>,
        from: GeoType,
        to: GeoType,
    ) -> Result<Vector3<f64>, Error> {
        let ecef_m = match from {
            GeoType::Ecef => *point,
            GeoType::Lla => geodetic_to_ecef(point[0], point[1], point[2])?,
            GeoType::Enu => self.frame()?.enu_to_ecef(point),
        };

        match to {
            GeoType::Ecef => Ok(ecef_m),
            GeoType::Lla => {
                let (lat_ddeg, long_ddeg, alt_m) = ecef_to_geodetic(&ecef_m)?;
                Ok(Vector3::new(lat_ddeg, long_ddeg, alt_m))
            },
            GeoType::Enu => Ok(self.frame()?.ecef_to_enu(&ecef_m)),
        }
    }

    /// Rotates a vector from one cartesian [GeoType] to another.
    pub fn rotate(
        &self,
        vector: &Vector3<f64>,
        from: GeoType,
        to: GeoType,
    ) -> Result<Vector3<f64>, Error> {
        Ok(self.rotation_matrix(from, to)? * vector)
    }

    /// Rotation matrix from one cartesian [GeoType] to another.
    pub fn rotation_matrix(&self, from: GeoType, to: GeoType) -> Result<Matrix3<f64>, Error> {
        match (from, to) {
            (GeoType::Lla, _) | (_, GeoType::Lla) => Err(Error::NonCartesianFrame),
            (GeoType::Enu, GeoType::Ecef) => Ok(*self.frame()?.rotation_ecef_enu()),
            (GeoType::Ecef, GeoType::Enu) => Ok(self.frame()?.rotation_ecef_enu().transpose()),
            _ => Ok(Matrix3::identity()),
        }
    }
}

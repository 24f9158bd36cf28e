use anise::constants::SPEED_OF_LIGHT_KM_S;

/// Earth angular velocity, in WGS84 frame rad/s
pub const EARTH_ANGULAR_VEL_RAD: f64 = 7.2921151467E-5;

/// WGS84 Earth Frame Ellipsoid equatorial radius (km)
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

/// WGS84 Earth Frame Ellipsoid polar radius (km), a·(1 - 1/298.257223563)
pub const EARTH_POLAR_RADIUS_KM: f64 = 6356.752314245179;

/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = SPEED_OF_LIGHT_KM_S * 1000.0;

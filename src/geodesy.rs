//! ECEF / geodetic / topocentric conversions (WGS84)
use map_3d::{ecef2aer, ecef2geodetic, geodetic2ecef, Ellipsoid};
use nalgebra::{Matrix3, Vector3};

/// Converts geodetic coordinates (latitude, longitude in radians, height in meters)
/// to ECEF coordinates in meters.
pub fn geodetic_to_ecef(lat_rad: f64, lon_rad: f64, h_m: f64) -> Vector3<f64> {
    let (x, y, z) = geodetic2ecef(lat_rad, lon_rad, h_m, Ellipsoid::WGS84);
    Vector3::new(x, y, z)
}

/// Converts ECEF coordinates (meters) to geodetic
/// (latitude, longitude in radians, height in meters).
pub fn ecef_to_geodetic(ecef_m: &Vector3<f64>) -> (f64, f64, f64) {
    ecef2geodetic(ecef_m[0], ecef_m[1], ecef_m[2], Ellipsoid::WGS84)
}

/// Rotation matrix whose columns are the local East, North and Up
/// unit vectors, expressed in ECEF.
pub fn enu_rotation(lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let (slat, clat) = lat_rad.sin_cos();
    let (slon, clon) = lon_rad.sin_cos();
    Matrix3::<f64>::new(
        -slon,
        -clon * slat,
        clat * clon,
        clon,
        -slat * slon,
        clat * slon,
        0.0_f64,
        clat,
        slat,
    )
}

/// Returns (elevation, azimuth) in radians of the target,
/// as seen from the receiver. Both expressed in ECEF meters.
pub fn elevation_azimuth(rx_ecef_m: &Vector3<f64>, target_ecef_m: &Vector3<f64>) -> (f64, f64) {
    let (lat, lon, h) = ecef_to_geodetic(rx_ecef_m);
    let (azim, elev, _) = ecef2aer(
        target_ecef_m[0],
        target_ecef_m[1],
        target_ecef_m[2],
        lat,
        lon,
        h,
        Ellipsoid::WGS84,
    );
    (elev, azim.rem_euclid(2.0 * std::f64::consts::PI))
}

/// Rotates a vector about the Z axis by `angle_rad` (counter clockwise).
pub(crate) fn rotate_z(v: &Vector3<f64>, angle_rad: f64) -> Vector3<f64> {
    let (s, c) = angle_rad.sin_cos();
    Vector3::new(c * v[0] - s * v[1], s * v[0] + c * v[1], v[2])
}

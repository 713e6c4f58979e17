use crate::{
    models::{TroposphereComponents, TroposphereModel},
    prelude::Epoch,
};

/// Saastamoinen model, evaluated in a standard atmosphere
/// (1013.25 hPa, 18°C and 50% relative humidity at sea level),
/// with a 1/sin(e) mapping function.
#[derive(Debug, Default, Clone, Copy)]
pub struct Saastamoinen {}

impl Saastamoinen {
    /// Standard atmosphere at `height_m`: pressure (hPa),
    /// temperature (K), water vapour partial pressure (hPa).
    fn standard_atmosphere(height_m: f64) -> (f64, f64, f64) {
        let pp = 1013.25 * (1.0 - 2.26E-5 * height_m).powf(5.225);
        let tt = 18.0 - height_m * 0.0065 + 273.15;
        let hh = 50.0 * (-6.396E-4 * height_m).exp();
        let ee = hh / 100.0 * (-37.2465 + 0.213166 * tt - 0.000256908 * tt * tt).exp();
        (pp, tt, ee)
    }
}

impl TroposphereModel for Saastamoinen {
    fn slant_delay(&self, elevation_rad: f64, height_m: f64, _: Epoch) -> TroposphereComponents {
        let height_m = height_m.clamp(-500.0, 10_000.0);
        let (pp, tt, ee) = Self::standard_atmosphere(height_m);

        TroposphereComponents {
            zenith_hydrostatic_m: 0.002277 * pp,
            zenith_wet_m: 0.002277 * (1255.0 / tt + 0.05) * ee,
            mapping_wet: 1.0 / elevation_rad.sin().max(1.0E-2),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Saastamoinen;
    use crate::models::TroposphereModel;
    use crate::prelude::Epoch;

    #[test]
    fn sea_level_zenith() {
        let model = Saastamoinen::default();
        let t = Epoch::default();

        let zenith = model.slant_delay(90.0_f64.to_radians(), 0.0, t);
        assert!((zenith.zenith_hydrostatic_m - 2.3072).abs() < 1.0E-3);
        assert!(zenith.zenith_wet_m > 0.05 && zenith.zenith_wet_m < 0.2);
        assert!((zenith.mapping_wet - 1.0).abs() < 1.0E-12);

        let low = model.slant_delay(10.0_f64.to_radians(), 0.0, t);
        assert!(low.slant_delay_m() > 5.0 * zenith.slant_delay_m());

        let high = model.slant_delay(90.0_f64.to_radians(), 2000.0, t);
        assert!(high.slant_delay_m() < zenith.slant_delay_m());
    }
}

use crate::constants::SPEED_OF_LIGHT_M_S;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1aB1c
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// E1 (Galileo)
    E1,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo) same frequency as B2iB2b
    E5B,
    /// B1I (BDS)
    B1I,
    /// B2I/B2B (BDS) same frequency as E5b
    B2iB2b,
    /// B3 (BDS)
    B3,
    /// G1 (Glonass FDMA) with frequency channel number
    G1(i8),
    /// G2 (Glonass FDMA) with frequency channel number
    G2(i8),
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::E1 => write!(f, "E1"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::B1I => write!(f, "B1I"),
            Self::B2iB2b => write!(f, "B2I/B2B"),
            Self::B3 => write!(f, "B3"),
            Self::G1(k) => write!(f, "G1({:+})", k),
            Self::G2(k) => write!(f, "G2({:+})", k),
        }
    }
}

impl Carrier {
    /// Carrier frequency in Hz
    pub fn frequency(&self) -> f64 {
        match self {
            Self::L1 | Self::E1 => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A => 1176.45E6_f64,
            Self::B3 => 1268.52E6_f64,
            Self::E5B | Self::B2iB2b => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
            Self::G1(k) => 1602.0E6_f64 + (*k as f64) * 0.5625E6,
            Self::G2(k) => 1246.0E6_f64 + (*k as f64) * 0.4375E6,
        }
    }

    /// Carrier wavelength in meters
    pub fn wavelength(&self) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency()
    }
}

#[cfg(test)]
mod test {
    use super::Carrier;

    #[test]
    fn glonass_fdma() {
        assert_eq!(Carrier::G1(0).frequency(), 1602.0E6);
        assert_eq!(Carrier::G1(-7).frequency(), 1602.0E6 - 7.0 * 0.5625E6);
        assert_eq!(Carrier::G2(6).frequency(), 1246.0E6 + 6.0 * 0.4375E6);
        assert_eq!(Carrier::G1(1).to_string(), "G1(+1)");
    }

    #[test]
    fn wavelengths() {
        assert!((Carrier::L1.wavelength() - 0.19029367).abs() < 1.0E-8);
        assert!((Carrier::L2.wavelength() - 0.24421021).abs() < 1.0E-8);
    }
}

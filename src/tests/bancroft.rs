use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    prelude::{Bancroft, BancroftObservation, Vector3},
    tests::{rx_ecef_m, RX_ECEF_M},
};

/// Vehicle positions and pseudo ranges, with vehicle clock offsets (s)
const OBSERVATIONS: [((f64, f64, f64), f64, f64); 4] = [
    (
        (24170352.34904016, -16029029.85873581, -5905924.153143198),
        28776032.260,
        142.784E-6,
    ),
    (
        (16069642.946692571, -8992001.827692423, 23184746.654093638),
        24090441.364,
        -313.533E-6,
    ),
    (
        (26119621.94656989, 7791422.617964384, 11558902.718228433),
        24762903.616,
        -368.749E-6,
    ),
    (
        (-3601205.0295727667, -20311399.087870672, 21230831.216778148),
        25537644.454,
        6.158955E-3,
    ),
];

fn position((x, y, z): (f64, f64, f64)) -> Vector3<f64> {
    Vector3::new(x, y, z)
}

#[test]
fn real_data() {
    let observations = OBSERVATIONS
        .iter()
        .map(|(sv, pr, dt)| BancroftObservation {
            position_ecef_m: position(*sv),
            pseudo_range_m: pr + dt * SPEED_OF_LIGHT_M_S,
        })
        .collect::<Vec<_>>();

    let solver = Bancroft::new(&observations).unwrap();
    let solution = solver.resolve().unwrap();

    let error = solution.position_ecef_m - rx_ecef_m();
    assert!(error[0].abs() < 100.0, "x error too large: {}", error[0]);
    assert!(error[1].abs() < 100.0, "y error too large: {}", error[1]);
    assert!(error[2].abs() < 100.0, "z error too large: {}", error[2]);
}

#[test]
fn noise_free() {
    let clock_bias_s = 1.0E-4;
    let rx = position(RX_ECEF_M);

    let observations = OBSERVATIONS
        .iter()
        .map(|(sv, _, _)| BancroftObservation {
            position_ecef_m: position(*sv),
            pseudo_range_m: (position(*sv) - rx).norm() + clock_bias_s * SPEED_OF_LIGHT_M_S,
        })
        .collect::<Vec<_>>();

    let solution = Bancroft::new(&observations).unwrap().resolve().unwrap();

    assert!((solution.position_ecef_m - rx).norm() < 1.0E-6);
    assert!((solution.clock_bias_s() - clock_bias_s).abs() < 1.0E-9);
}

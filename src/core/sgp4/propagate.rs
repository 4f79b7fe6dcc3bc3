use super::{Branch, Prediction, PropagationError, Propagator};
use crate::core::constants::TWO_PI;

pub const KEPLER_TOLERANCE: f64 = 1.0e-12;
pub const KEPLER_MAX_ITERATIONS: u32 = 10;
/// Largest Newton step applied to the eccentric anomaly, radians.
const KEPLER_MAX_STEP: f64 = 0.95;
/// Mean eccentricity is floored here to keep the long-period terms finite.
const MIN_ECCENTRICITY: f64 = 1.0e-6;

impl Propagator {
    /// Position and velocity in TEME `minutes` after the element set epoch.
    pub fn propagate(&self, minutes: f64) -> Result<Prediction, PropagationError> {
        let t = minutes;
        let g = &self.gravity;
        if !t.is_finite() {
            return Err(PropagationError::InvalidElements {
                minutes: t,
                reason: "elapsed time is not finite".into(),
            });
        }

        // secular gravity and drag
        let xmdf = self.mean_anomaly + self.mdot * t;
        let argpdf = self.argument_of_perigee + self.argpdot * t;
        let nodedf = self.raan + self.nodedot * t;
        let t2 = t * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let mut nodem = nodedf + self.nodecf * t2;
        let mut tempa = 1.0 - self.cc1 * t;
        let mut tempe = self.bstar * self.cc4 * t;
        let mut templ = self.t2cof * t2;

        if let Branch::NearEarth { drag: Some(d) } = &self.branch {
            let delomg = d.omgcof * t;
            let delm = d.xmcof * ((1.0 + d.eta * xmdf.cos()).powi(3) - d.delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa -= d.d2 * t2 + d.d3 * t3 + d.d4 * t4;
            tempe += self.bstar * self.cc5 * (mm.sin() - d.sinmao);
            templ += d.t3cof * t3 + t4 * (d.t4cof + t * d.t5cof);
        }

        let mut nm = self.mean_motion;
        if let Branch::Resonant(terms) = &self.branch {
            if let Some((resonant_mm, resonant_nm)) = terms.integrate(t, nodem, argpm) {
                mm = resonant_mm;
                nm = resonant_nm;
            }
        }

        if !(nm > 0.0) {
            return Err(PropagationError::InvalidElements {
                minutes: t,
                reason: format!("mean motion {nm} rad/min"),
            });
        }
        let am = (g.xke / nm).powf(2.0 / 3.0) * tempa * tempa;
        if !am.is_finite() || am <= 0.0 {
            return Err(PropagationError::InvalidElements {
                minutes: t,
                reason: format!("semi-major axis {am} earth radii"),
            });
        }
        let nm = g.xke / am.powf(1.5);
        let mut em = self.eccentricity - tempe;

        if em >= 1.0 {
            return Err(PropagationError::OrbitDiverged {
                minutes: t,
                eccentricity: em,
            });
        }
        // perigee below the surface, or drag has consumed the whole orbit
        if tempa <= 0.0 || am * (1.0 - em.max(0.0)) < 1.0 {
            return Err(PropagationError::SatelliteDecayed { minutes: t });
        }
        if em < -0.001 {
            return Err(PropagationError::OrbitDiverged {
                minutes: t,
                eccentricity: em,
            });
        }
        if em < MIN_ECCENTRICITY {
            em = MIN_ECCENTRICITY;
        }

        mm += self.mean_motion * templ;
        let xlm = (mm + argpm + nodem) % TWO_PI;
        nodem %= TWO_PI;
        argpm %= TWO_PI;
        mm = (xlm - argpm - nodem) % TWO_PI;

        // long-period periodics
        let (sinip, cosip) = self.inclination.sin_cos();
        let axnl = em * argpm.cos();
        let temp = 1.0 / (am * (1.0 - em * em));
        let aynl = em * argpm.sin() + temp * self.aycof;
        let xl = mm + argpm + nodem + temp * self.xlcof * axnl;

        let u = (xl - nodem) % TWO_PI;
        let eo1 = solve_kepler(u, axnl, aynl)?;

        // short-period periodics
        let (sineo1, coseo1) = eo1.sin_cos();
        let ecose = axnl * coseo1 + aynl * sineo1;
        let esine = axnl * sineo1 - aynl * coseo1;
        let el2 = axnl * axnl + aynl * aynl;
        let pl = am * (1.0 - el2);
        if pl < 0.0 {
            return Err(PropagationError::OrbitDiverged {
                minutes: t,
                eccentricity: el2.sqrt(),
            });
        }

        let rl = am * (1.0 - ecose);
        let rdotl = am.sqrt() * esine / rl;
        let rvdotl = pl.sqrt() / rl;
        let betal = (1.0 - el2).sqrt();
        let temp = esine / (1.0 + betal);
        let sinu = am / rl * (sineo1 - aynl - axnl * temp);
        let cosu = am / rl * (coseo1 - axnl + aynl * temp);
        let mut su = sinu.atan2(cosu);
        let sin2u = (cosu + cosu) * sinu;
        let cos2u = 1.0 - 2.0 * sinu * sinu;
        let temp = 1.0 / pl;
        let temp1 = 0.5 * g.j2 * temp;
        let temp2 = temp1 * temp;

        let mrt = rl * (1.0 - 1.5 * temp2 * betal * self.con41)
            + 0.5 * temp1 * self.x1mth2 * cos2u;
        su -= 0.25 * temp2 * self.x7thm1 * sin2u;
        let xnode = nodem + 1.5 * temp2 * cosip * sin2u;
        let xinc = self.inclination + 1.5 * temp2 * cosip * sinip * cos2u;
        let mvt = rdotl - nm * temp1 * self.x1mth2 * sin2u / g.xke;
        let rvdot = rvdotl + nm * temp1 * (self.x1mth2 * cos2u + 1.5 * self.con41) / g.xke;

        if mrt < 1.0 {
            return Err(PropagationError::SatelliteDecayed { minutes: t });
        }

        // orientation vectors
        let (sinsu, cossu) = su.sin_cos();
        let (snod, cnod) = xnode.sin_cos();
        let (sini, cosi) = xinc.sin_cos();
        let xmx = -snod * cosi;
        let xmy = cnod * cosi;
        let ux = xmx * sinsu + cnod * cossu;
        let uy = xmy * sinsu + snod * cossu;
        let uz = sini * sinsu;
        let vx = xmx * cossu - cnod * sinsu;
        let vy = xmy * cossu - snod * sinsu;
        let vz = sini * cossu;

        let radius = mrt * g.radius_km;
        let vkmpersec = g.radius_km * g.xke / 60.0;
        Ok(Prediction {
            position: [radius * ux, radius * uy, radius * uz],
            velocity: [
                (mvt * ux + rvdot * vx) * vkmpersec,
                (mvt * uy + rvdot * vy) * vkmpersec,
                (mvt * uz + rvdot * vz) * vkmpersec,
            ],
        })
    }
}

/// Solves Kepler's equation in equinoctial form for `E + ω`, where `u` is the
/// mean longitude minus node and `(axnl, aynl)` the eccentricity vector.
fn solve_kepler(u: f64, axnl: f64, aynl: f64) -> Result<f64, PropagationError> {
    let mut eo1 = u;
    let mut step = f64::INFINITY;
    let mut iterations = 0;
    while !(step.abs() < KEPLER_TOLERANCE) {
        if iterations == KEPLER_MAX_ITERATIONS {
            return Err(PropagationError::KeplerNonConvergence {
                iterations,
                residual: step,
            });
        }
        let (sineo1, coseo1) = eo1.sin_cos();
        step = (u - aynl * coseo1 + axnl * sineo1 - eo1) / (1.0 - coseo1 * axnl - sineo1 * aynl);
        step = step.clamp(-KEPLER_MAX_STEP, KEPLER_MAX_STEP);
        eo1 += step;
        iterations += 1;
    }
    Ok(eo1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sgp4::InitError;
    use crate::core::tle::{parse, OrbitalElements};
    use approx::assert_abs_diff_eq;

    const VANGUARD_1: &str = "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753";
    const VANGUARD_2: &str = "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667";
    const ISS_1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
    const MOLNIYA_1: &str = "1 08195U 75081A   06176.33215444  .00000099  00000-0  11873-3 0   813";
    const MOLNIYA_2: &str = "2 08195  64.1586 279.0717 6877146 264.7651  20.2257  2.00491383225656";
    const GEO_1: &str = "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190";
    const GEO_2: &str = "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4891";

    fn elements(l1: &str, l2: &str) -> OrbitalElements {
        parse(l1, l2).unwrap()
    }

    fn norm(v: [f64; 3]) -> f64 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn assert_vector_eq(actual: [f64; 3], expected: [f64; 3], epsilon: f64) {
        for (a, e) in actual.into_iter().zip(expected) {
            assert_abs_diff_eq!(a, e, epsilon = epsilon);
        }
    }

    #[test]
    fn matches_published_vector_at_epoch() {
        let prop = Propagator::new(&elements(VANGUARD_1, VANGUARD_2)).unwrap();
        let p = prop.propagate(0.0).unwrap();
        assert_vector_eq(p.position, [7022.465_292_66, -1400.082_967_55, 0.039_951_55], 1.0);
        assert_vector_eq(p.velocity, [1.893_841_015, 6.405_893_759, 4.534_807_250], 1e-3);
    }

    #[test]
    fn matches_published_vector_after_six_hours() {
        let prop = Propagator::new(&elements(VANGUARD_1, VANGUARD_2)).unwrap();
        let p = prop.propagate(360.0).unwrap();
        assert_vector_eq(p.position, [-7154.031_202_02, -3783.176_825_04, -3536.194_122_94], 1.0);
        assert_vector_eq(p.velocity, [4.741_887_409, -4.151_817_765, -2.093_935_425], 1e-3);
    }

    #[test]
    fn iss_radius_and_speed_are_plausible() {
        let prop = Propagator::new(&elements(ISS_1, ISS_2)).unwrap();
        for minutes in [-720.0, 0.0, 45.0, 1440.0] {
            let p = prop.propagate(minutes).unwrap();
            let r = norm(p.position);
            let v = norm(p.velocity);
            assert!((6_600.0..6_800.0).contains(&r), "radius {r} at {minutes}");
            assert!((7.5..7.9).contains(&v), "speed {v} at {minutes}");
        }
    }

    #[test]
    fn propagation_is_deterministic_and_order_independent() {
        let prop = Propagator::new(&elements(ISS_1, ISS_2)).unwrap();
        let a = prop.propagate(1234.5).unwrap();
        let _ = prop.propagate(-50.0).unwrap();
        let b = prop.propagate(1234.5).unwrap();
        assert_eq!(a.position.map(f64::to_bits), b.position.map(f64::to_bits));
        assert_eq!(a.velocity.map(f64::to_bits), b.velocity.map(f64::to_bits));
    }

    #[test]
    fn molniya_orbit_spans_perigee_to_apogee() {
        let prop = Propagator::new(&elements(MOLNIYA_1, MOLNIYA_2)).unwrap();
        let radii: Vec<f64> = (0..=72)
            .map(|i| norm(prop.propagate(f64::from(i) * 10.0).unwrap().position))
            .collect();
        let min = radii.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = radii.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        // a ≈ 26 560 km, e ≈ 0.69
        assert!(min < 10_000.0 && min > 6_878.0, "perigee radius {min}");
        assert!(max > 42_000.0 && max < 45_500.0, "apogee radius {max}");
    }

    #[test]
    fn resonant_orbit_propagates_backwards_and_far_forward() {
        let prop = Propagator::new(&elements(MOLNIYA_1, MOLNIYA_2)).unwrap();
        assert!(prop.propagate(-2_880.0).is_ok());
        assert!(prop.propagate(14_400.0).is_ok());
    }

    #[test]
    fn geostationary_radius_is_stable() {
        let prop = Propagator::new(&elements(GEO_1, GEO_2)).unwrap();
        for minutes in [0.0, 720.0, 1440.0, 10_080.0] {
            let r = norm(prop.propagate(minutes).unwrap().position);
            assert_abs_diff_eq!(r, 42_164.0, epsilon = 50.0);
        }
    }

    #[test]
    fn heavy_drag_reports_decay_instead_of_position() {
        let mut el = elements(ISS_1, ISS_2);
        el.bstar = 0.05;
        let prop = Propagator::new(&el).unwrap();
        assert!(prop.propagate(0.0).is_ok());
        assert!(matches!(
            prop.propagate(30.0 * 1440.0),
            Err(PropagationError::SatelliteDecayed { .. })
        ));
    }

    #[test]
    fn orbit_below_surface_at_epoch_is_decayed() {
        let mut el = elements(ISS_1, ISS_2);
        // about 6 270 km semi-major axis
        el.mean_motion = 17.5;
        let prop = Propagator::new(&el).unwrap();
        assert!(matches!(
            prop.propagate(0.0),
            Err(PropagationError::SatelliteDecayed { .. })
        ));
    }

    #[test]
    fn non_finite_time_is_rejected() {
        let prop = Propagator::new(&elements(ISS_1, ISS_2)).unwrap();
        assert!(matches!(
            prop.propagate(f64::NAN),
            Err(PropagationError::InvalidElements { .. })
        ));
    }

    #[test]
    fn eccentricity_of_one_never_reaches_solver() {
        let mut el = elements(ISS_1, ISS_2);
        el.eccentricity = 1.2;
        assert!(matches!(Propagator::new(&el), Err(InitError::InvalidElements { .. })));
    }

    #[test]
    fn kepler_solver_converges_for_circular_and_eccentric_orbits() {
        let e = solve_kepler(1.0, 0.0, 0.0).unwrap();
        assert_abs_diff_eq!(e, 1.0, epsilon = 1e-15);
        let e = solve_kepler(0.3, 0.7, 0.0).unwrap();
        assert_abs_diff_eq!(e - 0.7 * e.sin(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn kepler_solver_reports_non_convergence() {
        let err = solve_kepler(f64::NAN, 0.1, 0.1).unwrap_err();
        assert!(matches!(
            err,
            PropagationError::KeplerNonConvergence { iterations: KEPLER_MAX_ITERATIONS, .. }
        ));
    }
}

use tracing::debug;

use super::{
    Branch, HigherOrderDrag, InitError, Propagator, ResonantTerms, RESONANT_PERIOD_MINUTES,
};
use crate::core::constants::{GravityModel, MINUTES_PER_DAY, TWO_PI};
use crate::core::time::greenwich_rotation_angle;
use crate::core::tle::OrbitalElements;

/// Perigee height (km) under which the higher order drag terms are dropped.
const SIMPLIFIED_DRAG_PERIGEE_KM: f64 = 220.0;
/// Reference altitudes (km) of the SGP4 atmospheric density model.
const DENSITY_Q0_KM: f64 = 120.0;
const DENSITY_S0_KM: f64 = 78.0;
/// Guard against the 1 / (1 + cos i) singularity at 180° inclination.
const RETROGRADE_GUARD: f64 = 1.5e-12;

fn invalid(reason: impl Into<String>) -> InitError {
    InitError::InvalidElements {
        reason: reason.into(),
    }
}

impl Propagator {
    /// Initializes SGP4 with the WGS72 constants TLEs are fitted against.
    pub fn new(elements: &OrbitalElements) -> Result<Self, InitError> {
        Self::with_gravity(elements, GravityModel::default())
    }

    pub fn with_gravity(
        elements: &OrbitalElements,
        model: GravityModel,
    ) -> Result<Self, InitError> {
        let g = model.constants();
        let j3oj2 = g.j3_over_j2();
        let x2o3 = 2.0 / 3.0;

        let ecco = elements.eccentricity;
        if !(0.0..1.0).contains(&ecco) {
            return Err(invalid(format!("eccentricity {ecco} outside [0, 1)")));
        }
        let inclo = elements.inclination_deg.to_radians();
        if !(0.0..=std::f64::consts::PI).contains(&inclo) {
            return Err(invalid(format!(
                "inclination {} outside [0, 180] degrees",
                elements.inclination_deg
            )));
        }
        let no_kozai = elements.mean_motion * TWO_PI / MINUTES_PER_DAY;
        if !no_kozai.is_finite() || no_kozai <= 0.0 {
            return Err(invalid(format!("mean motion {} rev/day", elements.mean_motion)));
        }
        let angles = [
            elements.raan_deg,
            elements.argument_of_perigee_deg,
            elements.mean_anomaly_deg,
            elements.bstar,
        ];
        if angles.iter().any(|v| !v.is_finite()) {
            return Err(invalid("non-finite angle or drag term"));
        }
        let nodeo = elements.raan_deg.to_radians();
        let argpo = elements.argument_of_perigee_deg.to_radians();
        let mo = elements.mean_anomaly_deg.to_radians();
        let bstar = elements.bstar;

        // un-Kozai: Brouwer mean motion and semi-major axis
        let eccsq = ecco * ecco;
        let omeosq = 1.0 - eccsq;
        let rteosq = omeosq.sqrt();
        let (sinio, cosio) = inclo.sin_cos();
        let cosio2 = cosio * cosio;

        let ak = (g.xke / no_kozai).powf(x2o3);
        let d1 = 0.75 * g.j2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
        let del = d1 / (ak * ak);
        let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
        let del = d1 / (adel * adel);
        let no = no_kozai / (1.0 + del);
        let ao = (g.xke / no).powf(x2o3);
        if !no.is_finite() || no <= 0.0 || !ao.is_finite() || ao <= 0.0 {
            return Err(invalid(format!(
                "recovered mean motion {no} rad/min and semi-major axis {ao} earth radii"
            )));
        }

        let po = ao * omeosq;
        let con42 = 1.0 - 5.0 * cosio2;
        let con41 = -con42 - cosio2 - cosio2;
        let posq = po * po;
        let rp = ao * (1.0 - ecco);

        let gsto = greenwich_rotation_angle(&elements.epoch.to_instant());

        // atmospheric density parameters, adjusted for low perigees
        let perigee_km = (rp - 1.0) * g.radius_km;
        let (sfour, qzms24) = if perigee_km < 156.0 {
            let s = if perigee_km < 98.0 { 20.0 } else { perigee_km - DENSITY_S0_KM };
            (s / g.radius_km + 1.0, ((DENSITY_Q0_KM - s) / g.radius_km).powi(4))
        } else {
            (
                DENSITY_S0_KM / g.radius_km + 1.0,
                ((DENSITY_Q0_KM - DENSITY_S0_KM) / g.radius_km).powi(4),
            )
        };

        let pinvsq = 1.0 / posq;
        let tsi = 1.0 / (ao - sfour);
        let eta = ao * ecco * tsi;
        let etasq = eta * eta;
        let eeta = ecco * eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powi(4);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * no
            * (ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * g.j2 * tsi / psisq * con41 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        let cc1 = bstar * cc2;
        let cc3 = if ecco > 1.0e-4 {
            -2.0 * coef * tsi * j3oj2 * no * sinio / ecco
        } else {
            0.0
        };
        let x1mth2 = 1.0 - cosio2;
        let cc4 = 2.0
            * no
            * coef1
            * ao
            * omeosq
            * (eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - g.j2 * tsi / (ao * psisq)
                    * (-3.0 * con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * argpo).cos()));
        let cc5 = 2.0 * coef1 * ao * omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        // secular rates from J2 and J4
        let cosio4 = cosio2 * cosio2;
        let temp1 = 1.5 * g.j2 * pinvsq * no;
        let temp2 = 0.5 * temp1 * g.j2 * pinvsq;
        let temp3 = -0.46875 * g.j4 * pinvsq * pinvsq * no;
        let mdot = no
            + 0.5 * temp1 * rteosq * con41
            + 0.0625 * temp2 * rteosq * (13.0 - 78.0 * cosio2 + 137.0 * cosio4);
        let argpdot = -0.5 * temp1 * con42
            + 0.0625 * temp2 * (7.0 - 114.0 * cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * cosio;
        let nodedot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * cosio2) + 2.0 * temp3 * (3.0 - 7.0 * cosio2)) * cosio;
        let nodecf = 3.5 * omeosq * xhdot1 * cc1;
        let t2cof = 1.5 * cc1;

        // long-period J3 coefficients
        let xlcof_den = if (cosio + 1.0).abs() > RETROGRADE_GUARD {
            1.0 + cosio
        } else {
            RETROGRADE_GUARD
        };
        let xlcof = -0.25 * j3oj2 * sinio * (3.0 + 5.0 * cosio) / xlcof_den;
        let aycof = -0.5 * j3oj2 * sinio;
        let x7thm1 = 7.0 * cosio2 - 1.0;

        let branch = if TWO_PI / no >= RESONANT_PERIOD_MINUTES {
            Branch::Resonant(ResonantTerms::new(
                no,
                ecco,
                inclo,
                mo,
                nodeo,
                argpo,
                mdot,
                argpdot,
                nodedot,
                gsto,
                g.xke,
            ))
        } else if rp < SIMPLIFIED_DRAG_PERIGEE_KM / g.radius_km + 1.0 {
            Branch::NearEarth { drag: None }
        } else {
            let cc1sq = cc1 * cc1;
            let d2 = 4.0 * ao * tsi * cc1sq;
            let temp = d2 * tsi * cc1 / 3.0;
            let d3 = (17.0 * ao + sfour) * temp;
            let d4 = 0.5 * temp * ao * tsi * (221.0 * ao + 31.0 * sfour) * cc1;
            let delmo = (1.0 + eta * mo.cos()).powi(3);
            Branch::NearEarth {
                drag: Some(HigherOrderDrag {
                    d2,
                    d3,
                    d4,
                    t3cof: d2 + 2.0 * cc1sq,
                    t4cof: 0.25 * (3.0 * d3 + cc1 * (12.0 * d2 + 10.0 * cc1sq)),
                    t5cof: 0.2
                        * (3.0 * d4
                            + 12.0 * cc1 * d3
                            + 6.0 * d2 * d2
                            + 15.0 * cc1sq * (2.0 * d2 + cc1sq)),
                    omgcof: bstar * cc3 * argpo.cos(),
                    xmcof: if ecco > 1.0e-4 { -x2o3 * coef * bstar / eeta } else { 0.0 },
                    eta,
                    delmo,
                    sinmao: mo.sin(),
                }),
            }
        };

        let coefficients = [cc1, cc4, cc5, mdot, argpdot, nodedot, nodecf, xlcof];
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(invalid("degenerate drag or secular coefficients"));
        }

        debug!(
            norad = elements.norad_id,
            period_min = TWO_PI / no,
            ?branch,
            "Initialized SGP4"
        );

        Ok(Propagator {
            gravity: g,
            inclination: inclo,
            raan: nodeo,
            eccentricity: ecco,
            argument_of_perigee: argpo,
            mean_anomaly: mo,
            mean_motion: no,
            semi_major_axis: ao,
            bstar,
            mdot,
            argpdot,
            nodedot,
            nodecf,
            cc1,
            cc4,
            cc5,
            t2cof,
            aycof,
            xlcof,
            con41,
            x1mth2,
            x7thm1,
            branch,
        })
    }
}

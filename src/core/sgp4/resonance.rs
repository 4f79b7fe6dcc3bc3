use crate::core::constants::TWO_PI;

/// Earth rotation rate, rad/min.
const RPTIM: f64 = 4.375_269_088_011_299_66e-3;

// synchronous resonance
const Q22: f64 = 1.789_167_9e-6;
const Q31: f64 = 2.146_074_8e-6;
const Q33: f64 = 2.212_301_5e-7;
const FASX2: f64 = 0.131_309_08;
const FASX4: f64 = 2.884_319_8;
const FASX6: f64 = 0.374_480_87;

// half-day resonance
const ROOT22: f64 = 1.789_167_9e-6;
const ROOT32: f64 = 3.739_379_2e-7;
const ROOT44: f64 = 7.363_695_3e-9;
const ROOT52: f64 = 1.142_863_9e-7;
const ROOT54: f64 = 2.176_580_3e-9;
const G22: f64 = 5.768_639_6;
const G32: f64 = 0.952_408_98;
const G44: f64 = 1.801_499_8;
const G52: f64 = 1.050_833;
const G54: f64 = 4.410_889_8;

/// Integrator step, minutes.
const STEP: f64 = 720.0;
const STEP2: f64 = STEP * STEP / 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synchronous {
    del1: f64,
    del2: f64,
    del3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfDay {
    d2201: f64,
    d2211: f64,
    d3210: f64,
    d3222: f64,
    d4410: f64,
    d4422: f64,
    d5220: f64,
    d5232: f64,
    d5421: f64,
    d5433: f64,
}

/// Geopotential resonance of a long-period orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resonance {
    /// Period of at least 225 minutes but not commensurate with the Earth's rotation.
    None,
    /// One revolution per sidereal day.
    Synchronous(Synchronous),
    /// Two revolutions per day with eccentricity of at least 0.5 (Molniya type).
    HalfDay(HalfDay),
}

/// Resonance coefficients plus the epoch values the integrator restarts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonantTerms {
    pub resonance: Resonance,
    xlamo: f64,
    xfact: f64,
    gsto: f64,
    no: f64,
    argpo: f64,
    argpdot: f64,
}

impl ResonantTerms {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        no: f64,
        ecco: f64,
        inclo: f64,
        mo: f64,
        nodeo: f64,
        argpo: f64,
        mdot: f64,
        argpdot: f64,
        nodedot: f64,
        gsto: f64,
        xke: f64,
    ) -> Self {
        let (sinim, cosim) = inclo.sin_cos();
        let emsq = ecco * ecco;
        let aonv = (no / xke).powf(2.0 / 3.0);
        let theta = gsto;

        let (resonance, xlamo, xfact) = if no > 0.003_490_658_5 && no < 0.005_235_987_7 {
            let g200 = 1.0 + emsq * (-2.5 + 0.8125 * emsq);
            let g310 = 1.0 + 2.0 * emsq;
            let g300 = 1.0 + emsq * (-6.0 + 6.609_37 * emsq);
            let f220 = 0.75 * (1.0 + cosim) * (1.0 + cosim);
            let f311 = 0.9375 * sinim * sinim * (1.0 + 3.0 * cosim) - 0.75 * (1.0 + cosim);
            let f330 = 1.875 * (1.0 + cosim).powi(3);
            let del1 = 3.0 * no * no * aonv * aonv;
            let terms = Synchronous {
                del1: del1 * f311 * g310 * Q31 * aonv,
                del2: 2.0 * del1 * f220 * g200 * Q22,
                del3: 3.0 * del1 * f330 * g300 * Q33 * aonv,
            };
            (
                Resonance::Synchronous(terms),
                (mo + nodeo + argpo - theta) % TWO_PI,
                mdot + argpdot + nodedot - RPTIM - no,
            )
        } else if (8.26e-3..=9.24e-3).contains(&no) && ecco >= 0.5 {
            (
                Resonance::HalfDay(HalfDay::new(no, ecco, sinim, cosim, aonv)),
                (mo + nodeo + nodeo - theta - theta) % TWO_PI,
                mdot + 2.0 * (nodedot - RPTIM) - no,
            )
        } else {
            (Resonance::None, 0.0, 0.0)
        };

        ResonantTerms {
            resonance,
            xlamo,
            xfact,
            gsto,
            no,
            argpo,
            argpdot,
        }
    }

    /// Integrates the resonance equations from epoch to `t` minutes and returns
    /// the resonant mean anomaly and mean motion, or `None` without resonance.
    /// Each call restarts at epoch, so the result depends on `t` alone.
    pub(crate) fn integrate(&self, t: f64, nodem: f64, argpm: f64) -> Option<(f64, f64)> {
        if self.resonance == Resonance::None {
            return None;
        }

        let theta = (self.gsto + t * RPTIM) % TWO_PI;
        let delt = if t > 0.0 { STEP } else { -STEP };
        let mut atime = 0.0;
        let mut xli = self.xlamo;
        let mut xni = self.no;

        loop {
            let (xndt, xldot, xnddt) = self.derivatives(xli, xni, atime);
            let ft = t - atime;
            if ft.abs() < STEP {
                let nm = xni + xndt * ft + xnddt * ft * ft * 0.5;
                let xl = xli + xldot * ft + xndt * ft * ft * 0.5;
                let mm = match self.resonance {
                    Resonance::Synchronous(_) => xl - nodem - argpm + theta,
                    _ => xl - 2.0 * nodem + 2.0 * theta,
                };
                return Some((mm, nm));
            }
            xli += xldot * delt + xndt * STEP2;
            xni += xndt * delt + xnddt * STEP2;
            atime += delt;
        }
    }

    /// Returns (dn/dt, dλ/dt, d²n/dt²) at the integrator state.
    fn derivatives(&self, xli: f64, xni: f64, atime: f64) -> (f64, f64, f64) {
        let xldot = xni + self.xfact;
        match self.resonance {
            Resonance::Synchronous(s) => {
                let xndt = s.del1 * (xli - FASX2).sin()
                    + s.del2 * (2.0 * (xli - FASX4)).sin()
                    + s.del3 * (3.0 * (xli - FASX6)).sin();
                let xnddt = s.del1 * (xli - FASX2).cos()
                    + 2.0 * s.del2 * (2.0 * (xli - FASX4)).cos()
                    + 3.0 * s.del3 * (3.0 * (xli - FASX6)).cos();
                (xndt, xldot, xnddt * xldot)
            }
            Resonance::HalfDay(h) => {
                let xomi = self.argpo + self.argpdot * atime;
                let x2omi = xomi + xomi;
                let x2li = xli + xli;
                let xndt = h.d2201 * (x2omi + xli - G22).sin()
                    + h.d2211 * (xli - G22).sin()
                    + h.d3210 * (xomi + xli - G32).sin()
                    + h.d3222 * (-xomi + xli - G32).sin()
                    + h.d4410 * (x2omi + x2li - G44).sin()
                    + h.d4422 * (x2li - G44).sin()
                    + h.d5220 * (xomi + xli - G52).sin()
                    + h.d5232 * (-xomi + xli - G52).sin()
                    + h.d5421 * (xomi + x2li - G54).sin()
                    + h.d5433 * (-xomi + x2li - G54).sin();
                let xnddt = h.d2201 * (x2omi + xli - G22).cos()
                    + h.d2211 * (xli - G22).cos()
                    + h.d3210 * (xomi + xli - G32).cos()
                    + h.d3222 * (-xomi + xli - G32).cos()
                    + h.d5220 * (xomi + xli - G52).cos()
                    + h.d5232 * (-xomi + xli - G52).cos()
                    + 2.0
                        * (h.d4410 * (x2omi + x2li - G44).cos()
                            + h.d4422 * (x2li - G44).cos()
                            + h.d5421 * (xomi + x2li - G54).cos()
                            + h.d5433 * (-xomi + x2li - G54).cos());
                (xndt, xldot, xnddt * xldot)
            }
            Resonance::None => (0.0, xldot, 0.0),
        }
    }
}

impl HalfDay {
    fn new(no: f64, em: f64, sinim: f64, cosim: f64, aonv: f64) -> Self {
        let emsq = em * em;
        let eoc = em * emsq;
        let cosisq = cosim * cosim;

        let g201 = -0.306 - (em - 0.64) * 0.440;
        let (g211, g310, g322, g410, g422, g520) = if em <= 0.65 {
            (
                3.616 - 13.2470 * em + 16.2900 * emsq,
                -19.302 + 117.3900 * em - 228.4190 * emsq + 156.5910 * eoc,
                -18.9068 + 109.7927 * em - 214.6334 * emsq + 146.5816 * eoc,
                -41.122 + 242.6940 * em - 471.0940 * emsq + 313.9530 * eoc,
                -146.407 + 841.8800 * em - 1629.014 * emsq + 1083.4350 * eoc,
                -532.114 + 3017.977 * em - 5740.032 * emsq + 3708.2760 * eoc,
            )
        } else {
            let g520 = if em > 0.715 {
                -5149.66 + 29936.92 * em - 54087.36 * emsq + 31324.56 * eoc
            } else {
                1464.74 - 4664.75 * em + 3763.64 * emsq
            };
            (
                -72.099 + 331.819 * em - 508.738 * emsq + 266.724 * eoc,
                -346.844 + 1582.851 * em - 2415.925 * emsq + 1246.113 * eoc,
                -342.585 + 1554.908 * em - 2366.899 * emsq + 1215.972 * eoc,
                -1052.797 + 4758.686 * em - 7193.992 * emsq + 3651.957 * eoc,
                -3581.690 + 16178.110 * em - 24462.770 * emsq + 12422.520 * eoc,
                g520,
            )
        };
        let (g533, g521, g532) = if em < 0.7 {
            (
                -919.22770 + 4988.61 * em - 9064.77 * emsq + 5542.21 * eoc,
                -822.71072 + 4568.6173 * em - 8491.4146 * emsq + 5337.524 * eoc,
                -853.66600 + 4690.25 * em - 8624.77 * emsq + 5341.4 * eoc,
            )
        } else {
            (
                -37995.78 + 161616.52 * em - 229838.2 * emsq + 109377.94 * eoc,
                -51752.104 + 218913.95 * em - 309468.16 * emsq + 146349.42 * eoc,
                -40023.88 + 170470.89 * em - 242699.48 * emsq + 115605.82 * eoc,
            )
        };

        let sini2 = sinim * sinim;
        let f220 = 0.75 * (1.0 + 2.0 * cosim + cosisq);
        let f221 = 1.5 * sini2;
        let f321 = 1.875 * sinim * (1.0 - 2.0 * cosim - 3.0 * cosisq);
        let f322 = -1.875 * sinim * (1.0 + 2.0 * cosim - 3.0 * cosisq);
        let f441 = 35.0 * sini2 * f220;
        let f442 = 39.375 * sini2 * sini2;
        let f522 = 9.84375
            * sinim
            * (sini2 * (1.0 - 2.0 * cosim - 5.0 * cosisq)
                + 1.0 / 3.0 * (-2.0 + 4.0 * cosim + 6.0 * cosisq));
        let f523 = sinim
            * (4.921_875_12 * sini2 * (-2.0 - 4.0 * cosim + 10.0 * cosisq)
                + 6.562_500_12 * (1.0 + 2.0 * cosim - 3.0 * cosisq));
        let f542 = 29.53125
            * sinim
            * (2.0 - 8.0 * cosim + cosisq * (-12.0 + 8.0 * cosim + 10.0 * cosisq));
        let f543 = 29.53125
            * sinim
            * (-2.0 - 8.0 * cosim + cosisq * (12.0 + 8.0 * cosim - 10.0 * cosisq));

        let mut temp1 = 3.0 * no * no * aonv * aonv;
        let d22 = temp1 * ROOT22;
        temp1 *= aonv;
        let d32 = temp1 * ROOT32;
        temp1 *= aonv;
        let d44 = 2.0 * temp1 * ROOT44;
        temp1 *= aonv;
        let d52 = temp1 * ROOT52;
        let d54 = 2.0 * temp1 * ROOT54;

        HalfDay {
            d2201: d22 * f220 * g201,
            d2211: d22 * f221 * g211,
            d3210: d32 * f321 * g310,
            d3222: d32 * f322 * g322,
            d4410: d44 * f441 * g410,
            d4422: d44 * f442 * g422,
            d5220: d52 * f522 * g520,
            d5232: d52 * f523 * g532,
            d5421: d54 * f542 * g521,
            d5433: d54 * f543 * g533,
        }
    }
}

//! Easing functions for tweens
//!
//! Two forms are exposed: [`Easing::apply`] maps normalized progress, and
//! [`Easing::ease`] is the stateless four-argument form
//! `f(elapsed, start, delta, duration)` the tween evaluator uses.

use crate::error::AnimationError;
use regex::Regex;
use std::f64::consts::PI;
use std::str::FromStr;
use std::sync::OnceLock;

/// Easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
    /// Jump between `n` discrete levels
    Steps(u32),
    CubicBezier(f64, f64, f64, f64),
}

impl Easing {
    /// Map linear progress in `[0, 1]` onto this curve
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInQuint => t.powi(5),
            Easing::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::EaseInOutQuint => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::EaseInExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Easing::EaseOutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Easing::EaseInOutExpo => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Easing::EaseInCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Easing::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Easing::EaseInBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Easing::EaseOutBack => {
                1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2)
            }
            Easing::EaseInOutBack => {
                let c2 = BACK_C1 * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((c2 + 1.0) * 2.0 * t - c2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((c2 + 1.0) * (t * 2.0 - 2.0) + c2) + 2.0) / 2.0
                }
            }
            Easing::EaseInElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c4 = (2.0 * PI) / 3.0;
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
                }
            }
            Easing::EaseOutElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c4 = (2.0 * PI) / 3.0;
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
                }
            }
            Easing::EaseInOutElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c5 = (2.0 * PI) / 4.5;
                    let wave = ((20.0 * t - 11.125) * c5).sin();
                    if t < 0.5 {
                        -(2f64.powf(20.0 * t - 10.0) * wave) / 2.0
                    } else {
                        (2f64.powf(-20.0 * t + 10.0) * wave) / 2.0 + 1.0
                    }
                }
            }
            Easing::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Easing::EaseOutBounce => bounce_out(t),
            Easing::EaseInOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::Steps(steps) => {
                if t >= 1.0 || *steps == 0 {
                    1.0
                } else {
                    let n = *steps as f64;
                    (t.max(0.0) * n).floor() / n
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }

    /// Four-argument form: value at `elapsed` of a curve moving from `start`
    /// by `delta` over `duration`
    ///
    /// A non-positive duration lands on `start + delta` immediately.
    pub fn ease(&self, elapsed: f64, start: f64, delta: f64, duration: f64) -> f64 {
        if duration <= 0.0 {
            return start + delta;
        }
        start + delta * self.apply(elapsed / duration)
    }
}

const BACK_C1: f64 = 1.70158;
const BACK_C3: f64 = BACK_C1 + 1.0;

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Progress on the curve through (0,0), (x1,y1), (x2,y2), (1,1) at time `t`
///
/// Finds the curve parameter whose x equals `t`, then returns its y.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let param = solve_curve_x(t, x1, x2);
    curve_axis(param, y1, y2)
}

const CURVE_EPSILON: f64 = 1e-7;

fn solve_curve_x(x: f64, x1: f64, x2: f64) -> f64 {
    // Newton steps converge fast on well-behaved control points
    let mut guess = x;
    for _ in 0..8 {
        let offset = curve_axis(guess, x1, x2) - x;
        if offset.abs() < CURVE_EPSILON {
            return guess;
        }
        let slope = curve_axis_slope(guess, x1, x2);
        if slope.abs() < CURVE_EPSILON {
            break;
        }
        guess -= offset / slope;
    }

    // Flat slope: bisect, x is monotonic in the parameter on [0, 1]
    let (mut low, mut high) = (0.0_f64, 1.0_f64);
    let mut mid = x;
    for _ in 0..20 {
        let value = curve_axis(mid, x1, x2);
        if (value - x).abs() < CURVE_EPSILON {
            break;
        }
        if value < x {
            low = mid;
        } else {
            high = mid;
        }
        mid = (low + high) * 0.5;
    }
    mid
}

/// One axis of the curve, in Horner form
#[inline]
fn curve_axis(p: f64, c1: f64, c2: f64) -> f64 {
    let a = 1.0 + 3.0 * (c1 - c2);
    let b = 3.0 * c2 - 6.0 * c1;
    let c = 3.0 * c1;
    ((a * p + b) * p + c) * p
}

#[inline]
fn curve_axis_slope(p: f64, c1: f64, c2: f64) -> f64 {
    let a = 1.0 + 3.0 * (c1 - c2);
    let b = 3.0 * c2 - 6.0 * c1;
    let c = 3.0 * c1;
    (3.0 * a * p + 2.0 * b) * p + c
}

fn parametric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(cubicbezier|steps)\(([^)]*)\)$").expect("easing pattern is valid")
    })
}

impl FromStr for Easing {
    type Err = AnimationError;

    /// Parse an easing name
    ///
    /// Names are matched case-insensitively with `-`/`_` ignored, so
    /// `easeInOutQuad`, `ease-in-out-quad` and `ease_in_out_quad` agree.
    /// `cubicBezier(x1, y1, x2, y2)` and `steps(n)` take arguments.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let unknown = || AnimationError::UnknownEasing(name.to_string());

        if let Some(caps) = parametric_pattern().captures(&key) {
            let args: Vec<f64> = caps[2]
                .split(',')
                .map(|arg| arg.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|_| unknown())?;
            return match (&caps[1], args.as_slice()) {
                ("cubicbezier", [x1, y1, x2, y2]) => Ok(Easing::CubicBezier(*x1, *y1, *x2, *y2)),
                ("steps", [n]) if *n >= 1.0 => Ok(Easing::Steps(*n as u32)),
                _ => Err(unknown()),
            };
        }

        let easing = match key.as_str() {
            "linear" => Easing::Linear,
            "easein" => Easing::EaseIn,
            "easeout" => Easing::EaseOut,
            "easeinout" => Easing::EaseInOut,
            "easeinquad" => Easing::EaseInQuad,
            "easeoutquad" => Easing::EaseOutQuad,
            "easeinoutquad" => Easing::EaseInOutQuad,
            "easeincubic" => Easing::EaseInCubic,
            "easeoutcubic" => Easing::EaseOutCubic,
            "easeinoutcubic" => Easing::EaseInOutCubic,
            "easeinquart" => Easing::EaseInQuart,
            "easeoutquart" => Easing::EaseOutQuart,
            "easeinoutquart" => Easing::EaseInOutQuart,
            "easeinquint" => Easing::EaseInQuint,
            "easeoutquint" => Easing::EaseOutQuint,
            "easeinoutquint" => Easing::EaseInOutQuint,
            "easeinsine" => Easing::EaseInSine,
            "easeoutsine" => Easing::EaseOutSine,
            "easeinoutsine" => Easing::EaseInOutSine,
            "easeinexpo" => Easing::EaseInExpo,
            "easeoutexpo" => Easing::EaseOutExpo,
            "easeinoutexpo" => Easing::EaseInOutExpo,
            "easeincirc" => Easing::EaseInCirc,
            "easeoutcirc" => Easing::EaseOutCirc,
            "easeinoutcirc" => Easing::EaseInOutCirc,
            "easeinback" => Easing::EaseInBack,
            "easeoutback" => Easing::EaseOutBack,
            "easeinoutback" => Easing::EaseInOutBack,
            "easeinelastic" => Easing::EaseInElastic,
            "easeoutelastic" => Easing::EaseOutElastic,
            "easeinoutelastic" => Easing::EaseInOutElastic,
            "easeinbounce" => Easing::EaseInBounce,
            "easeoutbounce" => Easing::EaseOutBounce,
            "easeinoutbounce" => Easing::EaseInOutBounce,
            _ => return Err(unknown()),
        };
        Ok(easing)
    }
}

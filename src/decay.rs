use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f64) -> f64;
}

fn validate(rate: f64, vi: f64, vf: f64) -> Result<()> {
    ((rate >= 0.0 && vi >= vf) || (rate < 0.0 && vi <= vf))
        .then_some(())
        .ok_or_else(|| Error::invalid_configuration("`vi - vf` must have same sign as `rate`"))
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f64) -> f64 {
        self.value
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exponential {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Exponential {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) / (1 + rt)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InverseTime {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl InverseTime {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for InverseTime {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) / (1.0 + rate * t)
    }
}

/// v(t) = max(v<sub>i</sub> - rt, v<sub>f</sub>)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    rate: f64,
    vi: f64,
    vf: f64,
}

impl Linear {
    pub fn new(rate: f64, vi: f64, vf: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Linear {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf } = self;
        (vi - rate * t).max(vf)
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>floor(t/s)</sup>, v<sub>f</sub>)
///
/// With `r < 1` and `s = 1` this is the usual per-episode multiplicative epsilon decay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    rate: f64,
    vi: f64,
    vf: f64,
    step: f64,
}

impl Step {
    pub fn new(rate: f64, vi: f64, vf: f64, step: f64) -> Result<Self> {
        validate(rate, vi, vf)?;
        if step <= 0.0 {
            return Err(Error::invalid_configuration("`step` must be positive"));
        }
        Ok(Self { rate, vi, vf, step })
    }
}

impl Decay for Step {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf, step } = self;
        (vi * rate.powf((t / step).floor())).max(vf)
    }
}

/// A decay strategy chosen at configuration time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    Constant(Constant),
    Exponential(Exponential),
    InverseTime(InverseTime),
    Linear(Linear),
    Step(Step),
}

impl Schedule {
    /// Check the schedule's parameters, e.g. after deserializing it
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Constant(_) => Ok(()),
            Self::Exponential(Exponential { rate, vi, vf })
            | Self::InverseTime(InverseTime { rate, vi, vf })
            | Self::Linear(Linear { rate, vi, vf }) => validate(*rate, *vi, *vf),
            Self::Step(Step { rate, vi, vf, step }) => {
                Step::new(*rate, *vi, *vf, *step).map(|_| ())
            }
        }
    }

    /// Value at `t = 0`
    pub fn initial(&self) -> f64 {
        self.evaluate(0.0)
    }

    /// The bounds `(start, end)` the schedule moves between
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Constant(Constant { value }) => (*value, *value),
            Self::Exponential(Exponential { vi, vf, .. })
            | Self::InverseTime(InverseTime { vi, vf, .. })
            | Self::Linear(Linear { vi, vf, .. })
            | Self::Step(Step { vi, vf, .. }) => (*vi, *vf),
        }
    }
}

impl Default for Schedule {
    /// 0.1 decaying by a factor of 0.995 per episode down to 0.01
    fn default() -> Self {
        Self::Step(Step {
            rate: 0.995,
            vi: 0.1,
            vf: 0.01,
            step: 1.0,
        })
    }
}

impl Decay for Schedule {
    fn evaluate(&self, t: f64) -> f64 {
        match self {
            Self::Constant(d) => d.evaluate(t),
            Self::Exponential(d) => d.evaluate(t),
            Self::InverseTime(d) => d.evaluate(t),
            Self::Linear(d) => d.evaluate(t),
            Self::Step(d) => d.evaluate(t),
        }
    }
}

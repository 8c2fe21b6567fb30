use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::shared::error::VideoError;

/// Decimal places kept when a frame rate is given as a float.
const FLOAT_PRECISION: u32 = 1000;

/// Positive rational frame rate, e.g. `30000/1001`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "f64")]
pub struct FrameRate {
    num: u32,
    den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Result<Self, VideoError> {
        if num == 0 || den == 0 {
            return Err(VideoError::config(format!(
                "frame rate must be positive, got {num}/{den}"
            )));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn from_f64(fps: f64) -> Result<Self, VideoError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(VideoError::config(format!(
                "frame rate must be positive, got {fps}"
            )));
        }
        let scaled = (fps * FLOAT_PRECISION as f64).round();
        if scaled < 1.0 || scaled > u32::MAX as f64 {
            return Err(VideoError::config(format!("frame rate {fps} is out of range")));
        }
        Self::new(scaled as u32, FLOAT_PRECISION)
    }

    /// Parses ffprobe's `avg_frame_rate`; `0/0` means the rate is unknown.
    pub fn parse_probe(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    pub fn numerator(&self) -> u32 {
        self.num
    }

    pub fn denominator(&self) -> u32 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VideoError::config(format!("invalid frame rate '{s}'"));
        if let Some((num, den)) = s.split_once('/') {
            let num = num.trim().parse::<u32>().map_err(|_| invalid())?;
            let den = den.trim().parse::<u32>().map_err(|_| invalid())?;
            return Self::new(num, den);
        }
        if let Ok(whole) = s.parse::<u32>() {
            return Self::new(whole, 1);
        }
        Self::from_f64(s.parse::<f64>().map_err(|_| invalid())?)
    }
}

impl From<FrameRate> for f64 {
    fn from(rate: FrameRate) -> Self {
        rate.as_f64()
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

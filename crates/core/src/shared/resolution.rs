use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::shared::error::VideoError;

/// Frame size in pixels, `width x height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rejects zero-sized resolutions.
    pub fn validate(self) -> Result<Self, VideoError> {
        if self.width == 0 || self.height == 0 {
            return Err(VideoError::config(format!(
                "resolution must be positive, got {self}"
            )));
        }
        Ok(self)
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// ndarray shape `(height, width)`.
    pub fn shape(self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    pub fn from_shape(height: usize, width: usize) -> Result<Self, VideoError> {
        let width = u32::try_from(width)
            .map_err(|_| VideoError::config(format!("frame width {width} is too large")))?;
        let height = u32::try_from(height)
            .map_err(|_| VideoError::config(format!("frame height {height} is too large")))?;
        Ok(Self { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = VideoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| VideoError::config(format!("expected WIDTHxHEIGHT, got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| VideoError::config(format!("invalid resolution '{s}'")))
        };
        Resolution::new(parse(w)?, parse(h)?).validate()
    }
}

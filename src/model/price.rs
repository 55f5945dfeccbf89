use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open price interval `[min, max)`
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Create a new range
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a uniformly distributed price from the range
    #[inline]
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..self.max)
    }

    /// Check whether `price` lies inside the range
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price < self.max
    }

    /// Width of the range
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Validate range bounds
    pub fn validate(&self) -> crate::Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(crate::Error::Config(
                "Price range bounds must be finite".to_string(),
            ));
        }

        if !self.width().is_finite() {
            return Err(crate::Error::Config(format!(
                "Price range is too wide to sample: [{}, {})",
                self.min, self.max
            )));
        }

        if self.min >= self.max {
            return Err(crate::Error::Config(format!(
                "Price range is empty: [{}, {})",
                self.min, self.max
            )));
        }

        Ok(())
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::new(50.0, 150.0)
    }
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2})", self.min, self.max)
    }
}

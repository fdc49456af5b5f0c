//! Power noise reduction.
//!
//! A short center-weighted moving average knocks down single-sample spikes
//! from multipath and fading while keeping the trend used for peak detection.

use crate::error::{Error, Result};

/// Default smoothing kernel (1:3:1), normalized before use.
pub const DEFAULT_KERNEL: [f64; 3] = [2.0, 6.0, 2.0];

/// Convolution filter over power sequences.
///
/// Both ends are padded by repeating the boundary sample, so the output has
/// the same length as the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerFilter {
    /// Normalized taps, summing to 1.
    kernel: Vec<f64>,
}

impl PowerFilter {
    /// Build a filter from raw tap weights. The kernel must have odd length
    /// and a non-zero sum.
    pub fn with_kernel(weights: &[f64]) -> Result<Self> {
        if weights.is_empty() || weights.len() % 2 == 0 {
            return Err(Error::InvalidKernel(format!(
                "kernel length must be odd, got {}",
                weights.len()
            )));
        }
        let sum: f64 = weights.iter().sum();
        if sum == 0.0 || !sum.is_finite() {
            return Err(Error::InvalidKernel(format!("kernel sum must be non-zero, got {}", sum)));
        }

        Ok(Self {
            kernel: weights.iter().map(|w| w / sum).collect(),
        })
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Smooth `readings`, returning one filtered value per reading.
    pub fn smooth<T>(&self, readings: &[T]) -> Result<Vec<f64>>
    where
        T: Copy + Into<f64>,
    {
        let (first, last) = match (readings.first(), readings.last()) {
            (Some(&first), Some(&last)) => (first.into(), last.into()),
            _ => return Err(Error::EmptyInput),
        };

        let half = self.kernel.len() / 2;
        let padded: Vec<f64> = std::iter::repeat(first)
            .take(half)
            .chain(readings.iter().map(|&r| r.into()))
            .chain(std::iter::repeat(last).take(half))
            .collect();

        // Convolution flips the kernel; only visible for asymmetric kernels.
        Ok(padded
            .windows(self.kernel.len())
            .map(|window| {
                window
                    .iter()
                    .zip(self.kernel.iter().rev())
                    .map(|(x, k)| x * k)
                    .sum()
            })
            .collect())
    }
}

impl Default for PowerFilter {
    fn default() -> Self {
        let sum: f64 = DEFAULT_KERNEL.iter().sum();
        Self {
            kernel: DEFAULT_KERNEL.iter().map(|w| w / sum).collect(),
        }
    }
}

/// Smooth power readings with the default kernel.
pub fn smooth(readings: &[i32]) -> Result<Vec<f64>> {
    PowerFilter::default().smooth(readings)
}

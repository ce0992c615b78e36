//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

/// A half-open interval `[min, max)` on a number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval overlaps with the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max > other.min && other.max > self.min
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// Exponential moving average with a fixed smoothing factor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MovingAverage {
    value: Option<f64>,
    alpha: f64,
}

impl MovingAverage {
    pub const fn new(alpha: f64) -> Self {
        Self { value: None, alpha }
    }

    /// Folds a sample into the average and returns the new value.
    pub fn update(&mut self, sample: f64) -> f64 {
        let value = match self.value {
            Some(value) => (1.0 - self.alpha) * value + self.alpha * sample,
            None => sample,
        };
        self.value = Some(value);
        value
    }
}

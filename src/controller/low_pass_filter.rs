// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains functions for filtering signals with a low-pass filter.

use std::f64::consts::PI;

use crate::utils::CartesianVector;

/// Maximum cutoff frequency: 1000 Hz. Filtering is disabled at this frequency.
pub static MAX_CUTOFF_FREQUENCY: f64 = 1000.0;
/// Suggested cutoff frequency for the Cartesian velocity estimate: 100 Hz
pub static DEFAULT_CUTOFF_FREQUENCY: f64 = 100.0;

/// checks if the cutoff frequency can be used with [`low_pass_filter`](`low_pass_filter`)
pub fn is_valid_cutoff_frequency(cutoff_frequency: f64) -> bool {
    cutoff_frequency.is_finite() && cutoff_frequency > 0. && cutoff_frequency <= MAX_CUTOFF_FREQUENCY
}

/// Applies a first-order low-pass filter
///
/// # Arguments
/// * `sample_time` - Sample time constant
/// * `y` - Current value of the signal to be filtered
/// * `y_last` - Value of the signal to be filtered in the previous time step
/// * `cutoff_frequency` - Cutoff frequency of the low-pass filter
/// # Return
/// Filtered value. For a non-positive sample time `y_last` is returned unchanged.
pub fn low_pass_filter(sample_time: f64, y: f64, y_last: f64, cutoff_frequency: f64) -> f64 {
    debug_assert!(is_valid_cutoff_frequency(cutoff_frequency));
    if !(sample_time > 0.) {
        return y_last;
    }
    let gain = sample_time / (sample_time + (1.0 / (2.0 * PI * cutoff_frequency)));
    gain * y + (1. - gain) * y_last
}

/// Applies [`low_pass_filter`](`low_pass_filter`) to each component of a Cartesian vector.
pub fn cartesian_low_pass_filter(
    sample_time: f64,
    y: &CartesianVector,
    y_last: &CartesianVector,
    cutoff_frequency: f64,
) -> CartesianVector {
    y.zip_map(y_last, |y, y_last| {
        low_pass_filter(sample_time, y, y_last, cutoff_frequency)
    })
}

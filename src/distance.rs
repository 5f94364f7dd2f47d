//! Euclidean distance between f32 vectors.
//!
//! With the `simsimd` feature the SIMD kernels from that crate are used, otherwise a scalar
//! loop accumulating in f64.

/// Squared l2 distance between `q` and `d`.
///
/// Inputs must be the same length or this function may panic.
#[cfg(feature = "simsimd")]
#[inline(always)]
pub fn l2sq_f32(q: &[f32], d: &[f32]) -> f64 {
    simsimd::SpatialSimilarity::l2sq(q, d).expect("same dimensions")
}

/// Squared l2 distance between `q` and `d`.
///
/// Inputs must be the same length or this function may panic.
#[cfg(not(feature = "simsimd"))]
#[inline(always)]
pub fn l2sq_f32(q: &[f32], d: &[f32]) -> f64 {
    assert_eq!(q.len(), d.len());
    q.iter()
        .zip(d.iter())
        .map(|(q, d)| {
            let diff = *q as f64 - *d as f64;
            diff * diff
        })
        .sum()
}

/// Euclidean distance between `q` and `d`.
#[inline(always)]
pub fn l2(q: &[f32], d: &[f32]) -> f64 {
    l2sq_f32(q, d).sqrt()
}

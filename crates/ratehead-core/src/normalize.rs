//! L2 normalisation shared between training and serving.
//!
//! The serving normaliser applies the same policy: compute the norm in f64,
//! leave zero or non-finite norms untouched, otherwise divide and narrow to
//! f32. Changing either side alone skews the exported head.

/// Euclidean norm computed in double precision.
pub fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Scale `values` to unit L2 norm, narrowing to f32.
///
/// A zero, NaN or infinite norm passes the input through unchanged.
#[allow(clippy::cast_possible_truncation)]
pub fn normalize_embedding(values: &[f64]) -> Vec<f32> {
    let norm = l2_norm(values);
    if !norm.is_finite() || norm == 0.0 {
        return values.iter().map(|&v| v as f32).collect();
    }
    values.iter().map(|&v| (v / norm) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm32(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

    #[test]
    fn unit_norm_for_finite_nonzero() {
        for input in [vec![3.0, 4.0], vec![1e-8, -2e-8, 5e-9], vec![1e6; 768], vec![-0.5]] {
            let out = normalize_embedding(&input);
            assert_eq!(out.len(), input.len());
            assert!((norm32(&out) - 1.0).abs() <= 1e-5, "norm={}", norm32(&out));
        }
        assert_eq!(normalize_embedding(&[3.0, 4.0]), vec![0.6f32, 0.8f32]);
    }

    #[test]
    fn zero_vector_passes_through() {
        assert_eq!(normalize_embedding(&[0.0, 0.0, 0.0]), vec![0.0f32; 3]);
        assert!(normalize_embedding(&[]).is_empty());
    }

    #[test]
    fn non_finite_vector_passes_through() {
        let out = normalize_embedding(&[1.0, f64::NAN, 2.0]);
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 2.0);

        let out = normalize_embedding(&[f64::INFINITY, 1.0]);
        assert_eq!(out, vec![f32::INFINITY, 1.0]);
    }

    #[test]
    fn overflowing_norm_passes_through() {
        // Squares overflow to infinity even though every element is finite.
        let out = normalize_embedding(&[1e200, 1e200]);
        assert_eq!(out, vec![f32::INFINITY, f32::INFINITY]);
    }
}

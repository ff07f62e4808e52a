use ndarray::Array1;

/// Scales a sparse row in place to unit L2 norm. All-zero rows are left untouched.
pub(crate) fn normalize_sparse(values: &mut [f64]) {
    let norm: f64 = values.iter().map(|&x| x * x).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Numerically stable softmax.
pub(crate) fn softmax(scores: &Array1<f64>) -> Array1<f64> {
    if scores.is_empty() {
        return Array1::zeros(0);
    }
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp = scores.mapv(|s| (s - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// `ln(Σ exp(x))` without overflow.
pub(crate) fn log_sum_exp(scores: &[f64]) -> f64 {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + scores.iter().map(|&s| (s - max).exp()).sum::<f64>().ln()
}

/// Index of the largest value; the first one wins on ties.
pub(crate) fn argmax(values: &Array1<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&array![1000.0, 1000.0, 999.0]);
        assert!((p.sum() - 1.0).abs() < 1e-12);
        assert!(p[0] > p[2]);
        assert!((p[0] - p[1]).abs() < 1e-12);
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&array![0.2, 0.5, 0.5]), Some(1));
        assert_eq!(argmax(&Array1::<f64>::zeros(0)), None);
    }

    #[test]
    fn test_log_sum_exp() {
        let v = [0.0_f64, 0.0];
        assert!((log_sum_exp(&v) - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_sparse() {
        let mut v = vec![3.0, 4.0];
        normalize_sparse(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12);
        let mut zeros = vec![0.0, 0.0];
        normalize_sparse(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }
}

//! Binary linear SVM (L2-regularized, hinge loss) solved in the dual by
//! coordinate descent, as in Hsieh et al. (2008). The bias is learned as the
//! weight of an implicit constant feature equal to 1.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::nlp::SparseVector;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SvmParams {
    /// Penalty for margin violations.
    pub c: f64,
    /// Stop when the projected-gradient spread falls below this.
    pub tolerance: f64,
    pub max_iter: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            tolerance: 1e-3,
            max_iter: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearSvm {
    /// Fits on `samples` with `targets[i] == true` as the positive class.
    pub fn fit(
        samples: &[SparseVector],
        targets: &[bool],
        n_features: usize,
        params: &SvmParams,
        rng: &mut StdRng,
    ) -> Self {
        let n = samples.len();
        let y: Vec<f64> = targets.iter().map(|&t| if t { 1.0 } else { -1.0 }).collect();
        let q_diag: Vec<f64> = samples.iter().map(|x| x.squared_norm() + 1.0).collect();

        let mut alpha = vec![0.0; n];
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        let mut order: Vec<usize> = (0..n).collect();

        for iter in 0..params.max_iter {
            order.shuffle(rng);
            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            for &i in &order {
                let x = &samples[i];
                let g = y[i] * (x.dot(&weights) + bias) - 1.0;

                let pg = if alpha[i] == 0.0 {
                    g.min(0.0)
                } else if alpha[i] == params.c {
                    g.max(0.0)
                } else {
                    g
                };
                pg_max = pg_max.max(pg);
                pg_min = pg_min.min(pg);

                if pg.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - g / q_diag[i]).clamp(0.0, params.c);
                    let step = (alpha[i] - old) * y[i];
                    x.add_to(&mut weights, step);
                    bias += step;
                }
            }

            if pg_max - pg_min <= params.tolerance {
                tracing::debug!(iterations = iter + 1, "linear SVM converged");
                break;
            }
        }

        Self { weights, bias }
    }

    /// Signed distance-like score; positive means the positive class.
    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        x.dot(&self.weights) + self.bias
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }
}

//! Platt scaling: maps SVM decision values to probabilities through
//! `P(y = 1 | f) = 1 / (1 + exp(a * f + b))`, fitted by Newton's method with
//! backtracking on prior-corrected targets (Lin, Lin & Weng, 2007).

use serde::{Deserialize, Serialize};

const MAX_ITER: usize = 100;
const MIN_STEP: f64 = 1e-10;
const SIGMA: f64 = 1e-12;
const EPS: f64 = 1e-5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlattScaling {
    a: f64,
    b: f64,
}

impl PlattScaling {
    pub fn fit(decisions: &[f64], labels: &[bool]) -> Self {
        let prior1 = labels.iter().filter(|&&l| l).count() as f64;
        let prior0 = labels.len() as f64 - prior1;

        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let t: Vec<f64> = labels
            .iter()
            .map(|&l| if l { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(decisions, &t, a, b);

        for _ in 0..MAX_ITER {
            let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);

            for (&f, &ti) in decisions.iter().zip(&t) {
                let f_apb = f * a + b;
                let (p, q) = if f_apb >= 0.0 {
                    let e = (-f_apb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_apb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = ti - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < EPS && g2.abs() < EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(decisions, &t, new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < MIN_STEP {
                tracing::debug!("Platt scaling line search failed");
                break;
            }
        }

        Self { a, b }
    }

    /// Probability of the positive class for a decision value.
    pub fn probability(&self, decision: f64) -> f64 {
        let f_apb = decision * self.a + self.b;
        if f_apb >= 0.0 {
            let e = (-f_apb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_apb.exp())
        }
    }
}

fn objective(decisions: &[f64], t: &[f64], a: f64, b: f64) -> f64 {
    decisions
        .iter()
        .zip(t)
        .map(|(&f, &ti)| {
            let f_apb = f * a + b;
            if f_apb >= 0.0 {
                ti * f_apb + (1.0 + (-f_apb).exp()).ln()
            } else {
                (ti - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_increases_with_decision_value() {
        let decisions = [-2.0, -1.5, -1.0, -0.2, 0.3, 1.0, 1.4, 2.0];
        let labels = [false, false, false, true, false, true, true, true];
        let platt = PlattScaling::fit(&decisions, &labels);

        assert!(platt.a < 0.0);
        assert!(platt.probability(2.0) > 0.5);
        assert!(platt.probability(-2.0) < 0.5);
        assert!(platt.probability(1.0) > platt.probability(0.0));
    }

    #[test]
    fn test_probability_stays_in_unit_interval() {
        let platt = PlattScaling::fit(&[-1.0, 1.0], &[false, true]);
        for f in [-1e6, -10.0, 0.0, 10.0, 1e6] {
            let p = platt.probability(f);
            assert!((0.0..=1.0).contains(&p), "p({f}) = {p}");
        }
    }
}

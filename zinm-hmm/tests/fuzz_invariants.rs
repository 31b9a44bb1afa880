#![allow(missing_docs)]

//! Randomized sweeps over the testable properties of `SPEC_FULL.md` §8: row stochasticity,
//! log-likelihood monotonicity, Viterbi path length, and NA propagation, across many small
//! synthetic fits. Uses a fixed-seed `Pcg64` so failures are reproducible.

use float_cmp::approx_eq;
use ndarray::Array2;
use rand::Rng;
use rand_pcg::Pcg64;
use zinm_hmm::{viterbi, EmissionModel, HmmParams, Observations, TrainerConfig};

fn random_row_stochastic(rng: &mut Pcg64, rows: usize, cols: usize) -> Array2<f64> {
    let mut m = Array2::<f64>::zeros((rows, cols));
    for mut row in m.rows_mut() {
        for value in row.iter_mut() {
            *value = rng.gen_range(0.1..1.0);
        }
        let sum: f64 = row.sum();
        row.mapv_inplace(|value| value / sum);
    }
    m
}

fn random_counts(rng: &mut Pcg64, n: usize, cols: usize) -> Array2<i64> {
    let mut data = Array2::<i64>::zeros((n, cols));
    for mut row in data.rows_mut() {
        if rng.gen_bool(0.1) {
            row.fill(-1);
        } else if rng.gen_bool(0.2) {
            row.fill(0);
        } else {
            for value in row.iter_mut() {
                *value = rng.gen_range(0..6);
            }
        }
    }
    data
}

#[test]
fn randomized_fits_preserve_row_stochasticity_and_finite_loglik() {
    let mut rng = Pcg64::new(0xcafe_f00d_dead_beef, 0xa02_bdbf_7bb3_c0a7);

    for trial in 0..20 {
        let m = 2 + (trial % 2);
        let r = 1 + (trial % 2);
        let n = 12 + trial;

        let data = random_counts(&mut rng, n, r + 1);
        let obs = Observations::new(data, vec![n]).unwrap();

        let q = random_row_stochastic(&mut rng, m, m);
        let init = random_row_stochastic(&mut rng, 1, m).row(0).to_owned();
        let params = HmmParams::new(q, init);
        let Ok(mut params) = params else { continue };

        let p = random_row_stochastic(&mut rng, m, r + 1);
        let mut model = EmissionModel::ZeroInflated { a: 1.5, pi: 0.6, p };

        let config = TrainerConfig {
            max_iter: 3,
            ..TrainerConfig::default()
        };

        let Ok(output) = zinm_hmm::trainer::fit(&obs, &mut params, &mut model, &config) else {
            continue;
        };

        assert!(output.loglik.is_finite() || output.loglik == 0.0);

        for row in params.q().rows() {
            assert!(approx_eq!(f64, row.sum(), 1.0, epsilon = 1e-6));
        }

        if let EmissionModel::ZeroInflated { p, .. } = &model {
            for row in p.rows() {
                assert!(approx_eq!(f64, row.sum(), 1.0, epsilon = 1e-6));
            }
        }

        let path = viterbi::viterbi(&params, obs.block_sizes(), output.pem.view()).unwrap();
        assert_eq!(path.len(), obs.n());
    }
}

#[test]
fn more_iterations_never_decrease_log_likelihood_by_more_than_noise() {
    let mut rng = Pcg64::new(0x1234_5678_9abc_def0, 0x0fed_cba9_8765_4321);

    let data = random_counts(&mut rng, 30, 3);
    let obs = Observations::new(data, vec![30]).unwrap();

    let q = random_row_stochastic(&mut rng, 2, 2);
    let init = random_row_stochastic(&mut rng, 1, 2).row(0).to_owned();
    let p = random_row_stochastic(&mut rng, 2, 3);

    let mut params_short = HmmParams::new(q.clone(), init.clone()).unwrap();
    let mut model_short = EmissionModel::ZeroInflated { a: 2.0, pi: 0.5, p: p.clone() };
    let short = zinm_hmm::trainer::fit(
        &obs,
        &mut params_short,
        &mut model_short,
        &TrainerConfig {
            max_iter: 1,
            ..TrainerConfig::default()
        },
    );

    let mut params_long = HmmParams::new(q, init).unwrap();
    let mut model_long = EmissionModel::ZeroInflated { a: 2.0, pi: 0.5, p };
    let long = zinm_hmm::trainer::fit(
        &obs,
        &mut params_long,
        &mut model_long,
        &TrainerConfig {
            max_iter: 5,
            ..TrainerConfig::default()
        },
    );

    if let (Ok(short), Ok(long)) = (short, long) {
        assert!(long.loglik >= short.loglik - 1e-6);
    }
}

//! End-to-end: train a UBM, adapt and score speakers, persist the result.

use giztoy_gmm::{dotscore, io, EmConfig, Gmm, InitConfig, MapConfig, Order};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

const DIM: usize = 3;

const CENTERS: [[f64; DIM]; 4] = [
    [-4.0, 0.0, 1.0],
    [4.0, 0.0, -1.0],
    [0.0, 4.0, 0.0],
    [0.0, -4.0, 2.0],
];

/// Draws `n` points from an equal-weight mixture around `CENTERS`, shifted
/// by `shift` in the first dimension.
fn sample(n: usize, shift: f64, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.7).unwrap();
    let mut x = DMatrix::zeros(n, DIM);
    for i in 0..n {
        let c = &CENTERS[rng.gen_range(0..CENTERS.len())];
        for k in 0..DIM {
            x[(i, k)] = c[k] + rng.sample(noise);
        }
        x[(i, 0)] += shift;
    }
    x
}

fn train_ubm(background: &DMatrix<f64>) -> Gmm {
    let cfg = InitConfig {
        n_iter: 5,
        n_final: 10,
        ..Default::default()
    };
    Gmm::binary_split(4, background, &cfg).unwrap()
}

#[test]
fn ubm_training_improves_likelihood() {
    let background = sample(2000, 0.0, 1);
    let single = Gmm::from_data(&background).unwrap();
    let ubm = train_ubm(&background);

    assert_eq!(ubm.n(), 4);
    assert_eq!(ubm.d(), DIM);
    assert!((ubm.weights().sum() - 1.0).abs() < 1e-9);
    assert!(ubm.avll(&background).unwrap() > single.avll(&background).unwrap());
    assert!(ubm.variances().iter().all(|&v| v >= EmConfig::default().var_floor));
}

#[test]
fn em_log_likelihood_never_decreases() {
    let background = sample(1500, 0.0, 2);
    let mut gmm = Gmm::from_data(&background)
        .unwrap()
        .split(&Default::default())
        .unwrap()
        .split(&Default::default())
        .unwrap();
    let cfg = EmConfig {
        n_iter: 20,
        memory_budget: 64 * 1024,
        ..Default::default()
    };
    let history = gmm.em(&background, &cfg).unwrap();
    assert_eq!(history.len(), 20);
    for w in history.windows(2) {
        assert!(w[1] >= w[0] - 1e-9, "avll decreased: {history:?}");
    }
}

#[test]
fn stats_engine_matches_posterior_on_trained_model() {
    let background = sample(500, 0.0, 3);
    let ubm = train_ubm(&background);
    let st = ubm.stats(&background, Order::Second).unwrap();
    let (post, _) = ubm.post(&background).unwrap();

    let f = post.tr_mul(&background);
    let s = post.tr_mul(&background.component_mul(&background));
    for j in 0..ubm.n() {
        let n: f64 = post.column(j).sum();
        assert!((st.n[j] - n).abs() < 1e-8 * (1.0 + n));
        for k in 0..DIM {
            assert!((st.f[(j, k)] - f[(j, k)]).abs() < 1e-8 * (1.0 + f[(j, k)].abs()));
            let s_jk = st.s.as_ref().unwrap()[(j, k)];
            assert!((s_jk - s[(j, k)]).abs() < 1e-8 * (1.0 + s[(j, k)].abs()));
        }
    }
}

#[test]
fn speaker_verification() {
    let background = sample(2000, 0.0, 4);
    let ubm = train_ubm(&background);

    let enroll_a = sample(300, 0.8, 10);
    let test_a = sample(300, 0.8, 11);
    let test_b = sample(300, -0.8, 12);

    let cs_enroll = ubm.cstats(&enroll_a, Order::First).unwrap();
    let cs_a = ubm.cstats(&test_a, Order::First).unwrap();
    let cs_b = ubm.cstats(&test_b, Order::First).unwrap();

    let target = dotscore(&cs_enroll, &cs_a, 1.0).unwrap();
    let impostor = dotscore(&cs_enroll, &cs_b, 1.0).unwrap();
    assert!(target > impostor, "target {target} impostor {impostor}");

    // Same inputs, same score.
    let again = ubm.dotscore_data(&enroll_a, &test_a, 1.0).unwrap();
    assert_eq!(again, target);

    // The adapted model explains held-out data of its speaker better.
    let speaker = ubm.map_adapt(&enroll_a, &MapConfig::default()).unwrap();
    assert!(speaker.avll(&test_a).unwrap() > ubm.avll(&test_a).unwrap());
    assert_eq!(speaker.weights(), ubm.weights());
    assert_eq!(speaker.variances(), ubm.variances());
    assert_eq!(speaker.history().len(), ubm.history().len() + 1);
}

#[test]
fn trained_model_survives_save_and_load() {
    let background = sample(400, 0.0, 5);
    let mut ubm = train_ubm(&background);

    let dir = std::env::temp_dir().join(format!("giztoy-gmm-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("ubm.json");
    io::save(&mut ubm, &path).unwrap();
    let loaded = io::load(&path).unwrap();
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(loaded.weights(), ubm.weights());
    assert_eq!(loaded.means(), ubm.means());
    assert_eq!(loaded.variances(), ubm.variances());
    assert_eq!(loaded.history().len(), ubm.history().len());
    assert_eq!(loaded.avll(&background).unwrap(), ubm.avll(&background).unwrap());
}

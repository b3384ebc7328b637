use std::sync::Arc;

use approx_ss::params::{modulus_bound, BaseParameters, BaseParametersBuilder, SearchConfig};
use approx_ss::protocol::{RunState, Stage};
use approx_ss::sharing::{MemoryShareStore, SecretSharer, ShamirSecretSharing};
use approx_ss::{ApproxRecovery, Error, QuorumError, SimulationMode};
use fhe_math::rq::{Poly, Representation};
use num_bigint_dig::{prime::probably_prime, BigUint};
use rand::{thread_rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SMUDGING_BOUND: u64 = 16;

fn small_base() -> Arc<BaseParameters> {
    BaseParametersBuilder::new()
        .set_degree(256)
        .build_arc()
        .unwrap()
}

fn recovery(n: usize, t: usize, mode: SimulationMode) -> ApproxRecovery {
    ApproxRecovery::new(n, t, small_base(), SearchConfig::default(), mode).unwrap()
}

/// Secret, its shares in a store, and the shares themselves.
fn dealt(n: usize, t: usize) -> (Poly, MemoryShareStore, Vec<Poly>) {
    let mut rng = thread_rng();
    let base = small_base();
    let secret = Poly::random(base.ctx().unwrap(), Representation::PowerBasis, &mut rng);
    let shares = ShamirSecretSharing::new(n, t)
        .unwrap()
        .generate_shares(&secret, &mut rng)
        .unwrap();
    let store = MemoryShareStore::from_shares(&shares);
    (secret, store, shares)
}

#[test]
fn recovers_within_bound_for_all_pool_sizes() {
    let cases: [(usize, &[usize]); 3] = [
        (32, &[1, 5, 16, 32]),
        (64, &[3, 21, 64]),
        (128, &[5, 43, 128]),
    ];
    let base = small_base();
    for (n, thresholds) in cases {
        // Large pools reuse key material to keep the test fast.
        let mode = if n <= 32 {
            SimulationMode::PerParty
        } else {
            SimulationMode::Representative
        };
        for t in thresholds {
            let mut r = recovery(n, *t, mode);
            let report = r.run_once(SMUDGING_BOUND).unwrap();
            assert!(
                report.success,
                "n = {n}, t = {t}: deviation {} above {}",
                report.max_deviation, report.bound
            );
            assert_eq!(report.bound, *t as u64 * SMUDGING_BOUND);
            assert!(report.max_deviation <= report.bound);
            assert_eq!(report.round1.len(), *t);
            assert_eq!(report.round2.len(), *t);
            assert!(report.q1 as u128 > modulus_bound(&base, n));
            assert!(probably_prime(&BigUint::from(report.q1), 20));
            assert_eq!(r.state(), &RunState::At(Stage::Decrypted));
        }
    }
}

#[test]
fn default_parameters_32_parties_threshold_5() {
    let report = approx_ss::run_once(32, 5, 16).unwrap();
    assert!(report.success);
    assert!(report.max_deviation <= 80);
    assert_eq!(report.bound, 80);
    assert_eq!(report.approx_message.coefficients().len(), 4096);
}

#[test]
fn seeded_runs_are_reproducible() {
    let mut a = recovery(16, 4, SimulationMode::PerParty);
    let mut b = recovery(16, 4, SimulationMode::PerParty);
    let ra = a
        .run_once_with_rng(SMUDGING_BOUND, &mut ChaCha20Rng::seed_from_u64(42))
        .unwrap();
    let rb = b
        .run_once_with_rng(SMUDGING_BOUND, &mut ChaCha20Rng::seed_from_u64(42))
        .unwrap();
    assert_eq!(ra.round1, rb.round1);
    assert_eq!(ra.round2, rb.round2);
    assert_eq!(ra.approx_message, rb.approx_message);
    assert_eq!(a.tag(), b.tag());
}

#[test]
fn fresh_noise_gives_fresh_messages() {
    let (secret, store, _) = dealt(16, 4);
    let mut r = recovery(16, 4, SimulationMode::PerParty);
    r.set_shares(secret.clone(), Arc::new(store));

    let first = r
        .run_once_with_rng(SMUDGING_BOUND, &mut ChaCha20Rng::seed_from_u64(1))
        .unwrap();
    let second = r
        .run_once_with_rng(SMUDGING_BOUND, &mut ChaCha20Rng::seed_from_u64(2))
        .unwrap();
    assert!(first.success && second.success);
    assert_ne!(first.approx_message, second.approx_message);
    assert!(first.approx_message.is_within(&secret, 64));
    assert!(second.approx_message.is_within(&secret, 64));
}

#[test]
fn disjoint_quorums_recover() {
    let mut rng = thread_rng();
    let (secret, store, _) = dealt(10, 4);
    let mut r = recovery(10, 4, SimulationMode::PerParty);
    r.set_shares(secret.clone(), Arc::new(store));

    r.derive_params().unwrap();
    r.round1(&[0, 1, 2, 3], SMUDGING_BOUND, &mut rng).unwrap();
    r.combine_round1().unwrap();
    r.round2(&[6, 7, 8, 9]).unwrap();
    r.aggregate_decryption_key().unwrap();
    let message = r.decrypt().unwrap();
    assert!(message.is_within(&secret, 4 * SMUDGING_BOUND));
}

#[test]
fn wrong_quorum_sizes_fail_the_run() {
    let mut rng = thread_rng();
    let (secret, store, _) = dealt(10, 4);
    let store = Arc::new(store);

    for members in [&[0usize, 1, 2][..], &[0, 1, 2, 3, 4][..]] {
        let mut r = recovery(10, 4, SimulationMode::PerParty);
        r.set_shares(secret.clone(), store.clone());
        r.derive_params().unwrap();
        let e = r.round1(members, SMUDGING_BOUND, &mut rng).unwrap_err();
        assert!(matches!(
            e,
            Error::Quorum(QuorumError::WrongSize { expected: 4, found }) if found == members.len()
        ));
        assert!(matches!(
            r.state(),
            RunState::Failed {
                stage: Stage::Round1Encrypted,
                ..
            }
        ));
    }

    let mut r = recovery(10, 4, SimulationMode::PerParty);
    r.set_shares(secret, store);
    r.derive_params().unwrap();
    r.round1(&[0, 1, 2, 3], SMUDGING_BOUND, &mut rng).unwrap();
    r.combine_round1().unwrap();
    assert!(matches!(
        r.round2(&[4, 5, 6, 7, 8]).unwrap_err(),
        Error::Quorum(QuorumError::WrongSize { expected: 4, found: 5 })
    ));
    assert_eq!(r.state().stage(), Stage::Failed);
}

#[test]
fn missing_share_is_fatal() {
    let mut rng = thread_rng();
    let (secret, mut store, _) = dealt(8, 3);
    store.remove(5);
    let mut r = recovery(8, 3, SimulationMode::PerParty);
    r.set_shares(secret, Arc::new(store));

    r.derive_params().unwrap();
    let e = r.round1(&[1, 5, 7], SMUDGING_BOUND, &mut rng).unwrap_err();
    assert!(matches!(e, Error::MaterialLoad { party: 5, .. }));
    match r.state() {
        RunState::Failed { stage, reason } => {
            assert_eq!(*stage, Stage::Round1Encrypted);
            assert!(reason.contains("party 5"));
        }
        state => panic!("unexpected state {state:?}"),
    }
    assert!(matches!(
        r.combine_round1().unwrap_err(),
        Error::InvalidTransition {
            from: Stage::Failed,
            to: Stage::Round1Combined
        }
    ));
}

#[test]
fn corrupt_share_is_fatal() {
    let (secret, mut store, _) = dealt(8, 3);
    store.insert_bytes(2, vec![1, 2, 3]);
    let mut r = recovery(8, 3, SimulationMode::Representative);
    r.set_shares(secret, Arc::new(store));

    // Random quorums may miss party 2; a staged run makes sure it is selected.
    r.derive_params().unwrap();
    let e = r
        .round1(&[0, 2, 4], SMUDGING_BOUND, &mut thread_rng())
        .unwrap_err();
    assert!(matches!(e, Error::MaterialLoad { party: 2, .. }));
    assert!(r.state().is_failed());
}

#[test]
fn stages_must_run_in_order() {
    let mut r = recovery(8, 3, SimulationMode::PerParty);
    assert!(matches!(
        r.decrypt().unwrap_err(),
        Error::InvalidTransition {
            from: Stage::Idle,
            to: Stage::Decrypted
        }
    ));
    assert!(matches!(
        r.round2(&[0, 1, 2]).unwrap_err(),
        Error::InvalidTransition { .. }
    ));
    // Rejected calls leave the run untouched.
    assert_eq!(r.state(), &RunState::At(Stage::Idle));
}

#[test]
fn exhausted_search_fails_parameter_derivation() {
    let search = SearchConfig {
        max_iterations: 0,
        primality_rounds: 0,
    };
    let mut r =
        ApproxRecovery::new(8, 3, small_base(), search, SimulationMode::PerParty).unwrap();
    let e = r.derive_params().unwrap_err();
    assert!(e.is_configuration());
    assert!(matches!(
        r.state(),
        RunState::Failed {
            stage: Stage::ParamsDerived,
            ..
        }
    ));
    assert!(r.run_once(SMUDGING_BOUND).is_err());
}

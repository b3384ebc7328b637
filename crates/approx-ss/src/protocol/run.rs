//! Orchestration of a full recovery run.
//!
//! A run walks through the [`Stage`]s in order. Every stage is a method of
//! [`ApproxRecovery`]; calling one out of order is rejected without touching
//! the run, while an error inside a stage ends the run in
//! [`RunState::Failed`]. Single-use material lives in a per-run map that is
//! dropped, and zeroized, when the next run starts.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fhe_math::rq::{Poly, Representation};
use rand::{thread_rng, CryptoRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::validate_threshold_config;
use crate::double_enc::{
    decrypt_final, distribute_keys, ApproxMessage, Ciphertext, DecryptionKey,
    DecryptionKeyShare, KeySharePair, Tag,
};
use crate::params::{
    derive_double_encryption_parameters, BaseParameters, DoubleEncryptionParameters, SearchConfig,
};
use crate::protocol::party::{Party, Round1Output};
use crate::protocol::quorum::Quorum;
use crate::protocol::state::{RunState, Stage};
use crate::sharing::{
    LagrangeCoefficients, MemoryShareStore, SecretSharer, ShamirSecretSharing, ShareStore,
};
use crate::smudging::{BoundedSmudgingGenerator, SmudgingConfig};
use crate::{Error, Result};

type PartySeed = <ChaCha20Rng as SeedableRng>::Seed;

/// How round-1 work is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Every round-1 member derives and distributes its own keys.
    #[default]
    PerParty,
    /// The first round-1 member derives and distributes keys once, and the
    /// other members reuse them. Ciphertexts and decryption-key shares are
    /// still computed per party. Only meant for benchmarking large pools.
    Representative,
}

/// Wall-clock time spent in each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    /// Parameter derivation.
    pub params: Duration,
    /// Round-1 encryption and key distribution.
    pub round1: Duration,
    /// Round-1 Lagrange coefficients.
    pub combine: Duration,
    /// Round-2 decryption-key shares.
    pub round2: Duration,
    /// Decryption-key aggregation.
    pub aggregate: Duration,
    /// Final decryption.
    pub decrypt: Duration,
}

impl StageTimings {
    /// Time spent over all stages.
    pub fn total(&self) -> Duration {
        self.params + self.round1 + self.combine + self.round2 + self.aggregate + self.decrypt
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Number of parties.
    pub n: usize,
    /// Quorum size.
    pub threshold: usize,
    /// Simulation mode of the run.
    pub mode: SimulationMode,
    /// Second modulus of the double-encryption layer.
    pub q1: u64,
    /// Whether the recovered message is within `bound` of the secret.
    pub success: bool,
    /// Time spent per stage.
    pub timings: StageTimings,
    /// Recovered approximation of the secret.
    #[serde(skip)]
    pub approx_message: ApproxMessage,
    /// Largest coefficient-wise distance between the message and the secret.
    pub max_deviation: u64,
    /// Allowed distance, `threshold * smudging_bound`.
    pub bound: u64,
    /// Round-1 quorum.
    pub round1: Vec<usize>,
    /// Round-2 quorum.
    pub round2: Vec<usize>,
}

#[derive(Default)]
struct RunMaterial {
    tag: Option<Tag>,
    smudging: Option<SmudgingConfig>,
    round1: Option<Quorum>,
    share_cts: Vec<Ciphertext>,
    noise_cts: Vec<Ciphertext>,
    key_shares: BTreeMap<usize, Vec<KeySharePair>>,
    lagrange: Option<LagrangeCoefficients>,
    round2: Option<Quorum>,
    dk_shares: Vec<DecryptionKeyShare>,
    dk: Option<DecryptionKey>,
    message: Option<ApproxMessage>,
}

/// Run context for approximate threshold recovery among `n` parties with
/// quorums of `threshold`.
pub struct ApproxRecovery {
    n: usize,
    threshold: usize,
    base: Arc<BaseParameters>,
    search: SearchConfig,
    mode: SimulationMode,
    params: Option<Arc<DoubleEncryptionParameters>>,
    parties: Vec<Party>,
    secret: Option<Zeroizing<Poly>>,
    store: Option<Arc<dyn ShareStore>>,
    state: RunState,
    run: RunMaterial,
}

impl std::fmt::Debug for ApproxRecovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApproxRecovery")
            .field("n", &self.n)
            .field("threshold", &self.threshold)
            .field("base", &self.base)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ApproxRecovery {
    /// Create a run context; nothing is computed yet.
    pub fn new(
        n: usize,
        threshold: usize,
        base: Arc<BaseParameters>,
        search: SearchConfig,
        mode: SimulationMode,
    ) -> Result<Self> {
        validate_threshold_config(n, threshold, base.modulus())?;
        Ok(Self {
            n,
            threshold,
            base,
            search,
            mode,
            params: None,
            parties: vec![],
            secret: None,
            store: None,
            state: RunState::default(),
            run: RunMaterial::default(),
        })
    }

    /// Create a run context over the default base parameters.
    pub fn with_default_parameters(n: usize, threshold: usize) -> Result<Self> {
        Self::new(
            n,
            threshold,
            BaseParameters::default_arc()?,
            SearchConfig::default(),
            SimulationMode::default(),
        )
    }

    /// Number of parties.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Quorum size.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Simulation mode.
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// State of the current run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Double-encryption parameters, once derived.
    pub fn params(&self) -> Option<&Arc<DoubleEncryptionParameters>> {
        self.params.as_ref()
    }

    /// Parties of the pool; empty until the first round 1.
    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    /// Tag of the current run, once round 1 started.
    pub fn tag(&self) -> Option<&Tag> {
        self.run.tag.as_ref()
    }

    /// Approximate message of the current run, once decrypted.
    pub fn message(&self) -> Option<&ApproxMessage> {
        self.run.message.as_ref()
    }

    /// Use `store` as the source of shares of `secret`.
    pub fn set_shares(&mut self, secret: Poly, store: Arc<dyn ShareStore>) {
        self.secret = Some(Zeroizing::new(secret));
        self.store = Some(store);
    }

    /// Sample a random secret and store its Shamir shares in memory.
    pub fn deal<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<()> {
        let ctx = self.base.ctx()?;
        let secret = Poly::random(ctx, Representation::PowerBasis, rng);
        let sharer = ShamirSecretSharing::new(self.n, self.threshold)?;
        let shares = sharer.generate_shares(&secret, rng)?;
        self.set_shares(secret, Arc::new(MemoryShareStore::from_shares(&shares)));
        debug!(n = self.n, threshold = self.threshold, "dealt a fresh secret");
        Ok(())
    }

    /// Start a new run. Material of the previous run is dropped.
    pub fn reset(&mut self) {
        self.run = RunMaterial::default();
        self.state = RunState::default();
    }

    fn step<T>(&mut self, to: Stage, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.state.check(to)?;
        match f(self) {
            Ok(value) => {
                self.state.advance(to)?;
                Ok(value)
            }
            Err(e) => {
                warn!(stage = %to, error = %e, "recovery run failed");
                self.state.fail(to, e.to_string());
                Err(e)
            }
        }
    }

    fn derived(&self) -> Result<Arc<DoubleEncryptionParameters>> {
        self.params
            .clone()
            .ok_or_else(|| Error::configuration("Parameters were not derived"))
    }

    fn material<'a, T>(value: &'a Option<T>, what: &str) -> Result<&'a T> {
        value
            .as_ref()
            .ok_or_else(|| Error::configuration(format!("Missing {what} for this run")))
    }

    /// Derive the double-encryption parameters; reused across runs.
    pub fn derive_params(&mut self) -> Result<Arc<DoubleEncryptionParameters>> {
        self.step(Stage::ParamsDerived, |this| {
            if let Some(par) = &this.params {
                return Ok(par.clone());
            }
            let par = derive_double_encryption_parameters(&this.base, this.n, &this.search)?;
            info!(n = this.n, q1 = par.q1(), "derived double-encryption parameters");
            this.params = Some(par.clone());
            Ok(par)
        })
    }

    /// Round 1: every member of `members` encrypts its share and its
    /// smudging noise, bounded by `smudging_bound`, under a fresh tag.
    pub fn round1<R: RngCore + CryptoRng>(
        &mut self,
        members: &[usize],
        smudging_bound: u64,
        rng: &mut R,
    ) -> Result<()> {
        self.step(Stage::Round1Encrypted, |this| {
            let par = this.derived()?;
            let quorum = Quorum::new(members, this.n, this.threshold)?;
            let smudging = SmudgingConfig::new(smudging_bound)?;
            let generator = BoundedSmudgingGenerator::new(&smudging)?;
            let sharer = ShamirSecretSharing::new(this.n, this.threshold)?;
            let store = this
                .store
                .clone()
                .ok_or_else(|| Error::configuration("No shares to recover from"))?;

            if this.parties.is_empty() {
                this.parties = (0..this.n).map(|i| Party::random(i, rng)).collect();
            }
            let parties = &this.parties;
            let tag = Tag::new(&par, rng);

            let outputs = match this.mode {
                SimulationMode::PerParty => {
                    let seeds: Vec<PartySeed> =
                        quorum.members().iter().map(|_| rng.gen()).collect();
                    quorum
                        .members()
                        .par_iter()
                        .zip(seeds.into_par_iter())
                        .map(|(i, seed)| {
                            let mut rng = ChaCha20Rng::from_seed(seed);
                            parties[*i].round1(
                                &par,
                                &tag,
                                store.as_ref(),
                                &generator,
                                &sharer,
                                &mut rng,
                            )
                        })
                        .collect::<Result<Vec<_>>>()?
                }
                SimulationMode::Representative => {
                    let first = quorum.members()[0];
                    let keys = parties[first].derive_keys(&par, &tag);
                    let mut key_rng = ChaCha20Rng::from_seed(rng.gen());
                    let key_shares = distribute_keys(first, &keys, &sharer, &mut key_rng)?;
                    debug!(party = first, "representative party distributed its keys");

                    let seeds: Vec<PartySeed> =
                        quorum.members().iter().map(|_| rng.gen()).collect();
                    quorum
                        .members()
                        .par_iter()
                        .zip(seeds.into_par_iter())
                        .map(|(i, seed)| -> Result<Round1Output> {
                            let mut rng = ChaCha20Rng::from_seed(seed);
                            let (share_ct, noise_ct) = parties[*i].encrypt(
                                &tag,
                                &keys,
                                store.as_ref(),
                                &generator,
                                &mut rng,
                            )?;
                            Ok(Round1Output {
                                party: *i,
                                share_ct,
                                noise_ct,
                                key_shares: key_shares
                                    .iter()
                                    .map(|k| k.attributed_to(*i))
                                    .collect(),
                            })
                        })
                        .collect::<Result<Vec<_>>>()?
                }
            };

            let mut run = RunMaterial {
                tag: Some(tag),
                smudging: Some(smudging),
                round1: Some(quorum),
                ..Default::default()
            };
            for out in outputs {
                run.share_cts.push(out.share_ct);
                run.noise_cts.push(out.noise_ct);
                run.key_shares.insert(out.party, out.key_shares);
            }
            this.run = run;
            Ok(())
        })
    }

    /// Compute the Lagrange coefficients of the round-1 quorum.
    pub fn combine_round1(&mut self) -> Result<()> {
        self.step(Stage::Round1Combined, |this| {
            let quorum = Self::material(&this.run.round1, "round-1 quorum")?;
            if let Some(missing) = quorum
                .members()
                .iter()
                .find(|i| !this.run.key_shares.contains_key(*i))
            {
                return Err(Error::missing_contribution(*missing));
            }
            let lagrange =
                LagrangeCoefficients::build(this.base.ctx()?, &quorum.points(), this.threshold)?;
            this.run.lagrange = Some(lagrange);
            Ok(())
        })
    }

    /// Round 2: every member of `members` derives its decryption-key share.
    pub fn round2(&mut self, members: &[usize]) -> Result<()> {
        self.step(Stage::Round2KeySharesComputed, |this| {
            let par = this.derived()?;
            let quorum = Quorum::new(members, this.n, this.threshold)?;
            let tag = Self::material(&this.run.tag, "tag")?;
            let lagrange = Self::material(&this.run.lagrange, "round-1 coefficients")?;
            let round1 = Self::material(&this.run.round1, "round-1 quorum")?;
            let key_shares = &this.run.key_shares;
            let parties = &this.parties;

            let shares = quorum
                .members()
                .par_iter()
                .map(|j| -> Result<DecryptionKeyShare> {
                    let received = round1
                        .members()
                        .iter()
                        .map(|i| {
                            key_shares
                                .get(i)
                                .and_then(|shares| shares.get(*j))
                                .ok_or_else(|| Error::missing_contribution(*i))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    parties[*j].round2(&par, tag, lagrange, &received)
                })
                .collect::<Result<Vec<_>>>()?;

            this.run.dk_shares = shares;
            this.run.round2 = Some(quorum);
            Ok(())
        })
    }

    /// Aggregate the round-2 decryption-key shares.
    pub fn aggregate_decryption_key(&mut self) -> Result<()> {
        self.step(Stage::DecryptionKeyAggregated, |this| {
            let par = this.derived()?;
            let tag = Self::material(&this.run.tag, "tag")?;
            let dk = DecryptionKey::combine(&par, tag, this.threshold, &this.run.dk_shares)?;
            this.run.dk = Some(dk);
            Ok(())
        })
    }

    /// Decrypt the combined round-1 ciphertexts.
    pub fn decrypt(&mut self) -> Result<ApproxMessage> {
        self.step(Stage::Decrypted, |this| {
            let par = this.derived()?;
            let tag = Self::material(&this.run.tag, "tag")?;
            let dk = Self::material(&this.run.dk, "decryption key")?;
            let lagrange = Self::material(&this.run.lagrange, "round-1 coefficients")?;
            let message = decrypt_final(
                &par,
                tag,
                dk,
                lagrange,
                &this.run.share_cts,
                &this.run.noise_cts,
            )?;
            this.run.message = Some(message.clone());
            Ok(message)
        })
    }

    /// Run the whole protocol once, with random quorums.
    pub fn run_once(&mut self, smudging_bound: u64) -> Result<RunReport> {
        self.run_once_with_rng(smudging_bound, &mut thread_rng())
    }

    /// Run the whole protocol once, drawing all randomness from `rng`.
    ///
    /// A secret is dealt first if none was set. A recovered message farther
    /// than `threshold * smudging_bound` from the secret is reported through
    /// [`RunReport::success`], not as an error.
    pub fn run_once_with_rng<R: RngCore + CryptoRng>(
        &mut self,
        smudging_bound: u64,
        rng: &mut R,
    ) -> Result<RunReport> {
        self.reset();
        if self.store.is_none() {
            self.deal(rng)?;
        }
        let round1 = Quorum::random(self.n, self.threshold, rng)?;
        let round2 = Quorum::random(self.n, self.threshold, rng)?;
        info!(
            n = self.n,
            threshold = self.threshold,
            smudging_bound,
            mode = ?self.mode,
            "starting recovery run"
        );

        let mut timings = StageTimings::default();

        let start = Instant::now();
        let par = self.derive_params()?;
        timings.params = start.elapsed();

        let start = Instant::now();
        self.round1(round1.members(), smudging_bound, rng)?;
        timings.round1 = start.elapsed();
        info!(elapsed = ?timings.round1, "round 1 encrypted");

        let start = Instant::now();
        self.combine_round1()?;
        timings.combine = start.elapsed();

        let start = Instant::now();
        self.round2(round2.members())?;
        timings.round2 = start.elapsed();
        info!(elapsed = ?timings.round2, "round 2 decryption-key shares computed");

        let start = Instant::now();
        self.aggregate_decryption_key()?;
        timings.aggregate = start.elapsed();

        let start = Instant::now();
        let approx_message = self.decrypt()?;
        timings.decrypt = start.elapsed();

        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| Error::configuration("No secret to verify against"))?;
        let smudging = Self::material(&self.run.smudging, "smudging configuration")?;
        let bound = smudging.aggregate_bound(self.threshold);
        let max_deviation = approx_message.max_deviation(secret);
        let success = max_deviation <= bound;
        if success {
            info!(
                max_deviation,
                bound,
                total = ?timings.total(),
                "recovered the secret approximately"
            );
        } else {
            warn!(max_deviation, bound, "recovered message is outside the noise bound");
        }

        Ok(RunReport {
            n: self.n,
            threshold: self.threshold,
            mode: self.mode,
            q1: par.q1(),
            success,
            timings,
            approx_message,
            max_deviation,
            bound,
            round1: round1.members().to_vec(),
            round2: round2.members().to_vec(),
        })
    }
}

/// Run the protocol once over the default base parameters.
pub fn run_once(n: usize, threshold: usize, smudging_bound: u64) -> Result<RunReport> {
    ApproxRecovery::with_default_parameters(n, threshold)?.run_once(smudging_bound)
}

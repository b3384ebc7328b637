//! Decryption-key shares and their aggregation.
//!
//! Round-2 party `j` holds, from every round-1 party `i`, shares
//! `eks_i[j]` and `ekn_i[j]` of its two keys. It derives
//! `dk_j = Σ_i (L_i * eks_i[j] + ekn_i[j])`, where `L_i` is the round-1
//! Lagrange coefficient of `i`. The noise keys carry unit weight, matching
//! the unweighted noise ciphertexts. Interpolating the `dk_j` of any `T`
//! parties at zero yields the decryption key.

use std::collections::BTreeSet;
use std::sync::Arc;

use fhe_math::rq::{Poly, Representation};
use zeroize::Zeroizing;

use crate::double_enc::key_share::KeySharePair;
use crate::double_enc::tag::{Tag, TagSeed};
use crate::errors::QuorumError;
use crate::params::DoubleEncryptionParameters;
use crate::poly::scale_by_residues;
use crate::sharing::{EvaluationPoint, LagrangeCoefficients};
use crate::{Error, Result};

/// Share of the decryption key held by one round-2 party.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptionKeyShare {
    party: usize,
    tag: TagSeed,
    round1: Vec<usize>,
    poly: Zeroizing<Poly>,
}

impl DecryptionKeyShare {
    /// Derive the share of party `party` from the key shares it received from
    /// the round-1 quorum described by `lagrange`.
    ///
    /// Exactly one key-share pair addressed to `party` is required from every
    /// round-1 member, and none from anyone else.
    pub fn derive_share(
        par: &Arc<DoubleEncryptionParameters>,
        tag: &Tag,
        lagrange: &LagrangeCoefficients,
        party: usize,
        received: &[&KeySharePair],
    ) -> Result<Self> {
        let mut senders = BTreeSet::new();
        for pair in received {
            if !tag.matches(pair.share.tag()) || !tag.matches(pair.noise.tag()) {
                return Err(Error::TagMismatch);
            }
            if pair.recipient() != party || pair.noise.recipient() != party {
                return Err(Error::configuration(format!(
                    "Key share addressed to party {} handed to party {party}",
                    pair.recipient()
                )));
            }
            if pair.noise.sender() != pair.sender() {
                return Err(Error::configuration(format!(
                    "Key shares of parties {} and {} paired together",
                    pair.sender(),
                    pair.noise.sender()
                )));
            }
            if !lagrange.contains(&EvaluationPoint::for_party(pair.sender())) {
                return Err(QuorumError::UnexpectedContribution(pair.sender()).into());
            }
            if !senders.insert(pair.sender()) {
                return Err(QuorumError::DuplicatePoint(
                    EvaluationPoint::for_party(pair.sender()).value(),
                )
                .into());
            }
        }
        if let Some(missing) = lagrange.points().find(|p| !senders.contains(&p.party())) {
            return Err(Error::missing_contribution(missing.party()));
        }

        let ops = par.moduli_operators();
        let mut dk = Zeroizing::new(Poly::zero(par.ctx(), Representation::PowerBasis));
        for pair in received {
            let point = EvaluationPoint::for_party(pair.sender());
            let l = lagrange
                .lifted_residues(&point, ops)
                .ok_or(QuorumError::UnexpectedContribution(pair.sender()))?;
            let weighted = Zeroizing::new(scale_by_residues(pair.share.poly(), &l, ops)?);
            *dk.as_mut() += weighted.as_ref();
            *dk.as_mut() += pair.noise.poly();
        }

        Ok(Self {
            party,
            tag: *tag.seed(),
            round1: senders.into_iter().collect(),
            poly: dk,
        })
    }

    /// Index of the party holding the share.
    pub fn party(&self) -> usize {
        self.party
    }

    /// Seed of the tag the share is bound to.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }

    /// Round-1 quorum the share refers to, in increasing order.
    pub fn round1(&self) -> &[usize] {
        &self.round1
    }
}

/// Decryption key of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptionKey {
    tag: TagSeed,
    round1: Vec<usize>,
    /// Stored in NTT representation.
    pub(crate) poly: Zeroizing<Poly>,
}

impl DecryptionKey {
    /// Aggregate the shares of a round-2 quorum of exactly `threshold`
    /// distinct parties.
    pub fn combine(
        par: &Arc<DoubleEncryptionParameters>,
        tag: &Tag,
        threshold: usize,
        shares: &[DecryptionKeyShare],
    ) -> Result<Self> {
        let first = shares
            .first()
            .ok_or_else(|| Error::wrong_quorum_size(threshold, 0))?;
        for share in shares {
            if !tag.matches(share.tag()) {
                return Err(Error::TagMismatch);
            }
            if share.round1 != first.round1 {
                return Err(Error::configuration(
                    "Decryption-key shares refer to different round-1 quorums",
                ));
            }
        }

        let points = shares
            .iter()
            .map(|s| EvaluationPoint::for_party(s.party))
            .collect::<Vec<_>>();
        let lagrange = LagrangeCoefficients::build(par.ctx(), &points, threshold)?;
        let ops = par.moduli_operators();

        let mut dk = Zeroizing::new(Poly::zero(par.ctx(), Representation::PowerBasis));
        for (share, point) in shares.iter().zip(&points) {
            let l = lagrange
                .residues(point)
                .ok_or(QuorumError::MissingContribution(share.party))?;
            let weighted = Zeroizing::new(scale_by_residues(&share.poly, l, ops)?);
            *dk.as_mut() += weighted.as_ref();
        }
        dk.change_representation(Representation::Ntt);

        Ok(Self {
            tag: *tag.seed(),
            round1: first.round1.clone(),
            poly: dk,
        })
    }

    /// Seed of the tag the key is bound to.
    pub fn tag(&self) -> &TagSeed {
        &self.tag
    }

    /// Round-1 quorum whose ciphertexts the key decrypts.
    pub fn round1(&self) -> &[usize] {
        &self.round1
    }
}

#[cfg(test)]
mod tests {
    use super::{DecryptionKey, DecryptionKeyShare};
    use crate::double_enc::{distribute_keys, EncryptionKeyPair, KeySharePair, LongTermKey, Tag};
    use crate::errors::QuorumError;
    use crate::params::{derive_double_encryption_parameters, BaseParametersBuilder, SearchConfig};
    use crate::poly::scale_by_residues;
    use crate::sharing::{EvaluationPoint, LagrangeCoefficients, ShamirSecretSharing};
    use crate::Error;
    use fhe_math::rq::{Poly, Representation};
    use rand::thread_rng;

    const N: usize = 6;
    const T: usize = 3;

    #[test]
    fn aggregated_key_matches_weighted_sum() {
        let base = BaseParametersBuilder::new().set_degree(64).build_arc().unwrap();
        let par = derive_double_encryption_parameters(&base, N, &SearchConfig::default()).unwrap();
        let mut rng = thread_rng();
        let tag = Tag::new(&par, &mut rng);
        let sharer = ShamirSecretSharing::new(N, T).unwrap();

        let round1 = [0usize, 2, 5];
        let keys = round1
            .iter()
            .map(|_| EncryptionKeyPair::derive(&par, &LongTermKey::random(&mut rng), &tag))
            .collect::<Vec<_>>();
        let distributed = round1
            .iter()
            .zip(&keys)
            .map(|(i, k)| distribute_keys(*i, k, &sharer, &mut rng).unwrap())
            .collect::<Vec<_>>();
        let points = round1.map(EvaluationPoint::for_party);
        let lagrange = LagrangeCoefficients::build(base.ctx().unwrap(), &points, T).unwrap();

        let round2 = [1usize, 3, 4];
        let shares = round2
            .iter()
            .map(|j| {
                let received = distributed.iter().map(|d| &d[*j]).collect::<Vec<_>>();
                DecryptionKeyShare::derive_share(&par, &tag, &lagrange, *j, &received).unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(shares[0].round1(), &round1);
        let dk = DecryptionKey::combine(&par, &tag, T, &shares).unwrap();

        let ops = par.moduli_operators();
        let mut expected = Poly::zero(par.ctx(), Representation::PowerBasis);
        for (i, k) in round1.iter().zip(&keys) {
            let l = lagrange
                .lifted_residues(&EvaluationPoint::for_party(*i), ops)
                .unwrap();
            let s = k.share.to_poly(Representation::PowerBasis).unwrap();
            expected += &scale_by_residues(&s, &l, ops).unwrap();
            expected += k.noise.to_poly(Representation::PowerBasis).unwrap().as_ref();
        }
        expected.change_representation(Representation::Ntt);
        assert_eq!(&expected, dk.poly.as_ref());

        // Any other round-2 quorum recovers the same key.
        let other = [0usize, 1, 2]
            .iter()
            .map(|j| {
                let received = distributed.iter().map(|d| &d[*j]).collect::<Vec<_>>();
                DecryptionKeyShare::derive_share(&par, &tag, &lagrange, *j, &received).unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(dk, DecryptionKey::combine(&par, &tag, T, &other).unwrap());
    }

    #[test]
    fn rejects_incomplete_or_foreign_material() {
        let base = BaseParametersBuilder::new().set_degree(64).build_arc().unwrap();
        let par = derive_double_encryption_parameters(&base, N, &SearchConfig::default()).unwrap();
        let mut rng = thread_rng();
        let tag = Tag::new(&par, &mut rng);
        let other_tag = Tag::new(&par, &mut rng);
        let sharer = ShamirSecretSharing::new(N, T).unwrap();

        let round1 = [0usize, 1, 2];
        let distributed: Vec<Vec<KeySharePair>> = round1
            .iter()
            .map(|i| {
                let k = EncryptionKeyPair::derive(&par, &LongTermKey::random(&mut rng), &tag);
                distribute_keys(*i, &k, &sharer, &mut rng).unwrap()
            })
            .collect();
        let points = round1.map(EvaluationPoint::for_party);
        let lagrange = LagrangeCoefficients::build(base.ctx().unwrap(), &points, T).unwrap();

        // Missing contribution from party 2.
        let received = [&distributed[0][4], &distributed[1][4]];
        assert!(matches!(
            DecryptionKeyShare::derive_share(&par, &tag, &lagrange, 4, &received).unwrap_err(),
            Error::Quorum(QuorumError::MissingContribution(2))
        ));

        // Share addressed to someone else.
        let received = [&distributed[0][4], &distributed[1][4], &distributed[2][3]];
        assert!(DecryptionKeyShare::derive_share(&par, &tag, &lagrange, 4, &received)
            .unwrap_err()
            .is_configuration());

        // Foreign tag.
        let received = [&distributed[0][4], &distributed[1][4], &distributed[2][4]];
        assert!(matches!(
            DecryptionKeyShare::derive_share(&par, &other_tag, &lagrange, 4, &received)
                .unwrap_err(),
            Error::TagMismatch
        ));

        // Round-2 quorums of the wrong size.
        let shares = (3..N)
            .map(|j| {
                let received = distributed.iter().map(|d| &d[j]).collect::<Vec<_>>();
                DecryptionKeyShare::derive_share(&par, &tag, &lagrange, j, &received).unwrap()
            })
            .collect::<Vec<_>>();
        assert!(matches!(
            DecryptionKey::combine(&par, &tag, T, &shares[..2]).unwrap_err(),
            Error::Quorum(QuorumError::WrongSize { expected: 3, found: 2 })
        ));
        let mut four = shares.clone();
        four.push(shares[0].clone());
        assert!(matches!(
            DecryptionKey::combine(&par, &tag, T, &four).unwrap_err(),
            Error::Quorum(QuorumError::WrongSize { expected: 3, found: 4 })
        ));
        assert!(matches!(
            DecryptionKey::combine(&par, &other_tag, T, &shares).unwrap_err(),
            Error::TagMismatch
        ));
    }
}

use rand::{seq::index, Rng};
use serde::Serialize;

use crate::errors::QuorumError;
use crate::sharing::EvaluationPoint;
use crate::{Error, Result};

/// Set of exactly `threshold` distinct parties out of `n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quorum {
    n: usize,
    members: Vec<usize>,
}

impl Quorum {
    /// Validate a quorum; members are kept in increasing order.
    pub fn new(members: &[usize], n: usize, threshold: usize) -> Result<Self> {
        if members.len() != threshold {
            return Err(Error::wrong_quorum_size(threshold, members.len()));
        }
        let mut sorted = members.to_vec();
        sorted.sort_unstable();
        if let Some(party) = sorted.iter().find(|p| **p >= n) {
            return Err(QuorumError::UnknownParty { party: *party, n }.into());
        }
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            let point = EvaluationPoint::for_party(w[0]);
            return Err(QuorumError::DuplicatePoint(point.value()).into());
        }
        Ok(Self {
            n,
            members: sorted,
        })
    }

    /// Draw a uniformly random quorum.
    pub fn random<R: Rng + ?Sized>(n: usize, threshold: usize, rng: &mut R) -> Result<Self> {
        if threshold > n {
            return Err(Error::threshold_too_large(threshold, n));
        }
        let members = index::sample(rng, n, threshold).into_vec();
        Self::new(&members, n, threshold)
    }

    /// Members, in increasing order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Evaluation points of the members.
    pub fn points(&self) -> Vec<EvaluationPoint> {
        self.members
            .iter()
            .map(|p| EvaluationPoint::for_party(*p))
            .collect()
    }

    /// Whether `party` is a member.
    pub fn contains(&self, party: usize) -> bool {
        self.members.binary_search(&party).is_ok()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the quorum is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Size of the pool the quorum was drawn from.
    pub fn pool_size(&self) -> usize {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::Quorum;
    use crate::errors::QuorumError;
    use crate::Error;
    use rand::thread_rng;

    #[test]
    fn validation() {
        let q = Quorum::new(&[7, 2, 30, 11, 0], 32, 5).unwrap();
        assert_eq!(q.members(), &[0, 2, 7, 11, 30]);
        assert!(q.contains(11));
        assert!(!q.contains(12));
        assert_eq!(q.points()[0].value(), 1);

        assert!(matches!(
            Quorum::new(&[1, 2, 3, 4], 32, 5).unwrap_err(),
            Error::Quorum(QuorumError::WrongSize { expected: 5, found: 4 })
        ));
        assert!(matches!(
            Quorum::new(&[1, 2, 3, 4, 5, 6], 32, 5).unwrap_err(),
            Error::Quorum(QuorumError::WrongSize { expected: 5, found: 6 })
        ));
        assert!(matches!(
            Quorum::new(&[1, 2, 3, 4, 32], 32, 5).unwrap_err(),
            Error::Quorum(QuorumError::UnknownParty { party: 32, n: 32 })
        ));
        assert!(matches!(
            Quorum::new(&[1, 2, 3, 3, 5], 32, 5).unwrap_err(),
            Error::Quorum(QuorumError::DuplicatePoint(4))
        ));
    }

    #[test]
    fn random_quorums() {
        let mut rng = thread_rng();
        for _ in 0..20 {
            let q = Quorum::random(64, 9, &mut rng).unwrap();
            assert_eq!(q.len(), 9);
            assert_eq!(q.pool_size(), 64);
            assert!(q.members().windows(2).all(|w| w[0] < w[1]));
        }
        assert!(Quorum::random(4, 5, &mut rng).is_err());
        assert_eq!(Quorum::random(5, 5, &mut rng).unwrap().members(), &[0, 1, 2, 3, 4]);
    }
}

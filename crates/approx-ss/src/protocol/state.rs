use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

/// Stages of one recovery run, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    /// Nothing done yet.
    Idle,
    /// Double-encryption parameters are available.
    ParamsDerived,
    /// Every round-1 member produced its ciphertexts and key shares.
    Round1Encrypted,
    /// Round-1 Lagrange coefficients are computed.
    Round1Combined,
    /// Every round-2 member derived its decryption-key share.
    Round2KeySharesComputed,
    /// The decryption key is aggregated.
    DecryptionKeyAggregated,
    /// The approximate message is available.
    Decrypted,
    /// A stage failed; the run is over.
    Failed,
}

impl Stage {
    /// Stage that may follow this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Self::Idle => Some(Self::ParamsDerived),
            Self::ParamsDerived => Some(Self::Round1Encrypted),
            Self::Round1Encrypted => Some(Self::Round1Combined),
            Self::Round1Combined => Some(Self::Round2KeySharesComputed),
            Self::Round2KeySharesComputed => Some(Self::DecryptionKeyAggregated),
            Self::DecryptionKeyAggregated => Some(Self::Decrypted),
            Self::Decrypted | Self::Failed => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::ParamsDerived => "ParamsDerived",
            Self::Round1Encrypted => "Round1Encrypted",
            Self::Round1Combined => "Round1Combined",
            Self::Round2KeySharesComputed => "Round2KeySharesComputed",
            Self::DecryptionKeyAggregated => "DecryptionKeyAggregated",
            Self::Decrypted => "Decrypted",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// State of a recovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// The run completed `Stage` and may continue.
    At(Stage),
    /// The run failed while attempting `stage`. Terminal.
    Failed {
        /// Stage that was being attempted.
        stage: Stage,
        /// Description of the error.
        reason: String,
    },
}

impl Default for RunState {
    fn default() -> Self {
        Self::At(Stage::Idle)
    }
}

impl RunState {
    /// Current stage; [`Stage::Failed`] once the run failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::At(stage) => *stage,
            Self::Failed { .. } => Stage::Failed,
        }
    }

    /// Whether the run failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Check that `to` may be attempted now.
    pub fn check(&self, to: Stage) -> Result<()> {
        let from = self.stage();
        if from.next() == Some(to) {
            Ok(())
        } else {
            Err(Error::InvalidTransition { from, to })
        }
    }

    /// Move to `to` after a successful stage.
    pub(crate) fn advance(&mut self, to: Stage) -> Result<()> {
        self.check(to)?;
        *self = Self::At(to);
        Ok(())
    }

    /// Record that attempting `stage` failed.
    pub(crate) fn fail(&mut self, stage: Stage, reason: String) {
        *self = Self::Failed { stage, reason };
    }
}

#[cfg(test)]
mod tests {
    use super::{RunState, Stage};
    use crate::Error;

    #[test]
    fn stages_advance_in_order() {
        let mut state = RunState::default();
        let mut stage = Stage::Idle;
        while let Some(next) = stage.next() {
            state.advance(next).unwrap();
            stage = next;
        }
        assert_eq!(state.stage(), Stage::Decrypted);
        assert!(state.check(Stage::Idle).is_err());
    }

    #[test]
    fn out_of_order_is_rejected() {
        let mut state = RunState::default();
        let e = state.advance(Stage::Round1Combined).unwrap_err();
        assert!(matches!(
            e,
            Error::InvalidTransition {
                from: Stage::Idle,
                to: Stage::Round1Combined
            }
        ));
        assert_eq!(state.stage(), Stage::Idle);
    }

    #[test]
    fn failure_is_terminal() {
        let mut state = RunState::default();
        state.advance(Stage::ParamsDerived).unwrap();
        state.fail(Stage::Round1Encrypted, "missing share".to_string());
        assert!(state.is_failed());
        assert_eq!(state.stage(), Stage::Failed);
        assert!(state.check(Stage::Round1Encrypted).is_err());
        assert_eq!(
            state,
            RunState::Failed {
                stage: Stage::Round1Encrypted,
                reason: "missing share".to_string()
            }
        );
    }
}

use thiserror::Error;

/// Error kinds for the PVSS cryptographic core.
/// None of these ever unwind past a `SecretShare`/`PvssVote` method; callers
/// translate them into the documented drop/penalise/idempotent-ok policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PvssError {
	#[error("point or scalar encoding is invalid")]
	InvalidEncoding,

	#[error("candidate {0:?} failed signature verification and was dropped")]
	InvalidCandidate(crate::participant::Identity),

	#[error("share from {0:?} failed polynomial commitment verification")]
	ShareVerifyFail(crate::participant::Identity),

	#[error("sender {0:?} is not an enrolled participant")]
	UnknownParticipant(crate::participant::Identity),

	#[error("share payload length {got} does not match expected weight {expected}")]
	WeightMismatch { expected: usize, got: usize },

	#[error("polynomial coefficients must be non-zero")]
	ZeroCoefficient,

	#[error("operation invoked before its required predecessor phase completed")]
	PhaseOrder,

	#[error("internal invariant violated: {0}")]
	InternalInvariant(&'static str),
}

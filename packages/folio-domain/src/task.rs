use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Lifecycle of one batch-embedding task.
///
/// `Vectorizing` is the initial state; `Retrying` loops back to another
/// attempt; everything else is terminal. `Timeout` is the caller-observed
/// classification for "we gave up waiting" and is distinct from any
/// worker-reported failure.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
	Vectorizing,
	Retrying,
	Done,
	RuntimeError,
	Timeout,
	OutOfAttempts,
}
impl TaskState {
	pub const ALL: [Self; 6] = [
		Self::Vectorizing,
		Self::Retrying,
		Self::Done,
		Self::RuntimeError,
		Self::Timeout,
		Self::OutOfAttempts,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Vectorizing => "vectorizing",
			Self::Retrying => "retrying",
			Self::Done => "done",
			Self::RuntimeError => "runtime_error",
			Self::Timeout => "timeout",
			Self::OutOfAttempts => "out_of_attempts",
		}
	}

	pub fn parse(tag: &str) -> Option<Self> {
		Self::ALL.iter().copied().find(|state| state.as_str() == tag)
	}

	/// The polling loop keeps waiting only in these states.
	pub fn is_in_flight(&self) -> bool {
		matches!(self, Self::Vectorizing | Self::Retrying)
	}

	pub fn is_terminal(&self) -> bool {
		!self.is_in_flight()
	}
}

/// One status observation: state tag, timestamp, free-form context.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StatusStamp {
	pub state: TaskState,
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
	#[serde(default)]
	pub detail: Value,
}
impl StatusStamp {
	pub fn new(state: TaskState, at: OffsetDateTime, detail: Value) -> Self {
		Self { state, at, detail }
	}
}

/// Task snapshot as exposed over the RPC boundary: current status plus the
/// append-only history of every prior status.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TaskSnapshot {
	pub task_id: String,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	pub current_status: StatusStamp,
	#[serde(default)]
	pub history: Vec<StatusStamp>,
}

/// One persisted vector keyed by its position in the submitted batch. The
/// doc id is the join key back to the entry after completion.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SlotVector {
	pub position: u32,
	pub doc_id: String,
	pub vector: Vec<f32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmitRequest {
	pub task_id: String,
	pub texts: Vec<String>,
	pub doc_ids: Vec<String>,
}

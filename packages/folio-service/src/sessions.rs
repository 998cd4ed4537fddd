use std::{
	collections::HashMap,
	sync::Mutex,
	time::{Duration, Instant},
};

use uuid::Uuid;

use crate::{Error, Result};

/// In-memory session registry. A session only gates access to its query
/// history, so losing sessions on restart is acceptable; the registered
/// queries themselves live in Postgres.
pub struct SessionStore {
	ttl: Duration,
	inner: Mutex<HashMap<Uuid, Instant>>,
}
impl SessionStore {
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, inner: Mutex::new(HashMap::new()) }
	}

	pub fn create(&self) -> Uuid {
		let session_id = Uuid::new_v4();
		let mut sessions = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		sessions.insert(session_id, Instant::now());

		session_id
	}

	/// Validates the session and refreshes its expiry. Expired entries are
	/// dropped on sight, so the map stays bounded by active sessions.
	pub fn touch(&self, session_id: Uuid) -> Result<()> {
		let mut sessions = self.inner.lock().unwrap_or_else(|err| err.into_inner());
		let now = Instant::now();

		sessions.retain(|_, last_seen| now.duration_since(*last_seen) < self.ttl);

		match sessions.get_mut(&session_id) {
			Some(last_seen) => {
				*last_seen = now;

				Ok(())
			},
			None => Err(Error::SessionExpired),
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn created_sessions_validate_until_expiry() {
		let store = SessionStore::new(Duration::from_secs(60));
		let session_id = store.create();

		assert!(store.touch(session_id).is_ok());
		assert!(store.touch(Uuid::new_v4()).is_err());
	}

	#[test]
	fn expired_sessions_are_evicted() {
		let store = SessionStore::new(Duration::from_nanos(1));
		let session_id = store.create();

		std::thread::sleep(Duration::from_millis(1));

		assert!(matches!(store.touch(session_id), Err(Error::SessionExpired)));
		assert!(store.is_empty());
	}
}

use std::sync::RwLock;

/// Access + refresh credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    access_token: String,
    refresh_token: String,
}

impl SessionCredential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl core::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
struct Slot {
    credential: Option<SessionCredential>,
    generation: u64,
}

/// The ambient credential used by every authenticated call.
///
/// Each replacement bumps a generation counter so a caller can tell whether
/// the credential it failed with has already been superseded.
#[derive(Debug)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

impl CredentialStore {
    pub fn new(credential: SessionCredential) -> Self {
        Self {
            slot: RwLock::new(Slot {
                credential: Some(credential),
                generation: 0,
            }),
        }
    }

    /// A store with no session (logged out).
    pub fn empty() -> Self {
        Self {
            slot: RwLock::new(Slot {
                credential: None,
                generation: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> (Option<SessionCredential>, u64) {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        (slot.credential.clone(), slot.generation)
    }

    pub fn generation(&self) -> u64 {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    pub fn current(&self) -> Option<SessionCredential> {
        self.snapshot().0
    }

    /// Replace the credential (e.g. after login).
    pub fn set(&self, credential: SessionCredential) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.credential = Some(credential);
        slot.generation += 1;
    }

    /// Install `credential` only if nothing replaced the one at `generation`.
    pub fn replace_if_current(&self, generation: u64, credential: SessionCredential) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.generation != generation {
            return false;
        }
        slot.credential = Some(credential);
        slot.generation += 1;
        true
    }

    /// Drop the credential if it is still the one at `generation`.
    pub fn clear_if_current(&self, generation: u64) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.generation != generation {
            return false;
        }
        slot.credential = None;
        slot.generation += 1;
        true
    }

    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        slot.credential = None;
        slot.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_tokens() {
        let credential = SessionCredential::new("access-secret", "refresh-secret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn stale_generations_cannot_overwrite() {
        let store = CredentialStore::new(SessionCredential::new("a1", "r1"));
        let (_, generation) = store.snapshot();

        assert!(store.replace_if_current(generation, SessionCredential::new("a2", "r2")));
        assert!(!store.replace_if_current(generation, SessionCredential::new("a3", "r3")));
        assert!(!store.clear_if_current(generation));

        assert_eq!(store.current().unwrap().access_token(), "a2");
        assert_eq!(store.generation(), generation + 1);
    }

    #[test]
    fn clearing_logs_out() {
        let store = CredentialStore::new(SessionCredential::new("a1", "r1"));
        store.clear();
        assert!(store.current().is_none());

        store.set(SessionCredential::new("a2", "r2"));
        assert_eq!(store.current().unwrap().refresh_token(), "r2");
    }
}

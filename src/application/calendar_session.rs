use crate::domain::models::CalendarCredential;
use crate::infrastructure::error::PushError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarSession {
    credential: Option<CalendarCredential>,
}

impl CalendarSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&self) -> Option<&CalendarCredential> {
        self.credential.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.credential.is_some()
    }

    pub fn connect(&mut self, credential: CalendarCredential) {
        self.credential = Some(credential);
    }

    pub fn invalidate(&mut self) {
        self.credential = None;
    }

    /// Drops the credential only if it is still the one that failed; a
    /// reconnect that happened meanwhile is kept.
    pub fn invalidate_if_current(&mut self, access_token: &str) -> bool {
        let is_current = self
            .credential
            .as_ref()
            .is_some_and(|credential| credential.access_token == access_token);
        if is_current {
            self.credential = None;
        }
        is_current
    }

    pub fn apply_push_failure(&mut self, error: &PushError, access_token: &str) -> bool {
        error.requires_reconnect() && self.invalidate_if_current(access_token)
    }
}

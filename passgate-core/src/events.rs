//! Security-relevant events raised by the ceremonies.

use std::sync::Mutex;

use crate::credential::CredentialId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    /// A login presented a sign counter that did not advance. The credential's
    /// private key has likely been cloned.
    PossibleClonedAuthenticator {
        user_id: i64,
        username: String,
        credential_id: CredentialId,
        stored: u64,
        reported: u64,
    },
}

/// Receiver of security events.
///
/// Called synchronously from inside a ceremony, before the failure is
/// returned to the caller. Implementations must not block.
pub trait SecurityEventSink: Send + Sync {
    fn emit(&self, event: SecurityEvent);
}

/// Logs events at `warn` under the `security` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl SecurityEventSink for TracingEventSink {
    fn emit(&self, event: SecurityEvent) {
        match event {
            SecurityEvent::PossibleClonedAuthenticator {
                user_id,
                username,
                credential_id,
                stored,
                reported,
            } => {
                tracing::warn!(
                    target: "security",
                    event = "possible_cloned_authenticator",
                    user_id,
                    username = %username,
                    credential_id = %credential_id,
                    stored,
                    reported,
                    "Sign counter did not advance"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecurityEventSink for RecordingEventSink {
    fn emit(&self, event: SecurityEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        assert!(sink.is_empty());

        for reported in [3, 1] {
            sink.emit(SecurityEvent::PossibleClonedAuthenticator {
                user_id: 1,
                username: "alice".into(),
                credential_id: CredentialId::new(vec![1, 2]),
                stored: 5,
                reported,
            });
        }

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            SecurityEvent::PossibleClonedAuthenticator { reported: 1, .. }
        ));
    }
}

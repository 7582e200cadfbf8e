use std::fmt;

/// Lifecycle of the relay connection
///
/// `Unopened -> Opening -> Open -> {Closed, Failed}`. `Opening` may also
/// move straight to `Failed` when the initial open is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Client constructed, no open attempted yet
    Unopened,
    /// Open in progress
    Opening,
    /// Connected - requests can be sent and responses arrive
    Open,
    /// Closed by the client or by the relay
    Closed,
    /// Open refused or connection broke with an error
    Failed,
}

impl ConnectionState {
    /// Check if requests can be sent
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if the connection has reached an end state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    /// Check if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Unopened, Opening)
                | (Opening, Open)
                | (Opening, Failed)
                | (Opening, Closed)
                | (Open, Closed)
                | (Open, Failed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Unopened => "unopened",
            ConnectionState::Opening => "opening",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_open_accepts_requests() {
        assert!(!ConnectionState::Unopened.is_open());
        assert!(!ConnectionState::Opening.is_open());
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Closed.is_open());
        assert!(!ConnectionState::Failed.is_open());
    }

    #[test]
    fn test_terminal_states_do_not_transition() {
        for next in [
            ConnectionState::Unopened,
            ConnectionState::Opening,
            ConnectionState::Open,
            ConnectionState::Closed,
            ConnectionState::Failed,
        ] {
            assert!(!ConnectionState::Closed.can_transition_to(next));
            assert!(!ConnectionState::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        assert!(ConnectionState::Unopened.can_transition_to(ConnectionState::Opening));
        assert!(ConnectionState::Opening.can_transition_to(ConnectionState::Open));
        assert!(ConnectionState::Open.can_transition_to(ConnectionState::Closed));
        assert!(!ConnectionState::Unopened.can_transition_to(ConnectionState::Open));
    }
}

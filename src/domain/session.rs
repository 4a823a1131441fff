// Connection session lifecycle.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Registered,
    Active,
    Disconnecting,
    Unregistered,
}

/// Tracks a session through
/// `Connecting -> Registered -> Active -> Disconnecting -> Unregistered`.
///
/// Any non-terminal state may jump to `Disconnecting`; `Unregistered` is
/// only reachable from `Disconnecting`, so every session ends through the
/// same cleanup path.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: SessionState,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `next` if the transition is legal. Returns false and leaves
    /// the state untouched otherwise.
    pub fn advance(&mut self, next: SessionState) -> bool {
        use SessionState::*;

        let allowed = matches!(
            (self.state, next),
            (Connecting, Registered)
                | (Registered, Active)
                | (Connecting | Registered | Active, Disconnecting)
                | (Disconnecting, Unregistered)
        );
        if allowed {
            self.state = next;
        }
        allowed
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

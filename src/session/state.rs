use std::time::Instant;

/// Top-level conversational state. Mirrors the `IDLE | LISTEN | SPEAK`
/// state machine from the reference implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Listen,
    Speak,
}

/// Mutable bookkeeping carried across the main loop between blocks.
pub struct Session {
    pub state: State,
    pub session_id: Option<String>,
    pub wake_started_at: Option<Instant>,
    pub awaiting_first_utterance: bool,
    pub last_turn_at: Option<Instant>,
    pub ignore_until: Option<Instant>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            session_id: None,
            wake_started_at: None,
            awaiting_first_utterance: false,
            last_turn_at: None,
            ignore_until: None,
        }
    }

    pub fn start_wake(&mut self, now: Instant, cooldown: std::time::Duration) {
        self.session_id = Some(format!("voice-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]));
        self.wake_started_at = Some(now);
        self.last_turn_at = Some(now);
        self.ignore_until = Some(now + cooldown);
        self.awaiting_first_utterance = true;
        self.state = State::Listen;
    }

    pub fn return_to_idle(&mut self) {
        self.state = State::Idle;
        self.session_id = None;
        self.awaiting_first_utterance = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection transfer session.
///
/// ```text
/// send:    Idle ------> HeaderSent -----> Streaming --> Done
/// receive: Listening -> HeaderReceived -> Streaming --> Done
///          (any state) -------------------------------> Failed
/// ```
///
/// A session lives for exactly one connection and is never reused. The local
/// file it transfers is owned next to it and closed when dropped.

use std::time::{Duration, Instant};

use crate::progress::ProgressObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    HeaderSent,
    HeaderReceived,
    Streaming,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct TransferSession {
    direction: Direction,
    state: SessionState,
    declared_size: u64,
    transferred: u64,
    started: Instant,
}

impl TransferSession {
    /// Session for an outgoing file whose size is already known from stat.
    pub fn sender(declared_size: u64) -> Self {
        Self::new(Direction::Send, SessionState::Idle, declared_size)
    }

    /// Session for an incoming file; the size arrives with the header.
    pub fn receiver() -> Self {
        Self::new(Direction::Receive, SessionState::Listening, 0)
    }

    fn new(direction: Direction, state: SessionState, declared_size: u64) -> Self {
        Self {
            direction,
            state,
            declared_size,
            transferred: 0,
            started: Instant::now(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Bytes per second over the whole session so far.
    pub fn throughput_bps(&self) -> u64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            (self.transferred as f64 / secs) as u64
        } else {
            0
        }
    }

    pub(crate) fn header_sent(&mut self) {
        self.advance(SessionState::Idle, SessionState::HeaderSent);
    }

    pub(crate) fn header_received(&mut self, declared_size: u64) {
        self.declared_size = declared_size;
        self.advance(SessionState::Listening, SessionState::HeaderReceived);
    }

    pub(crate) fn streaming(&mut self) {
        let from = match self.direction {
            Direction::Send => SessionState::HeaderSent,
            Direction::Receive => SessionState::HeaderReceived,
        };
        self.advance(from, SessionState::Streaming);
    }

    pub(crate) fn done(&mut self, total: u64) {
        self.record(total);
        self.advance(SessionState::Streaming, SessionState::Done);
    }

    pub(crate) fn fail(&mut self) {
        tracing::debug!(direction = ?self.direction, from = ?self.state, "session failed");
        self.state = SessionState::Failed;
    }

    /// Counter never goes backwards.
    pub(crate) fn record(&mut self, done: u64) {
        self.transferred = self.transferred.max(done);
    }

    /// Wrap an optional caller observer so progress also lands in this session.
    pub(crate) fn observe<'a, 'b>(
        &'a mut self,
        inner: Option<&'a mut (dyn ProgressObserver + 'b)>,
    ) -> SessionObserver<'a, 'b> {
        SessionObserver {
            session: self,
            inner,
        }
    }

    fn advance(&mut self, from: SessionState, to: SessionState) {
        debug_assert_eq!(self.state, from, "invalid transition to {:?}", to);
        tracing::debug!(direction = ?self.direction, ?from, ?to, "session transition");
        self.state = to;
    }
}

pub(crate) struct SessionObserver<'a, 'b> {
    session: &'a mut TransferSession,
    inner: Option<&'a mut (dyn ProgressObserver + 'b)>,
}

impl ProgressObserver for SessionObserver<'_, '_> {
    fn on_progress(&mut self, done: u64, total: u64) {
        self.session.record(done);
        if let Some(obs) = self.inner.as_deref_mut() {
            obs.on_progress(done, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_lifecycle() {
        let mut s = TransferSession::sender(10);
        assert_eq!(s.state(), SessionState::Idle);
        s.header_sent();
        s.streaming();
        s.done(10);
        assert_eq!(s.state(), SessionState::Done);
        assert_eq!(s.transferred(), 10);
        assert_eq!(s.direction(), Direction::Send);
    }

    #[test]
    fn receiver_lifecycle_takes_size_from_header() {
        let mut s = TransferSession::receiver();
        assert_eq!(s.state(), SessionState::Listening);
        s.header_received(42);
        assert_eq!(s.declared_size(), 42);
        s.streaming();
        s.fail();
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[test]
    fn observer_feeds_counter_and_caller() {
        let mut s = TransferSession::receiver();
        let mut seen = Vec::new();
        let mut caller = |done: u64, total: u64| seen.push((done, total));
        {
            let mut obs = s.observe(Some(&mut caller));
            obs.on_progress(5, 10);
            obs.on_progress(10, 10);
        }
        assert_eq!(s.transferred(), 10);
        assert_eq!(seen, vec![(5, 10), (10, 10)]);
    }

    #[test]
    fn counter_is_monotonic() {
        let mut s = TransferSession::sender(100);
        s.record(60);
        s.record(20);
        assert_eq!(s.transferred(), 60);
    }
}

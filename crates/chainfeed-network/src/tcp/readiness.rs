use std::{io, time::Duration};

use mio::{Events, Interest, Poll, event::Source};

use crate::tcp::STREAM;

/// Absolute point in time after which an operation gives up.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    /// `None` when the budget doesn't fit on the clock: never expires.
    at: Option<quanta::Instant>,
}

impl Deadline {
    #[inline]
    pub fn after(budget: Duration) -> Self {
        Self { at: quanta::Instant::now().checked_add(budget) }
    }

    /// Time left, `Duration::MAX` for a deadline that never expires.
    #[inline]
    pub fn remaining(&self) -> Duration {
        self.at.map_or(Duration::MAX, |at| at.saturating_duration_since(quanta::Instant::now()))
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| quanta::Instant::now() >= at)
    }
}

/// Blocks on exactly one descriptor until it's ready for `Interest` or a
/// timeout elapses.
///
/// The descriptor is registered under [`STREAM`] on first use and reregistered
/// when the interest changes.
#[derive(Debug)]
pub(crate) struct ReadinessWait {
    poll: Poll,
    events: Events,
    armed: Option<Interest>,
}

impl ReadinessWait {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self { poll: Poll::new()?, events: Events::with_capacity(4), armed: None })
    }

    pub(crate) fn arm<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        interest: Interest,
    ) -> io::Result<()> {
        match self.armed {
            Some(current) if current == interest => return Ok(()),
            Some(_) => self.poll.registry().reregister(source, STREAM, interest)?,
            None => self.poll.registry().register(source, STREAM, interest)?,
        }
        self.armed = Some(interest);
        Ok(())
    }

    pub(crate) fn disarm<S: Source + ?Sized>(&mut self, source: &mut S) {
        if self.armed.take().is_some() {
            let _ = self.poll.registry().deregister(source);
        }
    }

    /// Returns `true` if the descriptor reported an event before `timeout`.
    /// A signal interrupting the wait counts as no event, callers re-check
    /// their own deadline.
    pub(crate) fn wait(&mut self, timeout: Duration) -> io::Result<bool> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => Ok(self.events.iter().any(|e| e.token() == STREAM)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(e),
        }
    }
}

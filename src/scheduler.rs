//! Frame-loop bookkeeping: one sample in flight at a time, resizes and
//! scrubs coalesced to a single application per refresh, and a stop switch.

use crate::geometry::Vector2;

/// Whether a sample is currently being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleTicket {
    #[default]
    Idle,
    Pending,
}

#[derive(Debug, Default)]
pub struct FrameLoop {
    ticket: SampleTicket,
    pending_resize: Option<Vector2>,
    pending_scrub: f64,
    stopped: bool,
    ticks: u64,
    skipped: u64,
}

/// Held for the duration of one sample; releases the ticket on drop.
pub struct TickGuard<'a> {
    frame_loop: &'a mut FrameLoop,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> SampleTicket {
        self.ticket
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Cancel the loop; every later `begin_tick` returns `None`.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Completed ticks and ticks dropped because one was still pending.
    pub fn stats(&self) -> (u64, u64) {
        (self.ticks, self.skipped)
    }

    /// Start a tick, or `None` if stopped or the previous sample is still
    /// pending (that refresh is skipped, not queued).
    ///
    /// `MatrixRenderer::tick` holds the guard only within one call, so it
    /// never sees `Pending`; the skip path serves drivers that keep a guard
    /// alive across refreshes, such as a sampler finishing on a worker.
    pub fn begin_tick(&mut self) -> Option<TickGuard<'_>> {
        if self.stopped {
            return None;
        }
        if self.ticket == SampleTicket::Pending {
            self.skipped += 1;
            return None;
        }
        self.ticket = SampleTicket::Pending;
        Some(TickGuard { frame_loop: self })
    }

    /// Remember the newest container size; only the last one per tick counts.
    pub fn request_resize(&mut self, width: f64, height: f64) {
        self.pending_resize = Some(Vector2::new(width, height));
    }

    pub fn take_resize(&mut self) -> Option<Vector2> {
        self.pending_resize.take()
    }

    /// Accumulate a scrub request as a fraction of the clip.
    pub fn request_scrub(&mut self, fraction: f64) {
        if fraction.is_finite() {
            self.pending_scrub += fraction;
        }
    }

    pub fn take_scrub(&mut self) -> Option<f64> {
        let s = std::mem::take(&mut self.pending_scrub);
        (s != 0.0).then_some(s)
    }
}

impl TickGuard<'_> {
    pub fn take_resize(&mut self) -> Option<Vector2> {
        self.frame_loop.take_resize()
    }

    pub fn take_scrub(&mut self) -> Option<f64> {
        self.frame_loop.take_scrub()
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.frame_loop.ticket = SampleTicket::Idle;
        self.frame_loop.ticks += 1;
    }
}

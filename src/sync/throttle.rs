/// Throttle gate - bounds how often the snapshot is published
///
/// Mutations only mark the gate dirty. The owner calls `on_tick` once per
/// publish interval; it returns true when a publication is due. Since the
/// snapshot is mutated synchronously, whatever is published at the tick is the
/// latest state of the window (trailing edge, last write wins).
#[derive(Debug, Default)]
pub struct ThrottleGate {
    dirty: bool,
    pending_mutations: u64,
    stats: ThrottleStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Publications released (ticks + forced)
    pub publications: u64,
    /// Publications released by `force`
    pub forced: u64,
    /// Ticks that found nothing to publish
    pub idle_ticks: u64,
    /// Mutations folded into an earlier or later publication
    pub coalesced: u64,
}

impl ThrottleGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one snapshot mutation
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.pending_mutations += 1;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Interval tick: true if the snapshot must be published now
    pub fn on_tick(&mut self) -> bool {
        if !self.dirty {
            self.stats.idle_ticks += 1;
            return false;
        }
        self.release();
        true
    }

    /// Immediate publication regardless of the window
    pub fn force(&mut self) {
        self.stats.forced += 1;
        self.release();
    }

    fn release(&mut self) {
        self.stats.coalesced += self.pending_mutations.saturating_sub(1);
        self.pending_mutations = 0;
        self.dirty = false;
        self.stats.publications += 1;
    }

    pub fn stats(&self) -> ThrottleStats {
        self.stats
    }
}

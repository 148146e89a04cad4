/// Logical clock for the simulation.
///
/// A `VirtualTime` is a bare tick count with no relation to the wall
/// clock: it moves forward only when the run loop dispatches an event.
/// Link delays are sampled in the same unit, so a trial's turnaround is
/// directly comparable across configurations — a mean delay of 110
/// means 110 ticks.

/// A point in simulation time, measured in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// Where every trial starts.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Wrap a raw tick count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// The raw tick count.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The point `delta` ticks later, or `None` on overflow.
    #[inline]
    pub fn advance(self, delta: u64) -> Option<VirtualTime> {
        self.0.checked_add(delta).map(VirtualTime)
    }

    /// Ticks elapsed since `earlier`, or `None` if `earlier` is
    /// actually later than `self`.
    #[inline]
    pub fn duration_since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

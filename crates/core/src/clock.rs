//! Millisecond clock shared by every component.

/// Milliseconds since an arbitrary epoch.  Wraps at `u32::MAX` (~49.7 days).
pub type Millis = u32;

/// Source of [`Millis`] timestamps.  Never owned by the core.
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Time from `since` to `now`, correct across a single counter wrap.
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

// ===========================================================================
// Tests
// ===========================================================================

//! Centralized integer conversions.
//!
//! Saturating where clamping is the right answer (pagination arithmetic, bench
//! counters), widening helpers elsewhere so call sites stay searchable.

#[inline]
#[must_use]
pub fn u64_to_usize_saturating(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn i64_to_u64_saturating_nonnegative(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Number of pages needed for `total` items at `per_page` items each; zero items is zero pages.
#[inline]
#[must_use]
pub fn page_count(total: u64, per_page: u64) -> u64 {
    if per_page == 0 { 0 } else { total.div_ceil(per_page) }
}

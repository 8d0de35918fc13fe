//! Replica policy: the single place replica counts are computed.

/// Replicas needed to serve `load` at `target_load` per replica, clamped to
/// `[min, max]` inclusive.
///
/// `target_load` must be positive; callers validate it at configuration or
/// label-parsing time. Negative or NaN loads count as zero. When `min > max`
/// the max bound is applied first, so `min` wins.
pub fn compute_target(load: f64, target_load: f64, min: u32, max: u32) -> u32 {
    debug_assert!(target_load > 0.0, "target load must be positive");

    // Float-to-int casts saturate: NaN and negatives become 0.
    let desired = (load / target_load).ceil() as u32;
    desired.min(max).max(min)
}

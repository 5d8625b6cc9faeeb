//! Diagnostic trace hook
//!
//! `record_callback_trace` is an attachment point for external profilers and
//! tracers: they hook the symbol and read its arguments. It has no functional
//! contract. Inputs are consumed, nothing is returned and nothing is retained.

/// Bytes of the caller stack folded into the digest
const CALLER_STACK_LIMIT: usize = 128;

/// Instrumentation entry point called once per dispatched callback
///
/// The digest is routed through `black_box` so the call survives optimization
/// even though its result is discarded.
#[inline(never)]
pub fn record_callback_trace(name: &str, count: usize, profile: &str, caller_stack: Option<&str>) {
    std::hint::black_box(trace_digest(name, count, profile, caller_stack));
}

/// djb2 over name and profile, xor-folded with the caller stack and count
pub(crate) fn trace_digest(
    name: &str,
    count: usize,
    profile: &str,
    caller_stack: Option<&str>,
) -> u64 {
    let mut hash: u64 = 5381;

    for byte in name.bytes().chain(profile.bytes()) {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(u64::from(byte));
    }

    if let Some(stack) = caller_stack {
        for byte in stack.bytes().take(CALLER_STACK_LIMIT) {
            hash ^= u64::from(byte);
        }
    }

    hash ^ count as u64
}

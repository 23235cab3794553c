use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

pub const FILE_PREFIX: &str = "downloaded_video";

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Wall-clock millis, bumped so that no two calls in this process share one.
fn next_millis() -> u64 {
    let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
    let mut last = LAST_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_MILLIS.compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// `<prefix>_<millis>_<12 hex chars>`; the random part separates processes.
pub fn unique_stem(prefix: &str) -> String {
    let suffix: String = rand::random::<[u8; 6]>()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    format!("{}_{}_{}", prefix, next_millis(), suffix)
}

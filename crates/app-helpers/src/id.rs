use std::{
    process,
    sync::atomic::{AtomicU64, Ordering},
    thread, time,
};

use sha2::{Digest, Sha256};

use crate::encoding::{to_base64, BaseEncoding};

/// Length of [`url_id`] in hex characters.
pub const URL_ID_LEN: usize = 16;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn now_ns() -> u128 {
    time::SystemTime::now()
        .duration_since(time::UNIX_EPOCH)
        .map_or(0, |x| x.as_nanos())
}

fn next_seq() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Unique-per-process id, safe to use in file names.
#[must_use]
pub fn time_thread_id() -> String {
    let thread_id = thread::current().id();
    let process_id = process::id();
    let ns = now_ns();
    let seq = next_seq();

    let id = format!("{ns}-{process_id}-{thread_id:?}-{seq}");

    to_base64(id)
}

/// Short lowercase id used to tell apart files that would otherwise share a name.
#[must_use]
pub fn short_id() -> String {
    let id = (now_ns() ^ u128::from(next_seq()).rotate_left(64)).to_base(36);

    id.chars().skip(id.len().saturating_sub(6)).collect()
}

/// Stable identifier for a source URL.
///
/// The same URL always maps to the same id, so files archived from it can be
/// found again on later runs.
#[must_use]
pub fn url_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());

    let mut id = hex::encode(digest);
    id.truncate(URL_ID_LEN);
    id
}

use std::time::{Duration, SystemTime};

/// Short base36 id used to name a run's staging root.
pub fn create_run_id() -> String {
    // Mix wall-clock nanos with the pid; distinct concurrent runs get distinct roots.
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let mix = now.as_nanos() ^ ((std::process::id() as u128) << 40);
    to_base36((mix & 0xffff_ffff_ffff) as u64)
}

fn to_base36(mut v: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if v == 0 {
        return "0".to_string();
    }
    let mut s = Vec::new();
    while v > 0 {
        s.push(ALPHABET[(v % 36) as usize]);
        v /= 36;
    }
    s.reverse();
    String::from_utf8_lossy(&s).into_owned()
}

//! The rolling-hash checksum embedded in every key.
//!
//! This is corruption detection, not a MAC: the accumulator is the classic
//! multiply-by-31 string hash, the "secret" ships inside every distributed
//! build, and anyone who reads this file can forge a passing checksum. It
//! exists to catch transcription errors and casual tampering only.

/// Appended to the payload before hashing. Embedded in client builds;
/// deterrent, not a security boundary.
const SHARED_SECRET: &str = "rollbook-activation-v1";

/// Checksum of a serialised payload: multiply-by-31 rolling hash over
/// `payload ++ SHARED_SECRET`, folded to `i32`, absolute value, base-36,
/// upper-case.
pub fn checksum(payload: &str) -> String {
  let mut acc: i32 = 0;
  for byte in payload.bytes().chain(SHARED_SECRET.bytes()) {
    acc = acc.wrapping_mul(31).wrapping_add(i32::from(byte));
  }
  base36_upper(acc.unsigned_abs())
}

fn base36_upper(mut n: u32) -> String {
  const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
  if n == 0 {
    return "0".to_owned();
  }
  let mut out = Vec::new();
  while n > 0 {
    out.push(DIGITS[(n % 36) as usize]);
    n /= 36;
  }
  out.reverse();
  String::from_utf8(out).unwrap_or_default()
}

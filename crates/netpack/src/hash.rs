//! Stable 16-bit procedure ids.
//!
//! An id is FNV-1a (32-bit) over the UTF-8 bytes of a qualified procedure name,
//! folded to 16 bits by xoring the halves. Both the build pipeline and the
//! runtime router compute ids with this function, so it must never change.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over `bytes`.
pub const fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Folds a 32-bit hash into 16 bits.
pub const fn fold(hash: u32) -> u16 {
    ((hash >> 16) ^ hash) as u16
}

/// The wire id of the procedure named `qualified_name`.
pub const fn stable_hash(qualified_name: &str) -> u16 {
    fold(fnv1a_32(qualified_name.as_bytes()))
}

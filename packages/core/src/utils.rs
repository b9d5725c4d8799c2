// ABOUTME: Shared utility functions for DocuLens
// ABOUTME: Prefixed identifier generation for persisted records

use rand::Rng;

const ID_LENGTH: usize = 12;

/// Generate a unique identifier with a short type prefix, e.g. `doc-3fK9aQ0xLm2Z`
pub fn generate_id(prefix: &str) -> String {
    const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    format!("{}-{}", prefix, suffix)
}

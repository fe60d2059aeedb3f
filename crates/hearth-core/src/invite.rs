//! Invite-code generation and validation.

use rand::Rng;

/// Code alphabet: uppercase letters and digits, minus the visually
/// ambiguous I, O, 0 and 1.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Invite codes are always exactly this long.
pub const CODE_LEN: usize = 6;

/// Generate a random invite code: `CODE_LEN` independent uniform draws
/// over the 32-symbol alphabet (~1.07e9 codes).
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Normalize a user-supplied code for exact-match lookup.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Whether a normalized code could ever have been minted. Cheap local
/// reject before any store round-trip.
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b))
}

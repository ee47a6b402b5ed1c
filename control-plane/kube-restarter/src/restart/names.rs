use rand::Rng;

/// Alphabet used by the platform for generated name suffixes; no vowels and
/// no confusable characters.
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Length of the random token appended to replacement pod names.
pub const SUFFIX_TOKEN_LEN: usize = 4;

/// Total characters added to a name: the separator plus the token.
pub const SUFFIX_LEN: usize = SUFFIX_TOKEN_LEN + 1;

/// Generate a short random token from the platform's suffix alphabet.
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect()
}

/// Name for the pod replacing `original`: `<original>-<token>`, cut so the
/// result never exceeds `max_len`.
pub fn replacement_name(original: &str, max_len: usize) -> String {
    with_suffix(original, &random_token(SUFFIX_TOKEN_LEN), max_len)
}

/// Any name longer than `max_len - 5` is cut, so a 252-char name with a
/// 255 limit keeps 250 chars.
fn with_suffix(original: &str, token: &str, max_len: usize) -> String {
    let room = max_len.saturating_sub(token.len() + 1);
    let base: String = if original.chars().count() > room {
        original.chars().take(room).collect()
    } else {
        original.to_string()
    };
    format!("{}-{}", base, token)
}

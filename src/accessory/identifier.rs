/// Derive the numeric accessory id from a gateway unique id.
///
/// Colons and hyphens are stripped and the remaining hex digits are read as a
/// base-16 number, keeping the low 64 bits when it is wider. Ids that contain
/// other characters fall back to an FNV-1a hash of the raw string so that
/// they still map to a stable, distinct value.
pub fn derive_id(unique_id: &str) -> u64 {
    let mut id: u64 = 0;
    let mut digits = 0usize;

    for c in unique_id.chars().filter(|c| *c != ':' && *c != '-') {
        match c.to_digit(16) {
            Some(d) => {
                id = (id << 4) | u64::from(d);
                digits += 1;
            }
            None => return fnv1a(unique_id),
        }
    }

    if digits == 0 {
        return fnv1a(unique_id);
    }
    id
}

fn fnv1a(input: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    input
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

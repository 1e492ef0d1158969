use loft_kernel::{ID_LENGTH, SAFE_ALPHABET, safe_nanoid};

#[test]
fn generates_expected_length_and_charset() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), ID_LENGTH);

    for ch in id.chars() {
        assert!(SAFE_ALPHABET.contains(&ch), "unexpected character in nanoid: {ch}");
    }
}

#[test]
fn custom_length() {
    let id = safe_nanoid!(8);
    assert_eq!(id.len(), 8);
}

#[test]
fn length_may_be_a_constant_expression() {
    const SHORT: usize = ID_LENGTH / 3;
    assert_eq!(safe_nanoid!(SHORT).len(), 7);
    assert_eq!(safe_nanoid!(SHORT + 1).len(), 8);
}

#[test]
fn ids_do_not_repeat() {
    let ids: std::collections::HashSet<String> = (0..1000).map(|_| safe_nanoid!()).collect();
    assert_eq!(ids.len(), 1000);
}

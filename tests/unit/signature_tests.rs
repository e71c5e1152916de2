//! Unit tests for webhook HMAC signatures.

use checkpoint_relay::notify::signature::{self, verify, SIGNATURE_HEADER};

fn sign(secret: &str, body: &[u8]) -> String {
    signature::sign(secret, body).expect("sign")
}

#[test]
fn matches_rfc4231_vector() {
    assert_eq!(
        sign("Jefe", b"what do ya want for nothing?"),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn signature_is_64_lowercase_hex_chars() {
    let sig = sign("secret", br#"{"type":"failed","taskId":"t1","error":"x"}"#);
    assert_eq!(sig.len(), 64);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn signing_is_deterministic() {
    let body = b"payload";
    assert_eq!(sign("k", body), sign("k", body));
}

#[test]
fn different_secret_changes_signature() {
    let body = b"payload";
    assert_ne!(sign("k1", body), sign("k2", body));
}

#[test]
fn different_body_changes_signature() {
    assert_ne!(sign("k", b"a"), sign("k", b"b"));
}

#[test]
fn empty_secret_still_signs() {
    assert_eq!(sign("", b"payload").len(), 64);
}

#[test]
fn oversized_secret_signs_without_error() {
    let secret = "k".repeat(4096);
    let sig = signature::sign(&secret, b"payload").expect("long keys are hashed down");
    assert!(verify(&secret, b"payload", &sig));
}

#[test]
fn verify_accepts_matching_signature() {
    let body = b"payload";
    assert!(verify("k", body, &sign("k", body)));
}

#[test]
fn verify_rejects_wrong_secret() {
    let body = b"payload";
    assert!(!verify("other", body, &sign("k", body)));
}

#[test]
fn verify_rejects_malformed_hex() {
    assert!(!verify("k", b"payload", "not-hex"));
    assert!(!verify("k", b"payload", "abcd"));
}

#[test]
fn header_name() {
    assert_eq!(SIGNATURE_HEADER, "X-Webhook-Signature");
}

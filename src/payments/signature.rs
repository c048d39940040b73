//! WSPay request and callback signatures
//!
//! The gateway protocol signs with MD5 over the transaction fields
//! interleaved with the shared secret key. Field order is part of the wire
//! contract with the gateway and must not change.

use crate::payments::types::TotalAmount;

/// Signature attached to an outbound payment form.
///
/// `shop_id || secret || cart_id || secret || amount_digits || secret`
pub fn sign_request(
    shop_id: &str,
    secret_key: &str,
    cart_id: &str,
    total_amount: &TotalAmount,
) -> String {
    digest(&[
        shop_id,
        secret_key,
        cart_id,
        secret_key,
        &total_amount.signed_digits(),
        secret_key,
    ])
}

/// Signature the gateway is expected to send back on the return URL.
///
/// `shop_id || secret || cart_id || secret || success || secret || approval_code || secret`
pub fn callback_signature(
    shop_id: &str,
    secret_key: &str,
    cart_id: i64,
    success: i64,
    approval_code: &str,
) -> String {
    digest(&[
        shop_id,
        secret_key,
        &cart_id.to_string(),
        secret_key,
        &success.to_string(),
        secret_key,
        approval_code,
        secret_key,
    ])
}

/// Constant-time comparison of two hex signatures.
pub fn signatures_match(computed: &str, provided: &str) -> bool {
    if computed.len() != provided.len() {
        return false;
    }

    computed
        .as_bytes()
        .iter()
        .zip(provided.as_bytes().iter())
        .fold(0, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn digest(parts: &[&str]) -> String {
    let mut context = md5::Context::new();
    for part in parts {
        context.consume(part.as_bytes());
    }
    hex::encode(context.compute().0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP_ID: &str = "1000000";
    const SECRET: &str = "secret";

    fn amount(input: &str) -> TotalAmount {
        TotalAmount::parse(input).unwrap()
    }

    #[test]
    fn test_sign_request_known_vector() {
        // md5("1000000secret42secret1000secret")
        let signature = sign_request(SHOP_ID, SECRET, "42", &amount("10.00"));
        assert_eq!(signature, "c9fd9a7475836088a67ebabcbf785906");
    }

    #[test]
    fn test_sign_request_hashes_digits_without_separators() {
        // md5("1000000secret42secret123450secret")
        let expected = "6411c9cb5e581227411b417a00e03fc7";
        assert_eq!(sign_request(SHOP_ID, SECRET, "42", &amount("1234.5")), expected);
        assert_eq!(sign_request(SHOP_ID, SECRET, "42", &amount("1,234.50")), expected);
    }

    #[test]
    fn test_sign_request_with_surcharged_total() {
        // md5("1000000secret42secret1100secret")
        let expected = "06a57ea1ba7bac4b5836dab33a7521fe";
        assert_eq!(sign_request(SHOP_ID, SECRET, "42", &amount("11.00")), expected);
        assert_eq!(sign_request(SHOP_ID, SECRET, "42", &amount("11,00")), expected);
    }

    #[test]
    fn test_sign_request_is_deterministic() {
        let first = sign_request(SHOP_ID, SECRET, "42", &amount("10.00"));
        let second = sign_request(SHOP_ID, SECRET, "42", &amount("10.00"));
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_adjacent_cart_ids_do_not_collide() {
        let forty_two = sign_request(SHOP_ID, SECRET, "42", &amount("10.00"));
        let forty_three = sign_request(SHOP_ID, SECRET, "43", &amount("10.00"));
        assert_eq!(forty_three, "6e6bee81593770e94e44f92ba25b6609");
        assert_ne!(forty_two, forty_three);
    }

    #[test]
    fn test_callback_signature_known_vectors() {
        // md5("1000000secret42secret1secretAB12secret")
        assert_eq!(
            callback_signature(SHOP_ID, SECRET, 42, 1, "AB12"),
            "d912047e4db4cda524733a6373bb4de5"
        );
        // md5("1000000secret42secret0secretAB12secret")
        assert_eq!(
            callback_signature(SHOP_ID, SECRET, 42, 0, "AB12"),
            "945b42b2398d972d29908f6faf4f0d56"
        );
    }

    #[test]
    fn test_flipped_success_flag_changes_signature() {
        let success = callback_signature(SHOP_ID, SECRET, 42, 1, "AB12");
        let failure = callback_signature(SHOP_ID, SECRET, 42, 0, "AB12");
        assert!(!signatures_match(&failure, &success));
    }

    #[test]
    fn test_signatures_match() {
        assert!(signatures_match("abc123", "abc123"));
        assert!(!signatures_match("abc123", "abc124"));
        assert!(!signatures_match("abc123", "abc12"));
        assert!(!signatures_match("", "a"));
        assert!(signatures_match("", ""));
    }
}

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::DescrambleError;

/// Session token the alternate secret is reserved for
const REFERENCE_ZID: &str = "13fafbe11a72969c2464696efd553940f6a45c1c4801b19c3445e033f38b0e7e";
const MATCHED_EXTRA: &str = "b3d90ea3cc794be5e74013880c4519aae1b8fbe3108f2bbe60c5dc3f6e807ff1";
const DEFAULT_EXTRA: &str = "0a10f3bd42587ad70fc96886d8e5e7b3614ce69529b238a1c690cb9b51d4868f";

/// Build the descriptor key from the per-request hash and the session token.
pub fn derive_key(key_hash: &str, zid: &str) -> String {
    let extra = if zid == REFERENCE_ZID {
        MATCHED_EXTRA
    } else {
        DEFAULT_EXTRA
    };

    format!("{}{}{}", zid, key_hash, extra)
}

/// Repeating-key XOR. Applying it twice with the same key is the identity.
/// An empty key leaves the content as is.
pub fn xor_cipher(key: &[u8], content: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return content.to_vec();
    }

    content
        .iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// base64 decode `key_data` and decrypt it into the descriptor text
pub fn decrypt_key_data(key: &str, key_data: &str) -> Result<String, DescrambleError> {
    let cipher_text = STANDARD
        .decode(key_data.trim())
        .map_err(|e| DescrambleError::MalformedDescriptor(format!("key_data is not base64: {e}")))?;

    let plain = xor_cipher(key.as_bytes(), &cipher_text);
    String::from_utf8(plain)
        .map_err(|e| DescrambleError::MalformedDescriptor(format!("key_data is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_derive_key_reference_token() {
        let key = derive_key("cafe", REFERENCE_ZID);
        assert!(key.starts_with(REFERENCE_ZID));
        assert!(key.ends_with(
            "b3d90ea3cc794be5e74013880c4519aae1b8fbe3108f2bbe60c5dc3f6e807ff1"
        ));
        assert_eq!(key.len(), 64 + 4 + 64);
    }

    #[test]
    fn test_derive_key_other_token() {
        let key = derive_key("cafe", "0123456789abcdef");
        assert_eq!(
            key,
            "0123456789abcdefcafe0a10f3bd42587ad70fc96886d8e5e7b3614ce69529b238a1c690cb9b51d4868f"
        );
    }

    #[test]
    fn test_xor_empty_key() {
        assert_eq!(xor_cipher(b"", b"plain"), b"plain");
    }

    #[test]
    fn test_decrypt_key_data() -> anyhow::Result<()> {
        let key = derive_key("hash", "zid");
        let plain = r#"{"1":[1,2,3,4]}"#;
        let key_data = STANDARD.encode(xor_cipher(key.as_bytes(), plain.as_bytes()));

        assert_eq!(decrypt_key_data(&key, &key_data)?, plain);
        Ok(())
    }

    #[test]
    fn test_decrypt_key_data_not_base64() {
        let err = decrypt_key_data("key", "***").unwrap_err();
        assert!(matches!(err, DescrambleError::MalformedDescriptor(_)));
    }

    proptest! {
        #[test]
        fn test_xor_involution(
            key in proptest::collection::vec(any::<u8>(), 1..80),
            text in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            prop_assert_eq!(xor_cipher(&key, &xor_cipher(&key, &text)), text);
        }
    }
}

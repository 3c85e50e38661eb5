//! Message envelope codec for the WeChat webhook
//!
//! POST deliveries arrive as an XML envelope whose `<Encrypt>` element holds
//! the AES-encrypted message; replies go back out in the same shape. The
//! codec owns the per-deployment key material and performs the platform's
//! second authenticity check: a digest over the ciphertext that is
//! independent of the outer handshake signature of [`super::security`].
//!
//! # Envelope layout
//!
//! The AES-256-CBC plaintext is
//! `16 random bytes | u32 big-endian length | message | app id`,
//! padded to a 32-byte boundary with PKCS#7-style count bytes. The key is
//! the 43-character dashboard `EncodingAESKey` plus `"="`, base64-decoded;
//! the IV is its first 16 bytes.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use base64::{
    Engine,
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
};
use derive_more::{Display, Error};
use rand::RngCore;

use super::{message, security};
use crate::config;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Dashboard keys are arbitrary 43-character strings, so the trailing bits
/// of the final base64 quantum are not canonical.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Vendor padding boundary for the envelope plaintext
const PAD_BLOCK: usize = 32;

#[derive(Debug, Display, Error)]
pub enum CryptoError {
    /// The digest over the ciphertext does not match `msg_signature`
    InvalidSignature,
    /// The app id trailing the plaintext is not ours
    InvalidAppId,
    /// The envelope or its plaintext does not follow the vendor layout
    MalformedEnvelope(#[error(not(source))] String),
}

/// Encrypts and decrypts webhook message envelopes for one deployment
#[derive(Clone)]
pub struct WechatCrypto {
    token: String,
    app_id: String,
    key: [u8; 32],
}

impl WechatCrypto {
    pub fn new(app_config: &config::AppConfig) -> anyhow::Result<Self> {
        let key = LENIENT_BASE64
            .decode(format!("{}=", app_config.wechat_aes_key))
            .map_err(|e| anyhow::anyhow!("EncodingAESKey is not valid base64: {}", e))?;

        anyhow::ensure!(
            key.len() == 32,
            "EncodingAESKey must decode to 32 bytes, got {}",
            key.len()
        );

        Ok(Self {
            token: app_config.wechat_token.clone(),
            app_id: app_config.wechat_app_id.clone(),
            key: key.try_into().expect("length checked above"),
        })
    }

    /// Decrypts an inbound envelope after validating its inner signature
    ///
    /// # Arguments
    ///
    /// * `raw_body` - The request body, an XML envelope with an `<Encrypt>` element
    /// * `msg_signature` - The `msg_signature` query parameter
    /// * `timestamp` / `nonce` - The matching query parameters
    ///
    /// # Returns
    ///
    /// The plaintext message XML, or the error that must abort the request.
    pub fn decrypt_message(
        &self,
        raw_body: &[u8],
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, CryptoError> {
        let body = std::str::from_utf8(raw_body)
            .map_err(|_| CryptoError::MalformedEnvelope("body is not utf-8".into()))?;
        let ciphertext_b64 = message::extract_tag(body, "Encrypt")
            .ok_or_else(|| CryptoError::MalformedEnvelope("missing Encrypt element".into()))?;

        let expected = security::compute_digest(&mut [
            self.token.as_str(),
            timestamp,
            nonce,
            ciphertext_b64.as_str(),
        ]);
        if !security::digest_matches(&expected, msg_signature) {
            return Err(CryptoError::InvalidSignature);
        }

        let ciphertext = LENIENT_BASE64
            .decode(ciphertext_b64.as_bytes())
            .map_err(|e| CryptoError::MalformedEnvelope(format!("ciphertext base64: {}", e)))?;
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(CryptoError::MalformedEnvelope(
                "ciphertext is not a whole number of blocks".into(),
            ));
        }

        let mut plaintext = Aes256CbcDec::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| CryptoError::MalformedEnvelope(format!("cipher init: {}", e)))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .map_err(|_| CryptoError::MalformedEnvelope("block decryption failed".into()))?;
        unpad(&mut plaintext)?;

        // 16 random bytes | u32 big-endian length | message | app id
        if plaintext.len() < 20 {
            return Err(CryptoError::MalformedEnvelope("plaintext too short".into()));
        }
        let msg_len = u32::from_be_bytes(
            plaintext[16..20]
                .try_into()
                .expect("length checked above"),
        ) as usize;
        if plaintext.len() < 20 + msg_len {
            return Err(CryptoError::MalformedEnvelope(
                "declared message length exceeds plaintext".into(),
            ));
        }

        let app_id = &plaintext[20 + msg_len..];
        if app_id != self.app_id.as_bytes() {
            return Err(CryptoError::InvalidAppId);
        }

        String::from_utf8(plaintext[20..20 + msg_len].to_vec())
            .map_err(|_| CryptoError::MalformedEnvelope("message is not utf-8".into()))
    }

    /// Encrypts a reply and renders the transport envelope
    ///
    /// The nonce and timestamp are caller-supplied per call and are signed
    /// together with the ciphertext so the platform can authenticate the
    /// reply.
    pub fn encrypt_message(
        &self,
        plaintext: &str,
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, CryptoError> {
        let mut prefix = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut prefix);

        let mut buffer = Vec::with_capacity(PAD_BLOCK + 20 + plaintext.len() + self.app_id.len());
        buffer.extend_from_slice(&prefix);
        buffer.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
        buffer.extend_from_slice(plaintext.as_bytes());
        buffer.extend_from_slice(self.app_id.as_bytes());
        pad(&mut buffer);

        let ciphertext = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| CryptoError::MalformedEnvelope(format!("cipher init: {}", e)))?
            .encrypt_padded_vec_mut::<NoPadding>(&buffer);
        let ciphertext_b64 = LENIENT_BASE64.encode(ciphertext);

        let signature = security::compute_digest(&mut [
            self.token.as_str(),
            timestamp,
            nonce,
            ciphertext_b64.as_str(),
        ]);

        Ok(format!(
            "<xml>\
             <Encrypt><![CDATA[{ciphertext_b64}]]></Encrypt>\
             <MsgSignature><![CDATA[{signature}]]></MsgSignature>\
             <TimeStamp>{timestamp}</TimeStamp>\
             <Nonce><![CDATA[{nonce}]]></Nonce>\
             </xml>"
        ))
    }
}

/// Pads to the vendor's 32-byte boundary with count bytes
fn pad(buffer: &mut Vec<u8>) {
    let amount = PAD_BLOCK - (buffer.len() % PAD_BLOCK);
    buffer.extend(std::iter::repeat(amount as u8).take(amount));
}

/// Strips the count-byte padding written by [`pad`]
fn unpad(buffer: &mut Vec<u8>) -> Result<(), CryptoError> {
    let amount = *buffer
        .last()
        .ok_or_else(|| CryptoError::MalformedEnvelope("empty plaintext".into()))?
        as usize;
    if amount == 0 || amount > PAD_BLOCK || amount > buffer.len() {
        return Err(CryptoError::MalformedEnvelope("invalid padding".into()));
    }

    buffer.truncate(buffer.len() - amount);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn codec() -> WechatCrypto {
        WechatCrypto::new(&test_config()).unwrap()
    }

    /// Re-assembles the decrypt inputs from an envelope produced by
    /// [`WechatCrypto::encrypt_message`]
    fn envelope_parts(envelope: &str) -> (String, String, String) {
        (
            message::extract_tag(envelope, "MsgSignature").unwrap(),
            message::extract_tag(envelope, "TimeStamp").unwrap(),
            message::extract_tag(envelope, "Nonce").unwrap(),
        )
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let plaintext = "<xml><MsgType><![CDATA[text]]></MsgType></xml>";

        let envelope = codec
            .encrypt_message(plaintext, "1320562132", "1409735669")
            .unwrap();
        let (signature, timestamp, nonce) = envelope_parts(&envelope);

        let decrypted = codec
            .decrypt_message(envelope.as_bytes(), &signature, &timestamp, &nonce)
            .unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_multibyte_content() {
        let codec = codec();
        let plaintext = "<xml><Content><![CDATA[你好，商城]]></Content></xml>";

        let envelope = codec
            .encrypt_message(plaintext, "nonce", "timestamp")
            .unwrap();
        let (signature, timestamp, nonce) = envelope_parts(&envelope);

        assert_eq!(
            codec
                .decrypt_message(envelope.as_bytes(), &signature, &timestamp, &nonce)
                .unwrap(),
            plaintext
        );
    }

    #[test]
    fn test_decrypt_rejects_bad_inner_signature() {
        let codec = codec();
        let envelope = codec.encrypt_message("<xml/>", "n", "t").unwrap();
        let (_, timestamp, nonce) = envelope_parts(&envelope);

        let result = codec.decrypt_message(
            envelope.as_bytes(),
            &security::compute_signature("x", "y", "z"),
            &timestamp,
            &nonce,
        );

        assert!(matches!(result, Err(CryptoError::InvalidSignature)));
    }

    #[test]
    fn test_decrypt_rejects_foreign_app_id() {
        let codec = codec();
        let mut other_config = test_config();
        other_config.wechat_app_id = "wx0000000000000000".into();
        let other = WechatCrypto::new(&other_config).unwrap();

        let envelope = other.encrypt_message("<xml/>", "n", "t").unwrap();
        let (signature, timestamp, nonce) = envelope_parts(&envelope);

        let result = codec.decrypt_message(envelope.as_bytes(), &signature, &timestamp, &nonce);

        assert!(matches!(result, Err(CryptoError::InvalidAppId)));
    }

    #[test]
    fn test_decrypt_rejects_missing_encrypt_element() {
        let codec = codec();

        let result = codec.decrypt_message(b"<xml></xml>", "sig", "t", "n");

        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_decrypt_rejects_garbage_ciphertext() {
        let codec = codec();
        let ciphertext_b64 = LENIENT_BASE64.encode(b"not a block at all");
        let body = format!("<xml><Encrypt><![CDATA[{ciphertext_b64}]]></Encrypt></xml>");
        let signature = security::compute_digest(&mut [
            "spamtest",
            "t",
            "n",
            ciphertext_b64.as_str(),
        ]);

        let result = codec.decrypt_message(body.as_bytes(), &signature, "t", "n");

        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_new_rejects_short_key() {
        let mut config = test_config();
        config.wechat_aes_key = "dG9vLXNob3J0".into();

        assert!(WechatCrypto::new(&config).is_err());
    }
}

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, KeyIvInit};

use m3u8_rs::Key;
use url::Url;

use crate::structs::VideoError;
use crate::utils::make_absolute_url;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// HLS segment encryption methods
#[derive(Clone, Debug)]
pub enum Encryption {
    None,
    Aes128 { key_uri: Url, iv: [u8; 16] },
}

impl Encryption {
    /// Interpret a playlist `#EXT-X-KEY` for the segment at sequence `seq`.
    pub fn new(m3u8_key: &Key, base_url: &str, seq: u64) -> Result<Self, VideoError> {
        match m3u8_key.method.to_string().as_str() {
            "NONE" => Ok(Self::None),
            "AES-128" => {
                let uri = m3u8_key.uri.as_ref().ok_or_else(|| {
                    VideoError::EncryptionError("No URI found for AES-128 key".to_string())
                })?;

                // Bail if keyformat exists but is not "identity"
                if let Some(keyformat) = &m3u8_key.keyformat {
                    if keyformat != "identity" {
                        return Err(VideoError::EncryptionError(format!(
                            "Invalid keyformat: {keyformat}"
                        )));
                    }
                }

                let key_uri = make_absolute_url(base_url, uri)?;

                let mut iv = [0_u8; 16];
                if let Some(iv_str) = &m3u8_key.iv {
                    // IV is given separately
                    let iv_str = iv_str.trim_start_matches("0x");
                    hex::decode_to_slice(iv_str, &mut iv as &mut [u8])
                        .map_err(VideoError::HexError)?;
                } else {
                    // Compute IV from segment sequence
                    iv[(16 - std::mem::size_of_val(&seq))..].copy_from_slice(&seq.to_be_bytes());
                }

                Ok(Self::Aes128 { key_uri, iv })
            }
            method => Err(VideoError::EncryptionError(format!(
                "Unsupported encryption method: {method}"
            ))),
        }
    }

    /// Decrypt the given data, fetching the key when one is referenced.
    pub async fn decrypt(
        &self,
        client: &reqwest_middleware::ClientWithMiddleware,
        data: &[u8],
    ) -> Result<Vec<u8>, VideoError> {
        match self {
            Self::None => Ok(Vec::from(data)),
            Self::Aes128 { key_uri, iv } => {
                let body = client
                    .get(key_uri.clone())
                    .send()
                    .await?
                    .bytes()
                    .await
                    .map_err(VideoError::Reqwest)?;

                if body.len() < 16 {
                    return Err(VideoError::DecryptionError(
                        "AES-128 key shorter than 16 bytes".to_string(),
                    ));
                }

                let mut key = [0_u8; 16];
                key.copy_from_slice(&body[..16]);

                Aes128CbcDec::new(&key.into(), iv.into())
                    .decrypt_padded_vec_mut::<Pkcs7>(data)
                    .map_err(|e| VideoError::DecryptionError(e.to_string()))
            }
        }
    }
}

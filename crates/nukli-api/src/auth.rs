// Per-request authentication suffix computation.
//
// The bridge protects its token with one of three mutually exclusive
// schemes, selected at client construction:
//
//   none            token=<token>                             (deterministic)
//   hashedToken     ts=<ts>&rnr=<rnr>&hash=<sha256 hex>       (deprecated)
//   encryptedToken  ctoken=<hex>&nonce=<hex>                  (default)
//
// The encryptedToken key is SHA-256(token), derived once per client and
// cached; rotating the token invalidates it. The `/auth` resource itself is
// the only one sent without a suffix.

use std::sync::RwLock;

use chrono::{DateTime, SecondsFormat, Utc};
use crypto_secretbox::aead::{Aead, AeadCore, KeyInit, OsRng};
use crypto_secretbox::{Key, XSalsa20Poly1305};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Token-protection scheme used for every authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Encryption {
    /// Append the token in clear text. Only sensible on a trusted LAN.
    None,
    /// Timestamp + nonce + SHA-256 hash. Deprecated by the vendor but still
    /// accepted by bridges with old firmware.
    HashedToken,
    /// Authenticated encryption (XSalsa20-Poly1305 secretbox) of a
    /// timestamp/nonce pair under SHA-256(token).
    #[default]
    EncryptedToken,
}

/// Token plus the secretbox key derived from it.
///
/// Both live under one lock so a rotation can never leave a stale key
/// behind.
#[derive(Default)]
struct Credential {
    token: Option<SecretString>,
    key: Option<Key>,
}

pub(crate) struct Authenticator {
    encryption: Encryption,
    credential: RwLock<Credential>,
}

impl Authenticator {
    pub(crate) fn new(encryption: Encryption, token: Option<SecretString>) -> Self {
        Self {
            encryption,
            credential: RwLock::new(Credential { token, key: None }),
        }
    }

    pub(crate) fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub(crate) fn has_token(&self) -> bool {
        self.credential
            .read()
            .expect("credential lock poisoned")
            .token
            .is_some()
    }

    /// Replace the token (after `/auth` handed out a fresh one) and drop the
    /// cached key so the next request re-derives it.
    pub(crate) fn set_token(&self, token: SecretString) {
        let mut cred = self.credential.write().expect("credential lock poisoned");
        cred.token = Some(token);
        cred.key = None;
    }

    /// Compute the authentication query suffix for one request.
    ///
    /// Every invocation in `hashedToken` and `encryptedToken` mode uses a
    /// fresh timestamp and nonce; `none` is deterministic.
    pub(crate) fn query_suffix(&self) -> Result<String, Error> {
        match self.encryption {
            Encryption::None => Ok(format!("token={}", self.require_token()?)),
            Encryption::HashedToken => {
                Ok(hashed_token_suffix(Utc::now(), &self.require_token()?))
            }
            Encryption::EncryptedToken => {
                let key = self.cached_key()?;
                let rnr = rand::thread_rng().gen_range(0..10_000u32);
                encrypted_token_suffix(&key, Utc::now(), rnr)
            }
        }
    }

    fn require_token(&self) -> Result<String, Error> {
        self.credential
            .read()
            .expect("credential lock poisoned")
            .token
            .as_ref()
            .map(|t| t.expose_secret().to_owned())
            .ok_or_else(|| Error::config("missing token (run the auth flow to obtain one)"))
    }

    /// The memoized SHA-256(token) secretbox key, derived on first use.
    fn cached_key(&self) -> Result<Key, Error> {
        {
            let cred = self.credential.read().expect("credential lock poisoned");
            if let Some(key) = cred.key.clone() {
                return Ok(key);
            }
        }
        let mut cred = self.credential.write().expect("credential lock poisoned");
        let token = cred
            .token
            .as_ref()
            .ok_or_else(|| Error::config("missing token (run the auth flow to obtain one)"))?;
        let key = derive_key(token.expose_secret());
        cred.key = Some(key.clone());
        Ok(key)
    }
}

pub(crate) fn derive_key(token: &str) -> Key {
    let digest = Sha256::digest(token.as_bytes());
    Key::clone_from_slice(&digest)
}

/// Current UTC time truncated to whole seconds, ISO-8601 with a literal `Z`.
fn iso_seconds(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn hashed_token_suffix(now: DateTime<Utc>, token: &str) -> String {
    let millis = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let ts = iso_seconds(now);
    // Legacy nonce: character 18 (last digit of the seconds) concatenated
    // with characters 20..23 (the milliseconds) of the 24-character
    // millisecond timestamp, read as one decimal number. Frozen
    // compatibility behavior.
    let rnr: u32 = format!("{}{}", &millis[18..19], &millis[20..23])
        .parse()
        .expect("timestamp digits");
    let hash = hex::encode(Sha256::digest(format!("{ts},{rnr},{token}").as_bytes()));
    format!("ts={ts}&rnr={rnr}&hash={hash}")
}

fn encrypted_token_suffix(key: &Key, now: DateTime<Utc>, rnr: u32) -> Result<String, Error> {
    let cipher = XSalsa20Poly1305::new(key);
    let nonce = XSalsa20Poly1305::generate_nonce(&mut OsRng);
    let message = format!("{},{rnr}", iso_seconds(now));
    let ctoken = cipher
        .encrypt(&nonce, message.as_bytes())
        .map_err(|_| Error::Internal("token sealing failed".into()))?;
    Ok(format!(
        "ctoken={}&nonce={}",
        hex::encode(ctoken),
        hex::encode(nonce)
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixed_time(millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(millis)
    }

    fn authenticator(encryption: Encryption) -> Authenticator {
        Authenticator::new(encryption, Some(SecretString::from("0123abcd")))
    }

    #[test]
    fn none_mode_is_deterministic() {
        let auth = authenticator(Encryption::None);
        let a = auth.query_suffix().unwrap();
        let b = auth.query_suffix().unwrap();
        assert_eq!(a, "token=0123abcd");
        assert_eq!(a, b);
    }

    #[test]
    fn missing_token_is_a_configuration_error() {
        for mode in [
            Encryption::None,
            Encryption::HashedToken,
            Encryption::EncryptedToken,
        ] {
            let auth = Authenticator::new(mode, None);
            match auth.query_suffix() {
                Err(Error::Config { .. }) => {}
                other => panic!("expected Config error for {mode}, got {other:?}"),
            }
        }
    }

    #[test]
    fn hashed_token_is_deterministic_for_a_fixed_clock() {
        let ts = fixed_time(678);
        let a = hashed_token_suffix(ts, "0123abcd");
        let b = hashed_token_suffix(ts, "0123abcd");
        assert_eq!(a, b);

        // rnr reads "5" (seconds digit) + "678" (milliseconds) as 5678.
        let expected_hash = hex::encode(Sha256::digest(
            "2024-01-02T03:04:05Z,5678,0123abcd".as_bytes(),
        ));
        assert_eq!(
            a,
            format!("ts=2024-01-02T03:04:05Z&rnr=5678&hash={expected_hash}")
        );
    }

    #[test]
    fn hashed_token_rnr_keeps_leading_millisecond_zeroes_in_position() {
        // "…:05.012Z" → "5" + "012" → 5012.
        let suffix = hashed_token_suffix(fixed_time(12), "t");
        assert!(suffix.contains("&rnr=5012&"), "suffix: {suffix}");
    }

    #[test]
    fn hashed_token_suffixes_differ_across_seconds() {
        let a = hashed_token_suffix(fixed_time(0), "t");
        let b = hashed_token_suffix(fixed_time(1000), "t");
        assert_ne!(a, b);
    }

    #[test]
    fn encrypted_token_suffixes_are_fresh_per_request() {
        let auth = authenticator(Encryption::EncryptedToken);
        let a = auth.query_suffix().unwrap();
        let b = auth.query_suffix().unwrap();
        assert_ne!(a, b, "nonce must be fresh per request");
    }

    #[test]
    fn encrypted_token_round_trips_under_the_derived_key() {
        let auth = authenticator(Encryption::EncryptedToken);
        let suffix = auth.query_suffix().unwrap();

        let mut ctoken = None;
        let mut nonce = None;
        for pair in suffix.split('&') {
            let (k, v) = pair.split_once('=').unwrap();
            match k {
                "ctoken" => ctoken = Some(hex::decode(v).unwrap()),
                "nonce" => nonce = Some(hex::decode(v).unwrap()),
                other => panic!("unexpected parameter {other}"),
            }
        }
        let ctoken = ctoken.expect("ctoken present");
        let nonce = nonce.expect("nonce present");
        assert_eq!(nonce.len(), 24);

        let cipher = XSalsa20Poly1305::new(&derive_key("0123abcd"));
        let plain = cipher
            .decrypt(crypto_secretbox::Nonce::from_slice(&nonce), ctoken.as_ref())
            .expect("decrypts under SHA-256(token)");
        let plain = String::from_utf8(plain).unwrap();

        let (ts, rnr) = plain.split_once(',').expect("ts,rnr shape");
        chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%SZ")
            .expect("ISO timestamp with trailing Z");
        let rnr: u32 = rnr.parse().expect("integer rnr");
        assert!(rnr < 10_000);
    }

    #[test]
    fn token_rotation_invalidates_the_cached_key() {
        let auth = authenticator(Encryption::EncryptedToken);
        auth.query_suffix().unwrap(); // populate the cache
        auth.set_token(SecretString::from("feedbeef"));
        let suffix = auth.query_suffix().unwrap();

        let mut parts = suffix.split('&');
        let ctoken = hex::decode(parts.next().unwrap().strip_prefix("ctoken=").unwrap()).unwrap();
        let nonce = hex::decode(parts.next().unwrap().strip_prefix("nonce=").unwrap()).unwrap();

        let cipher = XSalsa20Poly1305::new(&derive_key("feedbeef"));
        cipher
            .decrypt(crypto_secretbox::Nonce::from_slice(&nonce), ctoken.as_ref())
            .expect("sealed under the rotated token's key");
    }

    #[test]
    fn encryption_mode_parses_wire_names() {
        assert_eq!("none".parse::<Encryption>().unwrap(), Encryption::None);
        assert_eq!(
            "hashedToken".parse::<Encryption>().unwrap(),
            Encryption::HashedToken
        );
        assert_eq!(
            "encryptedToken".parse::<Encryption>().unwrap(),
            Encryption::EncryptedToken
        );
        assert!("hashed".parse::<Encryption>().is_err());
    }
}

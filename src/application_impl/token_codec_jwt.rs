use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::Clock;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub signing_key: Vec<u8>,
    /// First entry signs; every entry is accepted on verify.
    pub allowed_algorithms: Vec<Algorithm>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String,
    sid: String,
    #[serde(default)]
    authorities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
}

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

pub struct JwtCodec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCodec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, CodecError> {
        if cfg.signing_key.is_empty() {
            return Err(CodecError::InternalError("empty signing key".to_string()));
        }
        let Some(&signing_alg) = cfg.allowed_algorithms.first() else {
            return Err(CodecError::InternalError(
                "no allowed algorithms configured".to_string(),
            ));
        };
        if let Some(alg) = cfg
            .allowed_algorithms
            .iter()
            .find(|alg| !HMAC_ALGORITHMS.contains(alg))
        {
            return Err(CodecError::InternalError(format!(
                "{alg:?} needs an asymmetric key, only HMAC is supported"
            )));
        }

        let mut validation = Validation::new(signing_alg);
        validation.algorithms = cfg.allowed_algorithms.clone();
        // expiry is checked against the injected clock instead
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["exp", "sub", "iss", "aud"].map(String::from));
        validation.set_audience(&[cfg.audience.clone()]);
        validation.set_issuer(&[cfg.issuer.clone()]);

        Ok(JwtCodec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
            cfg,
            clock,
        })
    }

    #[inline]
    fn gen_jti() -> String {
        nanoid::nanoid!()
    }

    /// Reads the header by hand so that names jsonwebtoken does not know, like
    /// `none`, are reported as unsupported rather than malformed.
    fn check_algorithm(&self, token: &str) -> Result<(), CodecError> {
        let mut parts = token.split('.');
        let (Some(header), Some(_), Some(_), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::Malformed);
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| CodecError::Malformed)?;
        let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| CodecError::Malformed)?;

        match Algorithm::from_str(&raw.alg) {
            Ok(alg) if self.cfg.allowed_algorithms.contains(&alg) => Ok(()),
            _ => Err(CodecError::UnsupportedAlgorithm(raw.alg)),
        }
    }

    fn decode_claims(&self, token: &str) -> Result<IdentityClaims, CodecError> {
        self.check_algorithm(token)?;

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => CodecError::SignatureInvalid,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    CodecError::UnsupportedAlgorithm(format!("{e}"))
                }
                _ => CodecError::Malformed,
            }
        })?;
        let claims = data.claims;

        let subject = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| CodecError::Malformed)?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(CodecError::Malformed)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(CodecError::Malformed)?;

        Ok(IdentityClaims {
            subject,
            authorities: claims.authorities.into_iter().collect(),
            issued_at,
            expires_at,
            jti: claims.jti,
            session_id: SessionId(claims.sid),
        })
    }
}

impl TokenCodec for JwtCodec {
    fn issue(
        &self,
        input: &ClaimsInput,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), CodecError> {
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            sub: input.subject.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: Self::gen_jti(),
            sid: input.session_id.0.clone(),
            authorities: input.authorities.iter().cloned().collect(),
        };
        let token = encode(
            &Header::new(self.validation.algorithms[0]),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| CodecError::InternalError(e.to_string()))?;

        // whole seconds, exactly what is embedded
        let exp_dt = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| CodecError::InternalError("expiry out of range".to_string()))?;
        Ok((token, exp_dt))
    }

    fn verify(&self, token: &str) -> Result<IdentityClaims, CodecError> {
        let claims = self.decode_claims(token)?;
        if self.clock.now() >= claims.expires_at {
            return Err(CodecError::Expired);
        }
        Ok(claims)
    }

    fn verify_ignoring_expiry(&self, token: &str) -> Result<IdentityClaims, CodecError> {
        self.decode_claims(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;
    use std::collections::BTreeSet;

    fn config(key: &str, algs: Vec<Algorithm>) -> JwtConfig {
        JwtConfig {
            issuer: "bazaar.auth".to_string(),
            audience: "bazaar-client".to_string(),
            signing_key: key.as_bytes().to_vec(),
            allowed_algorithms: algs,
        }
    }

    fn codec_with(clock: Arc<ManualClock>, key: &str, algs: Vec<Algorithm>) -> JwtCodec {
        JwtCodec::new(config(key, algs), clock).unwrap()
    }

    fn input(subject: i64) -> ClaimsInput {
        ClaimsInput {
            subject: UserId(subject),
            authorities: BTreeSet::from(["ROLE_USER".to_string()]),
            session_id: SessionId("sess-1".to_string()),
        }
    }

    #[test]
    fn issued_token_verifies_until_expiry() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with(clock.clone(), "secret", vec![Algorithm::HS256]);

        let (token, exp) = codec.issue(&input(42), Duration::from_secs(60)).unwrap();
        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.subject, UserId(42));
        assert_eq!(claims.expires_at, exp);
        assert!(claims.authorities.contains("ROLE_USER"));
        assert_eq!(claims.session_id, SessionId("sess-1".to_string()));

        clock.advance(Duration::from_secs(59));
        assert!(codec.verify(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert_eq!(codec.verify(&token), Err(CodecError::Expired));
        assert!(codec.verify_ignoring_expiry(&token).is_ok());
    }

    #[test]
    fn same_second_issues_are_distinct() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with(clock, "secret", vec![Algorithm::HS256]);
        let (a, _) = codec.issue(&input(1), Duration::from_secs(60)).unwrap();
        let (b, _) = codec.issue(&input(1), Duration::from_secs(60)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rotated_key_is_signature_invalid() {
        let clock = Arc::new(ManualClock::default());
        let old = codec_with(clock.clone(), "old-secret", vec![Algorithm::HS256]);
        let new = codec_with(clock, "new-secret", vec![Algorithm::HS256]);

        let (token, _) = old.issue(&input(1), Duration::from_secs(60)).unwrap();
        assert_eq!(new.verify(&token), Err(CodecError::SignatureInvalid));
    }

    #[test]
    fn tampered_payload_is_signature_invalid() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with(clock.clone(), "secret", vec![Algorithm::HS256]);
        let (victim, _) = codec.issue(&input(1), Duration::from_secs(60)).unwrap();
        let (attacker, _) = codec.issue(&input(2), Duration::from_secs(60)).unwrap();

        let v: Vec<&str> = victim.split('.').collect();
        let a: Vec<&str> = attacker.split('.').collect();
        let forged = format!("{}.{}.{}", v[0], a[1], v[2]);
        assert_eq!(codec.verify(&forged), Err(CodecError::SignatureInvalid));
    }

    #[test]
    fn none_algorithm_is_unsupported() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with(clock, "secret", vec![Algorithm::HS256]);
        let (token, _) = codec.issue(&input(1), Duration::from_secs(60)).unwrap();

        let payload = token.split('.').nth(1).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{header}.{payload}.");
        assert_eq!(
            codec.verify(&forged),
            Err(CodecError::UnsupportedAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn algorithm_outside_allow_list_is_unsupported() {
        let clock = Arc::new(ManualClock::default());
        let hs512 = codec_with(clock.clone(), "secret", vec![Algorithm::HS512]);
        let hs256 = codec_with(clock, "secret", vec![Algorithm::HS256]);

        let (token, _) = hs512.issue(&input(1), Duration::from_secs(60)).unwrap();
        assert_eq!(
            hs256.verify(&token),
            Err(CodecError::UnsupportedAlgorithm("HS512".to_string()))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let clock = Arc::new(ManualClock::default());
        let codec = codec_with(clock, "secret", vec![Algorithm::HS256]);
        assert_eq!(codec.verify("not-a-token"), Err(CodecError::Malformed));
        assert_eq!(codec.verify("a.b.c"), Err(CodecError::Malformed));
        assert_eq!(codec.verify("a.b.c.d"), Err(CodecError::Malformed));
    }

    #[test]
    fn asymmetric_algorithms_are_refused_at_construction() {
        let clock = Arc::new(ManualClock::default());
        assert!(JwtCodec::new(config("secret", vec![Algorithm::RS256]), clock.clone()).is_err());
        assert!(JwtCodec::new(config("", vec![Algorithm::HS256]), clock).is_err());
    }
}

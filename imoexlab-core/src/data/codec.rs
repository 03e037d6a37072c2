//! Versioned artifact encoding.
//!
//! Current artifacts are written as an envelope:
//!
//! ```json
//! {"version":2,"kind":"news","date":"2022-03-07","payload":{"ts":[...],"title":[...]}}
//! ```
//!
//! Two older encodings are still readable:
//! - version 1: the bare payload mapping, no envelope
//! - double-encoded: a JSON string whose content is a version 1 mapping
//!
//! The double-encoded path is a compatibility shim. It logs a warning so the
//! affected artifacts can be rewritten; writers only ever emit version 2.

use super::provider::DataError;
use crate::domain::{ArtifactKind, DateKey, MarketIndexArtifact, NewsArtifact, RawArtifact};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Version tag written into every envelope.
pub const ARTIFACT_VERSION: u32 = 2;

#[derive(Serialize)]
struct EnvelopeRef<'a, P> {
    version: u32,
    kind: ArtifactKind,
    date: DateKey,
    payload: &'a P,
}

/// How a decoded payload was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Version 2 envelope.
    Versioned,
    /// Version 1 bare mapping.
    Bare,
    /// JSON string wrapping a mapping.
    DoubleEncoded,
}

impl Encoding {
    /// Whether re-encoding would change the stored bytes' format.
    pub fn is_legacy(self) -> bool {
        self != Encoding::Versioned
    }
}

/// Result of decoding a stored artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub artifact: T,
    pub encoding: Encoding,
}

/// Encode an artifact for `date` in the current envelope format.
pub fn encode(date: DateKey, artifact: &RawArtifact) -> Result<Vec<u8>, DataError> {
    match artifact {
        RawArtifact::News(a) => encode_payload(ArtifactKind::News, date, a),
        RawArtifact::MarketIndex(a) => encode_payload(ArtifactKind::MarketIndex, date, a),
    }
}

fn encode_payload<P: Serialize>(
    kind: ArtifactKind,
    date: DateKey,
    payload: &P,
) -> Result<Vec<u8>, DataError> {
    let envelope = EnvelopeRef {
        version: ARTIFACT_VERSION,
        kind,
        date,
        payload,
    };
    serde_json::to_vec(&envelope).map_err(|e| DataError::Codec(format!("encode {kind}: {e}")))
}

/// Decode a stored artifact of the given kind, accepting any known encoding.
pub fn decode(kind: ArtifactKind, bytes: &[u8]) -> Result<Decoded<RawArtifact>, DataError> {
    match kind {
        ArtifactKind::News => decode_news(bytes).map(|d| Decoded {
            artifact: RawArtifact::News(d.artifact),
            encoding: d.encoding,
        }),
        ArtifactKind::MarketIndex => decode_market_index(bytes).map(|d| Decoded {
            artifact: RawArtifact::MarketIndex(d.artifact),
            encoding: d.encoding,
        }),
    }
}

pub fn decode_news(bytes: &[u8]) -> Result<Decoded<NewsArtifact>, DataError> {
    let decoded: Decoded<NewsArtifact> = decode_typed(ArtifactKind::News, bytes)?;
    decoded.artifact.validate()?;
    Ok(decoded)
}

pub fn decode_market_index(bytes: &[u8]) -> Result<Decoded<MarketIndexArtifact>, DataError> {
    let decoded: Decoded<MarketIndexArtifact> = decode_typed(ArtifactKind::MarketIndex, bytes)?;
    decoded.artifact.validate()?;
    Ok(decoded)
}

fn decode_typed<T: DeserializeOwned>(
    kind: ArtifactKind,
    bytes: &[u8],
) -> Result<Decoded<T>, DataError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DataError::Codec(format!("{kind}: not valid JSON: {e}")))?;

    match value {
        Value::String(inner) => {
            warn!(
                kind = kind.as_str(),
                "decoding double-encoded legacy artifact; rewrite it to drop this path"
            );
            let inner: Value = serde_json::from_str(&inner)
                .map_err(|e| DataError::Codec(format!("{kind}: double-encoded payload: {e}")))?;
            if !inner.is_object() {
                return Err(DataError::Codec(format!(
                    "{kind}: double-encoded payload is not a mapping"
                )));
            }
            let (artifact, _) = decode_object(kind, inner)?;
            Ok(Decoded {
                artifact,
                encoding: Encoding::DoubleEncoded,
            })
        }
        Value::Object(_) => {
            let (artifact, encoding) = decode_object(kind, value)?;
            Ok(Decoded { artifact, encoding })
        }
        other => Err(DataError::Codec(format!(
            "{kind}: expected a mapping, found {}",
            json_type_name(&other)
        ))),
    }
}

fn decode_object<T: DeserializeOwned>(
    kind: ArtifactKind,
    value: Value,
) -> Result<(T, Encoding), DataError> {
    let Value::Object(mut map) = value else {
        return Err(DataError::Codec(format!("{kind}: expected a mapping")));
    };

    let Some(version) = map.remove("version") else {
        let artifact = serde_json::from_value(Value::Object(map))
            .map_err(|e| DataError::Codec(format!("{kind}: {e}")))?;
        return Ok((artifact, Encoding::Bare));
    };

    if version.as_u64() != Some(u64::from(ARTIFACT_VERSION)) {
        return Err(DataError::Codec(format!(
            "{kind}: unsupported artifact version {version}"
        )));
    }

    let stored_kind: ArtifactKind = map
        .remove("kind")
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| DataError::Codec(format!("{kind}: envelope kind: {e}")))?
        .ok_or_else(|| DataError::Codec(format!("{kind}: envelope has no kind")))?;
    if stored_kind != kind {
        return Err(DataError::Codec(format!(
            "expected a {kind} artifact, found {stored_kind}"
        )));
    }

    let payload = map
        .remove("payload")
        .ok_or_else(|| DataError::Codec(format!("{kind}: envelope has no payload")))?;
    let artifact =
        serde_json::from_value(payload).map_err(|e| DataError::Codec(format!("{kind}: {e}")))?;
    Ok((artifact, Encoding::Versioned))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

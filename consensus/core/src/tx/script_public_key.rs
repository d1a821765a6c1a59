use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Visitor},
};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

/// Locking script of a transaction output.
#[derive(Default, PartialEq, Eq, Clone, Hash)]
pub struct ScriptPublicKey {
    script: Vec<u8>, // Kept private to preserve read-only semantics
}

impl std::fmt::Debug for ScriptPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptPublicKey").field("script", &hex::encode(&self.script)).finish()
    }
}

impl ScriptPublicKey {
    pub fn new(script: Vec<u8>) -> Self {
        Self { script }
    }

    pub fn from_slice(script: &[u8]) -> Self {
        Self { script: script.to_vec() }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn into_script(self) -> Vec<u8> {
        self.script
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

impl From<Vec<u8>> for ScriptPublicKey {
    fn from(script: Vec<u8>) -> Self {
        Self::new(script)
    }
}

impl AsRef<[u8]> for ScriptPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.script
    }
}

impl Display for ScriptPublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(&self.script))
    }
}

impl FromStr for ScriptPublicKey {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(hex::decode(s)?))
    }
}

impl Serialize for ScriptPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScriptPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScriptVisitor;

        impl Visitor<'_> for ScriptVisitor {
            type Value = ScriptPublicKey;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("a hex encoded script")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                ScriptPublicKey::from_str(v).map_err(Error::custom)
            }
        }

        deserializer.deserialize_str(ScriptVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_public_key_serde() {
        let spk = ScriptPublicKey::new(vec![0x76, 0xa9, 0x14]);
        let json = serde_json::to_string(&spk).unwrap();
        assert_eq!(json, r#""76a914""#);
        let back: ScriptPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spk);
        assert!(serde_json::from_str::<ScriptPublicKey>(r#""zz""#).is_err());
    }
}

use crate::{
    adapter::ContractKind,
    error::{Error, Result},
    tier::{TIERS, Tier},
};
use log::debug;
use sensible_addresses::Network;
use sensible_hashes::{Hash160, hash160};
use sensible_txscript::opcodes::codes::OpReturn;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, sync::Arc};

pub const DEFAULT_FEEB: f64 = 0.5;
pub const DEFAULT_DUST_LIMIT_FACTOR: u64 = 250;
pub const DEFAULT_DUST_FLOOR: u64 = 546;

/// A check contract template compiled for one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTemplate {
    pub max_inputs: usize,
    pub max_outputs: usize,
    #[serde(with = "hex::serde")]
    pub code: Vec<u8>,
}

impl TierTemplate {
    pub fn tier(&self) -> Tier {
        Tier::new(self.max_inputs, self.max_outputs)
    }
}

/// Compiled code parts, hex encoded in configuration files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractTemplates {
    #[serde(with = "hex::serde")]
    pub ft_genesis: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub ft_token: Vec<u8>,
    pub ft_transfer_check: Vec<TierTemplate>,
    pub ft_unlock_check: Vec<TierTemplate>,
    #[serde(with = "hex::serde")]
    pub nft_genesis: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub nft_token: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub nft_unlock_check: Vec<u8>,
}

/// Serialized form of [`ProtocolConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    pub network: Network,
    /// Fee rate in satoshis per byte.
    pub feeb: f64,
    pub dust_limit_factor: u64,
    pub dust_floor: u64,
    pub templates: ContractTemplates,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            network: Network::default(),
            feeb: DEFAULT_FEEB,
            dust_limit_factor: DEFAULT_DUST_LIMIT_FACTOR,
            dust_floor: DEFAULT_DUST_FLOOR,
            templates: ContractTemplates::default(),
        }
    }
}

/// Validated protocol configuration: every contract template with its code
/// hash, plus network and fee parameters. Built once and borrowed by the
/// token managers.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ProtocolSettings")]
pub struct ProtocolConfig {
    settings: ProtocolSettings,
    code_parts: BTreeMap<ContractKind, Arc<[u8]>>,
    code_hashes: BTreeMap<ContractKind, Hash160>,
}

impl ProtocolConfig {
    pub fn new(settings: ProtocolSettings) -> Result<Self> {
        if !(settings.feeb.is_finite() && settings.feeb > 0.0) {
            return Err(Error::InvalidConfig(format!("fee rate must be positive, got {}", settings.feeb)));
        }

        let templates = &settings.templates;
        let mut code_parts = BTreeMap::new();
        for (kind, code) in [
            (ContractKind::FtGenesis, &templates.ft_genesis),
            (ContractKind::FtToken, &templates.ft_token),
            (ContractKind::NftGenesis, &templates.nft_genesis),
            (ContractKind::NftToken, &templates.nft_token),
            (ContractKind::NftUnlockCheck, &templates.nft_unlock_check),
        ] {
            code_parts.insert(kind, validate_code_part(kind, code)?);
        }
        for tier in TIERS {
            for (kind, list) in [
                (ContractKind::FtTransferCheck(tier), &templates.ft_transfer_check),
                (ContractKind::FtUnlockCheck(tier), &templates.ft_unlock_check),
            ] {
                let code = list.iter().find(|t| t.tier() == tier).map(|t| &t.code).ok_or_else(|| Error::MissingTemplate(kind.to_string()))?;
                code_parts.insert(kind, validate_code_part(kind, code)?);
            }
        }

        let code_hashes = code_parts.iter().map(|(kind, code)| (*kind, hash160(code))).collect();
        debug!("Loaded {} contract templates for {}", code_parts.len(), settings.network.as_str());
        Ok(Self { settings, code_parts, code_hashes })
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::new(toml::from_str::<ProtocolSettings>(toml)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    pub fn network(&self) -> Network {
        self.settings.network
    }

    pub fn feeb(&self) -> f64 {
        self.settings.feeb
    }

    pub fn dust_floor(&self) -> u64 {
        self.settings.dust_floor
    }

    /// Smallest value an output with a locking script of `script_len` bytes may carry.
    pub fn dust_threshold(&self, script_len: usize) -> u64 {
        (self.settings.dust_limit_factor * (script_len as u64 + 9 + 148)).div_ceil(1000)
    }

    pub fn code_part(&self, kind: ContractKind) -> Result<Arc<[u8]>> {
        self.code_parts.get(&kind).cloned().ok_or_else(|| Error::MissingTemplate(kind.to_string()))
    }

    pub fn code_hash(&self, kind: ContractKind) -> Result<Hash160> {
        self.code_hashes.get(&kind).copied().ok_or_else(|| Error::MissingTemplate(kind.to_string()))
    }

    /// Identifies the contract kind a code hash belongs to.
    pub fn kind_of(&self, code_hash: &Hash160) -> Option<ContractKind> {
        self.code_hashes.iter().find(|(_, hash)| *hash == code_hash).map(|(kind, _)| *kind)
    }
}

impl TryFrom<ProtocolSettings> for ProtocolConfig {
    type Error = Error;

    fn try_from(settings: ProtocolSettings) -> Result<Self> {
        Self::new(settings)
    }
}

fn validate_code_part(kind: ContractKind, code: &[u8]) -> Result<Arc<[u8]>> {
    match code.last() {
        None => Err(Error::MissingTemplate(kind.to_string())),
        Some(&OpReturn) => Ok(Arc::from(code)),
        Some(_) => Err(Error::InvalidConfig(format!("{kind} code part must end with OP_RETURN"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Distinct dummy code parts for every template.
    pub fn test_templates() -> ContractTemplates {
        let code = |tag: u8| vec![0x01, tag, 0x75, OpReturn];
        let tiered = |tag: u8| {
            TIERS.iter().enumerate().map(|(i, t)| TierTemplate { max_inputs: t.max_inputs, max_outputs: t.max_outputs, code: code(tag + i as u8) }).collect()
        };
        ContractTemplates {
            ft_genesis: code(1),
            ft_token: code(2),
            ft_transfer_check: tiered(10),
            ft_unlock_check: tiered(20),
            nft_genesis: code(3),
            nft_token: code(4),
            nft_unlock_check: code(5),
        }
    }

    pub fn test_config() -> ProtocolConfig {
        ProtocolConfig::new(ProtocolSettings { network: Network::Testnet, templates: test_templates(), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_config_from_toml() {
        let settings = ProtocolSettings { network: Network::Testnet, feeb: 0.25, templates: test_templates(), ..Default::default() };
        let toml = toml::to_string(&settings).unwrap();
        assert!(toml.contains("ft_genesis = \"0101756a\""));

        let config = ProtocolConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.network(), Network::Testnet);
        assert_eq!(config.feeb(), 0.25);
        assert_eq!(config.dust_floor(), DEFAULT_DUST_FLOOR);
        assert_eq!(config.code_part(ContractKind::FtToken).unwrap().as_ref(), &[0x01, 2, 0x75, OpReturn]);
        assert_eq!(config.code_hash(ContractKind::NftToken).unwrap(), hash160(&[0x01, 4, 0x75, OpReturn]));
        let tier = Tier::new(8, 12);
        assert_eq!(config.kind_of(&config.code_hash(ContractKind::FtUnlockCheck(tier)).unwrap()), Some(ContractKind::FtUnlockCheck(tier)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        let from_file = ProtocolConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(from_file.code_hash(ContractKind::FtGenesis), config.code_hash(ContractKind::FtGenesis));
    }

    #[test]
    fn test_config_errors() {
        struct Test {
            name: &'static str,
            mutate: fn(&mut ProtocolSettings),
            expected: Error,
        }

        let tests = vec![
            Test {
                name: "missing genesis",
                mutate: |s| s.templates.ft_genesis.clear(),
                expected: Error::MissingTemplate("ft_genesis".into()),
            },
            Test {
                name: "missing tier",
                mutate: |s| s.templates.ft_unlock_check.retain(|t| t.max_outputs != 100),
                expected: Error::MissingTemplate("ft_unlock_check 3x100".into()),
            },
            Test {
                name: "code part without OP_RETURN",
                mutate: |s| s.templates.nft_token = vec![0x51],
                expected: Error::InvalidConfig("nft_token code part must end with OP_RETURN".into()),
            },
            Test { name: "zero fee rate", mutate: |s| s.feeb = 0.0, expected: Error::InvalidConfig("fee rate must be positive, got 0".into()) },
        ];

        for test in tests {
            let mut settings = ProtocolSettings { templates: test_templates(), ..Default::default() };
            (test.mutate)(&mut settings);
            assert_eq!(ProtocolConfig::new(settings).unwrap_err(), test.expected, "{}", test.name);
        }

        assert!(matches!(ProtocolConfig::from_toml_str("feeb = \"fast\""), Err(Error::Toml(_))));
        assert!(matches!(ProtocolConfig::from_toml_file("/nonexistent/protocol.toml"), Err(Error::Io(_))));
    }

    #[test]
    fn test_dust_threshold() {
        let config = test_config();
        assert_eq!(config.dust_threshold(25), 46);
        assert_eq!(config.dust_threshold(1000), 290);
    }
}

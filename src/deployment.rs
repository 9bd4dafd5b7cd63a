use crate::model::Address;
use chrono::Utc;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::BTreeMap,
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
pub const ARTIFACT_FILE: &str = "SolQuiz.json";
pub const CONTRACT_NAME: &str = "SolQuiz";

pub const SANDBOX_CHAIN_ID: u64 = 1337;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Sandbox,
    Sepolia,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Sandbox => SANDBOX_CHAIN_ID,
            Network::Sepolia => SEPOLIA_CHAIN_ID,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            SANDBOX_CHAIN_ID => Some(Network::Sandbox),
            SEPOLIA_CHAIN_ID => Some(Network::Sepolia),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Network::Sandbox => Network::Sepolia,
            Network::Sepolia => Network::Sandbox,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Sandbox => "Sandbox",
            Network::Sepolia => "Sepolia",
        };
        write!(f, "{name}")
    }
}

pub fn default_artifact_path() -> PathBuf {
    Path::new(DEPLOYMENTS_ROOT).join(ARTIFACT_FILE)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeployment {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<String>,
}

/// Build artifact listing the contract address per network id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkDeployment>,
}

impl Default for QuizArtifact {
    fn default() -> Self {
        Self {
            contract_name: CONTRACT_NAME.to_owned(),
            networks: BTreeMap::new(),
        }
    }
}

impl QuizArtifact {
    /// `Ok(None)` when the contract was never deployed to `chain_id`.
    pub fn address_for(&self, chain_id: u64) -> Result<Option<Address>> {
        let Some(entry) = self.networks.get(&chain_id.to_string()) else {
            return Ok(None);
        };
        let address = entry.address.parse::<Address>().wrap_err_with(|| {
            format!("Artifact address for network {chain_id} is malformed")
        })?;
        Ok(Some(address))
    }

    pub fn record(&mut self, chain_id: u64, address: Address, transaction_hash: Option<String>) {
        self.networks.insert(
            chain_id.to_string(),
            NetworkDeployment {
                address: address.to_string(),
                transaction_hash,
                deployed_at: Some(Utc::now().to_rfc3339()),
            },
        );
    }
}

#[derive(Debug)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or blank file loads as `None`.
    pub fn load(&self) -> Result<Option<QuizArtifact>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path).wrap_err("Failed to read deployment artifact")?;
        if data.is_empty() || data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let artifact = serde_json::from_slice::<QuizArtifact>(&data).map_err(|e| {
            eyre!(
                "Failed to parse deployment artifact {}: {e}",
                self.path.display()
            )
        })?;
        tracing::info!(
            path = %self.path.display(),
            fingerprint = %fingerprint(&data),
            networks = artifact.networks.len(),
            "loaded deployment artifact"
        );
        Ok(Some(artifact))
    }

    pub fn save(&self, artifact: &QuizArtifact) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create directory {}", parent.display())
            })?;
        }
        let json = serde_json::to_vec_pretty(artifact)
            .wrap_err("Failed to serialize deployment artifact")?;
        fs::write(&self.path, json).wrap_err("Failed to write deployment artifact")?;
        Ok(())
    }

    /// Loads (or starts) the artifact, records the deployment, writes it back.
    pub fn record_deployment(&self, chain_id: u64, address: Address) -> Result<QuizArtifact> {
        let mut artifact = self.load()?.unwrap_or_default();
        artifact.record(chain_id, address, None);
        self.save(&artifact)?;
        Ok(artifact)
    }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "solquiz-deployment-{}-{}",
            name,
            rand::random::<u64>()
        ));
        dir.join(ARTIFACT_FILE)
    }

    #[test]
    fn artifact_store__missing_file_loads_as_none() {
        let store = ArtifactStore::new(scratch_path("missing"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn artifact_store__record_deployment_round_trips_address() {
        // given
        let store = ArtifactStore::new(scratch_path("record"));
        let address = Address::new([0xab; 20]);

        // when
        store.record_deployment(SANDBOX_CHAIN_ID, address).unwrap();
        let loaded = store.load().unwrap().unwrap();

        // then
        assert_eq!(loaded.address_for(SANDBOX_CHAIN_ID).unwrap(), Some(address));
        assert_eq!(loaded.address_for(SEPOLIA_CHAIN_ID).unwrap(), None);
        let _ = fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn quiz_artifact__reads_truffle_layout() {
        // given
        let json = r#"{
            "contractName": "SolQuiz",
            "abi": [],
            "networks": {
                "11155111": {
                    "address": "0x00000000000000000000000000000000000000aa",
                    "transactionHash": "0xdead"
                }
            }
        }"#;

        // when
        let artifact: QuizArtifact = serde_json::from_str(json).unwrap();

        // then
        let expected = {
            let mut bytes = [0; 20];
            bytes[19] = 0xaa;
            Address::new(bytes)
        };
        assert_eq!(
            artifact.address_for(SEPOLIA_CHAIN_ID).unwrap(),
            Some(expected)
        );
    }

    #[test]
    fn quiz_artifact__malformed_address_is_an_error() {
        let mut artifact = QuizArtifact::default();
        artifact.networks.insert(
            SANDBOX_CHAIN_ID.to_string(),
            NetworkDeployment {
                address: "nope".to_owned(),
                transaction_hash: None,
                deployed_at: None,
            },
        );
        assert!(artifact.address_for(SANDBOX_CHAIN_ID).is_err());
    }

    #[test]
    fn fingerprint__is_stable_sha256_hex() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

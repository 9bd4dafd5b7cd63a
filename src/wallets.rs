use crate::{
    gateway::{
        AccountRequest,
        WalletEvent,
        WalletEvents,
        WalletProvider,
        WalletSubscription,
    },
    model::Address,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rand::Rng;
use rpassword::prompt_password;
use serde::Deserialize;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Clone, Debug)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub address: Address,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf, address: Address) -> Self {
        Self {
            name: name.into(),
            path,
            address,
        }
    }
}

#[derive(Deserialize)]
struct KeystoreHeader {
    address: Option<String>,
}

pub fn default_keystore_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".ethereum").join("keystore"))
}

pub fn resolve_keystore_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_keystore_dir(),
    }
}

/// Keystore files (`*.json`) that carry an `address`, sorted by name.
pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let entry = entry.wrap_err("Failed to read keystore entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        let header = fs::read(&path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<KeystoreHeader>(&bytes).ok());
        let Some(raw_address) = header.and_then(|h| h.address) else {
            tracing::warn!(path = %path.display(), "skipping keystore without address");
            continue;
        };
        match raw_address.parse::<Address>() {
            Ok(address) => wallets.push(WalletDescriptor::new(name, path, address)),
            Err(err) => {
                tracing::warn!(?err, path = %path.display(), "skipping keystore with bad address")
            }
        }
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<WalletDescriptor> {
    let wallets = list_wallets(dir)?;
    wallets
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| eyre!("Wallet '{name}' not found in {}", dir.to_string_lossy()))
}

pub fn unlock_wallet(descriptor: &WalletDescriptor, password: &str) -> Result<()> {
    decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{}'", descriptor.name))?;
    Ok(())
}

pub fn prompt_wallet_password(descriptor: &WalletDescriptor) -> Result<String> {
    let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
    prompt_password(prompt).wrap_err("Failed to read wallet password")
}

#[derive(Debug)]
enum Accounts {
    Keystore(Vec<WalletDescriptor>),
    Development(Vec<Address>),
}

#[derive(Debug)]
struct WalletState {
    chain_id: u64,
    selected: Option<Address>,
}

/// Wallet provider backed by a local keystore directory or generated
/// development accounts.
#[derive(Clone, Debug)]
pub struct LocalWallet {
    accounts: Arc<Accounts>,
    state: Arc<Mutex<WalletState>>,
    events: WalletEvents,
}

impl LocalWallet {
    fn with_accounts(accounts: Accounts, chain_id: u64) -> Self {
        Self {
            accounts: Arc::new(accounts),
            state: Arc::new(Mutex::new(WalletState {
                chain_id,
                selected: None,
            })),
            events: WalletEvents::default(),
        }
    }

    pub fn keystore(descriptors: Vec<WalletDescriptor>, chain_id: u64) -> Self {
        Self::with_accounts(Accounts::Keystore(descriptors), chain_id)
    }

    /// `None` when the directory does not exist.
    pub fn detect_keystore(dir: &Path, chain_id: u64) -> Result<Option<Self>> {
        if !dir.exists() {
            tracing::info!(dir = %dir.display(), "no keystore directory");
            return Ok(None);
        }
        let descriptors = list_wallets(dir)?;
        tracing::info!(count = descriptors.len(), "keystore wallets found");
        Ok(Some(Self::keystore(descriptors, chain_id)))
    }

    pub fn development(count: usize, chain_id: u64, rng: &mut impl Rng) -> Self {
        let accounts = (0..count)
            .map(|_| Address::new(rng.random::<[u8; 20]>()))
            .collect();
        Self::with_accounts(Accounts::Development(accounts), chain_id)
    }

    pub fn development_with(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self::with_accounts(Accounts::Development(accounts), chain_id)
    }

    /// Labelled accounts the wallet can offer for approval.
    pub fn accounts(&self) -> Vec<(String, Address)> {
        match &*self.accounts {
            Accounts::Keystore(descriptors) => descriptors
                .iter()
                .map(|d| (d.name.clone(), d.address))
                .collect(),
            Accounts::Development(addresses) => addresses
                .iter()
                .enumerate()
                .map(|(idx, address)| (format!("dev-{idx}"), *address))
                .collect(),
        }
    }

    pub fn current_chain_id(&self) -> u64 {
        self.state.lock().map(|s| s.chain_id).unwrap_or_default()
    }

    pub fn switch_chain(&self, chain_id: u64) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| eyre!("wallet state poisoned"))?;
            state.chain_id = chain_id;
        }
        tracing::info!(chain_id, "wallet switched network");
        self.events.emit(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    /// Moves the selection to the next development account and notifies
    /// subscribers. Keystore accounts need an unlock instead.
    pub fn cycle_account(&self) -> Result<Option<Address>> {
        let Accounts::Development(addresses) = &*self.accounts else {
            return Err(eyre!("Keystore accounts must be unlocked to switch"));
        };
        if addresses.is_empty() {
            return Ok(None);
        }
        let next = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| eyre!("wallet state poisoned"))?;
            let idx = state
                .selected
                .and_then(|current| addresses.iter().position(|a| *a == current))
                .map_or(0, |idx| (idx + 1) % addresses.len());
            state.selected = Some(addresses[idx]);
            addresses[idx]
        };
        self.events
            .emit(WalletEvent::AccountsChanged(vec![next]));
        Ok(Some(next))
    }

    /// Unlocks a keystore account with a terminal password prompt before the
    /// UI takes over the screen.
    pub fn unlock_interactive(&self, name: &str) -> Result<Address> {
        let Accounts::Keystore(descriptors) = &*self.accounts else {
            return Err(eyre!("Only keystore wallets can be unlocked"));
        };
        let descriptor = descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| eyre!("Wallet '{name}' not found"))?;
        let password = prompt_wallet_password(descriptor)?;
        unlock_wallet(descriptor, &password)?;
        self.set_selected(Some(descriptor.address))?;
        Ok(descriptor.address)
    }

    fn set_selected(&self, address: Option<Address>) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| eyre!("wallet state poisoned"))?;
        state.selected = address;
        Ok(())
    }
}

impl WalletProvider for LocalWallet {
    async fn chain_id(&self) -> Result<u64> {
        let state = self
            .state
            .lock()
            .map_err(|_| eyre!("wallet state poisoned"))?;
        Ok(state.chain_id)
    }

    fn selected_address(&self) -> Option<Address> {
        self.state.lock().ok().and_then(|s| s.selected)
    }

    fn requires_password(&self) -> bool {
        matches!(&*self.accounts, Accounts::Keystore(_))
    }

    async fn request_accounts(&self, request: AccountRequest) -> Result<Vec<Address>> {
        let address = match &*self.accounts {
            Accounts::Development(addresses) => {
                let address = request
                    .account
                    .or_else(|| addresses.first().copied())
                    .ok_or_else(|| eyre!("No development accounts available"))?;
                if !addresses.contains(&address) {
                    return Err(eyre!("Account {address} is not managed by this wallet"));
                }
                address
            }
            Accounts::Keystore(descriptors) => {
                let descriptor = match request.account {
                    Some(account) => descriptors.iter().find(|d| d.address == account),
                    None => descriptors.first(),
                }
                .cloned()
                .ok_or_else(|| eyre!("No keystore account to unlock"))?;
                let password = request.password.ok_or_else(|| {
                    eyre!("Password required to unlock '{}'", descriptor.name)
                })?;
                let address = descriptor.address;
                tokio::task::spawn_blocking(move || unlock_wallet(&descriptor, &password))
                    .await
                    .wrap_err("Keystore unlock task failed")??;
                address
            }
        };
        self.set_selected(Some(address))?;
        tracing::info!(%address, "account approved");
        Ok(vec![address])
    }

    fn subscribe(&self) -> WalletSubscription {
        self.events.subscribe()
    }
}

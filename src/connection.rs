use crate::{
    deployment::QuizArtifact,
    gateway::{
        AccountRequest,
        ContractDirectory,
        QuizContract,
        Session,
        WalletEvent,
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
use tracing::{
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotReadyReason {
    Initializing,
    NoWallet,
    NoArtifact,
    NoAccount,
    WrongNetwork,
}

impl NotReadyReason {
    pub fn message(self) -> &'static str {
        match self {
            NotReadyReason::Initializing => "Loading...",
            NotReadyReason::NoWallet => "No wallet found",
            NotReadyReason::NoArtifact => "No contract artifact found",
            NotReadyReason::NoAccount => "No account found",
            NotReadyReason::WrongNetwork => {
                "Wrong network. Please switch to Sepolia Test Network."
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    NotReady(NotReadyReason),
    Ready {
        account: Address,
        manager: Address,
        chain_id: u64,
    },
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready { .. })
    }

    pub fn not_ready_reason(&self) -> Option<NotReadyReason> {
        match self {
            ConnectionState::NotReady(reason) => Some(*reason),
            ConnectionState::Ready { .. } => None,
        }
    }

    pub fn account(&self) -> Option<Address> {
        match self {
            ConnectionState::Ready { account, .. } => Some(*account),
            ConnectionState::NotReady(_) => None,
        }
    }

    pub fn manager(&self) -> Option<Address> {
        match self {
            ConnectionState::Ready { manager, .. } => Some(*manager),
            ConnectionState::NotReady(_) => None,
        }
    }
}

/// Result of a completed probe: the network answered and the contract is live.
#[derive(Clone, Debug)]
struct Probe<C> {
    chain_id: u64,
    manager: Address,
    contract: C,
}

/// Derives readiness from wallet, artifact and network, and hands out a
/// [`Session`] once everything lines up.
pub struct ConnectionTracker<W, D: ContractDirectory> {
    wallet: Option<W>,
    directory: D,
    artifact: Option<QuizArtifact>,
    reason: NotReadyReason,
    probe: Option<Probe<D::Contract>>,
    account: Option<Address>,
}

impl<W, D> ConnectionTracker<W, D>
where
    W: WalletProvider,
    D: ContractDirectory,
{
    pub fn new(wallet: Option<W>, directory: D, artifact: Option<QuizArtifact>) -> Self {
        Self {
            wallet,
            directory,
            artifact,
            reason: NotReadyReason::Initializing,
            probe: None,
            account: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.probe, self.account) {
            (Some(probe), Some(account)) => ConnectionState::Ready {
                account,
                manager: probe.manager,
                chain_id: probe.chain_id,
            },
            (Some(_), None) => ConnectionState::NotReady(NotReadyReason::NoAccount),
            (None, _) => ConnectionState::NotReady(self.reason),
        }
    }

    pub fn session(&self) -> Option<Session<D::Contract>> {
        let probe = self.probe.as_ref()?;
        let account = self.account?;
        Some(Session {
            account,
            manager: probe.manager,
            chain_id: probe.chain_id,
            contract: probe.contract.clone(),
        })
    }

    pub fn wallet(&self) -> Option<&W> {
        self.wallet.as_ref()
    }

    pub fn subscribe(&self) -> Option<WalletSubscription> {
        self.wallet.as_ref().map(WalletProvider::subscribe)
    }

    pub fn set_artifact(&mut self, artifact: Option<QuizArtifact>) {
        self.artifact = artifact;
    }

    /// Probes wallet, artifact, network and contract in order. The session is
    /// cleared first, so nothing from a previous probe survives a failure.
    pub async fn initialize(&mut self) -> Result<()> {
        self.probe = None;
        self.account = None;
        self.reason = NotReadyReason::Initializing;

        let Some(wallet) = self.wallet.as_ref() else {
            self.reason = NotReadyReason::NoWallet;
            info!("no wallet provider");
            return Ok(());
        };
        let Some(artifact) = self.artifact.as_ref() else {
            self.reason = NotReadyReason::NoArtifact;
            info!("no deployment artifact");
            return Ok(());
        };
        let chain_id = wallet
            .chain_id()
            .await
            .wrap_err("Failed to resolve network id")?;
        let Some(address) = artifact.address_for(chain_id)? else {
            self.reason = NotReadyReason::WrongNetwork;
            info!(chain_id, "contract not deployed on this network");
            return Ok(());
        };
        let contract = self
            .directory
            .instantiate(chain_id, address)
            .wrap_err_with(|| format!("Failed to instantiate contract at {address}"))?;
        let manager = contract
            .manager()
            .await
            .wrap_err("Failed to read contract manager")?;

        self.account = wallet.selected_address();
        self.reason = NotReadyReason::NoAccount;
        self.probe = Some(Probe {
            chain_id,
            manager,
            contract,
        });
        info!(chain_id, %address, %manager, account = ?self.account, "connection probed");
        Ok(())
    }

    /// Adopts the first account of a notification; an empty list clears it.
    pub fn set_account(&mut self, accounts: &[Address]) {
        self.account = accounts.first().copied();
        info!(account = ?self.account, "account changed");
    }

    pub fn disconnect(&mut self) {
        self.account = None;
        info!("disconnected");
    }

    /// Asks the wallet for approval and adopts the first approved account.
    pub async fn connect(&mut self, request: AccountRequest) -> Result<Option<Address>> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| eyre!("No wallet to connect"))?;
        let accounts = wallet
            .request_accounts(request)
            .await
            .wrap_err("Account request was not approved")?;
        self.set_account(&accounts);
        Ok(self.account)
    }

    pub async fn handle_wallet_event(&mut self, event: WalletEvent) -> Result<()> {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                self.set_account(&accounts);
                Ok(())
            }
            WalletEvent::ChainChanged(chain_id) => {
                info!(chain_id, "network changed, re-initializing");
                self.initialize().await.inspect_err(|err| {
                    warn!(?err, "re-initialization after network change failed")
                })
            }
        }
    }
}

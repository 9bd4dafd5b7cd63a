use crate::{
    gateway::{
        QuizContract,
        Session,
    },
    model::{
        Address,
        Receipt,
        User,
    },
};
use color_eyre::eyre::Result;
use tracing::{
    debug,
    info,
    warn,
};

/// Write issued by [`ProfileSession::begin_save`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileWrite {
    Create(String),
    Edit(String),
}

impl ProfileWrite {
    pub fn display_name(&self) -> &str {
        match self {
            ProfileWrite::Create(name) | ProfileWrite::Edit(name) => name,
        }
    }

    pub async fn send<C: QuizContract>(self, contract: &C, from: Address) -> Result<Receipt> {
        match self {
            ProfileWrite::Create(name) => contract.create_user(name, from).await,
            ProfileWrite::Edit(name) => contract.edit_user(name, from).await,
        }
    }
}

/// The current account's display name and point balance.
#[derive(Debug, Default)]
pub struct ProfileSession {
    user: Option<User>,
    loaded_for: Option<Address>,
    loading: bool,
    saving: bool,
    editor_open: bool,
    points_adjusted: bool,
}

impl ProfileSession {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn has_profile(&self) -> bool {
        self.user.as_ref().is_some_and(User::has_profile)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.display_name.as_deref())
    }

    pub fn points(&self) -> Option<i64> {
        self.user.as_ref().and_then(|u| u.points)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_editor_open(&self) -> bool {
        self.editor_open
    }

    pub fn open_editor(&mut self) {
        self.editor_open = true;
    }

    pub fn close_editor(&mut self) {
        self.editor_open = false;
    }

    /// Forgets everything; used when the account or network goes away.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin_load(&mut self, account: Address) {
        self.loading = true;
        self.loaded_for = Some(account);
    }

    /// Applies a `leaderboard(account)` result. Results for an account other
    /// than the one last requested are dropped.
    pub fn finish_load(&mut self, account: Address, result: Result<User>) {
        if self.loaded_for != Some(account) {
            debug!(%account, "dropping profile for a previous account");
            return;
        }
        self.loading = false;
        match result {
            Ok(remote) => {
                if self.points_adjusted {
                    let local = self.points();
                    if local != remote.points {
                        warn!(
                            ?local,
                            remote = ?remote.points,
                            "local point balance drifted from contract"
                        );
                    }
                }
                self.points_adjusted = false;
                info!(%account, name = ?remote.display_name, points = ?remote.points, "profile loaded");
                self.user = Some(remote);
            }
            Err(err) => warn!(?err, %account, "loading profile failed"),
        }
    }

    pub async fn load<C: QuizContract>(&mut self, session: &Session<C>) {
        self.begin_load(session.account);
        let result = session.contract.leaderboard(session.account).await;
        self.finish_load(session.account, result);
    }

    /// Decides between `createUser` and `editUser`. `None` means nothing to
    /// send: empty name, not connected, or a save already in flight.
    pub fn begin_save(&mut self, ready: bool, display_name: &str) -> Option<ProfileWrite> {
        if !ready || display_name.is_empty() || self.saving {
            return None;
        }
        self.saving = true;
        let name = display_name.to_owned();
        Some(if self.has_profile() {
            ProfileWrite::Edit(name)
        } else {
            ProfileWrite::Create(name)
        })
    }

    /// Returns whether the write went through. The editor closes only on
    /// success.
    pub fn finish_save(&mut self, write: ProfileWrite, result: Result<Receipt>) -> bool {
        self.saving = false;
        match result {
            Ok(_) => {
                let user = self.user.get_or_insert_with(User::default);
                user.display_name = Some(write.display_name().to_owned());
                self.editor_open = false;
                info!(name = write.display_name(), "profile saved");
                true
            }
            Err(err) => {
                warn!(?err, "saving profile failed");
                false
            }
        }
    }

    pub async fn save<C: QuizContract>(
        &mut self,
        session: Option<&Session<C>>,
        display_name: &str,
    ) -> bool {
        let Some(session) = session else {
            return false;
        };
        let Some(write) = self.begin_save(true, display_name) else {
            return false;
        };
        let result = write
            .clone()
            .send(&session.contract, session.account)
            .await;
        self.finish_save(write, result)
    }

    /// Adds points reported by a `PointsAwarded` event.
    pub fn award(&mut self, amount: Option<u64>) {
        let Some(amount) = amount else {
            return;
        };
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        self.adjust_points(amount);
    }

    pub fn spend(&mut self, cost: i64) {
        self.adjust_points(-cost);
    }

    fn adjust_points(&mut self, delta: i64) {
        let user = self.user.get_or_insert_with(User::default);
        let points = user.points.unwrap_or(0).saturating_add(delta);
        if points < 0 {
            warn!(points, "point balance went negative");
        }
        user.points = Some(points);
        self.points_adjusted = true;
    }
}

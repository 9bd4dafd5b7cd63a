use crate::{
    gateway::{
        LeaderboardColumns,
        QuizContract,
        Session,
    },
    model::{
        Address,
        LeaderboardEntry,
    },
};
use color_eyre::eyre::Result;
use itertools::izip;
use tracing::{
    error,
    info,
    warn,
};

/// Zips the three columns and orders by points, highest first. Columns of
/// unequal length are reported and truncated to the shortest.
pub fn assemble(columns: LeaderboardColumns) -> Vec<LeaderboardEntry> {
    let LeaderboardColumns {
        addresses,
        display_names,
        points,
    } = columns;
    if addresses.len() != display_names.len() || addresses.len() != points.len() {
        error!(
            addresses = addresses.len(),
            names = display_names.len(),
            points = points.len(),
            "Leaderboard data is corrupted"
        );
    }
    let mut entries: Vec<LeaderboardEntry> = izip!(addresses, display_names, points)
        .map(|(address, display_name, points)| LeaderboardEntry {
            address,
            display_name,
            points,
        })
        .collect();
    if entries.len() > 1 {
        entries.sort_by(|a, b| b.points.cmp(&a.points));
    }
    entries
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    loading: bool,
}

impl Leaderboard {
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn begin_fetch(&mut self) {
        self.loading = true;
    }

    /// A failed fetch keeps the last entries.
    pub fn finish_fetch(&mut self, result: Result<LeaderboardColumns>) {
        self.loading = false;
        match result {
            Ok(columns) => {
                self.entries = assemble(columns);
                info!(entries = self.entries.len(), "leaderboard fetched");
            }
            Err(err) => warn!(?err, "fetching leaderboard failed"),
        }
    }

    pub async fn fetch<C: QuizContract>(&mut self, session: &Session<C>) {
        self.begin_fetch();
        let result = session.contract.get_leaderboard().await;
        self.finish_fetch(result);
    }

    /// 1-based rank of `account`, if listed.
    pub fn rank_of(&self, account: Address) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.address == account)
            .map(|idx| idx + 1)
    }
}

/// Deterministic RGB colour for an avatar, derived from the name's UTF-16
/// code units with a `hash * 31 + c` style hash in 32-bit wrapping space.
pub fn avatar_color(name: &str) -> (u8, u8, u8) {
    let hash = name.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit)
            .wrapping_add(hash.wrapping_shl(5))
            .wrapping_sub(hash)
    });
    let byte = |i: u32| ((hash >> (i * 8)) & 0xff) as u8;
    (byte(0), byte(1), byte(2))
}

pub fn avatar_hex(name: &str) -> String {
    let (r, g, b) = avatar_color(name);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// First letter of the first two space-separated words.
pub fn initials(name: &str) -> String {
    let mut words = name.split(' ');
    let first = words.next().and_then(|w| w.chars().next());
    let second = words.next().and_then(|w| w.chars().next());
    first.into_iter().chain(second).collect()
}

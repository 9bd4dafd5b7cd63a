pub mod connection;
pub mod deployment;
pub mod draft;
pub mod gateway;
pub mod leaderboard;
pub mod model;
pub mod profile;
pub mod quiz_session;
pub mod sandbox;
pub mod trivia;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

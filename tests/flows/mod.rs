mod authoring;
mod connection;
mod playing;
pub mod support;

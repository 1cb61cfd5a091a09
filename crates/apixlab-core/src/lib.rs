//! Core APIXLab library (wallet login sequencer, backend client, session, config).

pub mod backend;
pub mod challenge;
pub mod config;
pub mod error;
pub mod logging;
pub mod sequencer;
pub mod session;
pub mod status;
pub mod storage;
pub mod wallet;

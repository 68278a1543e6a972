//! # Authentication Flow Client
//!
//! The application-side half of the delegated authentication flow: builds
//! the authorization redirect, validates the callback's anti-forgery state,
//! redeems the code at the gateway and maintains the resulting session.
//!
//! The entry point is [`AuthFlow`]; storage and wallet derivation are
//! pluggable via [`storage::KeyValueStorage`] and [`wallet::WalletDeriver`].

#![deny(missing_docs)]

pub mod config;
pub mod flow;
pub mod storage;
pub mod wallet;

pub(crate) mod gateway;

pub use config::AuthFlowConfig;
pub use flow::{AuthFlow, AuthFlowError, AuthSession, AuthStage};

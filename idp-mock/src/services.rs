//! The services of the mock identity provider.

pub(crate) mod code_store;
pub(crate) mod token_issuer;

//! Versioned API types exchanged between client, gateway and provider.

pub mod v1;

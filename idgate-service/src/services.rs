//! The services of the authentication gateway.

pub(crate) mod assertion;
pub(crate) mod exchange;
pub(crate) mod gateway;
pub(crate) mod key_material;
pub(crate) mod token;

pub(crate) mod aws;
pub(crate) mod credentials;
pub(crate) mod errors;
pub(crate) mod forward;
pub(crate) mod middleware;
pub(crate) mod proxy;
pub(crate) mod signer;
pub(crate) mod sigv4;
pub(crate) mod state;
pub(crate) mod summary;
pub(crate) mod transform;

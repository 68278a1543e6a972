//! Metric keys of the authentication gateway.

/// Counter: callbacks that ended in a verified identity token.
pub const METRICS_KEY_CALLBACK_SUCCESS: &str = "auth.callback.success";
/// Counter: token exchanges the provider rejected.
pub const METRICS_KEY_EXCHANGE_REJECTED: &str = "auth.exchange.provider_rejected";
/// Counter: token exchanges that never got a response.
pub const METRICS_KEY_EXCHANGE_TRANSPORT: &str = "auth.exchange.transport_error";
/// Counter: identity tokens that failed to decrypt.
pub const METRICS_KEY_TOKEN_DECRYPTION_FAILED: &str = "auth.token.decryption_failed";
/// Counter: decrypted identity tokens that failed verification.
pub const METRICS_KEY_TOKEN_VERIFICATION_FAILED: &str = "auth.token.verification_failed";

/// Describe all metrics used by the service.
///
/// This calls the `describe_*` functions from the `metrics` crate to set
/// metadata on the different metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        METRICS_KEY_CALLBACK_SUCCESS,
        metrics::Unit::Count,
        "Number of successful authentication callbacks"
    );
    metrics::describe_counter!(
        METRICS_KEY_EXCHANGE_REJECTED,
        metrics::Unit::Count,
        "Number of token exchanges rejected by the identity provider"
    );
    metrics::describe_counter!(
        METRICS_KEY_EXCHANGE_TRANSPORT,
        metrics::Unit::Count,
        "Number of token exchanges without a response from the identity provider"
    );
    metrics::describe_counter!(
        METRICS_KEY_TOKEN_DECRYPTION_FAILED,
        metrics::Unit::Count,
        "Number of identity tokens that could not be decrypted"
    );
    metrics::describe_counter!(
        METRICS_KEY_TOKEN_VERIFICATION_FAILED,
        metrics::Unit::Count,
        "Number of decrypted identity tokens that failed signature or claim verification"
    );
}

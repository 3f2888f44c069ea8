//! # Coordinator Wire Constants
//!
//! Route names, payload keys and fixed strings shared with the federated
//! learning coordinator. These must match the server byte for byte.

/// HTTP routes exposed by the coordinator, relative to the server root
pub mod routes {
    pub const REGISTER_WORKER: &str = "register_worker";
    pub const RETURN_GLOBAL_MODEL: &str = "return_global_model";
    pub const QUERY_GLOBAL_MODEL_STATUS: &str = "query_global_model_status";
    pub const RECEIVE_WORKER_UPDATE: &str = "receive_worker_update";
}

/// Keys used in request payloads
pub mod keys {
    pub const WORKER_ID: &str = "worker_id";
    pub const ID_AND_MODEL: &str = "id_and_model";
    pub const PUBLIC_KEY_STR: &str = "public_key_str";
    pub const SIGNED_PHRASE: &str = "signed_phrase";
}

/// Phrase every worker signs to prove possession of its private key
pub const WORKER_AUTHENTICATION_PHRASE: &[u8] = b"Please authenticate me";

/// Registration response meaning the server could not authenticate the worker
pub const INVALID_WORKER: &str = "invalid_worker";

/// Placeholder sent as `signed_phrase` when the worker runs unauthenticated
pub const NO_PRIVATE_KEY_PLACEHOLDER: &str =
    "No private key was provided when worker was started.";

/// Placeholder sent as `public_key_str` when the worker runs unauthenticated
pub const NO_PUBLIC_KEY_PLACEHOLDER: &str = "No public key was provided when worker was started.";

/// Suffix appended to the private key path to locate the public key
pub const PUBLIC_KEY_SUFFIX: &str = ".pub";

/// Default seconds between status polls
pub const DEFAULT_POLLING_WAIT_SECS: u64 = 1;

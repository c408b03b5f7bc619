pub mod google;
pub mod middleware;
pub mod token;

/// Authenticated caller identity attached to request extensions by the auth
/// middleware. The email is the sole key for quota and audit records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

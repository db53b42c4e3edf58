use serde::Serialize;

use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
    /// Lifetime of `access_token` in seconds.
    pub(crate) expires_in: u64,
    pub(crate) user: UserResponse,
}

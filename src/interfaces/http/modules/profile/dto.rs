use serde::Serialize;
use utoipa::ToSchema;

/// Combined account + profile view returned to the authenticated caller
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub role: String,
}

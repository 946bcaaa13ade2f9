//! Request and response envelopes shared by the handlers

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Field values as typed into the form. Absent keys deserialize as empty.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmitFormRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 40))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub message: String,

    #[serde(default, rename = "botField", alias = "bot_field")]
    #[validate(length(max = 200))]
    pub bot_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeTokenRequest {
    pub token: String,
}

//! Contact form payloads and the outbound wire formats

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactFields {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            message: message.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.phone.is_empty() && self.message.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Everything one submit event carries into the service.
#[derive(Debug, Clone, Default)]
pub struct SubmissionPayload {
    pub fields: ContactFields,
    pub bot_field: String,
    pub challenge_token: Option<String>,
}

impl SubmissionPayload {
    pub fn new(fields: ContactFields) -> Self {
        Self {
            fields,
            bot_field: String::new(),
            challenge_token: None,
        }
    }

    pub fn with_bot_field(mut self, value: impl Into<String>) -> Self {
        self.bot_field = value.into();
        self
    }

    pub fn with_challenge_token(mut self, token: impl Into<String>) -> Self {
        self.challenge_token = Some(token.into());
        self
    }
}

/// JSON body sent to the delivery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_token: Option<String>,
}

/// Keyed relay request: the relay's identifiers wrap the message as template parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub template_params: OutboundMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub delivered_at: chrono::DateTime<chrono::Utc>,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_message_omits_absent_optionals() {
        let message = OutboundMessage {
            name: "Igreja Batista".to_string(),
            email: "pastor@igreja.org".to_string(),
            phone: "5521997767702".to_string(),
            message: "Orçamento para mesa de som".to_string(),
            time: "14/10/2026, 09:30:00".to_string(),
            reply_to: None,
            challenge_token: None,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["phone"], "5521997767702");
        assert!(json.get("replyTo").is_none());
        assert!(json.get("challengeToken").is_none());
    }

    #[test]
    fn test_relay_envelope_uses_relay_key_names() {
        let envelope = RelayEnvelope {
            service_id: "service_x".to_string(),
            template_id: "template_y".to_string(),
            user_id: "public_z".to_string(),
            access_token: Some("secret".to_string()),
            template_params: OutboundMessage {
                name: "a".to_string(),
                email: "a@b.c".to_string(),
                phone: "551199999999".to_string(),
                message: "m".to_string(),
                time: "t".to_string(),
                reply_to: Some("a@b.c".to_string()),
                challenge_token: Some("tok".to_string()),
            },
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["service_id"], "service_x");
        assert_eq!(json["user_id"], "public_z");
        assert_eq!(json["accessToken"], "secret");
        assert_eq!(json["template_params"]["replyTo"], "a@b.c");
        assert_eq!(json["template_params"]["challengeToken"], "tok");
    }

    #[test]
    fn test_fields_clear() {
        let mut fields = ContactFields::new("a", "b", "c", "d");
        assert!(!fields.is_blank());
        fields.clear();
        assert!(fields.is_blank());
    }
}

//! Ordered local checks run before any network activity

use super::{
    error::SubmissionError,
    models::{ContactFields, SubmissionPayload},
    phone,
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_SHAPE: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// Trimmed fields and the challenge token of a payload that passed every local check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub fields: ContactFields,
    pub challenge_token: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email)
}

/// Checks run in a fixed order and the first failure wins.
pub fn validate_payload(
    payload: &SubmissionPayload,
    challenge_required: bool,
) -> Result<ValidatedSubmission, SubmissionError> {
    if !payload.bot_field.is_empty() {
        return Err(SubmissionError::BotDetected);
    }

    let fields = ContactFields {
        name: payload.fields.name.trim().to_string(),
        email: payload.fields.email.trim().to_string(),
        phone: payload.fields.phone.trim().to_string(),
        message: payload.fields.message.trim().to_string(),
    };

    if fields.name.is_empty()
        || fields.email.is_empty()
        || fields.phone.is_empty()
        || fields.message.is_empty()
    {
        return Err(SubmissionError::MissingField);
    }

    if !is_valid_email(&fields.email) {
        return Err(SubmissionError::InvalidEmail);
    }

    if !phone::has_valid_digit_count(&fields.phone) {
        return Err(SubmissionError::InvalidPhone);
    }

    let challenge_token = payload
        .challenge_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    if challenge_required && challenge_token.is_none() {
        return Err(SubmissionError::ChallengeRequired);
    }

    Ok(ValidatedSubmission {
        fields,
        challenge_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> SubmissionPayload {
        SubmissionPayload::new(ContactFields::new(
            "Igreja Central",
            "contato@igreja.org",
            "(21) 99776-7702",
            "Precisamos de microfones sem fio",
        ))
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("pastor.joao@igreja.org.br"));
        assert!(!is_valid_email("abc"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.c"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[test]
    fn test_valid_payload_passes_and_is_trimmed() {
        let mut payload = valid_payload();
        payload.fields.name = "  Igreja Central  ".to_string();

        let validated = validate_payload(&payload, false).unwrap();
        assert_eq!(validated.fields.name, "Igreja Central");
        assert_eq!(validated.challenge_token, None);
    }

    #[test]
    fn test_honeypot_wins_over_everything() {
        let payload = SubmissionPayload::new(ContactFields::default()).with_bot_field("spam");
        assert_eq!(validate_payload(&payload, true), Err(SubmissionError::BotDetected));
    }

    #[test]
    fn test_each_empty_field_is_missing() {
        for index in 0..4 {
            let mut payload = valid_payload();
            match index {
                0 => payload.fields.name = "   ".to_string(),
                1 => payload.fields.email = String::new(),
                2 => payload.fields.phone = "\t".to_string(),
                _ => payload.fields.message = String::new(),
            }
            assert_eq!(validate_payload(&payload, false), Err(SubmissionError::MissingField));
        }
    }

    #[test]
    fn test_invalid_email_is_reported_before_phone() {
        let mut payload = valid_payload();
        payload.fields.email = "a@b".to_string();
        payload.fields.phone = "123".to_string();
        assert_eq!(validate_payload(&payload, false), Err(SubmissionError::InvalidEmail));
    }

    #[test]
    fn test_phone_digit_bounds() {
        let cases = [
            ("123456789", false),
            ("1234567890", true),
            ("1234567890123", true),
            ("12345678901234", false),
        ];

        for (phone, accepted) in cases {
            let mut payload = valid_payload();
            payload.fields.phone = phone.to_string();
            let result = validate_payload(&payload, false);
            if accepted {
                assert!(result.is_ok(), "{} should be accepted", phone);
            } else {
                assert_eq!(result, Err(SubmissionError::InvalidPhone), "{} should be rejected", phone);
            }
        }
    }

    #[test]
    fn test_challenge_token_required_only_when_configured() {
        let payload = valid_payload();
        assert!(validate_payload(&payload, false).is_ok());
        assert_eq!(validate_payload(&payload, true), Err(SubmissionError::ChallengeRequired));

        let blank_token = valid_payload().with_challenge_token("  ");
        assert_eq!(validate_payload(&blank_token, true), Err(SubmissionError::ChallengeRequired));

        let with_token = valid_payload().with_challenge_token("cf-token");
        let validated = validate_payload(&with_token, true).unwrap();
        assert_eq!(validated.challenge_token.as_deref(), Some("cf-token"));
    }
}

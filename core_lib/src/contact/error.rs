//! Submission error taxonomy and the user-facing messages for each kind

use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Mensagem enviada com sucesso! Entraremos em contato em breve.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("honeypot field was filled")]
    BotDetected,

    #[error("a required field is empty")]
    MissingField,

    #[error("email does not match the expected shape")]
    InvalidEmail,

    #[error("phone digit count out of range")]
    InvalidPhone,

    #[error("anti-bot challenge token is missing")]
    ChallengeRequired,

    #[error("a submission is already in flight")]
    AlreadySubmitting,

    #[error("cooldown active for {0} more seconds")]
    CooldownActive(u64),

    #[error("delivery configuration is missing")]
    ConfigurationMissing,

    #[error("delivery timed out")]
    Timeout,

    #[error("delivery rejected: {0}")]
    DeliveryRejected(String),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl SubmissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::BotDetected => "bot_detected",
            SubmissionError::MissingField => "missing_field",
            SubmissionError::InvalidEmail => "invalid_email",
            SubmissionError::InvalidPhone => "invalid_phone",
            SubmissionError::ChallengeRequired => "challenge_required",
            SubmissionError::AlreadySubmitting => "already_submitting",
            SubmissionError::CooldownActive(_) => "cooldown_active",
            SubmissionError::ConfigurationMissing => "configuration_missing",
            SubmissionError::Timeout => "timeout",
            SubmissionError::DeliveryRejected(_) => "delivery_rejected",
            SubmissionError::NetworkError(_) => "network_error",
        }
    }

    /// Text shown to the visitor. `None` means the attempt is silently ignored.
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            SubmissionError::MissingField => "Por favor, preencha todos os campos.".to_string(),
            SubmissionError::InvalidEmail => "Por favor, informe um e-mail válido.".to_string(),
            SubmissionError::InvalidPhone => {
                "Por favor, informe um telefone válido com DDD.".to_string()
            }
            SubmissionError::BotDetected => "Não foi possível enviar sua mensagem.".to_string(),
            SubmissionError::ChallengeRequired => {
                "Por favor, confirme que você não é um robô.".to_string()
            }
            SubmissionError::AlreadySubmitting => return None,
            SubmissionError::CooldownActive(seconds) => format!(
                "Aguarde {} segundos antes de enviar outra mensagem.",
                seconds
            ),
            SubmissionError::ConfigurationMissing => {
                "Configuração do serviço de contato ausente.".to_string()
            }
            SubmissionError::Timeout => {
                "Tempo de resposta excedido. Verifique sua conexão e tente novamente.".to_string()
            }
            SubmissionError::DeliveryRejected(_) | SubmissionError::NetworkError(_) => {
                "Erro ao enviar mensagem. Tente novamente.".to_string()
            }
        };
        Some(message)
    }

    /// Supplementary detail that may be shown next to the message.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            SubmissionError::DeliveryRejected(body) => Some(body.as_str()),
            _ => None,
        }
    }
}

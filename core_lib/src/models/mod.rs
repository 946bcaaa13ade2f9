pub mod request;

pub use request::{ApiResponse, ChallengeTokenRequest, SubmitFormRequest};

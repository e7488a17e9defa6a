//! Improvement requests sent from the settings page.

use crate::errors::QuestError;
use crate::models::{Feedback, FeedbackRequest};
use crate::session::SessionKey;
use chrono::Utc;

/// Validates the request and stamps it with the sender.
pub fn prepare(request: FeedbackRequest, sender: &SessionKey) -> Result<Feedback, QuestError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(QuestError::Invalid(
            "tell us a little more about the improvement you need".into(),
        ));
    }
    let user_id = match sender {
        SessionKey::Account(user_id) => Some(user_id.clone()),
        SessionKey::Guest(_) => None,
    };

    Ok(Feedback {
        category: request.category,
        message: message.to_string(),
        email: request
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty()),
        user_id,
        submitted_at: Utc::now(),
    })
}

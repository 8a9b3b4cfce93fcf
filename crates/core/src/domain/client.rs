use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Client and event metadata attached to a quote request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub event_type: String,
    pub event_date: String,
    pub event_location: String,
}

impl ClientInfo {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("client.name must not be empty".to_owned()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::InvalidInput(format!(
                "client.email is not a valid address: `{email}`"
            )));
        }
        if self.event_type.trim().is_empty() {
            return Err(DomainError::InvalidInput("client.event_type must not be empty".to_owned()));
        }
        if self.event_date.trim().is_empty() {
            return Err(DomainError::InvalidInput("client.event_date must not be empty".to_owned()));
        }
        if self.event_location.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "client.event_location must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

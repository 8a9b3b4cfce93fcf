use std::sync::Mutex;

use chrono::Utc;

use cotizador_core::domain::client::ClientInfo;

use super::{ClientRepository, NewQuote, QuoteRepository, QuoteSummary, RepositoryError};

/// In-memory doubles for handler tests and offline tooling.
#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: Mutex<Vec<ClientInfo>>,
}

#[async_trait::async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn upsert(&self, client: &ClientInfo) -> Result<i64, RepositoryError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| RepositoryError::Decode("client store poisoned".to_string()))?;

        let matches = |existing: &ClientInfo| {
            existing.name == client.name
                && existing.email == client.email
                && existing.company == client.company
                && existing.phone == client.phone
        };

        if let Some(position) = clients.iter().position(matches) {
            return Ok(position as i64 + 1);
        }

        clients.push(client.clone());
        Ok(clients.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: Mutex<Vec<NewQuote>>,
}

impl InMemoryQuoteRepository {
    pub fn stored(&self) -> Vec<NewQuote> {
        self.quotes.lock().map(|quotes| quotes.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn save(&self, quote: NewQuote) -> Result<i64, RepositoryError> {
        let mut quotes = self
            .quotes
            .lock()
            .map_err(|_| RepositoryError::Decode("quote store poisoned".to_string()))?;
        quotes.push(quote);
        Ok(quotes.len() as i64)
    }

    async fn find_by_folio(&self, folio: &str) -> Result<Option<QuoteSummary>, RepositoryError> {
        let quotes = self
            .quotes
            .lock()
            .map_err(|_| RepositoryError::Decode("quote store poisoned".to_string()))?;

        Ok(quotes.iter().find(|quote| quote.folio == folio).map(|quote| QuoteSummary {
            folio: quote.folio.clone(),
            event_type: quote.event_type.clone(),
            total: quote.total,
            file_name: quote.file_name.clone(),
            created_at: Utc::now(),
        }))
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let quotes = self
            .quotes
            .lock()
            .map_err(|_| RepositoryError::Decode("quote store poisoned".to_string()))?;
        Ok(quotes.len() as i64)
    }
}

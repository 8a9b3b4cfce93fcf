pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    ClientRepository, InMemoryClientRepository, InMemoryQuoteRepository, NewQuote, NewQuoteItem,
    QuoteRepository, QuoteSummary, RepositoryError, SqlClientRepository, SqlFolioSequence,
    SqlQuoteRepository,
};

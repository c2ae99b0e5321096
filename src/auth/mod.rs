// Authentication module
// Manages the client-credentials token lifecycle

mod manager;
mod refresh;
mod types;

pub use manager::CredentialManager;
pub use refresh::token_url;
pub use types::{Credentials, DEFAULT_AUTHORITY_URL, POWERBI_SCOPE};

use std::sync::Arc;

use tl_domain::config::Config;
use tl_providers::AssistantProvider;
use tl_store::UserStore;

use crate::identity::IdentityResolver;

/// Shared application state passed to all API handlers.
///
/// Every collaborator is constructed once in [`crate::bootstrap`] (or by a
/// test) and injected here; handlers never reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn AssistantProvider>,
    pub store: Arc<dyn UserStore>,
    pub identity: Arc<IdentityResolver>,
}

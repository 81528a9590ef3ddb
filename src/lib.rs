use anyhow::Result;
use std::sync::Arc;

pub mod analysis;
pub mod api_client;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod profile;
pub mod store;
pub mod types;

pub use analysis::AnalysisService;
pub use api_client::ApiClient;
pub use auth::{AuthClient, AuthContext, AuthUser};
pub use config::EnvironmentConfig;
pub use dashboard::{aggregate, DashboardSummary};
pub use error::AnalysisError;
pub use profile::{ProfileService, UserProfile};
pub use store::AnalysisStore;
pub use types::{AnalysisRecord, AnalysisSource, Suggestion};

/// The wired-up client core: auth, remote analysis, local history.
pub struct ResumeLens {
    pub auth: Arc<AuthClient>,
    pub analysis: AnalysisService,
    pub profile: ProfileService,
    pub store: AnalysisStore,
}

impl ResumeLens {
    /// Construct every component from configuration and open the
    /// local document store.
    pub async fn connect(config: &EnvironmentConfig) -> Result<Self> {
        let auth = Arc::new(AuthClient::new(
            config.auth_base_url.clone(),
            config.auth_api_key.clone(),
            config.request_timeout_secs,
        )?);
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout_secs)?;
        let store = AnalysisStore::open(&config.database_path).await?;

        let auth_ctx: Arc<dyn AuthContext> = auth.clone();
        let analysis = AnalysisService::new(api, store.clone(), auth_ctx.clone());
        let profile = ProfileService::new(store.clone(), auth_ctx);

        Ok(Self {
            auth,
            analysis,
            profile,
            store,
        })
    }
}

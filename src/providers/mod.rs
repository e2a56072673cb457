pub mod http_client;
pub mod openai;
pub mod scrub;
pub mod traits;

pub use http_client::{build_http_client, build_http_client_with_timeout};
pub use openai::OpenAiProvider;
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::Provider;

use crate::config::Config;
use std::sync::Arc;

/// Build the configured chat provider.
pub fn create_provider(config: &Config) -> Arc<dyn Provider> {
    Arc::new(OpenAiProvider::new(
        &config.api_base_url,
        config.api_key.as_deref(),
    ))
}

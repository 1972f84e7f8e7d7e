use common::errors::AppError;
use common::models::{AddressSuggestion, SuggestionsEnvelope};
use std::sync::Arc;
use tracing::{info, instrument};

use super::LookupContext;
use crate::cache::{CacheEntry, suggestions_key};
use crate::providers::{AddressProvider, AddressProviderKind, ProviderRegistry};
use crate::validator::validate_suggestions;

/// Address suggestion lookups against one provider.
pub struct SuggestionsService {
    provider: Arc<dyn AddressProvider>,
    context: LookupContext,
}

impl SuggestionsService {
    /// Service for the named provider; fails before any lookup on an unknown name.
    pub fn new(
        registry: &ProviderRegistry,
        provider_name: Option<&str>,
        context: &LookupContext,
    ) -> Result<Self, AppError> {
        let kind = AddressProviderKind::from_name(provider_name)?;
        info!(provider = kind.as_str(), "Initializing SuggestionsService");
        Ok(Self::with_provider(registry.address_provider(kind), context))
    }

    pub fn with_provider(provider: Arc<dyn AddressProvider>, context: &LookupContext) -> Self {
        Self {
            provider,
            context: context.clone(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Suggestions for `query` with surrounding whitespace trimmed.
    ///
    /// An empty query is a normal lookup. The cache slot is shared by all
    /// providers for the same query text.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn get_suggestions(&self, query: &str) -> Result<SuggestionsEnvelope, AppError> {
        let query = query.trim();
        let cache_key = suggestions_key(query);

        if let Some(entry) = self.context.cache.read(&cache_key).await {
            let cache_age = entry.age_minutes(self.context.clock.now());
            info!(query = %query, cache_age, "Cache HIT for suggestions");
            return Ok(SuggestionsEnvelope {
                suggestions: validate_suggestions(&entry.payload)?,
                cache_age: Some(cache_age),
            });
        }

        info!(query = %query, "Cache MISS for suggestions");

        let results = self
            .context
            .bounded("Suggestions request", self.provider.search(query))
            .await?;
        let suggestions = validate_suggestions(&results)?;

        self.context
            .cache
            .write(
                cache_key,
                CacheEntry::new(encode(&suggestions)?, self.context.clock.now()),
                self.provider.cache_expiry(),
            )
            .await;

        Ok(SuggestionsEnvelope {
            suggestions,
            cache_age: None,
        })
    }
}

fn encode(suggestions: &[AddressSuggestion]) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(suggestions)
        .map_err(|e| AppError::internal(format!("Failed to encode suggestions: {}", e)))
}

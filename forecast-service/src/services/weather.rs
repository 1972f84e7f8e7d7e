use common::errors::AppError;
use common::models::ForecastEnvelope;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::LookupContext;
use crate::cache::{CacheEntry, weather_key};
use crate::coordinates::Coordinates;
use crate::providers::{ForecastProvider, ProviderRegistry, WeatherProviderKind};
use crate::validator::validate_forecast;

/// Forecast lookups against one provider.
pub struct WeatherService {
    provider: Arc<dyn ForecastProvider>,
    context: LookupContext,
}

impl WeatherService {
    /// Service for the named provider; fails before any lookup on an unknown name.
    pub fn new(
        registry: &ProviderRegistry,
        provider_name: Option<&str>,
        context: &LookupContext,
    ) -> Result<Self, AppError> {
        let kind = WeatherProviderKind::from_name(provider_name)?;
        info!(provider = kind.as_str(), "Initializing WeatherService");
        Ok(Self::with_provider(registry.forecast_provider(kind), context))
    }

    pub fn with_provider(provider: Arc<dyn ForecastProvider>, context: &LookupContext) -> Self {
        Self {
            provider,
            context: context.clone(),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Forecast for `"lat,lng"`, from cache when a live entry exists for the
    /// coordinate bucket.
    ///
    /// Provider and validation failures are returned as-is and nothing is
    /// cached for them.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn get_forecast(&self, coordinates: &str) -> Result<ForecastEnvelope, AppError> {
        let coordinates: Coordinates = coordinates.parse()?;
        debug!(lat = coordinates.lat, lng = coordinates.lng, "Getting forecast");

        let cache_key = weather_key(self.provider.name(), &coordinates);

        if let Some(entry) = self.context.cache.read(&cache_key).await {
            let cache_age = entry.age_minutes(self.context.clock.now());
            info!(cache_key = %cache_key, cache_age, "Cache HIT for forecast");
            return Ok(ForecastEnvelope {
                forecast: entry.payload,
                cache_age: Some(cache_age),
                timestamp: entry.stored_at,
            });
        }

        info!(cache_key = %cache_key, "Cache MISS for forecast");

        let forecast = self
            .context
            .bounded(
                "Forecast request",
                self.provider.get_forecast(&coordinates.to_string()),
            )
            .await?;
        validate_forecast(&forecast)?;

        let stored_at = self.context.clock.now();
        self.context
            .cache
            .write(
                cache_key,
                CacheEntry::new(forecast.clone(), stored_at),
                self.provider.cache_expiry(),
            )
            .await;

        Ok(ForecastEnvelope {
            forecast,
            cache_age: None,
            timestamp: stored_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clock::{Clock, ManualClock};
    use crate::providers::{MockAddressProvider, MockWeatherProvider};
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Provider returning a fixed payload and counting calls.
    struct FixedProvider {
        payload: Result<Value, fn() -> AppError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn ok(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                payload: Ok(payload),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: fn() -> AppError) -> Arc<Self> {
            Arc::new(Self {
                payload: Err(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ForecastProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn get_forecast(&self, _coordinates: &str) -> Result<Value, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Ok(value) => Ok(value.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    /// Provider that never answers.
    struct StalledProvider;

    #[async_trait]
    impl ForecastProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn get_forecast(&self, _coordinates: &str) -> Result<Value, AppError> {
            std::future::pending().await
        }
    }

    /// Provider that holds each call until the barrier fills.
    struct GatedProvider {
        gate: Barrier,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ForecastProvider for GatedProvider {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn get_forecast(&self, _coordinates: &str) -> Result<Value, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.wait().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(edmonton())
        }
    }

    fn context() -> (Arc<ManualClock>, LookupContext) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let context = LookupContext::new(cache, clock.clone(), Duration::from_secs(5));
        (clock, context)
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(MockWeatherProvider), Arc::new(MockAddressProvider))
    }

    fn edmonton() -> Value {
        json!({
            "location": { "name": "Edmonton", "country": "Canada" },
            "current": {
                "temp_c": -2.0,
                "is_day": 1,
                "wind_kph": 12.2,
                "wind_dir": "NW",
                "humidity": 64,
                "feelslike_c": -6.1,
                "condition": { "text": "Sunny", "icon": "sunny.png" }
            },
            "forecast": []
        })
    }

    #[test]
    fn unknown_provider_fails_construction() {
        let (_, context) = context();
        let err = WeatherService::new(&registry(), Some("bogus"), &context)
            .err()
            .unwrap();
        assert!(matches!(err, AppError::UnknownProvider(_)));
    }

    #[test]
    fn selects_provider_by_name() {
        let (_, context) = context();
        let service = WeatherService::new(&registry(), Some("test"), &context).unwrap();
        assert_eq!(service.provider_name(), "test");
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let (clock, context) = context();
        let provider = FixedProvider::ok(edmonton());
        let service = WeatherService::with_provider(provider.clone(), &context);

        let first = service.get_forecast("53.5461,-113.4937").await.unwrap();
        assert_eq!(first.cache_age, None);
        assert_eq!(first.forecast["location"]["name"], "Edmonton");
        assert_eq!(first.timestamp, clock.now());

        clock.advance(TimeDelta::seconds(90));
        let second = service.get_forecast("53.5461,-113.4937").await.unwrap();
        assert_eq!(second.cache_age, Some(1));
        assert_eq!(second.forecast, first.forecast);
        assert_eq!(second.timestamp, first.timestamp);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn nearby_coordinates_share_an_entry() {
        let (_, context) = context();
        let provider = FixedProvider::ok(edmonton());
        let service = WeatherService::with_provider(provider.clone(), &context);

        service.get_forecast("53.5461,-113.4937").await.unwrap();
        let nearby = service.get_forecast("53.51,-113.46").await.unwrap();

        assert_eq!(nearby.cache_age, Some(0));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn cache_age_grows_until_expiry() {
        let (clock, context) = context();
        let provider = FixedProvider::ok(edmonton());
        let service = WeatherService::with_provider(provider.clone(), &context);

        service.get_forecast("10,10").await.unwrap();
        let mut last_age = 0;
        for _ in 0..3 {
            clock.advance(TimeDelta::minutes(7));
            let age = service.get_forecast("10,10").await.unwrap().cache_age.unwrap();
            assert!(age > last_age);
            last_age = age;
        }
        assert_eq!(last_age, 21);

        clock.advance(TimeDelta::minutes(9));
        let refreshed = service.get_forecast("10,10").await.unwrap();
        assert_eq!(refreshed.cache_age, None);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_provider() {
        let (_, context) = context();
        let provider = FixedProvider::ok(edmonton());
        let service = WeatherService::with_provider(provider.clone(), &context);

        for input in ["invalid", "91,0", "0,181", ""] {
            let err = service.get_forecast(input).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{input}");
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_errors_propagate_and_are_not_cached() {
        let (_, context) = context();
        let provider = FixedProvider::failing(|| AppError::provider("API Error"));
        let service = WeatherService::with_provider(provider.clone(), &context);

        for _ in 0..2 {
            let err = service.get_forecast("10,10").await.unwrap_err();
            assert_eq!(err.to_string(), "API Error");
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn invalid_forecast_is_not_cached() {
        let (_, context) = context();
        let provider = FixedProvider::ok(json!({ "invalid": "data" }));
        let service = WeatherService::with_provider(provider.clone(), &context);

        for _ in 0..2 {
            let err = service.get_forecast("20,20").await.unwrap_err();
            assert_eq!(err.to_string(), "Missing key: location");
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn mock_provider_entries_expire_after_a_second() {
        let (clock, context) = context();
        let service = WeatherService::new(&registry(), Some("test"), &context).unwrap();

        let first = service.get_forecast("42.36,-71.0589").await.unwrap();
        assert_eq!(first.forecast["forecast"].as_array().unwrap().len(), 3);
        assert_eq!(first.forecast["location"]["name"], "Mock City");

        let second = service.get_forecast("42.36,-71.0589").await.unwrap();
        assert_eq!(second.cache_age, Some(0));
        assert_eq!(second.forecast, first.forecast);

        clock.advance(TimeDelta::seconds(1));
        let third = service.get_forecast("42.36,-71.0589").await.unwrap();
        assert_eq!(third.cache_age, None);
    }

    #[tokio::test]
    async fn providers_do_not_share_forecast_entries() {
        let (_, context) = context();
        let fixed = FixedProvider::ok(edmonton());
        WeatherService::with_provider(fixed, &context)
            .get_forecast("10,10")
            .await
            .unwrap();

        let mock = WeatherService::new(&registry(), Some("test"), &context).unwrap();
        let envelope = mock.get_forecast("10,10").await.unwrap();
        assert_eq!(envelope.cache_age, None);
        assert_eq!(envelope.forecast["location"]["name"], "Mock City");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out() {
        let (_, context) = context();
        let service = WeatherService::with_provider(Arc::new(StalledProvider), &context);

        let err = service.get_forecast("10,10").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_each_reach_the_provider() {
        const CALLERS: usize = 16;

        let (_, context) = context();
        let provider = Arc::new(GatedProvider {
            gate: Barrier::new(CALLERS),
            calls: AtomicUsize::new(0),
        });
        let service = Arc::new(WeatherService::with_provider(provider.clone(), &context));

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.get_forecast("10.01,10.02").await })
            })
            .collect();

        for handle in handles {
            let envelope = handle.await.unwrap().unwrap();
            assert_eq!(envelope.cache_age, None);
            assert_eq!(envelope.forecast["location"]["name"], "Edmonton");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), CALLERS);

        let later = service.get_forecast("10.04,9.98").await.unwrap();
        assert_eq!(later.cache_age, Some(0));
        assert_eq!(provider.calls.load(Ordering::SeqCst), CALLERS);
    }
}

//! The price oracle aggregator (C3): resolves a native (ETH-denominated)
//! price for every token the auction touches, trying a cascade of sources
//! from cheapest/most-trusted to most-expensive/least-trusted and stopping
//! as soon as coverage is good enough to score a solution.

use {
    eth::TokenAddress,
    fixed_point::PRECISION,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::sync::Semaphore,
};

pub use alloy_primitives::U256;

/// One external price source. The auction-supplied price list and the
/// last-known cache are handled inline by [`Aggregator`] rather than
/// through this trait, since neither involves network I/O.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    /// Best-effort lookup of a single token's native price, scaled by
    /// [`PRECISION`]. `None` if this source doesn't cover the token.
    async fn fetch_one(&self, token: TokenAddress) -> Option<U256>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("only {covered}/{required} auction tokens have a native price")]
pub struct InsufficientCoverage {
    pub covered: usize,
    pub required: usize,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,
    per_source_timeout: Duration,
    coverage_threshold: f64,
    concurrency: usize,
    last_known: Mutex<HashMap<TokenAddress, U256>>,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn Source>>,
        per_source_timeout: Duration,
        coverage_threshold: f64,
        concurrency: usize,
    ) -> Self {
        Self {
            sources,
            per_source_timeout,
            coverage_threshold,
            concurrency,
            last_known: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a native price for every token in `tokens`, preferring (in
    /// order): WETH's hardcoded 1:1 price, the auction's own supplied
    /// prices, each configured source in turn, then the last-known cache.
    /// Fails only if coverage still falls short of the configured threshold
    /// after every fallback has been tried.
    pub async fn prices(
        &self,
        tokens: &[TokenAddress],
        auction_prices: &HashMap<TokenAddress, U256>,
    ) -> Result<HashMap<TokenAddress, U256>, InsufficientCoverage> {
        let mut resolved = HashMap::new();
        let mut missing: Vec<TokenAddress> = Vec::new();

        for &token in tokens {
            if token == eth::well_known::WETH {
                resolved.insert(token, PRECISION);
            } else if let Some(&price) = auction_prices.get(&token) {
                resolved.insert(token, price);
            } else {
                missing.push(token);
            }
        }

        let required = (tokens.len() as f64 * self.coverage_threshold).ceil() as usize;
        for source in &self.sources {
            if missing.is_empty() {
                break;
            }
            let fetched = self.fetch_from(source.as_ref(), &missing).await;
            for (token, price) in fetched {
                resolved.insert(token, price);
            }
            missing.retain(|t| !resolved.contains_key(t));
            if tokens.len() - missing.len() >= required {
                break;
            }
        }

        if !missing.is_empty() {
            let cache = self.last_known.lock().expect("last_known mutex poisoned");
            for &token in &missing {
                if let Some(&price) = cache.get(&token) {
                    resolved.insert(token, price);
                }
            }
        }
        missing.retain(|t| !resolved.contains_key(t));

        let covered = tokens.len() - missing.len();
        if covered < required {
            tracing::warn!(covered, required, total = tokens.len(), "insufficient oracle coverage");
            return Err(InsufficientCoverage { covered, required });
        }

        let mut cache = self.last_known.lock().expect("last_known mutex poisoned");
        cache.extend(resolved.iter().map(|(&t, &p)| (t, p)));
        drop(cache);

        Ok(resolved)
    }

    async fn fetch_from(&self, source: &dyn Source, tokens: &[TokenAddress]) -> HashMap<TokenAddress, U256> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let timeout = self.per_source_timeout;
        let fetches = tokens.iter().map(|&token| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match tokio::time::timeout(timeout, source.fetch_one(token)).await {
                    Ok(Some(price)) => Some((token, price)),
                    Ok(None) => None,
                    Err(_elapsed) => {
                        tracing::debug!(source = source.name(), %token, "price source timed out");
                        None
                    }
                }
            }
        });
        futures::future::join_all(fetches).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        name: &'static str,
        prices: HashMap<TokenAddress, U256>,
    }

    #[async_trait::async_trait]
    impl Source for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_one(&self, token: TokenAddress) -> Option<U256> {
            self.prices.get(&token).copied()
        }
    }

    struct NeverRespondsSource;

    #[async_trait::async_trait]
    impl Source for NeverRespondsSource {
        fn name(&self) -> &'static str {
            "never"
        }

        async fn fetch_one(&self, _token: TokenAddress) -> Option<U256> {
            std::future::pending().await
        }
    }

    fn token(byte: u8) -> TokenAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        alloy_primitives::Address::from(bytes).into()
    }

    #[tokio::test]
    async fn weth_is_always_one_to_one() {
        let aggregator = Aggregator::new(vec![], Duration::from_secs(2), 0.7, 10);
        let prices = aggregator
            .prices(&[eth::well_known::WETH], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(prices[&eth::well_known::WETH], PRECISION);
    }

    #[tokio::test]
    async fn falls_back_from_auction_prices_to_source() {
        let a = token(1);
        let b = token(2);
        let mut auction_prices = HashMap::new();
        auction_prices.insert(a, PRECISION);

        let mut source_prices = HashMap::new();
        source_prices.insert(b, PRECISION * U256::from(2u8));
        let source = Arc::new(FixedSource { name: "test", prices: source_prices });

        let aggregator = Aggregator::new(vec![source], Duration::from_secs(2), 0.7, 10);
        let prices = aggregator.prices(&[a, b], &auction_prices).await.unwrap();
        assert_eq!(prices[&a], PRECISION);
        assert_eq!(prices[&b], PRECISION * U256::from(2u8));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_source_does_not_block_the_rest() {
        let a = token(1);
        let aggregator = Aggregator::new(
            vec![Arc::new(NeverRespondsSource)],
            Duration::from_millis(10),
            0.0,
            10,
        );
        let prices = aggregator.prices(&[a], &HashMap::new()).await.unwrap();
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn uses_last_known_cache_before_failing() {
        let a = token(1);
        let source_with_price = Arc::new(FixedSource {
            name: "first-run",
            prices: HashMap::from([(a, PRECISION)]),
        });
        let aggregator = Aggregator::new(vec![source_with_price], Duration::from_secs(2), 0.7, 10);
        aggregator.prices(&[a], &HashMap::new()).await.unwrap();

        let failing_source = Arc::new(FixedSource { name: "second-run", prices: HashMap::new() });
        let aggregator2 = Aggregator {
            sources: vec![failing_source],
            per_source_timeout: Duration::from_secs(2),
            coverage_threshold: 0.7,
            concurrency: 10,
            last_known: Mutex::new(HashMap::from([(a, PRECISION)])),
        };
        let prices = aggregator2.prices(&[a], &HashMap::new()).await.unwrap();
        assert_eq!(prices[&a], PRECISION);
    }

    struct CountingSource {
        prices: HashMap<TokenAddress, U256>,
        calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Source for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_one(&self, token: TokenAddress) -> Option<U256> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.prices.get(&token).copied()
        }
    }

    #[tokio::test]
    async fn stops_querying_sources_once_coverage_threshold_is_met() {
        let tokens = [token(1), token(2), token(3), token(4)];
        let mut first_prices = HashMap::new();
        first_prices.insert(tokens[0], PRECISION);
        first_prices.insert(tokens[1], PRECISION);
        let first_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let first = Arc::new(CountingSource { prices: first_prices, calls: first_calls.clone() });

        let second_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let second = Arc::new(CountingSource { prices: HashMap::new(), calls: second_calls.clone() });

        let aggregator = Aggregator::new(vec![first, second], Duration::from_secs(2), 0.5, 10);
        let prices = aggregator.prices(&tokens, &HashMap::new()).await.unwrap();

        assert_eq!(prices.len(), 2);
        assert!(first_calls.load(std::sync::atomic::Ordering::SeqCst) > 0);
        assert_eq!(
            second_calls.load(std::sync::atomic::Ordering::SeqCst),
            0,
            "the second source should never be queried once the first already covers the threshold"
        );
    }

    #[tokio::test]
    async fn fails_below_coverage_threshold() {
        let a = token(1);
        let b = token(2);
        let c = token(3);
        let aggregator = Aggregator::new(vec![], Duration::from_secs(2), 0.7, 10);
        let err = aggregator.prices(&[a, b, c], &HashMap::new()).await.unwrap_err();
        assert_eq!(err, InsufficientCoverage { covered: 0, required: 3 });
    }
}

//! In-memory [`RemoteFetch`] for exercising the cache without a network.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use earnwallet_core::{
    ActivityResponse, DuneTransactionResponse, QuoteResponse, TokenInfoResponse,
};

use crate::error::{FetchResult, RemoteFetchError};
use crate::fetch::RemoteFetch;
use crate::query::{ActivityQuery, SwapQuoteQuery, TokenInfoQuery};

/// Counts calls; every call sleeps for the configured delay, then returns
/// canned data or the configured failure.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    calls: AtomicUsize,
    delay: Mutex<Duration>,
    failure: Mutex<Option<RemoteFetchError>>,
}

impl FakeFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn fail_with(&self, error: Option<RemoteFetchError>) {
        *self.failure.lock().unwrap() = error;
    }

    async fn call(&self) -> FetchResult<usize> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().unwrap().clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(n),
        }
    }

    pub async fn next_activity(&self) -> FetchResult<ActivityResponse> {
        self.call().await.map(activity_response)
    }
}

/// Activity page tagged with the call number in `next_offset`.
pub(crate) fn activity_response(n: usize) -> ActivityResponse {
    ActivityResponse {
        activity: vec![],
        next_offset: Some(n.to_string()),
    }
}

#[async_trait]
impl RemoteFetch for FakeFetcher {
    async fn fetch_activity(&self, _query: &ActivityQuery) -> FetchResult<ActivityResponse> {
        self.next_activity().await
    }

    async fn fetch_swap_quote(&self, query: &SwapQuoteQuery) -> FetchResult<QuoteResponse> {
        let n = self.call().await?;
        Ok(QuoteResponse {
            liquidity_available: true,
            buy_amount: Some(n.to_string()),
            sell_amount: Some(query.sell_amount.clone()),
            min_buy_amount: None,
            buy_token: Some(query.buy_token.clone()),
            sell_token: Some(query.sell_token.clone()),
            transaction: None,
            extra: Default::default(),
        })
    }

    async fn fetch_token_info(&self, query: &TokenInfoQuery) -> FetchResult<TokenInfoResponse> {
        self.call().await?;
        Ok(TokenInfoResponse {
            contract_address: query.contract_address.clone(),
            tokens: vec![],
        })
    }

    async fn fetch_transactions(
        &self,
        _address: &str,
        _limit: Option<u32>,
    ) -> FetchResult<DuneTransactionResponse> {
        self.call().await?;
        Ok(DuneTransactionResponse {
            next_offset: None,
            transactions: vec![],
            extra: Default::default(),
        })
    }
}

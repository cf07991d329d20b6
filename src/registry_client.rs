//! Registry Client: read-only access to the profile registry contract.
//!
//! Encodes `GetProfileLevel(address)`, sends it as an `eth_call` through a
//! [`RegistryTransport`] and decodes the `uint8` result into an
//! [`IdentityLevel`]. The client is stateless and shared by on-demand lookups
//! and the background refresh loop.

use crate::contracts::profile_registry::get_profile_level_function;
use crate::error::IdentityError;
use crate::identity_level::IdentityLevel;
use crate::metrics;
use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::prelude::{Address, Bytes, Middleware, TransactionRequest, U256};
use ethers::types::transaction::eip2718::TypedTransaction;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outbound seam to the chain: executes a read-only call against a contract
/// and returns the raw result bytes.
#[async_trait]
pub trait RegistryTransport: Send + Sync + 'static {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes>;
}

/// [`RegistryTransport`] backed by any ethers middleware (usually `Provider<Http>`).
#[derive(Debug, Clone)]
pub struct MiddlewareTransport<M: Middleware> {
    provider: Arc<M>,
}

impl<M: Middleware> MiddlewareTransport<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> RegistryTransport for MiddlewareTransport<M> {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        let tx_request = TransactionRequest::new().to(to).data(data);
        let typed_tx: TypedTransaction = tx_request.into();
        self.provider
            .call(&typed_tx, None)
            .await
            .map_err(|e| anyhow::anyhow!("eth_call to {:?} failed: {}", to, e))
    }
}

pub struct RegistryClient<T: RegistryTransport> {
    transport: Arc<T>,
    registry: Address,
    function: Function,
    timeout: Duration,
}

impl<T: RegistryTransport> RegistryClient<T> {
    /// Create a client for the registry deployed at `registry`.
    ///
    /// Fails with [`IdentityError::Configuration`] when the registry ABI does
    /// not parse or lacks `GetProfileLevel`.
    pub fn new(transport: Arc<T>, registry: Address, timeout: Duration) -> Result<Self, IdentityError> {
        Ok(Self {
            transport,
            registry,
            function: get_profile_level_function()?,
            timeout,
        })
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// ABI-encoded calldata for `GetProfileLevel(address)`.
    pub fn encode_call(&self, address: Address) -> Result<Bytes, IdentityError> {
        let calldata = self.function.encode_input(&[Token::Address(address)])?;
        Ok(Bytes::from(calldata))
    }

    /// Decode the raw `eth_call` result into an identity level.
    pub fn decode_level(&self, raw: &[u8]) -> Result<IdentityLevel, IdentityError> {
        let tokens = self
            .function
            .decode_output(raw)
            .map_err(|e| IdentityError::Decoding(e.to_string()))?;

        match tokens.as_slice() {
            [Token::Uint(value)] if *value <= U256::from(u8::MAX) => {
                Ok(IdentityLevel::from(value.low_u32() as u8))
            }
            [Token::Uint(value)] => Err(IdentityError::Decoding(format!(
                "profile level {} does not fit in uint8",
                value
            ))),
            other => Err(IdentityError::Decoding(format!(
                "expected a single uint8, got {:?}",
                other
            ))),
        }
    }

    /// Ask the registry for `address`'s identity level.
    ///
    /// The round trip is bounded by the client timeout. Failures are logged
    /// here and returned; callers decide how to degrade.
    pub async fn lookup(&self, address: Address) -> Result<IdentityLevel, IdentityError> {
        let start = Instant::now();
        let result = self.lookup_inner(address).await;
        let duration = start.elapsed();

        match &result {
            Ok(level) => {
                metrics::record_registry_lookup("ok", duration);
                debug!("Registry: {:?} has level {} ({:?})", address, level, duration);
            }
            Err(e) => {
                metrics::record_registry_lookup("failed", duration);
                metrics::increment_registry_failure(e.reason());
                warn!("Registry: failed to get profile level for {:?}: {}", address, e);
            }
        }

        result
    }

    async fn lookup_inner(&self, address: Address) -> Result<IdentityLevel, IdentityError> {
        let calldata = self.encode_call(address)?;

        let raw = match tokio::time::timeout(self.timeout, self.transport.call(self.registry, calldata)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(IdentityError::Transport(e.to_string())),
            Err(_) => return Err(IdentityError::Timeout(self.timeout)),
        };

        self.decode_level(&raw)
    }
}

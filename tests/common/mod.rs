//! Scripted in-memory registry used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::Token;
use ethers::types::{Address, Bytes, U256};
use identity_slots_sdk::settings::IdentitySettings;
use identity_slots_sdk::RegistryTransport;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const REGISTRY: &str = "0x1D4DAf3D826683DA8b68d9f5165ae1196Cf97b52";

/// How the fake registry answers for one address.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Level(u8),
    Fail,
    Hang,
    Malformed,
}

#[derive(Default)]
pub struct MockRegistry {
    replies: Mutex<HashMap<Address, Reply>>,
    calls: AtomicUsize,
    calls_by_address: Mutex<HashMap<Address, usize>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: Address, reply: Reply) {
        self.replies.lock().unwrap().insert(address, reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, address: Address) -> usize {
        self.calls_by_address.lock().unwrap().get(&address).copied().unwrap_or(0)
    }
}

/// Extract the `address` argument from `GetProfileLevel(address)` calldata.
fn decode_owner(data: &[u8]) -> Address {
    Address::from_slice(&data[16..36])
}

#[async_trait]
impl RegistryTransport for MockRegistry {
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        assert_eq!(to, Address::from_str(REGISTRY).unwrap(), "call sent to the wrong contract");
        assert_eq!(data.len(), 36, "unexpected calldata length");

        let owner = decode_owner(&data);
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_address.lock().unwrap().entry(owner).or_insert(0) += 1;

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Level(level) => Ok(Bytes::from(ethers::abi::encode(&[Token::Uint(U256::from(level))]))),
            Reply::Fail => Err(anyhow::anyhow!("connection refused")),
            Reply::Hang => std::future::pending().await,
            Reply::Malformed => Ok(Bytes::from(vec![0xde, 0xad])),
        }
    }
}

pub fn address(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// Settings with no seeded accounts and the reference timings.
pub fn settings() -> IdentitySettings {
    IdentitySettings {
        profile_registry_address: REGISTRY.to_string(),
        update_interval_ms: 5_000,
        request_timeout_ms: 500,
        seed_addresses: vec![],
    }
}

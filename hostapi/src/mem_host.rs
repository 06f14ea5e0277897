//! In-memory host for testing and embedding demos.
//!
//! `MemHost` implements [`Host`] over `BTreeMap`s so iteration order is
//! deterministic. Storage slots remember their value at the start of the
//! transaction, which is what the storage-status classification needs.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;
use vmlink_primitives::{
    Address, Bytes32, ExecutionResult, Message, StorageStatus, TxContext, ZERO_ADDRESS,
    ZERO_BYTES32,
};

use crate::traits::Host;

const DEPLOY_CONTEXT: &str = "vmlink mem-host 2024 deploy address";
const SPAWN_CONTEXT: &str = "vmlink mem-host 2024 spawn address";

/// One storage slot's transaction-scoped history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageSlot {
    /// Value at the start of the current transaction.
    pub original: Bytes32,
    /// Value after the most recent write.
    pub current: Bytes32,
}

impl StorageSlot {
    pub fn new(value: Bytes32) -> Self {
        Self {
            original: value,
            current: value,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.current
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: u64,
    /// Template code for deployed templates, or the template's code for a
    /// spawned program.
    pub code: Vec<u8>,
    pub storage: BTreeMap<Bytes32, StorageSlot>,
}

/// Handler for nested calls made through [`Host::call`].
pub type CallHandler = Box<dyn FnMut(&Message<'_>) -> ExecutionResult>;

/// In-memory host backed by `BTreeMap`.
#[derive(Default)]
pub struct MemHost {
    accounts: BTreeMap<Address, Account>,
    tx_context: TxContext,
    block_hashes: BTreeMap<i64, Bytes32>,
    call_handler: Option<CallHandler>,
    calls: usize,
}

impl MemHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tx_context(mut self, tx_context: TxContext) -> Self {
        self.tx_context = tx_context;
        self
    }

    /// Install the handler that answers nested calls.
    pub fn with_call_handler(
        mut self,
        handler: impl FnMut(&Message<'_>) -> ExecutionResult + 'static,
    ) -> Self {
        self.call_handler = Some(Box::new(handler));
        self
    }

    pub fn set_balance(&mut self, address: Address, balance: u64) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    pub fn set_block_hash(&mut self, number: i64, hash: Bytes32) {
        self.block_hashes.insert(number, hash);
    }

    /// Seed a committed storage value (original and current both set).
    pub fn insert_storage(&mut self, address: Address, key: Bytes32, value: Bytes32) {
        self.accounts
            .entry(address)
            .or_default()
            .storage
            .insert(key, StorageSlot::new(value));
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn storage_slot(&self, address: &Address, key: &Bytes32) -> Option<StorageSlot> {
        self.accounts.get(address)?.storage.get(key).copied()
    }

    /// Number of nested calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// End the current transaction: every slot's original value becomes its
    /// current value and zero slots are dropped.
    pub fn commit(&mut self) {
        for account in self.accounts.values_mut() {
            account.storage.retain(|_, slot| {
                slot.original = slot.current;
                !slot.current.is_zero()
            });
        }
    }

    fn derive_address(context: &str, parts: &[&[u8]]) -> Address {
        let mut hasher = blake3::Hasher::new_derive_key(context);
        for part in parts {
            hasher.update(part);
        }
        let hash = hasher.finalize();
        let mut bytes = [0u8; 24];
        bytes.copy_from_slice(&hash.as_bytes()[..24]);
        Address::new(bytes)
    }
}

impl Host for MemHost {
    fn account_exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn get_balance(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.balance)
    }

    fn get_storage(&self, address: &Address, key: &Bytes32) -> Bytes32 {
        self.storage_slot(address, key)
            .map_or(ZERO_BYTES32, |slot| slot.current)
    }

    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let slot = self
            .accounts
            .entry(*address)
            .or_default()
            .storage
            .entry(*key)
            .or_default();
        let status = StorageStatus::classify(&slot.original, &slot.current, value);
        slot.current = *value;
        trace!("mem-host: {} slot {} {}", address, key, status);
        status
    }

    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult {
        self.calls += 1;
        match self.call_handler.as_mut() {
            Some(handler) => handler(msg),
            None => {
                trace!("mem-host: no call handler for {}", msg.recipient);
                ExecutionResult::failure()
            }
        }
    }

    fn get_tx_context(&self) -> TxContext {
        self.tx_context
    }

    fn get_block_hash(&self, number: i64) -> Bytes32 {
        self.block_hashes.get(&number).copied().unwrap_or(ZERO_BYTES32)
    }

    /// The blob is a 24-byte template address followed by constructor data.
    /// Returns the zero address if the blob is too short or the template is
    /// unknown.
    fn spawn(&mut self, blob: &[u8]) -> Address {
        if blob.len() < 24 {
            trace!("mem-host: spawn blob too short ({} bytes)", blob.len());
            return ZERO_ADDRESS;
        }
        let mut template_bytes = [0u8; 24];
        template_bytes.copy_from_slice(&blob[..24]);
        let template = Address::new(template_bytes);
        let Some(code) = self.accounts.get(&template).map(|a| a.code.clone()) else {
            trace!("mem-host: spawn from unknown template {}", template);
            return ZERO_ADDRESS;
        };
        let address = Self::derive_address(SPAWN_CONTEXT, &[&template.bytes, &blob[24..]]);
        self.accounts.entry(address).or_default().code = code;
        address
    }

    fn deploy(&mut self, blob: &[u8]) -> Address {
        let address = Self::derive_address(DEPLOY_CONTEXT, &[blob]);
        self.accounts.entry(address).or_default().code = blob.to_vec();
        address
    }
}

impl fmt::Debug for MemHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemHost")
            .field("accounts", &self.accounts.len())
            .field("block_hashes", &self.block_hashes.len())
            .field("call_handler", &self.call_handler.is_some())
            .field("calls", &self.calls)
            .finish()
    }
}

//! ATM ledger contract bound through JSON-RPC.
//!
//! Calls are ABI-encoded by hand: the contract only takes a single `uint256`
//! argument and returns a single `uint256`, so a full ABI codec is not needed.

use crate::blockchain::{Address, Amount};
use crate::blockchain_client::{parse_quantity, RpcTransport};
use crate::config::ConfirmationPolicy;
use crate::errors::{WalletError, WalletResult};
use crate::provider::{Confirmation, ContractBinder, LedgerContract, PendingTransaction};
use async_trait::async_trait;
use serde_json::json;
use sha3::{Digest, Keccak256};
use std::rc::Rc;

pub const GET_BALANCE_SIGNATURE: &str = "getBalance()";
pub const DEPOSIT_SIGNATURE: &str = "deposit(uint256)";
pub const WITHDRAW_SIGNATURE: &str = "withdraw(uint256)";

const WORD_SIZE: usize = 32;

/// First four bytes of the keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Encode a call to `signature` with `uint256` arguments as 0x-prefixed calldata.
pub fn encode_call(signature: &str, args: &[u128]) -> String {
    let mut data = Vec::with_capacity(4 + args.len() * WORD_SIZE);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        let mut word = [0u8; WORD_SIZE];
        word[WORD_SIZE - 16..].copy_from_slice(&arg.to_be_bytes());
        data.extend_from_slice(&word);
    }
    format!("0x{}", hex::encode(data))
}

/// Decode a single `uint256` return word, rejecting values beyond `u128`.
pub fn decode_uint(return_data: &str) -> WalletResult<u128> {
    let digits = return_data.strip_prefix("0x").unwrap_or(return_data);
    let bytes = hex::decode(digits)
        .map_err(|_| WalletError::InvalidResponse("Return data is not hex".to_string()))?;

    if bytes.len() != WORD_SIZE {
        return Err(WalletError::InvalidResponse(format!(
            "Expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }

    let (high, low) = bytes.split_at(WORD_SIZE - 16);
    if high.iter().any(|b| *b != 0) {
        return Err(WalletError::InvalidResponse(
            "Balance does not fit in 128 bits".to_string(),
        ));
    }

    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Ok(u128::from_be_bytes(buf))
}

/// Contract handle that signs as `account` through the wallet behind `transport`.
pub struct AtmContract<T> {
    transport: Rc<T>,
    account: Address,
    address: Address,
    policy: ConfirmationPolicy,
}

impl<T: RpcTransport> AtmContract<T> {
    pub fn new(
        transport: Rc<T>,
        account: Address,
        address: Address,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            transport,
            account,
            address,
            policy,
        }
    }

    async fn send(&self, signature: &str, amount: Amount) -> WalletResult<RpcPendingTransaction<T>> {
        let tx = json!({
            "from": self.account.as_string(),
            "to": self.address.as_string(),
            "data": encode_call(signature, &[amount.units()]),
        });

        let response = self
            .transport
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        let hash = response.as_str().ok_or_else(|| {
            WalletError::InvalidResponse("Transaction hash missing from response".to_string())
        })?;

        Ok(RpcPendingTransaction {
            transport: Rc::clone(&self.transport),
            hash: hash.to_string(),
            policy: self.policy,
        })
    }
}

#[async_trait(?Send)]
impl<T: RpcTransport> LedgerContract for AtmContract<T> {
    type Pending = RpcPendingTransaction<T>;

    async fn get_balance(&self) -> WalletResult<u128> {
        let call = json!({
            "from": self.account.as_string(),
            "to": self.address.as_string(),
            "data": encode_call(GET_BALANCE_SIGNATURE, &[]),
        });

        let response = self
            .transport
            .request("eth_call", json!([call, "latest"]))
            .await?;
        let data = response.as_str().ok_or_else(|| {
            WalletError::InvalidResponse("eth_call returned no data".to_string())
        })?;
        decode_uint(data)
    }

    async fn deposit(&self, amount: Amount) -> WalletResult<Self::Pending> {
        self.send(DEPOSIT_SIGNATURE, amount).await
    }

    async fn withdraw(&self, amount: Amount) -> WalletResult<Self::Pending> {
        self.send(WITHDRAW_SIGNATURE, amount).await
    }
}

/// Transaction submitted through JSON-RPC, confirmed by polling for its receipt.
pub struct RpcPendingTransaction<T> {
    transport: Rc<T>,
    hash: String,
    policy: ConfirmationPolicy,
}

#[async_trait(?Send)]
impl<T: RpcTransport> PendingTransaction for RpcPendingTransaction<T> {
    fn hash(&self) -> &str {
        &self.hash
    }

    async fn wait(&self) -> WalletResult<Confirmation> {
        for attempt in 0..self.policy.max_polls() {
            if attempt > 0 {
                self.transport.pause(self.policy.poll_interval).await;
            }

            // The transaction is already out; a failed poll says nothing about it.
            let receipt = match self
                .transport
                .request("eth_getTransactionReceipt", json!([self.hash]))
                .await
            {
                Ok(receipt) => receipt,
                Err(err) => {
                    log::warn!("Receipt poll {} for {} failed: {}", attempt + 1, self.hash, err);
                    continue;
                }
            };
            if receipt.is_null() {
                continue;
            }

            // Receipts from before the status field existed carry no verdict.
            let status = receipt.get("status").and_then(|v| v.as_str());
            if let Some(status) = status {
                if parse_quantity(status)? == 0 {
                    return Err(WalletError::RemoteOperationFailed(format!(
                        "transaction {} reverted",
                        self.hash
                    )));
                }
            }

            let block_number = receipt
                .get("blockNumber")
                .and_then(|v| v.as_str())
                .map(parse_quantity)
                .transpose()?;

            return Ok(Confirmation {
                transaction_hash: self.hash.clone(),
                block_number,
            });
        }

        Err(WalletError::RemoteOperationFailed(format!(
            "timed out waiting for confirmation of {}",
            self.hash
        )))
    }
}

/// Binds [`AtmContract`] handles at a fixed contract address.
pub struct AtmContractBinder<T> {
    transport: Rc<T>,
    address: Address,
    policy: ConfirmationPolicy,
}

impl<T: RpcTransport> AtmContractBinder<T> {
    pub fn new(transport: Rc<T>, address: Address, policy: ConfirmationPolicy) -> Self {
        Self {
            transport,
            address,
            policy,
        }
    }
}

impl<T: RpcTransport> ContractBinder for AtmContractBinder<T> {
    type Contract = AtmContract<T>;

    fn bind(&self, account: &Address) -> WalletResult<Self::Contract> {
        log::debug!("Binding ATM contract {} for {}", self.address, account);
        Ok(AtmContract::new(
            Rc::clone(&self.transport),
            account.clone(),
            self.address.clone(),
            self.policy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedTransport;
    use std::time::Duration;

    const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
    const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    fn bound(transport: &Rc<ScriptedTransport>, max_polls: u64) -> AtmContract<ScriptedTransport> {
        let policy = ConfirmationPolicy {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_millis(10 * max_polls),
        };
        let binder = AtmContractBinder::new(
            Rc::clone(transport),
            Address::from_string(CONTRACT).unwrap(),
            policy,
        );
        binder.bind(&Address::from_string(ACCOUNT).unwrap()).unwrap()
    }

    fn word(value: u128) -> String {
        format!("0x{:064x}", value)
    }

    #[test]
    fn selectors_match_solidity() {
        assert_eq!(hex::encode(selector(GET_BALANCE_SIGNATURE)), "12065fe0");
        assert_eq!(hex::encode(selector(DEPOSIT_SIGNATURE)), "b6b55f25");
        assert_eq!(hex::encode(selector(WITHDRAW_SIGNATURE)), "2e1a7d4d");
    }

    #[test]
    fn deposit_calldata_layout() {
        let data = encode_call(DEPOSIT_SIGNATURE, &[1]);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0xb6b55f25"));
        assert!(data.ends_with("0001"));
    }

    #[test]
    fn decode_uint_bounds() {
        assert_eq!(decode_uint(&word(42)).unwrap(), 42);
        assert!(decode_uint("0x").is_err());
        let huge = format!("0x{}{}", "01", "0".repeat(62));
        assert!(matches!(
            decode_uint(&huge),
            Err(WalletError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn balance_is_read_with_eth_call() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_call", Ok(json!(word(7))));
        let contract = bound(&transport, 3);

        assert_eq!(contract.get_balance().await.unwrap(), 7);

        let calls = transport.calls.borrow();
        let (_, params) = &calls[0];
        assert_eq!(params[0]["to"], CONTRACT);
        assert_eq!(params[0]["data"], "0x12065fe0");
        assert_eq!(params[1], "latest");
    }

    #[tokio::test]
    async fn withdraw_submits_and_polls_until_receipt() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_sendTransaction", Ok(json!(TX_HASH)));
        transport.expect("eth_getTransactionReceipt", Ok(serde_json::Value::Null));
        transport.expect(
            "eth_getTransactionReceipt",
            Ok(json!({ "status": "0x1", "blockNumber": "0x2" })),
        );
        let contract = bound(&transport, 5);

        let pending = contract.withdraw(Amount::from_units(3)).await.unwrap();
        assert_eq!(pending.hash(), TX_HASH);
        let confirmation = pending.wait().await.unwrap();

        assert_eq!(confirmation.transaction_hash, TX_HASH);
        assert_eq!(confirmation.block_number, Some(2));
        assert_eq!(transport.pauses.borrow().len(), 1);

        let calls = transport.calls.borrow();
        assert_eq!(calls[0].1[0]["from"], ACCOUNT);
        assert!(calls[0].1[0]["data"]
            .as_str()
            .unwrap()
            .starts_with("0x2e1a7d4d"));
    }

    #[tokio::test]
    async fn reverted_receipt_is_a_failure() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_sendTransaction", Ok(json!(TX_HASH)));
        transport.expect(
            "eth_getTransactionReceipt",
            Ok(json!({ "status": "0x0", "blockNumber": "0x3" })),
        );
        let contract = bound(&transport, 5);

        let pending = contract.deposit(Amount::from_units(1)).await.unwrap();
        assert!(matches!(
            pending.wait().await,
            Err(WalletError::RemoteOperationFailed(msg)) if msg.contains("reverted")
        ));
    }

    #[tokio::test]
    async fn wait_polls_through_transport_errors() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_sendTransaction", Ok(json!(TX_HASH)));
        transport.expect(
            "eth_getTransactionReceipt",
            Err(WalletError::NetworkError("502 bad gateway".into())),
        );
        transport.expect(
            "eth_getTransactionReceipt",
            Ok(json!({ "status": "0x1", "blockNumber": "0x4" })),
        );
        let contract = bound(&transport, 5);

        let pending = contract.deposit(Amount::from_units(2)).await.unwrap();
        let confirmation = pending.wait().await.unwrap();

        assert_eq!(confirmation.block_number, Some(4));
        assert_eq!(transport.calls.borrow().len(), 3);
    }

    #[tokio::test]
    async fn wait_gives_up_when_every_poll_fails() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_sendTransaction", Ok(json!(TX_HASH)));
        for _ in 0..2 {
            transport.expect(
                "eth_getTransactionReceipt",
                Err(WalletError::NetworkError("connection reset".into())),
            );
        }
        let contract = bound(&transport, 2);

        let pending = contract.withdraw(Amount::from_units(1)).await.unwrap();
        assert!(matches!(
            pending.wait().await,
            Err(WalletError::RemoteOperationFailed(msg)) if msg.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn wait_gives_up_after_policy_timeout() {
        let transport = Rc::new(ScriptedTransport::default());
        transport.expect("eth_sendTransaction", Ok(json!(TX_HASH)));
        for _ in 0..2 {
            transport.expect("eth_getTransactionReceipt", Ok(serde_json::Value::Null));
        }
        let contract = bound(&transport, 2);

        let pending = contract.deposit(Amount::from_units(1)).await.unwrap();
        assert!(matches!(
            pending.wait().await,
            Err(WalletError::RemoteOperationFailed(msg)) if msg.contains("timed out")
        ));
    }
}

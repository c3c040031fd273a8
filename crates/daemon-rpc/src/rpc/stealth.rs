//! One-sided payment proof: which outputs of a transaction pay an address.
//!
//! Whoever holds a transaction's private key `r` can recompute every
//! one-time output key the sender produced for a recipient `(A, B)`:
//! `P_i = H_s(8·r·A ‖ i)·G + B`. Matching keys identify the recipient's
//! outputs without the recipient's secrets.

use crate::domain::error::{RpcError, RpcResult};
use crate::domain::types::{CheckPaymentRequest, CheckPaymentResponse, RpcStatus};
use crate::ports::BlockchainEngine;
use shared_crypto::{derive_public_key, generate_key_derivation, CryptoError};
use shared_types::{
    AccountPublicAddress, Hash, OutputTarget, SecretKey, TransactionOutput, TransactionPrefix,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Outputs recognised as paying the recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StealthScan {
    /// Sum of matched amounts
    pub amount: u64,
    /// Matched outputs in transaction order
    pub outputs: Vec<TransactionOutput>,
}

/// Failure while scanning outputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The view key and transaction key do not agree on a shared secret
    #[error("key agreement failed: {0}")]
    KeyAgreement(CryptoError),

    /// Deriving the expected key of an output failed
    #[error("output {index}: {source}")]
    Derivation { index: u64, source: CryptoError },

    /// Matched amounts do not fit in 64 bits
    #[error("matched amount overflows")]
    AmountOverflow,
}

/// Find the outputs of `prefix` that pay `recipient`.
///
/// Output positions count every output, key or not, so a multisignature
/// output still consumes an index.
pub fn scan_outputs(
    prefix: &TransactionPrefix,
    recipient: &AccountPublicAddress,
    tx_private_key: &SecretKey,
) -> Result<StealthScan, ScanError> {
    let derivation = generate_key_derivation(&recipient.view_public_key, tx_private_key)
        .map_err(ScanError::KeyAgreement)?;

    let mut scan = StealthScan::default();
    for (index, output) in (0u64..).zip(prefix.outputs.iter()) {
        let OutputTarget::Key(target) = &output.target else {
            continue;
        };
        let expected = derive_public_key(&derivation, index, &recipient.spend_public_key)
            .map_err(|source| ScanError::Derivation { index, source })?;
        if expected == target.key {
            scan.amount = scan
                .amount
                .checked_add(output.amount)
                .ok_or(ScanError::AmountOverflow)?;
            scan.outputs.push(output.clone());
        }
    }
    Ok(scan)
}

/// `check_payment` handler
pub struct PaymentRpc {
    engine: Arc<dyn BlockchainEngine>,
}

impl PaymentRpc {
    pub fn new(engine: Arc<dyn BlockchainEngine>) -> Self {
        Self { engine }
    }

    /// check_payment - Sum the outputs of a transaction that pay an address
    #[instrument(skip(self, request), fields(tx = %request.transaction_id))]
    pub fn check_payment(&self, request: CheckPaymentRequest) -> RpcResult<CheckPaymentResponse> {
        let transaction_id = Hash::from_hex(&request.transaction_id)
            .map_err(|_| RpcError::WrongParam("Failed to parse transaction id".into()))?;

        let address = self
            .engine
            .parse_address(&request.receiver_address)
            .ok_or_else(|| RpcError::WrongParam("Receiver's address not found".into()))?;

        let tx_private_key = SecretKey::from_hex(&request.transaction_private_key)
            .map_err(|_| RpcError::WrongParam("Failed to parse transaction secret key".into()))?;

        let mut lookup = self.engine.transactions(&[transaction_id], true);
        let transaction = match (lookup.found.pop(), lookup.found.is_empty()) {
            (Some(tx), true) => tx,
            _ => return Err(RpcError::WrongParam("Transaction ID was not found".into())),
        };

        let scan = scan_outputs(&transaction.prefix, &address, &tx_private_key).map_err(|e| {
            match e {
                ScanError::KeyAgreement(_) => RpcError::WrongParam(
                    "Failed to generate key derivation from supplied parameters".into(),
                ),
                other => {
                    error!(error = %other, "Output scan failed");
                    RpcError::Internal("Unknown error".into())
                }
            }
        })?;

        debug!(
            matched = scan.outputs.len(),
            amount = scan.amount,
            "Payment checked"
        );

        Ok(CheckPaymentResponse {
            amount: scan.amount,
            outputs: scan.outputs,
            status: RpcStatus::Ok,
        })
    }
}

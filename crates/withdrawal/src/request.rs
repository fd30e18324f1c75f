//! Creation of new withdrawal records.

use crate::{
    error::ValidationError,
    hash::derive_record_id,
    types::{WithdrawalRecord, WithdrawalStatus},
};
use alloy_primitives::{utils::parse_ether, Address, TxHash, U256};
use config::NetworkConfig;

/// A withdrawal whose initiating L2 transaction has succeeded.
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub transaction_hash: TxHash,
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    /// Decimal string in units of the L2 native asset.
    pub amount: String,
    pub from: Address,
    pub to: Address,
    /// Unix time the withdrawal was initiated.
    pub initiated_at: u64,
}

impl NewWithdrawal {
    /// Validate the input and build the initial record.
    ///
    /// Family and settlement addresses are captured from `network` now, since
    /// they cannot be safely re-derived once configuration changes.
    pub fn into_record(self, network: &NetworkConfig) -> Result<WithdrawalRecord, ValidationError> {
        if self.transaction_hash == TxHash::ZERO {
            return Err(ValidationError::EmptyTransactionHash);
        }
        if self.from == Address::ZERO {
            return Err(ValidationError::ZeroAddress("fromAddress"));
        }
        if self.to == Address::ZERO {
            return Err(ValidationError::ZeroAddress("toAddress"));
        }

        let amount = self.amount.trim();
        if amount.starts_with('-') {
            return Err(ValidationError::NonPositiveAmount);
        }
        let wei = parse_ether(amount)
            .map_err(|_| ValidationError::InvalidAmount(self.amount.clone()))?;
        if wei == U256::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }

        let rollup = network
            .rollup(self.source_chain_id)
            .ok_or(ValidationError::UnknownChain(self.source_chain_id))?;
        if rollup.l1_chain_id != self.destination_chain_id {
            return Err(ValidationError::DestinationMismatch {
                chain_id: self.source_chain_id,
                expected: rollup.l1_chain_id,
                got: self.destination_chain_id,
            });
        }

        let family = rollup.family;
        let status = WithdrawalStatus::Initiated;

        Ok(WithdrawalRecord {
            id: derive_record_id(self.transaction_hash, self.from, self.initiated_at),
            transaction_hash: self.transaction_hash,
            rollup_family: family,
            source_chain_id: self.source_chain_id,
            destination_chain_id: self.destination_chain_id,
            amount: amount.to_string(),
            from_address: self.from,
            to_address: self.to,
            bridge_address: rollup.bridge,
            portal_or_outbox_address: rollup.portal_or_outbox,
            status,
            current_step: 1,
            initiated_at: self.initiated_at,
            state_root_published_at: None,
            proven_at: None,
            challenge_period_ends_at: None,
            finalized_at: None,
            prove_tx_hash: None,
            finalize_tx_hash: None,
            last_error: None,
            last_error_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RollupFamily;
    use alloy_primitives::{address, b256};

    fn request() -> NewWithdrawal {
        NewWithdrawal {
            transaction_hash: b256!(
                "91b374b5403401198a892f62db8843b60125cfb3e28ec1664089d9158424dc4a"
            ),
            source_chain_id: 42161,
            destination_chain_id: 1,
            amount: "0.25".to_string(),
            from: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
            to: address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1"),
            initiated_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_record_captures_chain_addresses() {
        let network = NetworkConfig::mainnet();
        let record = request().into_record(&network).unwrap();
        let rollup = network.rollup(42161).unwrap();

        assert_eq!(record.rollup_family, RollupFamily::Arbitrum);
        assert_eq!(record.status, WithdrawalStatus::Initiated);
        assert_eq!(record.current_step, 1);
        assert_eq!(record.portal_or_outbox_address, rollup.portal_or_outbox);
        assert_eq!(record.bridge_address, rollup.bridge);
        assert_eq!(
            record.id,
            derive_record_id(record.transaction_hash, record.from_address, 1_700_000_000)
        );
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let network = NetworkConfig::mainnet();
        for amount in ["0", "0.0", "-1", "abc", ""] {
            let mut req = request();
            req.amount = amount.to_string();
            let err = req.into_record(&network).unwrap_err();
            assert!(
                matches!(
                    err,
                    ValidationError::NonPositiveAmount | ValidationError::InvalidAmount(_)
                ),
                "{amount}: {err}"
            );
        }
    }

    #[test]
    fn test_rejects_zero_addresses() {
        let network = NetworkConfig::mainnet();
        let mut req = request();
        req.to = Address::ZERO;
        assert_eq!(
            req.into_record(&network).unwrap_err(),
            ValidationError::ZeroAddress("toAddress")
        );
    }

    #[test]
    fn test_rejects_unknown_chain_and_wrong_destination() {
        let network = NetworkConfig::mainnet();

        let mut req = request();
        req.source_chain_id = 999;
        assert_eq!(
            req.into_record(&network).unwrap_err(),
            ValidationError::UnknownChain(999)
        );

        let mut req = request();
        req.destination_chain_id = 11155111;
        assert!(matches!(
            req.into_record(&network).unwrap_err(),
            ValidationError::DestinationMismatch { .. }
        ));
    }
}

//! OP Stack contract bindings.
//!
//! Covers every contract touched across a withdrawal's lifecycle:
//! - L2ToL1MessagePasser (L2 predeploy, emits the withdrawal)
//! - OptimismPortal2 (L1, prove and finalize)
//! - L2OutputOracle (L1, legacy output proposals)
//! - DisputeGameFactory / FaultDisputeGame (L1, fault-proof proposals)

use alloy_primitives::{address, b256, Address, B256};
use alloy_sol_types::sol;

/// L2ToL1MessagePasser predeploy, identical on every OP Stack chain.
pub const MESSAGE_PASSER_ADDRESS: Address = address!("4200000000000000000000000000000000000016");

/// L2StandardBridge predeploy, identical on every OP Stack chain.
pub const L2_STANDARD_BRIDGE_ADDRESS: Address =
    address!("4200000000000000000000000000000000000010");

/// Version byte of the output root preimage.
pub const OUTPUT_VERSION_V0: B256 =
    b256!("0000000000000000000000000000000000000000000000000000000000000000");

sol! {
    /// Withdrawal transaction structure (shared across contracts)
    #[derive(Debug, PartialEq, Eq)]
    struct WithdrawalTransaction {
        uint256 nonce;
        address sender;
        address target;
        uint256 value;
        uint256 gasLimit;
        bytes data;
    }

    /// Output root proof structure (used in proving withdrawals)
    #[derive(Debug, PartialEq, Eq)]
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    #[sol(rpc)]
    interface IL2ToL1MessagePasser {
        /// Emitted when a withdrawal is initiated on L2
        event MessagePassed(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );

        function sentMessages(bytes32) external view returns (bool);
    }

    #[sol(rpc)]
    interface IOptimismPortal2 {
        #[derive(Debug)]
        struct ProvenWithdrawal {
            address disputeGameProxy;
            uint64 timestamp;
        }

        function provenWithdrawals(bytes32 withdrawalHash, address proofSubmitter)
            external view returns (ProvenWithdrawal memory);

        function finalizedWithdrawals(bytes32 withdrawalHash)
            external view returns (bool);

        /// Get the proof maturity delay (usually 7 days = 604800 seconds)
        function proofMaturityDelaySeconds()
            external view returns (uint256);

        function respectedGameType()
            external view returns (uint32);

        /// `_disputeGameIndex` is the L2 output index on portals backed by an
        /// L2OutputOracle.
        function proveWithdrawalTransaction(
            WithdrawalTransaction calldata _tx,
            uint256 _disputeGameIndex,
            OutputRootProof calldata _outputRootProof,
            bytes[] calldata _withdrawalProof
        ) external;

        function finalizeWithdrawalTransaction(
            WithdrawalTransaction calldata _tx
        ) external;
    }

    /// Output proposals registry on chains that predate fault proofs.
    #[sol(rpc)]
    interface IL2OutputOracle {
        function latestBlockNumber() external view returns (uint256);

        function FINALIZATION_PERIOD_SECONDS() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IDisputeGameFactory {
        struct GameSearchResult {
            uint256 index;
            bytes32 metadata;
            uint256 timestamp;
            bytes32 rootClaim;
            bytes extraData;
        }

        function gameCount() external view returns (uint256 gameCount_);

        function findLatestGames(
            uint32 _gameType,
            uint256 _start,
            uint256 _n
        ) external view returns (GameSearchResult[] memory);
    }

    #[sol(rpc)]
    interface IFaultDisputeGame {
        /// Get the L2 block number this game is disputing
        function l2BlockNumber() external view returns (uint256);
    }
}

/// Extract the game proxy address from a packed `GameId`.
///
/// Layout: type (32 bits) | timestamp (64 bits) | proxy address (160 bits).
pub fn game_proxy_address(metadata: B256) -> Address {
    Address::from_slice(&metadata.as_slice()[12..32])
}

//! Arbitrum (Nitro) contract bindings.
//!
//! - ArbSys (L2 precompile, emits `L2ToL1Tx`)
//! - Outbox (L1, executes proven L2→L1 messages)
//! - RollupCore (L1, assertion confirmation parameters)

use alloy_primitives::{address, Address};
use alloy_sol_types::sol;

/// ArbSys precompile address on every Arbitrum chain.
pub const ARB_SYS_ADDRESS: Address = address!("0000000000000000000000000000000000000064");

sol! {
    #[sol(rpc)]
    interface IArbSys {
        /// Emitted for every L2→L1 message, including plain ETH withdrawals.
        event L2ToL1Tx(
            address caller,
            address indexed destination,
            uint256 indexed hash,
            uint256 indexed position,
            uint256 arbBlockNum,
            uint256 ethBlockNum,
            uint256 timestamp,
            uint256 callvalue,
            bytes data
        );

        function withdrawEth(address destination) external payable returns (uint256);
    }

    #[sol(rpc)]
    interface IOutbox {
        event OutBoxTransactionExecuted(
            address indexed to,
            address indexed l2Sender,
            uint256 indexed zero,
            uint256 transactionIndex
        );

        function isSpent(uint256 index) external view returns (bool);

        function executeTransaction(
            bytes32[] calldata proof,
            uint256 index,
            address l2Sender,
            address to,
            uint256 l2Block,
            uint256 l1Block,
            uint256 l2Timestamp,
            uint256 value,
            bytes calldata data
        ) external;
    }

    #[sol(rpc)]
    interface IRollupCore {
        /// Number of L1 blocks an assertion must wait before confirmation.
        function confirmPeriodBlocks() external view returns (uint64);
    }
}

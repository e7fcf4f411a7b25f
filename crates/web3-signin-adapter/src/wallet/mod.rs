/*
[INPUT]:  Injected wallet objects and local private keys
[OUTPUT]: Wallet provider capability, handles and concrete providers
[POS]:    Wallet layer - the injected-wallet side of the flow
[UPDATE]: When adding wallet kinds or provider methods
*/

pub mod evm;
pub mod handle;
pub mod mock;
pub mod provider;
pub mod solana;

pub use evm::LocalEthereumWallet;
pub use handle::ProviderHandle;
pub use mock::MockWalletProvider;
pub use provider::{ApprovalPolicy, ConnectOptions, ProviderEvent, WalletProvider};
pub use solana::LocalSolanaWallet;

//! Quorum CLI Application
//!
//! A command-line interface for deploying and operating multi-owner wallets.

use clap::{Parser, Subcommand};
use quorum_wallet::api::{self, ApiConfig, ApiState};
use quorum_wallet::cli::{self, AppState};
use quorum_wallet::factory::FactoryKind;
use quorum_wallet::multisig::WalletCall;
use quorum_wallet::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Multi-owner wallets with on-chain confirmations and signed endorsements", long_about = None)]
struct Cli {
    /// Data directory for chain state and keys
    #[arg(short, long, default_value = ".quorum_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Owner key operations
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Credit funds to an address
    Fund {
        /// Recipient address or key label
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: u128,
    },

    /// Show the balance of an address
    Balance {
        /// Address or key label
        #[arg(short, long)]
        address: String,
    },

    /// Send value, with optional call data, from a stored key
    Send {
        /// Sender key label or address
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, default_value = "0")]
        amount: u128,

        /// Hex call data
        #[arg(long)]
        data: Option<String>,
    },

    /// Multisig wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Governance changes, proposed as wallet self-calls
    Governance {
        #[command(subcommand)]
        action: GovernanceCommands,
    },

    /// Name registry operations
    Registry {
        #[command(subcommand)]
        action: RegistryCommands,
    },

    /// Factory operations
    Factory {
        #[command(subcommand)]
        action: FactoryCommands,
    },

    /// List deployed contracts
    Contracts,

    /// Show emitted events
    Logs {
        /// Only events from this contract
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Export chain state to file
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import chain state from file
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List saved state backups
    Backups,

    /// Replace the chain state with a saved backup
    Restore {
        /// Backup index, 0 is the newest
        #[arg(short, long)]
        backup: usize,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new key
    New {
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Import a key from its private key hex
    Import {
        #[arg(short, long)]
        private_key: String,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all keys
    List,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Deploy a new multisig wallet
    Deploy {
        /// Deployer key
        #[arg(short, long)]
        from: String,

        /// Comma-separated owner addresses or key labels
        #[arg(short, long)]
        owners: String,

        /// Required confirmations
        #[arg(short, long)]
        threshold: u32,
    },

    /// Show wallet details
    Info {
        #[arg(short, long)]
        wallet: String,
    },

    /// Propose a transaction
    Submit {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, default_value = "0")]
        value: u128,

        #[arg(long)]
        data: Option<String>,
    },

    /// Confirm a pending transaction
    Confirm {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        id: u64,
    },

    /// Revoke a confirmation
    Revoke {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        id: u64,
    },

    /// Retry execution of a confirmed transaction
    Execute {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        id: u64,
    },

    /// List transactions
    Transactions {
        #[arg(short, long)]
        wallet: String,

        /// First index in the filtered list
        #[arg(long, default_value = "0")]
        from: usize,

        /// End index (exclusive) in the filtered list
        #[arg(long)]
        to: Option<usize>,

        /// Only pending transactions
        #[arg(long)]
        pending: bool,

        /// Only executed transactions
        #[arg(long)]
        executed: bool,
    },

    /// Sign an endorsement for the wallet's current nonce
    Sign {
        #[arg(short, long)]
        key: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, default_value = "0")]
        value: u128,

        #[arg(long)]
        data: Option<String>,
    },

    /// Relay signed endorsements for immediate execution
    ExecuteSigned {
        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long, default_value = "0")]
        value: u128,

        #[arg(long)]
        data: Option<String>,

        /// Comma-separated stored keys to sign with
        #[arg(long)]
        signers: Option<String>,

        /// Comma-separated signatures, already sorted by signer
        #[arg(long)]
        signatures: Option<String>,
    },
}

#[derive(Subcommand)]
enum GovernanceCommands {
    /// Add an owner
    AddOwner {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        owner: String,
    },

    /// Remove an owner
    RemoveOwner {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        owner: String,
    },

    /// Replace an owner in place
    ReplaceOwner {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Change the number of required confirmations
    ChangeThreshold {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        threshold: u32,
    },
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// Deploy a registry owned by the deployer
    Deploy {
        #[arg(short, long)]
        from: String,
    },

    /// Register a name
    Register {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        registry: String,

        /// Dotted name or 32-byte hex id
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        address: String,
    },

    /// Remove a name
    Unregister {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        registry: String,

        #[arg(short, long)]
        name: String,
    },

    /// Resolve a name
    Resolve {
        #[arg(short, long)]
        registry: String,

        #[arg(short, long)]
        name: String,
    },

    /// Transfer registry ownership
    TransferOwnership {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        registry: String,

        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum FactoryCommands {
    /// Deploy a factory
    Deploy {
        #[arg(short, long)]
        from: String,

        /// "wallet" or "registry"
        #[arg(short, long, default_value = "wallet")]
        kind: String,
    },

    /// Create a wallet through a wallet factory
    CreateWallet {
        #[arg(short, long)]
        from: String,

        #[arg(long)]
        factory: String,

        /// Attached fee
        #[arg(short, long, default_value = "0")]
        value: u128,

        #[arg(short, long)]
        owners: String,

        #[arg(short, long)]
        threshold: u32,
    },

    /// Create a registry through a registry factory
    CreateRegistry {
        #[arg(short, long)]
        from: String,

        #[arg(long)]
        factory: String,

        #[arg(short, long, default_value = "0")]
        value: u128,
    },

    /// Show the fee, or set it with --set
    Fee {
        #[arg(long)]
        factory: String,

        #[arg(short, long)]
        from: Option<String>,

        #[arg(long)]
        set: Option<u128>,
    },

    /// Withdraw collected fees to the owner
    Withdraw {
        #[arg(short, long)]
        from: String,

        #[arg(long)]
        factory: String,
    },

    /// Transfer factory ownership
    TransferOwnership {
        #[arg(short, long)]
        from: String,

        #[arg(long)]
        factory: String,

        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the read-only REST API server
    Start {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    // Process commands
    match cli.command {
        Commands::Api { .. } => unreachable!(),

        Commands::Key { action } => match action {
            KeyCommands::New { label } => cli::cmd_key_new(&state, label.as_deref())?,
            KeyCommands::Import { private_key, label } => {
                cli::cmd_key_import(&state, &private_key, label.as_deref())?
            }
            KeyCommands::List => cli::cmd_key_list(&state)?,
        },

        Commands::Fund { to, amount } => cli::cmd_fund(&mut state, &to, amount)?,

        Commands::Balance { address } => cli::cmd_balance(&state, &address)?,

        Commands::Send {
            from,
            to,
            amount,
            data,
        } => cli::cmd_send(&mut state, &from, &to, amount, data.as_deref())?,

        Commands::Wallet { action } => run_wallet_command(&mut state, action)?,

        Commands::Governance { action } => {
            let (from, wallet, call) = match action {
                GovernanceCommands::AddOwner { from, wallet, owner } => {
                    let owner = state.resolve_address(&owner)?;
                    (from, wallet, WalletCall::AddOwner(owner))
                }
                GovernanceCommands::RemoveOwner { from, wallet, owner } => {
                    let owner = state.resolve_address(&owner)?;
                    (from, wallet, WalletCall::RemoveOwner(owner))
                }
                GovernanceCommands::ReplaceOwner {
                    from,
                    wallet,
                    old,
                    new,
                } => {
                    let old = state.resolve_address(&old)?;
                    let new = state.resolve_address(&new)?;
                    (from, wallet, WalletCall::ReplaceOwner { old, new })
                }
                GovernanceCommands::ChangeThreshold {
                    from,
                    wallet,
                    threshold,
                } => (from, wallet, WalletCall::ChangeRequirement(threshold)),
            };
            cli::cmd_wallet_governance(&mut state, &from, &wallet, call)?;
        }

        Commands::Registry { action } => match action {
            RegistryCommands::Deploy { from } => cli::cmd_registry_deploy(&mut state, &from)?,
            RegistryCommands::Register {
                from,
                registry,
                name,
                address,
            } => cli::cmd_registry_register(&mut state, &from, &registry, &name, &address)?,
            RegistryCommands::Unregister {
                from,
                registry,
                name,
            } => cli::cmd_registry_unregister(&mut state, &from, &registry, &name)?,
            RegistryCommands::Resolve { registry, name } => {
                cli::cmd_registry_resolve(&state, &registry, &name)?
            }
            RegistryCommands::TransferOwnership {
                from,
                registry,
                owner,
            } => cli::cmd_transfer_ownership(&mut state, &from, &registry, &owner)?,
        },

        Commands::Factory { action } => match action {
            FactoryCommands::Deploy { from, kind } => {
                let kind = match kind.as_str() {
                    "wallet" => FactoryKind::Wallet,
                    "registry" => FactoryKind::Registry,
                    other => return Err(format!("Unknown factory kind: {}", other).into()),
                };
                cli::cmd_factory_deploy(&mut state, &from, kind)?
            }
            FactoryCommands::CreateWallet {
                from,
                factory,
                value,
                owners,
                threshold,
            } => cli::cmd_factory_create_wallet(
                &mut state, &from, &factory, value, &owners, threshold,
            )?,
            FactoryCommands::CreateRegistry {
                from,
                factory,
                value,
            } => cli::cmd_factory_create_registry(&mut state, &from, &factory, value)?,
            FactoryCommands::Fee { factory, from, set } => {
                cli::cmd_factory_fee(&mut state, from.as_deref(), &factory, set)?
            }
            FactoryCommands::Withdraw { from, factory } => {
                cli::cmd_factory_withdraw(&mut state, &from, &factory)?
            }
            FactoryCommands::TransferOwnership {
                from,
                factory,
                owner,
            } => cli::cmd_transfer_ownership(&mut state, &from, &factory, &owner)?,
        },

        Commands::Contracts => cli::cmd_contracts(&state)?,

        Commands::Logs { address } => cli::cmd_logs(&state, address.as_deref())?,

        Commands::Export { output } => cli::cmd_export(&state, &output)?,

        Commands::Import { input } => cli::cmd_import(&mut state, &input)?,

        Commands::Backups => cli::cmd_backups(&state)?,

        Commands::Restore { backup } => cli::cmd_restore(&mut state, backup)?,
    }

    Ok(())
}

fn run_wallet_command(state: &mut AppState, action: WalletCommands) -> cli::CliResult<()> {
    match action {
        WalletCommands::Deploy {
            from,
            owners,
            threshold,
        } => cli::cmd_wallet_deploy(state, &from, &owners, threshold),
        WalletCommands::Info { wallet } => cli::cmd_wallet_info(state, &wallet),
        WalletCommands::Submit {
            from,
            wallet,
            to,
            value,
            data,
        } => cli::cmd_wallet_submit(state, &from, &wallet, &to, value, data.as_deref()),
        WalletCommands::Confirm { from, wallet, id } => {
            cli::cmd_wallet_confirm(state, &from, &wallet, id)
        }
        WalletCommands::Revoke { from, wallet, id } => {
            cli::cmd_wallet_revoke(state, &from, &wallet, id)
        }
        WalletCommands::Execute { from, wallet, id } => {
            cli::cmd_wallet_execute(state, &from, &wallet, id)
        }
        WalletCommands::Transactions {
            wallet,
            from,
            to,
            pending,
            executed,
        } => {
            // No filter flag means both
            let (pending, executed) = if pending || executed {
                (pending, executed)
            } else {
                (true, true)
            };
            cli::cmd_wallet_transactions(state, &wallet, from, to, pending, executed)
        }
        WalletCommands::Sign {
            key,
            wallet,
            to,
            value,
            data,
        } => cli::cmd_wallet_sign(state, &key, &wallet, &to, value, data.as_deref()),
        WalletCommands::ExecuteSigned {
            wallet,
            to,
            value,
            data,
            signers,
            signatures,
        } => cli::cmd_wallet_execute_signed(
            state,
            &wallet,
            &to,
            value,
            data.as_deref(),
            signers.as_deref(),
            signatures.as_deref(),
        ),
    }
}

fn run_api_command(action: &ApiCommands, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                let storage = Storage::new(StorageConfig {
                    data_dir: data_dir.to_path_buf(),
                    ..Default::default()
                })?;

                let chain = if storage.exists() {
                    println!("📂 Loading existing chain state...");
                    storage.load()?
                } else {
                    println!("📂 No chain state yet, serving an empty chain...");
                    Default::default()
                };

                let config = ApiConfig { port: *port };
                println!("🌐 API server on http://localhost:{}", config.port);
                api::serve(ApiState::new(chain, storage), &config).await?;
                Ok(())
            }
        }
    })
}

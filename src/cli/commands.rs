//! CLI commands for the quorum wallet
//!
//! Implements all command handlers for the CLI interface.

use crate::core::{Address, CallOutcome, CallRequest, Chain, Contract, Log, Receipt};
use crate::factory::FactoryKind;
use crate::keystore::KeyStore;
use crate::multisig::{EndorsementBundle, MultisigWallet, WalletCall};
use crate::registry::{id_hex, parse_name};
use crate::storage::{Storage, StorageConfig};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub chain: Chain,
    pub storage: Storage,
    pub keystore: KeyStore,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };

        let storage = Storage::new(storage_config)?;
        let keystore = KeyStore::new(&data_dir.join("keys"))?;

        let chain = if storage.exists() {
            storage.load()?
        } else {
            println!("🆕 Creating new chain state...");
            let chain = Chain::new();
            storage.save(&chain)?;
            chain
        };

        Ok(Self {
            chain,
            storage,
            keystore,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.chain)?;
        Ok(())
    }

    /// Address of a stored key, by label or address
    pub fn key_address(&self, name: &str) -> CliResult<Address> {
        Ok(self.keystore.find(name)?.address())
    }

    /// Parse an address, falling back to a stored key label
    pub fn resolve_address(&self, input: &str) -> CliResult<Address> {
        match input.parse::<Address>() {
            Ok(address) => Ok(address),
            Err(_) => self.key_address(input),
        }
    }

    /// Parse a comma-separated list of addresses or key labels
    pub fn resolve_addresses(&self, input: &str) -> CliResult<Vec<Address>> {
        input
            .split(',')
            .map(|s| self.resolve_address(s.trim()))
            .collect()
    }

    fn wallet(&self, address: &Address) -> CliResult<&MultisigWallet> {
        self.chain
            .wallet(address)
            .ok_or_else(|| format!("No wallet at {}", address).into())
    }
}

/// Decode optional `0x` hex call data
pub fn parse_data(data: Option<&str>) -> CliResult<Vec<u8>> {
    match data {
        Some(s) => Ok(hex::decode(s.strip_prefix("0x").unwrap_or(s))?),
        None => Ok(Vec::new()),
    }
}

fn print_receipt<T>(receipt: &Receipt<T>) {
    if receipt.logs.is_empty() {
        return;
    }
    println!("   Events:");
    for log in &receipt.logs {
        println!("   └─ {} @ {}", log.event.name(), log.address);
    }
}

fn print_outcome(outcome: &CallOutcome) {
    match outcome.reason() {
        None => println!("   ✅ Call succeeded"),
        Some(reason) => println!("   ❌ Call failed: {}", reason),
    }
}

// ==================== Keys and value ====================

/// Create a new owner key
pub fn cmd_key_new(state: &AppState, label: Option<&str>) -> CliResult<()> {
    let key = state.keystore.create(label)?;

    println!("🔐 New key created!");
    println!("   📍 Address: {}", key.address());
    if let Some(l) = &key.label {
        println!("   🏷️  Label: {}", l);
    }
    println!("\n   ⚠️  IMPORTANT: The private key is stored in the keys directory.");

    Ok(())
}

/// Import a key from its private key
pub fn cmd_key_import(state: &AppState, private_key: &str, label: Option<&str>) -> CliResult<()> {
    let key = state.keystore.import(private_key, label)?;
    println!("📥 Key imported: {}", key.address());
    Ok(())
}

/// List stored keys
pub fn cmd_key_list(state: &AppState) -> CliResult<()> {
    let keys = state.keystore.list()?;

    if keys.is_empty() {
        println!("📭 No keys found. Create one with: quorum key new");
        return Ok(());
    }

    println!("📋 Keys:");
    for key in &keys {
        let label = key.label.as_deref().unwrap_or("-");
        let balance = state.chain.balance_of(&key.address());
        println!("   {} ({}) - {}", key.address(), label, balance);
    }

    Ok(())
}

/// Credit funds to an address
pub fn cmd_fund(state: &mut AppState, to: &str, amount: u128) -> CliResult<()> {
    let address = state.resolve_address(to)?;
    state.chain.mint(address, amount);
    state.save()?;

    println!("💰 Funded {} with {}", address, amount);
    Ok(())
}

pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let address = state.resolve_address(address)?;
    println!("💰 Balance for {}: {}", address, state.chain.balance_of(&address));
    Ok(())
}

/// Send value, with optional call data, from a stored key
pub fn cmd_send(
    state: &mut AppState,
    from: &str,
    to: &str,
    amount: u128,
    data: Option<&str>,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let destination = state.resolve_address(to)?;
    let request = CallRequest::new(destination, amount, parse_data(data)?);

    let receipt = state.chain.send(sender, request)?;
    state.save()?;

    println!("📤 Sent {} from {} to {}", amount, sender, destination);
    if !receipt.output.is_empty() {
        println!("   Return data: 0x{}", hex::encode(&receipt.output));
    }
    print_receipt(&receipt);
    Ok(())
}

/// Print every committed log, optionally for one contract
pub fn cmd_logs(state: &AppState, address: Option<&str>) -> CliResult<()> {
    let filter = address.map(|a| state.resolve_address(a)).transpose()?;
    let logs: Vec<&Log> = match &filter {
        Some(address) => state.chain.logs_of(address).collect(),
        None => state.chain.logs().iter().collect(),
    };

    println!("📜 Logs ({}):", logs.len());
    for log in logs {
        println!("   {} {}", log.address, serde_json::to_string(&log.event)?);
    }
    Ok(())
}

/// List deployed contracts
pub fn cmd_contracts(state: &AppState) -> CliResult<()> {
    let contracts: Vec<_> = state.chain.contracts().collect();
    if contracts.is_empty() {
        println!("📜 No contracts deployed yet.");
        return Ok(());
    }

    println!("📜 Deployed contracts ({}):", contracts.len());
    for (address, contract) in contracts {
        let detail = match contract {
            Contract::Wallet(w) => w.registry().description(),
            Contract::Registry(r) => format!("{} names", r.len()),
            Contract::Factory(f) => format!("fee {}", f.fee()),
        };
        println!("   {} {} ({})", address, contract.type_name(), detail);
    }
    Ok(())
}

// ==================== Wallet ====================

/// Deploy a multisig wallet
pub fn cmd_wallet_deploy(
    state: &mut AppState,
    from: &str,
    owners: &str,
    threshold: u32,
) -> CliResult<()> {
    let deployer = state.key_address(from)?;
    let owners = state.resolve_addresses(owners)?;

    let receipt = state.chain.deploy_wallet(deployer, owners, threshold)?;
    state.save()?;

    let wallet = state.wallet(&receipt.output)?;
    println!("🔐 Multisig wallet deployed!");
    println!("   📍 Address: {}", receipt.output);
    println!("   🔢 Policy: {}", wallet.registry().description());
    Ok(())
}

/// Show wallet owners, threshold, nonce and balance
pub fn cmd_wallet_info(state: &AppState, wallet: &str) -> CliResult<()> {
    let address = state.resolve_address(wallet)?;
    let wallet = state.wallet(&address)?;

    println!("🔐 Multisig wallet {}", address);
    println!("   ├─ Policy: {}", wallet.registry().description());
    println!("   ├─ Balance: {}", state.chain.balance_of(&address));
    println!("   ├─ Nonce: {}", wallet.nonce());
    println!(
        "   ├─ Transactions: {} ({} pending)",
        wallet.transaction_count(),
        wallet.filtered_transaction_count(true, false)
    );
    println!("   └─ Owners:");
    for owner in wallet.owners() {
        println!("      └─ {}", owner);
    }
    Ok(())
}

/// Propose an action from an owner
pub fn cmd_wallet_submit(
    state: &mut AppState,
    from: &str,
    wallet: &str,
    to: &str,
    value: u128,
    data: Option<&str>,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let wallet = state.resolve_address(wallet)?;
    let destination = state.resolve_address(to)?;
    let payload = parse_data(data)?;

    submit(state, sender, wallet, destination, value, payload)
}

fn submit(
    state: &mut AppState,
    sender: Address,
    wallet: Address,
    destination: Address,
    value: u128,
    payload: Vec<u8>,
) -> CliResult<()> {
    let receipt = state
        .chain
        .submit_transaction(sender, wallet, destination, value, payload)?;
    state.save()?;

    let id = receipt.output;
    let w = state.wallet(&wallet)?;
    println!("📝 Transaction {} submitted", id);
    println!(
        "   Confirmations: {}/{}",
        w.confirmation_count(id),
        w.required()
    );
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_wallet_confirm(state: &mut AppState, from: &str, wallet: &str, id: u64) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let wallet = state.resolve_address(wallet)?;

    let receipt = state.chain.confirm_transaction(sender, wallet, id)?;
    state.save()?;

    println!("✍️  Transaction {} confirmed by {}", id, sender);
    if let Some(outcome) = &receipt.output {
        print_outcome(outcome);
    }
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_wallet_revoke(state: &mut AppState, from: &str, wallet: &str, id: u64) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let wallet = state.resolve_address(wallet)?;

    let receipt = state.chain.revoke_confirmation(sender, wallet, id)?;
    state.save()?;

    println!("↩️  Confirmation of transaction {} revoked", id);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_wallet_execute(state: &mut AppState, from: &str, wallet: &str, id: u64) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let wallet = state.resolve_address(wallet)?;

    let receipt = state.chain.execute_transaction(sender, wallet, id)?;
    state.save()?;

    println!("🚀 Transaction {} executed", id);
    print_outcome(&receipt.output);
    print_receipt(&receipt);
    Ok(())
}

/// List transactions at positions `from..to` of the filtered list
pub fn cmd_wallet_transactions(
    state: &AppState,
    wallet: &str,
    from: usize,
    to: Option<usize>,
    pending: bool,
    executed: bool,
) -> CliResult<()> {
    let address = state.resolve_address(wallet)?;
    let wallet = state.wallet(&address)?;
    let to = to.unwrap_or_else(|| wallet.filtered_transaction_count(pending, executed));

    let ids = wallet.transaction_ids(from, to, pending, executed);
    if ids.is_empty() {
        println!("📭 No matching transactions");
        return Ok(());
    }

    println!("📋 Transactions:");
    for id in ids {
        if let Some(tx) = wallet.transaction(id) {
            println!(
                "   #{} | {:?} | {} -> {} | {} bytes | {}/{} confirmations",
                id,
                tx.status,
                tx.value,
                tx.destination,
                tx.payload.len(),
                wallet.confirmation_count(id),
                wallet.required()
            );
        }
    }
    Ok(())
}

/// Sign an endorsement over the wallet's current nonce
pub fn cmd_wallet_sign(
    state: &AppState,
    key: &str,
    wallet: &str,
    to: &str,
    value: u128,
    data: Option<&str>,
) -> CliResult<()> {
    let key = state.keystore.find(key)?;
    let wallet = state.resolve_address(wallet)?;
    let destination = state.resolve_address(to)?;
    let payload = parse_data(data)?;

    let w = state.wallet(&wallet)?;
    let digest = w.signing_digest(&destination, value, &payload);
    let signature = key.key_pair().sign(&digest)?;

    println!("✍️  Endorsement by {} at nonce {}", key.address(), w.nonce());
    println!("   Signature: 0x{}", hex::encode(signature));
    Ok(())
}

/// Relay an endorsement bundle. Either sign with the given stored keys or
/// pass signatures already in signer order.
#[allow(clippy::too_many_arguments)]
pub fn cmd_wallet_execute_signed(
    state: &mut AppState,
    wallet: &str,
    to: &str,
    value: u128,
    data: Option<&str>,
    signers: Option<&str>,
    signatures: Option<&str>,
) -> CliResult<()> {
    let wallet = state.resolve_address(wallet)?;
    let destination = state.resolve_address(to)?;
    let payload = parse_data(data)?;

    let bundle = match (signers, signatures) {
        (Some(signers), _) => {
            let keys = signers
                .split(',')
                .map(|name| state.keystore.find(name.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            let pairs: Vec<_> = keys.iter().map(|k| k.key_pair()).collect();
            let digest = state
                .wallet(&wallet)?
                .signing_digest(&destination, value, &payload);
            EndorsementBundle::sign_sorted(&pairs, &digest)?
        }
        (None, Some(signatures)) => {
            let mut bytes = Vec::new();
            for sig in signatures.split(',') {
                let sig = sig.trim();
                bytes.extend(hex::decode(sig.strip_prefix("0x").unwrap_or(sig))?);
            }
            EndorsementBundle::from_bytes(bytes)
        }
        (None, None) => return Err("Provide --signers or --signatures".into()),
    };

    let receipt = state
        .chain
        .execute_signed(wallet, destination, value, payload, &bundle)?;
    state.save()?;

    println!("🚀 Executed with {} signatures", bundle.len());
    print_outcome(&receipt.output);
    print_receipt(&receipt);
    Ok(())
}

/// Governance change submitted as a self-call
pub fn cmd_wallet_governance(
    state: &mut AppState,
    from: &str,
    wallet: &str,
    call: WalletCall,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let wallet = state.resolve_address(wallet)?;
    println!("🏛️  Proposing {}", call.signature());
    submit(state, sender, wallet, wallet, 0, call.encode())
}

// ==================== Registry ====================

pub fn cmd_registry_deploy(state: &mut AppState, from: &str) -> CliResult<()> {
    let deployer = state.key_address(from)?;
    let receipt = state.chain.deploy_registry(deployer)?;
    state.save()?;

    println!("📒 Registry deployed at {}", receipt.output);
    println!("   Owner: {}", deployer);
    Ok(())
}

pub fn cmd_registry_register(
    state: &mut AppState,
    from: &str,
    registry: &str,
    name: &str,
    address: &str,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let registry = state.resolve_address(registry)?;
    let target = state.resolve_address(address)?;
    let id = parse_name(name);

    let receipt = state.chain.register(sender, registry, id, target)?;
    state.save()?;

    println!("📒 Registered {} ({}) -> {}", name, id_hex(&id), target);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_registry_unregister(
    state: &mut AppState,
    from: &str,
    registry: &str,
    name: &str,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let registry = state.resolve_address(registry)?;
    let id = parse_name(name);

    let receipt = state.chain.unregister(sender, registry, id)?;
    state.save()?;

    println!("🗑️  Unregistered {}", name);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_registry_resolve(state: &AppState, registry: &str, name: &str) -> CliResult<()> {
    let registry = state.resolve_address(registry)?;
    let address = state.chain.resolve(&registry, &parse_name(name))?;

    if address.is_zero() {
        println!("❓ {} is not registered", name);
    } else {
        println!("📍 {} -> {}", name, address);
    }
    Ok(())
}

/// Transfer ownership of a registry or factory
pub fn cmd_transfer_ownership(
    state: &mut AppState,
    from: &str,
    contract: &str,
    new_owner: &str,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let contract = state.resolve_address(contract)?;
    let new_owner = state.resolve_address(new_owner)?;

    let receipt = state.chain.transfer_ownership(sender, contract, new_owner)?;
    state.save()?;

    println!("👑 Ownership of {} transferred to {}", contract, new_owner);
    print_receipt(&receipt);
    Ok(())
}

// ==================== Factory ====================

pub fn cmd_factory_deploy(state: &mut AppState, from: &str, kind: FactoryKind) -> CliResult<()> {
    let deployer = state.key_address(from)?;
    let receipt = state.chain.deploy_factory(deployer, kind)?;
    state.save()?;

    println!("🏭 {} factory deployed at {}", kind, receipt.output);
    Ok(())
}

pub fn cmd_factory_create_wallet(
    state: &mut AppState,
    from: &str,
    factory: &str,
    value: u128,
    owners: &str,
    threshold: u32,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let factory = state.resolve_address(factory)?;
    let owners = state.resolve_addresses(owners)?;

    let receipt = state
        .chain
        .create_wallet(sender, factory, value, owners, threshold)?;
    state.save()?;

    println!("🔐 Wallet created at {}", receipt.output);
    print_receipt(&receipt);
    Ok(())
}

pub fn cmd_factory_create_registry(
    state: &mut AppState,
    from: &str,
    factory: &str,
    value: u128,
) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let factory = state.resolve_address(factory)?;

    let receipt = state.chain.create_registry(sender, factory, value)?;
    state.save()?;

    println!("📒 Registry created at {}", receipt.output);
    print_receipt(&receipt);
    Ok(())
}

/// Show the fee, or update it when `new_fee` is given
pub fn cmd_factory_fee(
    state: &mut AppState,
    from: Option<&str>,
    factory: &str,
    new_fee: Option<u128>,
) -> CliResult<()> {
    let address = state.resolve_address(factory)?;

    if let Some(fee) = new_fee {
        let sender = state.key_address(from.ok_or("--from is required to update the fee")?)?;
        let receipt = state.chain.update_fee(sender, address, fee)?;
        state.save()?;
        println!("💲 Fee updated to {}", fee);
        print_receipt(&receipt);
        return Ok(());
    }

    let factory = state
        .chain
        .factory(&address)
        .ok_or_else(|| format!("No factory at {}", address))?;
    println!("💲 {} factory {}", factory.kind(), address);
    println!("   ├─ Owner: {}", factory.owner());
    println!("   ├─ Fee: {}", factory.fee());
    println!("   └─ Collected: {}", state.chain.balance_of(&address));
    Ok(())
}

pub fn cmd_factory_withdraw(state: &mut AppState, from: &str, factory: &str) -> CliResult<()> {
    let sender = state.key_address(from)?;
    let factory = state.resolve_address(factory)?;

    let receipt = state.chain.withdraw(sender, factory)?;
    state.save()?;

    println!("💸 Withdrew {} to {}", receipt.output, sender);
    Ok(())
}

// ==================== Import / export ====================

/// List saved backups, newest first
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();
    if backups.is_empty() {
        println!("📭 No backups yet");
        return Ok(());
    }

    println!("🗄️  Backups in {:?}:", state.storage.data_dir());
    for index in backups {
        let chain = state.storage.restore_backup(index)?;
        println!(
            "   #{} | {} contracts | {} logs",
            index,
            chain.contracts().count(),
            chain.logs().len()
        );
    }
    Ok(())
}

/// Replace the current state with a backup
pub fn cmd_restore(state: &mut AppState, backup: usize) -> CliResult<()> {
    state.chain = state.storage.restore_backup(backup)?;
    state.save()?;

    println!("♻️  Restored backup #{}", backup);
    println!("   Contracts: {}", state.chain.contracts().count());
    Ok(())
}

/// Export chain state to file
pub fn cmd_export(state: &AppState, path: &PathBuf) -> CliResult<()> {
    crate::storage::save_to_file(&state.chain, path)?;
    println!("📦 Chain state exported to {:?}", path);
    Ok(())
}

/// Import chain state from file
pub fn cmd_import(state: &mut AppState, path: &PathBuf) -> CliResult<()> {
    state.chain = crate::storage::load_from_file(path)?;
    state.save()?;

    println!("📥 Chain state imported from {:?}", path);
    println!("   Contracts: {}", state.chain.contracts().count());
    Ok(())
}

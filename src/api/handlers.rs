//! REST API handlers for chain inspection

use crate::core::{Address, Chain, Contract};
use crate::multisig::{ActionStatus, MultisigWallet, ProposedAction};
use crate::registry::{id_hex, parse_name};
use crate::storage::Storage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<RwLock<Chain>>,
    pub storage: Arc<Storage>,
}

impl ApiState {
    pub fn new(chain: Chain, storage: Storage) -> Self {
        Self {
            chain: Arc::new(RwLock::new(chain)),
            storage: Arc::new(storage),
        }
    }

    /// Reload the chain from disk so CLI writes become visible
    pub async fn refresh(&self) {
        let storage = Arc::clone(&self.storage);
        let loaded = tokio::task::spawn_blocking(move || {
            storage.exists().then(|| storage.load())
        })
        .await;

        match loaded {
            Ok(Some(Ok(chain))) => *self.chain.write().await = chain,
            Ok(Some(Err(e))) => log::warn!("Keeping cached chain state: {}", e),
            Ok(None) => {}
            Err(e) => log::warn!("State reload task failed: {}", e),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub contracts: usize,
    pub logs: usize,
}

#[derive(Debug, Serialize)]
pub struct ContractSummary {
    pub address: Address,
    #[serde(rename = "type")]
    pub contract_type: &'static str,
    pub balance: u128,
}

#[derive(Debug, Serialize)]
pub struct WalletInfo {
    pub address: Address,
    pub owners: Vec<Address>,
    pub required: u32,
    pub nonce: u64,
    pub balance: u128,
    pub transaction_count: usize,
    pub pending_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: u64,
    pub destination: Address,
    pub value: u128,
    pub payload: String,
    pub status: ActionStatus,
    pub confirmations: Vec<Address>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl TransactionResponse {
    fn new(wallet: &MultisigWallet, tx: &ProposedAction) -> Self {
        Self {
            id: tx.id,
            destination: tx.destination,
            value: tx.value,
            payload: format!("0x{}", hex::encode(&tx.payload)),
            status: tx.status,
            confirmations: wallet.confirmations(tx.id),
            confirmed: wallet.is_confirmed(tx.id),
            created_at: tx.created_at,
            executed_at: tx.executed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub name: String,
    pub id: String,
    pub address: Address,
    pub registered: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

fn parse_address(input: &str) -> Result<Address, (StatusCode, Json<ApiError>)> {
    input
        .parse()
        .map_err(|e| error(StatusCode::BAD_REQUEST, format!("Invalid address: {}", e)))
}

fn find_wallet<'a>(
    chain: &'a Chain,
    address: &Address,
) -> Result<&'a MultisigWallet, (StatusCode, Json<ApiError>)> {
    chain
        .wallet(address)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No wallet at {}", address)))
}

// ============================================================================
// Request Types
// ============================================================================

/// Index range and status filter for wallet transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    #[serde(default)]
    pub from: usize,
    pub to: Option<usize>,
    pub pending: Option<bool>,
    pub executed: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    state.refresh().await;
    let chain = state.chain.read().await;

    Json(HealthResponse {
        status: "ok",
        contracts: chain.contracts().count(),
        logs: chain.logs().len(),
    })
}

/// GET /api/contracts - List deployed contracts
pub async fn list_contracts(State(state): State<ApiState>) -> Json<Vec<ContractSummary>> {
    state.refresh().await;
    let chain = state.chain.read().await;

    Json(
        chain
            .contracts()
            .map(|(address, contract)| ContractSummary {
                address: *address,
                contract_type: contract.type_name(),
                balance: chain.balance_of(address),
            })
            .collect(),
    )
}

/// GET /api/contracts/:address - Raw contract state
pub async fn get_contract(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Contract> {
    let address = parse_address(&address)?;
    state.refresh().await;
    let chain = state.chain.read().await;

    chain
        .contract(&address)
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No contract at {}", address)))
}

/// GET /api/wallets/:address - Owners, threshold and counters
pub async fn get_wallet(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<WalletInfo> {
    let address = parse_address(&address)?;
    state.refresh().await;
    let chain = state.chain.read().await;
    let wallet = find_wallet(&chain, &address)?;

    Ok(Json(WalletInfo {
        address,
        owners: wallet.owners().to_vec(),
        required: wallet.required(),
        nonce: wallet.nonce(),
        balance: chain.balance_of(&address),
        transaction_count: wallet.transaction_count(),
        pending_count: wallet.filtered_transaction_count(true, false),
        created_at: wallet.created_at(),
    }))
}

/// GET /api/wallets/:address/transactions?from=&to=&pending=&executed=
///
/// Both filters default to true; `to` defaults to the filtered count.
pub async fn list_transactions(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Vec<TransactionResponse>> {
    let address = parse_address(&address)?;
    state.refresh().await;
    let chain = state.chain.read().await;
    let wallet = find_wallet(&chain, &address)?;

    let pending = query.pending.unwrap_or(true);
    let executed = query.executed.unwrap_or(true);
    let to = query
        .to
        .unwrap_or_else(|| wallet.filtered_transaction_count(pending, executed));

    let transactions = wallet
        .transaction_ids(query.from, to, pending, executed)
        .into_iter()
        .filter_map(|id| wallet.transaction(id))
        .map(|tx| TransactionResponse::new(wallet, tx))
        .collect();

    Ok(Json(transactions))
}

/// GET /api/wallets/:address/transactions/:id - One transaction with its confirmations
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path((address, id)): Path<(String, u64)>,
) -> ApiResult<TransactionResponse> {
    let address = parse_address(&address)?;
    state.refresh().await;
    let chain = state.chain.read().await;
    let wallet = find_wallet(&chain, &address)?;

    wallet
        .transaction(id)
        .map(|tx| Json(TransactionResponse::new(wallet, tx)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("Transaction {} not found", id)))
}

/// GET /api/registries/:address/resolve/:name - Resolve a dotted name or hex id
pub async fn resolve_name(
    State(state): State<ApiState>,
    Path((address, name)): Path<(String, String)>,
) -> ApiResult<ResolveResponse> {
    let registry = parse_address(&address)?;
    state.refresh().await;
    let chain = state.chain.read().await;

    let id = parse_name(&name);
    let resolved = chain
        .resolve(&registry, &id)
        .map_err(|e| error(StatusCode::NOT_FOUND, e.to_string()))?;

    Ok(Json(ResolveResponse {
        name,
        id: id_hex(&id),
        address: resolved,
        registered: !resolved.is_zero(),
    }))
}

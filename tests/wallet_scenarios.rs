//! End-to-end wallet scenarios against the in-memory chain

use quorum_wallet::core::{Address, Authorization, CallRequest, Chain, ChainError, Event};
use quorum_wallet::crypto::KeyPair;
use quorum_wallet::factory::{calls as factory_calls, FactoryError, FactoryKind};
use quorum_wallet::multisig::{ActionStatus, EndorsementBundle, WalletCall, WalletError};
use quorum_wallet::registry::{calls as registry_calls, namehash};

fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn keys(n: usize) -> Vec<KeyPair> {
    (0..n).map(|_| KeyPair::generate()).collect()
}

#[test]
fn test_governance_then_signed_execution() {
    let ks = keys(5);
    let [a, b, c, d, e] = [0, 1, 2, 3, 4].map(|i| ks[i].address());
    let x = addr(0x58);

    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b, c, d], 2).unwrap().output;
    chain.mint(wallet, 10);

    // A proposes adding E, B's confirmation executes it
    let add = chain
        .submit_transaction(a, wallet, wallet, 0, WalletCall::AddOwner(e).encode())
        .unwrap()
        .output;
    let receipt = chain.confirm_transaction(b, wallet, add).unwrap();
    assert!(receipt.output.unwrap().success);
    assert_eq!(chain.wallet(&wallet).unwrap().owners(), &[a, b, c, d, e]);
    assert_eq!(chain.wallet(&wallet).unwrap().required(), 2);

    // A proposes removing B, C confirms
    let remove = chain
        .submit_transaction(a, wallet, wallet, 0, WalletCall::RemoveOwner(b).encode())
        .unwrap()
        .output;
    chain.confirm_transaction(c, wallet, remove).unwrap();
    assert_eq!(chain.wallet(&wallet).unwrap().owners(), &[a, c, d, e]);

    // Endorsements from A and C over "send 3 to X"
    let digest = chain.wallet(&wallet).unwrap().signing_digest(&x, 3, &[]);
    let bundle = EndorsementBundle::sign_sorted(&[&ks[2], &ks[0]], &digest).unwrap();

    let receipt = chain
        .execute_signed(wallet, x, 3, Vec::new(), &bundle)
        .unwrap();
    assert!(receipt.output.success);
    assert_eq!(chain.balance_of(&x), 3);
    assert_eq!(chain.wallet(&wallet).unwrap().nonce(), 1);

    // Verbatim resubmission no longer matches the nonce
    assert!(chain
        .execute_signed(wallet, x, 3, Vec::new(), &bundle)
        .is_err());
    assert_eq!(chain.balance_of(&x), 3);
    assert_eq!(chain.wallet(&wallet).unwrap().nonce(), 1);
}

#[test]
fn test_removed_owner_cannot_endorse() {
    let ks = keys(3);
    let [a, b, c] = [0, 1, 2].map(|i| ks[i].address());

    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b, c], 2).unwrap().output;
    chain.mint(wallet, 10);

    let id = chain
        .submit_transaction(a, wallet, wallet, 0, WalletCall::RemoveOwner(b).encode())
        .unwrap()
        .output;
    chain.confirm_transaction(c, wallet, id).unwrap();

    let digest = chain.wallet(&wallet).unwrap().signing_digest(&addr(9), 1, &[]);
    let bundle = EndorsementBundle::sign_sorted(&[&ks[0], &ks[1]], &digest).unwrap();
    let err = chain
        .execute_signed(wallet, addr(9), 1, Vec::new(), &bundle)
        .unwrap_err();

    assert!(matches!(err, ChainError::Wallet(WalletError::SignerNotOwner(_))));
    assert_eq!(chain.wallet(&wallet).unwrap().nonce(), 0);
}

#[test]
fn test_too_few_endorsements_rejected() {
    let ks = keys(2);
    let [a, b] = [0, 1].map(|i| ks[i].address());

    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b], 2).unwrap().output;

    let digest = chain.wallet(&wallet).unwrap().signing_digest(&addr(9), 0, &[]);
    let bundle = EndorsementBundle::sign_sorted(&[&ks[0]], &digest).unwrap();
    let err = chain
        .execute_signed(wallet, addr(9), 0, Vec::new(), &bundle)
        .unwrap_err();

    assert!(matches!(
        err,
        ChainError::Wallet(WalletError::InsufficientSignatures { have: 1, need: 2 })
    ));
}

#[test]
fn test_reentrant_call_fails_and_outer_action_stays_executed() {
    let a = addr(1);
    let mut chain = Chain::new();
    let outer = chain.deploy_wallet(a, vec![a], 1).unwrap().output;
    let inner = chain.deploy_wallet(a, vec![outer], 1).unwrap().output;

    // Outer asks inner to call back into outer while outer is executing
    let callback = WalletCall::Submit {
        destination: outer,
        value: 0,
        payload: WalletCall::Confirm(0).encode(),
    }
    .encode();
    let receipt = chain
        .submit_transaction(a, outer, inner, 0, callback)
        .unwrap();

    let events: Vec<_> = receipt
        .logs
        .iter()
        .map(|log| (log.address, log.event.name()))
        .collect();
    assert_eq!(
        events,
        vec![
            (outer, "Submission"),
            (outer, "Confirmation"),
            (inner, "Submission"),
            (inner, "Confirmation"),
            (inner, "ExecutionFailure"),
            (outer, "Execution"),
        ]
    );

    let outer_tx = chain.wallet(&outer).unwrap().transaction(0).unwrap();
    assert_eq!(outer_tx.status, ActionStatus::Executed);
    let inner_tx = chain.wallet(&inner).unwrap().transaction(0).unwrap();
    assert_eq!(inner_tx.status, ActionStatus::Failed);

    // Terminal: neither can be executed again
    assert!(matches!(
        chain.execute_transaction(a, outer, 0),
        Err(ChainError::Wallet(WalletError::AlreadyExecuted(0)))
    ));
}

#[test]
fn test_reentrant_signed_execution_fails_and_nonce_advances_once() {
    let ks = keys(2);
    let [a, b] = [0, 1].map(|i| ks[i].address());
    let x = addr(0x58);

    let mut chain = Chain::new();
    let outer = chain.deploy_wallet(a, vec![a, b], 2).unwrap().output;
    let inner = chain.deploy_wallet(a, vec![outer], 1).unwrap().output;
    chain.mint(outer, 10);

    // A second bundle, valid at nonce 0, that the inner wallet tries to relay
    let pay_digest = chain.wallet(&outer).unwrap().signing_digest(&x, 5, &[]);
    let pay_bundle = EndorsementBundle::sign_sorted(&[&ks[0], &ks[1]], &pay_digest).unwrap();
    let relay = WalletCall::ExecuteSigned {
        destination: x,
        value: 5,
        payload: Vec::new(),
        signatures: pay_bundle.as_bytes().to_vec(),
    };
    let callback = WalletCall::Submit {
        destination: outer,
        value: 0,
        payload: relay.encode(),
    }
    .encode();

    let digest = chain
        .wallet(&outer)
        .unwrap()
        .signing_digest(&inner, 0, &callback);
    let bundle = EndorsementBundle::sign_sorted(&[&ks[0], &ks[1]], &digest).unwrap();
    let receipt = chain
        .execute_signed(outer, inner, 0, callback, &bundle)
        .unwrap();

    assert!(receipt.output.success);
    assert!(receipt.events().any(|e| matches!(
        e,
        Event::Execution {
            authorization: Authorization::Nonce(0),
            success: true
        }
    )));
    let inner_tx = chain.wallet(&inner).unwrap().transaction(0).unwrap();
    assert_eq!(inner_tx.status, ActionStatus::Failed);
    assert_eq!(chain.wallet(&outer).unwrap().nonce(), 1);
    assert_eq!(chain.balance_of(&x), 0);
    assert_eq!(chain.balance_of(&outer), 10);

    // The relayed bundle was signed at nonce 0 and is now stale
    assert!(chain
        .execute_signed(outer, x, 5, Vec::new(), &pay_bundle)
        .is_err());
    assert_eq!(chain.wallet(&outer).unwrap().nonce(), 1);
}

#[test]
fn test_signed_bundle_relayed_by_another_wallet() {
    let ks = keys(2);
    let [a, b] = [0, 1].map(|i| ks[i].address());
    let x = addr(0x58);

    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b], 2).unwrap().output;
    let relayer = chain.deploy_wallet(a, vec![a], 1).unwrap().output;
    chain.mint(wallet, 10);

    let digest = chain.wallet(&wallet).unwrap().signing_digest(&x, 3, &[]);
    let bundle = EndorsementBundle::sign_sorted(&[&ks[0], &ks[1]], &digest).unwrap();
    let relay = WalletCall::ExecuteSigned {
        destination: x,
        value: 3,
        payload: Vec::new(),
        signatures: bundle.as_bytes().to_vec(),
    }
    .encode();

    let id = chain
        .submit_transaction(a, relayer, wallet, 0, relay)
        .unwrap()
        .output;

    let relayed = chain.wallet(&relayer).unwrap().transaction(id).unwrap();
    assert_eq!(relayed.status, ActionStatus::Executed);
    assert_eq!(chain.wallet(&wallet).unwrap().nonce(), 1);
    assert_eq!(chain.balance_of(&x), 3);
    assert_eq!(chain.balance_of(&wallet), 7);
}

#[test]
fn test_value_sent_with_wallet_call_is_refused() {
    let (a, b) = (addr(1), addr(2));
    let mut chain = Chain::new();
    chain.mint(b, 50);
    let wallet = chain.deploy_wallet(a, vec![a, b], 2).unwrap().output;
    let id = chain
        .submit_transaction(a, wallet, addr(9), 0, Vec::new())
        .unwrap()
        .output;
    let logs_before = chain.logs().len();

    let err = chain
        .send(b, CallRequest::new(wallet, 50, WalletCall::Confirm(id).encode()))
        .unwrap_err();

    assert!(matches!(err, ChainError::CallFailed(ref reason) if reason.contains("does not accept value")));
    assert_eq!(chain.balance_of(&b), 50);
    assert_eq!(chain.balance_of(&wallet), 0);
    assert_eq!(chain.wallet(&wallet).unwrap().confirmations(id), vec![a]);
    assert_eq!(chain.logs().len(), logs_before);
}

#[test]
fn test_wallet_owned_registry() {
    let (a, b) = (addr(1), addr(2));
    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b], 2).unwrap().output;
    let registry = chain.deploy_registry(a).unwrap().output;
    chain.transfer_ownership(a, registry, wallet).unwrap();

    // The previous owner lost control
    assert!(chain
        .register(a, registry, namehash("vault.eth"), addr(7))
        .is_err());

    let payload = registry_calls::register(&namehash("vault.eth"), &addr(7));
    let id = chain
        .submit_transaction(a, wallet, registry, 0, payload)
        .unwrap()
        .output;
    let receipt = chain.confirm_transaction(b, wallet, id).unwrap();

    assert!(receipt.events().any(|e| matches!(e, Event::Registered { .. })));
    assert_eq!(
        chain.resolve(&registry, &namehash("vault.eth")).unwrap(),
        addr(7)
    );
}

#[test]
fn test_wallet_owned_factory_fees() {
    let (a, creator) = (addr(1), addr(3));
    let mut chain = Chain::new();
    chain.mint(creator, 50);
    let wallet = chain.deploy_wallet(a, vec![a], 1).unwrap().output;
    let factory = chain.deploy_factory(a, FactoryKind::Wallet).unwrap().output;
    chain.transfer_ownership(a, factory, wallet).unwrap();

    chain
        .submit_transaction(a, wallet, factory, 0, factory_calls::update_fee(10))
        .unwrap();
    assert_eq!(chain.factory(&factory).unwrap().fee(), 10);

    // Underpaying is rejected with no trace
    let err = chain
        .create_wallet(creator, factory, 5, vec![creator], 1)
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Factory(FactoryError::InsufficientFee { paid: 5, fee: 10 })
    ));
    assert_eq!(chain.balance_of(&creator), 50);

    // Overpaying keeps the whole value
    let created = chain
        .create_wallet(creator, factory, 15, vec![creator], 1)
        .unwrap()
        .output;
    assert!(chain.wallet(&created).unwrap().is_owner(&creator));
    assert_eq!(chain.factory(&factory).unwrap().contracts(&creator), &[created]);
    assert_eq!(chain.balance_of(&factory), 15);

    // Only the owner withdraws
    assert!(matches!(
        chain.withdraw(creator, factory),
        Err(ChainError::Factory(FactoryError::Access(_)))
    ));

    // The owning wallet receives the fees while it is executing
    let receipt = chain
        .submit_transaction(a, wallet, factory, 0, factory_calls::withdraw())
        .unwrap();
    assert_eq!(
        receipt.event_names(),
        vec![
            "Submission",
            "Confirmation",
            "Deposit",
            "FundWithdraw",
            "Execution"
        ]
    );
    assert_eq!(chain.balance_of(&factory), 0);
    assert_eq!(chain.balance_of(&wallet), 15);
}

#[test]
fn test_threshold_clamped_on_removal() {
    let (a, b, c) = (addr(1), addr(2), addr(3));
    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a, b, c], 3).unwrap().output;

    let id = chain
        .submit_transaction(a, wallet, wallet, 0, WalletCall::RemoveOwner(c).encode())
        .unwrap()
        .output;
    chain.confirm_transaction(b, wallet, id).unwrap();
    let receipt = chain.confirm_transaction(c, wallet, id).unwrap();

    assert!(receipt.events().any(|e| *e == Event::RequirementChange { required: 2 }));
    let w = chain.wallet(&wallet).unwrap();
    assert_eq!(w.owners(), &[a, b]);
    assert_eq!(w.required(), 2);
}

#[test]
fn test_last_owner_cannot_be_removed() {
    let a = addr(1);
    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a], 1).unwrap().output;

    let receipt = chain
        .submit_transaction(a, wallet, wallet, 0, WalletCall::RemoveOwner(a).encode())
        .unwrap();

    assert_eq!(receipt.event_names().last(), Some(&"ExecutionFailure"));
    let w = chain.wallet(&wallet).unwrap();
    assert_eq!(w.owners(), &[a]);
    assert_eq!(w.transaction(0).unwrap().status, ActionStatus::Failed);
}

#[test]
fn test_insufficient_balance_consumes_action() {
    let (a, x) = (addr(1), addr(9));
    let mut chain = Chain::new();
    let wallet = chain.deploy_wallet(a, vec![a], 1).unwrap().output;

    let receipt = chain
        .submit_transaction(a, wallet, x, 5, Vec::new())
        .unwrap();
    assert_eq!(receipt.event_names().last(), Some(&"ExecutionFailure"));
    assert_eq!(chain.balance_of(&x), 0);

    // Funding afterwards does not revive the consumed action
    chain.mint(wallet, 5);
    assert!(matches!(
        chain.execute_transaction(a, wallet, 0),
        Err(ChainError::Wallet(WalletError::AlreadyExecuted(0)))
    ));
    assert_eq!(chain.balance_of(&x), 0);
}

#[test]
fn test_governance_rejected_from_outside() {
    let a = addr(1);
    let mut chain = Chain::new();
    chain.mint(a, 1);
    let wallet = chain.deploy_wallet(a, vec![a], 1).unwrap().output;

    let err = chain
        .send(
            a,
            quorum_wallet::core::CallRequest::new(wallet, 0, WalletCall::AddOwner(addr(2)).encode()),
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::CallFailed(_)));
    assert!(!chain.wallet(&wallet).unwrap().is_owner(&addr(2)));
}

//! Tests for the dash-transaction crate.
//!
//! Signing tests use `k256` (RFC6979 nonces, low-S) as the signer, which
//! reproduces the reference two-input transaction byte for byte.

use async_trait::async_trait;
use dash_script::{p2pkh, Script};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

use crate::config::{DashTxConfig, SortPolicy};
use crate::fees;
use crate::input::{InputForSig, LockSource, Outpoint, TxId, TxInput};
use crate::legacy::{Coin, Recipient, TxDraft};
use crate::output::{OutputValue, TxOutput};
use crate::parser::{parse_unknown, ParsedInputScript, ParsedOutput, TxKind};
use crate::sighash::{self, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::signer::{PrivateKey, TxSigner};
use crate::transaction::Transaction;
use crate::{DashTx, TransactionError};

// -----------------------------------------------------------------------
// Test vectors
// -----------------------------------------------------------------------

const PRIVATE_KEY: &str = "5d3baf90046938ba5d1b7dff3570417238547c6e1728f99d5dc879ac145f9236";
const PUBLIC_KEY: &str = "03e10848073f3f92f43d718ed1be39afe7314e410eb7080bbc4474e82fe88c5cf2";
const SOURCE_TXID: &str = "7f305558cbeba3a9271d2559e8277f473f29d6b64a7a7a27e02a8564bde8352b";
const SOURCE_LOCK_SCRIPT: &str = "76a9141e0a6ef6085bb8af443a9e7f8941e61deb09fb5488ac";
const RECIPIENT_PKH: &str = "5bcd0d776a7252310b9f1a7eee1a749d42126944";

/// Two inputs spending outputs 0 and 1 of `SOURCE_TXID`, two outputs of 2314.
const SIGNED_TX: &str = "03000000022b35e8bd64852ae0277a7a4ab6d6293f477f27e859251d27a9a3ebcb5855307f000000006b48304502210098ba308087f7bcc5d9f6c347ffd633422bbbe8d44a20c21a2d5574da35d0a2070220026cae84cec2d96fd4e1a837ab0f3a559fdbd4b19bdd60c4dec450565f79f5f3012103e10848073f3f92f43d718ed1be39afe7314e410eb7080bbc4474e82fe88c5cf2ffffffff2b35e8bd64852ae0277a7a4ab6d6293f477f27e859251d27a9a3ebcb5855307f010000006b483045022100a6ec8b004c6e24047df4a9b2198a42c92862c4b3ad7ac989c85a04ba86fbdb3702200febea2871834d70c1c9d754cbe8163def8f1f721eb8b833098e01bd49ccae65012103e10848073f3f92f43d718ed1be39afe7314e410eb7080bbc4474e82fe88c5cf2ffffffff020a090000000000001976a9145bcd0d776a7252310b9f1a7eee1a749d4212694488ac0a090000000000001976a9145bcd0d776a7252310b9f1a7eee1a749d4212694488ac00000000";

const COIN_ADDRESS: &str = "XgCLJNfaugnB35WTCMjKQ65GMBN41QtVQJ";
const PAYEE_ADDRESS: &str = "XhKPmX1ofTiu4L6veoxYKNca4KEg9AwjBV";

fn recipient_pkh() -> [u8; 20] {
    hex::decode(RECIPIENT_PKH).unwrap().try_into().unwrap()
}

fn source_pkh() -> [u8; 20] {
    Script::from_hex(SOURCE_LOCK_SCRIPT).unwrap().public_key_hash().unwrap()
}

fn txid(byte: u8) -> TxId {
    TxId::new([byte; 32])
}

// -----------------------------------------------------------------------
// Test signer
// -----------------------------------------------------------------------

/// Signs with one k256 key; skips the listed input indexes.
struct K256Signer {
    key: Vec<u8>,
    skip: Vec<usize>,
    deterministic: bool,
}

impl K256Signer {
    fn new() -> Self {
        K256Signer { key: hex::decode(PRIVATE_KEY).unwrap(), skip: Vec::new(), deterministic: true }
    }

    fn skipping(skip: Vec<usize>) -> Self {
        K256Signer { skip, ..Self::new() }
    }

    fn signing_key(private_key: &[u8]) -> Result<SigningKey, TransactionError> {
        SigningKey::from_slice(private_key).map_err(|e| TransactionError::SigningError(e.to_string()))
    }
}

#[async_trait]
impl TxSigner for K256Signer {
    async fn get_private_key(
        &self,
        _input: &TxInput,
        index: usize,
        _inputs: &[TxInput],
    ) -> Result<Option<PrivateKey>, TransactionError> {
        if self.skip.contains(&index) {
            return Ok(None);
        }
        Ok(Some(Zeroizing::new(self.key.clone())))
    }

    fn to_public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, TransactionError> {
        let key = Self::signing_key(private_key)?;
        Ok(key.verifying_key().to_encoded_point(true).as_bytes().to_vec())
    }

    async fn sign(&self, private_key: &[u8], hash: &[u8; 32]) -> Result<Vec<u8>, TransactionError> {
        let key = Self::signing_key(private_key)?;
        let (sig, _) = key
            .sign_prehash_recoverable(hash)
            .map_err(|e| TransactionError::SigningError(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        Ok(sig.to_der().as_bytes().to_vec())
    }

    fn addr_to_pub_key_hash(&self, address: &str) -> Result<[u8; 20], TransactionError> {
        match address {
            COIN_ADDRESS => Ok(source_pkh()),
            PAYEE_ADDRESS => Ok(recipient_pkh()),
            other => Err(TransactionError::InvalidTransaction(format!("unknown address {}", other))),
        }
    }

    fn is_deterministic(&self) -> bool {
        self.deterministic
    }
}

/// Hands out an empty key for every input.
struct EmptyKeySigner;

#[async_trait]
impl TxSigner for EmptyKeySigner {
    async fn get_private_key(
        &self,
        _input: &TxInput,
        _index: usize,
        _inputs: &[TxInput],
    ) -> Result<Option<PrivateKey>, TransactionError> {
        Ok(Some(Zeroizing::new(Vec::new())))
    }

    async fn sign(&self, _private_key: &[u8], _hash: &[u8; 32]) -> Result<Vec<u8>, TransactionError> {
        Ok(vec![0x30])
    }
}

/// The unsigned form of `SIGNED_TX`, signed with SIGHASH_ALL.
fn reference_tx() -> Transaction {
    let source = TxId::from_hex(SOURCE_TXID).unwrap();
    let lock = LockSource::Script(Script::from_hex(SOURCE_LOCK_SCRIPT).unwrap());
    let inputs = (0..2)
        .map(|index| {
            TxInput::ForSig(InputForSig {
                sig_hash_type: SIGHASH_ALL,
                ..InputForSig::new(Outpoint::new(source, index), lock.clone())
            })
        })
        .collect();
    let outputs = vec![TxOutput::p2pkh(2314, recipient_pkh()), TxOutput::p2pkh(2314, recipient_pkh())];
    Transaction::with_parts(inputs, outputs)
}

// -----------------------------------------------------------------------
// Signing
// -----------------------------------------------------------------------

/// Signing the reference transaction reproduces the known hex.
#[tokio::test]
async fn test_sign_reference_transaction() {
    let dash_tx = DashTx::new(K256Signer::new());
    let signed = dash_tx.hash_and_sign_all(&reference_tx()).await.unwrap();

    assert_eq!(signed.hex, SIGNED_TX, "signed hex should match the reference");
    assert!(signed.is_fully_signed());
    assert_eq!(signed.inputs, reference_tx().inputs, "original inputs are kept");
    match &signed.transaction.inputs[0] {
        TxInput::Signed(input) => assert_eq!(hex::encode(&input.public_key), PUBLIC_KEY),
        other => panic!("expected a signed input, got {:?}", other),
    }
    assert_eq!(signed.id().unwrap(), signed.transaction.tx_id_hex().unwrap());
}

/// Passing one key per input produces the same transaction.
#[tokio::test]
async fn test_sign_with_key_list() {
    let dash_tx = DashTx::new(K256Signer::skipping(vec![0, 1]));
    let key: PrivateKey = Zeroizing::new(hex::decode(PRIVATE_KEY).unwrap());

    let signed = dash_tx
        .hash_and_sign_all_with_keys(&reference_tx(), vec![key.clone(), key.clone()])
        .await
        .unwrap();
    assert_eq!(signed.hex, SIGNED_TX);

    let err = dash_tx
        .hash_and_sign_all_with_keys(&reference_tx(), vec![key])
        .await
        .unwrap_err();
    assert!(
        matches!(err, TransactionError::KeyCountMismatch { keys: 1, inputs: 2 }),
        "unexpected error: {}",
        err
    );
    assert_eq!(err.code(), "E_INVALID_INPUT");
}

/// Inputs without a key stay sign-ready; the rest are signed.
#[tokio::test]
async fn test_partial_signing() {
    let dash_tx = DashTx::new(K256Signer::skipping(vec![1]));
    let signed = dash_tx.hash_and_sign_all(&reference_tx()).await.unwrap();

    assert!(signed.transaction.inputs[0].is_signed());
    assert!(matches!(signed.transaction.inputs[1], TxInput::ForSig(_)));
    assert!(!signed.is_fully_signed());

    // the first input's signature is unchanged by the skip
    assert_eq!(&signed.hex[..8 + 2 + 82 + 214], &SIGNED_TX[..8 + 2 + 82 + 214]);
}

/// Signing one input returns its signed form.
#[tokio::test]
async fn test_sign_single_input() {
    let dash_tx = DashTx::new(K256Signer::new());
    let key = hex::decode(PRIVATE_KEY).unwrap();
    let input = dash_tx.hash_and_sign_input(&reference_tx(), 1, &key).await.unwrap();

    assert_eq!(input.outpoint.output_index, 1);
    assert_eq!(input.sig_hash_type, SIGHASH_ALL);
    let script = input.unlocking_script().unwrap();
    assert!(
        (p2pkh::UNLOCK_SCRIPT_SIZE..=p2pkh::MAX_UNLOCK_SCRIPT_SIZE).contains(&script.len()),
        "unlock script of {} bytes",
        script.len()
    );
    assert!(SIGNED_TX.contains(&script.to_hex()));

    let raw = dash_tx.create_raw(&reference_tx());
    let err = dash_tx.hash_and_sign_input(&raw, 0, &key).await.unwrap_err();
    assert!(err.to_string().contains("either 'pubKeyHash' or 'script'"), "{}", err);
}

/// An empty key is a signer error, not a skip.
#[tokio::test]
async fn test_empty_key_rejected() {
    let dash_tx = DashTx::new(EmptyKeySigner);
    let err = dash_tx.hash_and_sign_all(&reference_tx()).await.unwrap_err();
    assert_eq!(err.code(), "E_SIGNER");
    assert!(err.to_string().contains("inputs[0]"), "{}", err);
}

/// Without a public key source, signing fails with the default message.
#[tokio::test]
async fn test_missing_public_key() {
    struct NoPubKey;

    #[async_trait]
    impl TxSigner for NoPubKey {
        async fn get_private_key(
            &self,
            _input: &TxInput,
            _index: usize,
            _inputs: &[TxInput],
        ) -> Result<Option<PrivateKey>, TransactionError> {
            Ok(Some(Zeroizing::new(vec![1; 32])))
        }

        async fn sign(&self, _key: &[u8], _hash: &[u8; 32]) -> Result<Vec<u8>, TransactionError> {
            Ok(vec![0x30; 70])
        }
    }

    let err = DashTx::new(NoPubKey).hash_and_sign_all(&reference_tx()).await.unwrap_err();
    assert!(err.to_string().contains("to_public_key"), "{}", err);
}

/// Address-only outputs are resolved through the signer.
#[tokio::test]
async fn test_address_outputs_resolved() {
    let dash_tx = DashTx::new(K256Signer::new());
    let mut tx = reference_tx();
    tx.outputs = vec![
        TxOutput::Value(OutputValue::to_address(2314, PAYEE_ADDRESS)),
        TxOutput::Value(OutputValue::to_address(2314, PAYEE_ADDRESS)),
    ];
    let signed = dash_tx.hash_and_sign_all(&tx).await.unwrap();
    assert_eq!(signed.hex, SIGNED_TX);

    tx.outputs = vec![TxOutput::Value(OutputValue::to_address(2314, "Xunknown"))];
    assert!(dash_tx.hash_and_sign_all(&tx).await.is_err());
}

// -----------------------------------------------------------------------
// SIGHASH modes
// -----------------------------------------------------------------------

/// ALL keeps every input (others raw) and every output.
#[test]
fn test_hashable_all() {
    let tx = reference_tx();
    let hashable = sighash::create_hashable(&tx, 1, SIGHASH_ALL).unwrap();
    assert!(matches!(hashable.inputs[0], TxInput::Raw(_)));
    assert!(matches!(hashable.inputs[1], TxInput::ForSig(_)));
    assert_eq!(hashable.outputs.len(), 2);

    let preimage = tx.serialize(Some(SIGHASH_ALL)).unwrap();
    assert!(preimage.ends_with("0000000001000000"), "{}", preimage);
}

/// ANYONECANPAY keeps only the input being signed.
#[test]
fn test_hashable_anyone_can_pay() {
    let tx = reference_tx();
    let hashable = sighash::create_hashable(&tx, 1, SIGHASH_ALL | SIGHASH_ANYONECANPAY).unwrap();
    assert_eq!(hashable.inputs.len(), 1);
    assert_eq!(hashable.inputs[0].outpoint().output_index, 1);
    assert_eq!(hashable.outputs.len(), 2);

    // other inputs do not affect the hash
    let mut other = tx.clone();
    other.inputs[0] = TxInput::p2pkh(txid(9), 4, [7; 20]);
    assert_eq!(
        sighash::signature_hash(&tx, 1, 0x81).unwrap(),
        sighash::signature_hash(&other, 1, 0x81).unwrap()
    );
}

/// NONE commits to no outputs; the preimage still serializes.
#[test]
fn test_hashable_none() {
    let tx = reference_tx();
    let hashable = sighash::create_hashable(&tx, 0, SIGHASH_NONE).unwrap();
    assert!(hashable.outputs.is_empty());
    let preimage = hex::encode(sighash::calc_preimage(&tx, 0, SIGHASH_NONE).unwrap());
    assert!(preimage.ends_with("000000000002000000"), "{}", preimage);

    let mut changed = tx.clone();
    changed.outputs[0] = TxOutput::p2pkh(1, [0; 20]);
    assert_eq!(
        sighash::signature_hash(&tx, 0, SIGHASH_NONE).unwrap(),
        sighash::signature_hash(&changed, 0, SIGHASH_NONE).unwrap()
    );
}

/// SINGLE is refused with a stable code.
#[test]
fn test_hashable_single_unsupported() {
    let err = sighash::create_hashable(&reference_tx(), 0, SIGHASH_SINGLE).unwrap_err();
    assert_eq!(err.code(), "E_UNSUPPORTED_SIGHASH");
}

/// Hashing a preimage given as hex matches the computed signature hash.
#[test]
fn test_hash_partial_matches() {
    let tx = reference_tx();
    let preimage = hex::encode(sighash::calc_preimage(&tx, 0, SIGHASH_ALL).unwrap());
    assert_eq!(
        sighash::hash_partial(&preimage).unwrap(),
        sighash::signature_hash(&tx, 0, SIGHASH_ALL).unwrap()
    );
}

// -----------------------------------------------------------------------
// Building, ordering and donation
// -----------------------------------------------------------------------

/// An empty output list needs an explicit donation.
#[test]
fn test_donation() {
    let inputs = vec![TxInput::p2pkh(txid(1), 0, [2; 20])];

    let strict = DashTx::new(K256Signer::new());
    let err = strict.create(inputs.clone(), Vec::new()).unwrap_err();
    assert!(matches!(err, TransactionError::EmptyOutputs), "{}", err);
    assert!(Transaction::with_parts(inputs.clone(), Vec::new()).to_hex().is_err());

    let config = DashTxConfig { allow_donation: true, ..Default::default() };
    let donating = DashTx::with_config(K256Signer::new(), config);
    let tx = donating.create(inputs, Vec::new()).unwrap();
    assert_eq!(tx.outputs, vec![donating.create_donation_output()]);
    assert!(tx.to_hex().unwrap().ends_with("010000000000000000026a0000000000"));
}

/// With `SortPolicy::Require`, unsorted transactions are refused.
#[tokio::test]
async fn test_sort_policy() {
    let mut tx = reference_tx();
    tx.outputs = vec![TxOutput::p2pkh(5000, [1; 20]), TxOutput::p2pkh(1000, [1; 20])];

    let config = DashTxConfig { sort_policy: SortPolicy::Require, ..Default::default() };
    let strict = DashTx::with_config(K256Signer::new(), config);
    let err = strict.hash_and_sign_all(&tx).await.unwrap_err();
    assert_eq!(err.code(), "E_UNSORTED");
    assert!(err.to_string().contains("outputs are"), "{}", err);

    // warn-only policy signs anyway
    let lenient = DashTx::new(K256Signer::new());
    assert!(lenient.hash_and_sign_all(&tx).await.is_ok());

    strict.sort_outputs(&mut tx.outputs).unwrap();
    strict.sort_inputs(&mut tx.inputs);
    assert!(strict.hash_and_sign_all(&tx).await.is_ok());
}

// -----------------------------------------------------------------------
// Coin selection
// -----------------------------------------------------------------------

fn coins(values: &[u64]) -> Vec<Coin> {
    values
        .iter()
        .enumerate()
        .map(|(i, &satoshis)| Coin::p2pkh(txid(i as u8 + 1), 0, satoshis, source_pkh()))
        .collect()
}

fn pay_20000() -> Recipient {
    Recipient::to_pub_key_hash(Some(20000), recipient_pkh())
}

/// A coin worth exactly amount + 190 cannot pay the 191 fee.
#[test]
fn test_too_few_sats() {
    let dash_tx = DashTx::new(K256Signer::new());
    let err = dash_tx.draft_single_output(&coins(&[20190]), &pay_20000(), None).unwrap_err();
    assert_eq!(err.code(), "E_INSUFFICIENT_FUNDS");
    let msg = err.to_string();
    assert!(msg.contains("cannot pay for 0.00020000 (20000)"), "{}", msg);
    assert!(msg.contains("fee 0.00000191 (191)"), "{}", msg);
    assert!(msg.contains("balance of 0.00020190 (20190)"), "{}", msg);
}

/// A second coin covering its own input size and margin is enough.
#[test]
fn test_exactly_enough_sats() {
    let dash_tx = DashTx::new(K256Signer::new());
    let draft = dash_tx.draft_single_output(&coins(&[20190, 152]), &pay_20000(), None).unwrap();
    assert_eq!(draft.inputs.len(), 2);
    assert_eq!(draft.change_index(), None);
    assert_eq!(draft.fee_target, 342, "339 target plus 3 leftover");
    assert_eq!(draft.total_input_satoshis().unwrap() - draft.total_output_satoshis().unwrap(), draft.fee_target);
}

/// Leftovers below dust plus an output's size are donated to the fee.
#[test]
fn test_change_threshold() {
    let dash_tx = DashTx::new(K256Signer::new());
    let threshold = 20000 + 191 + 2000 + 34;

    let draft = dash_tx.draft_single_output(&coins(&[threshold - 1]), &pay_20000(), None).unwrap();
    assert_eq!(draft.outputs.len(), 1, "no change below the threshold");
    assert_eq!(draft.fee_target, 191 + 2033);

    let draft = dash_tx.draft_single_output(&coins(&[threshold]), &pay_20000(), None).unwrap();
    let change_index = draft.change_index().expect("change output");
    assert_eq!(draft.outputs[change_index].satoshis(), 2000);
    assert_eq!(draft.fee_target, 191 + 34);
    assert_eq!(draft.total_input_satoshis().unwrap() - draft.total_output_satoshis().unwrap(), 225);

    // change defaults to the spent coin's destination
    match &draft.outputs[change_index] {
        TxOutput::Value(output) => assert_eq!(output.pub_key_hash, Some(source_pkh())),
        other => panic!("unexpected change output {:?}", other),
    }
}

/// Amounts near `u64::MAX` fail cleanly instead of wrapping.
#[test]
fn test_selection_near_u64_max() {
    let outputs = vec![TxOutput::p2pkh(u64::MAX - 10, recipient_pkh())];
    let err = crate::legacy::select_coins(&coins(&[u64::MAX]), u64::MAX - 10, &outputs)
        .unwrap_err();
    assert_eq!(err.code(), "E_INSUFFICIENT_FUNDS");

    let err = crate::legacy::select_coins(&coins(&[u64::MAX, u64::MAX]), u64::MAX - 10, &outputs)
        .unwrap_err();
    assert!(err.to_string().contains("exceeds u64"), "{}", err);

    let dash_tx = DashTx::new(K256Signer::new());
    let outputs = vec![
        TxOutput::p2pkh(u64::MAX, recipient_pkh()),
        TxOutput::p2pkh(1, recipient_pkh()),
    ];
    let err = dash_tx.create_legacy_tx(&coins(&[1000]), outputs, None).unwrap_err();
    assert!(err.to_string().contains("exceeds u64"), "{}", err);

    let full = Recipient::to_pub_key_hash(None, recipient_pkh());
    let err = dash_tx.draft_single_output(&coins(&[u64::MAX, 1]), &full, None).unwrap_err();
    assert!(err.to_string().contains("exceeds u64"), "{}", err);
}

/// Transaction totals report overflow instead of wrapping.
#[test]
fn test_transaction_totals_overflow() {
    let tx = Transaction::with_parts(
        vec![],
        vec![TxOutput::p2pkh(u64::MAX, recipient_pkh()), TxOutput::p2pkh(1, recipient_pkh())],
    );
    let err = tx.total_output_satoshis().unwrap_err();
    assert_eq!(err.code(), "E_INVALID_INPUT");
    assert!(err.to_string().contains("satoshi total exceeds u64"), "{}", err);
    assert_eq!(reference_tx().total_output_satoshis().unwrap(), 2 * 2314);
}

/// The smallest adequate single coin beats larger ones.
#[test]
fn test_selects_closest_coin() {
    let dash_tx = DashTx::new(K256Signer::new());
    let exact = 20000 + 193 + 2000 + 34;
    let draft = dash_tx
        .draft_single_output(&coins(&[400000, 3000, exact, 500000]), &pay_20000(), None)
        .unwrap();
    assert_eq!(draft.inputs.len(), 1);
    assert_eq!(draft.inputs[0].satoshis(), Some(exact));
    let change_index = draft.change_index().expect("change output");
    assert_eq!(draft.outputs[change_index].satoshis(), 2002);
}

/// Without one large enough coin, coins are taken largest-first.
#[test]
fn test_accumulates_largest_first() {
    let dash_tx = DashTx::new(K256Signer::new());
    let change_to = Recipient::to_pub_key_hash(None, [0xcc; 20]);
    let draft = dash_tx
        .draft_single_output(&coins(&[8000, 15000, 10000]), &pay_20000(), Some(&change_to))
        .unwrap();
    let mut values: Vec<u64> = draft.inputs.iter().filter_map(TxInput::satoshis).collect();
    values.sort();
    assert_eq!(values, vec![10000, 15000]);

    let change_index = draft.change_index().expect("change output");
    assert_eq!(draft.outputs[change_index].satoshis(), 25000 - 20000 - 339 - 34);
    match &draft.outputs[change_index] {
        TxOutput::Value(output) => assert_eq!(output.pub_key_hash, Some([0xcc; 20])),
        other => panic!("unexpected change output {:?}", other),
    }
}

/// Full transfer of an address-locked coin to an address.
#[test]
fn test_full_transfer_draft() {
    let dash_tx = DashTx::new(K256Signer::new());
    let coin = Coin {
        address: Some(COIN_ADDRESS.to_string()),
        pub_key_hash: None,
        ..Coin::p2pkh(txid(3), 0, 10200, [0; 20])
    };
    let recipient = Recipient::to_address(None, PAYEE_ADDRESS);
    let draft = dash_tx.draft_single_output(&[coin], &recipient, None).unwrap();

    assert!(draft.full_transfer);
    assert_eq!(draft.fee_target, 191);
    assert_eq!(draft.inputs.len(), 1);
    assert_eq!(draft.inputs[0].satoshis(), Some(10200));
    assert_eq!(draft.outputs.len(), 1);
    assert_eq!(draft.outputs[0].satoshis(), 10200 - 191);
    match &draft.inputs[0] {
        TxInput::ForSig(input) => assert_eq!(input.lock.pub_key_hash(), Some(source_pkh())),
        other => panic!("unexpected input {:?}", other),
    }
}

/// Several outputs are covered together.
#[test]
fn test_multi_output_draft() {
    let dash_tx = DashTx::new(K256Signer::new());
    let outputs = vec![
        TxOutput::p2pkh(30000, recipient_pkh()),
        TxOutput::message("hello").unwrap(),
        TxOutput::p2pkh(10000, [0xdd; 20]),
    ];
    let draft = dash_tx.create_legacy_tx(&coins(&[100000]), outputs, None).unwrap();
    assert_eq!(draft.outputs.len(), 4);
    assert!(matches!(draft.outputs[0], TxOutput::Memo(_)), "memo sorts first");
    let fee = draft.total_input_satoshis().unwrap() - draft.total_output_satoshis().unwrap();
    assert_eq!(fee, draft.fee_target);
    assert!(fee >= fees::appraise(&draft.to_transaction()).unwrap().min);
}

// -----------------------------------------------------------------------
// Finalization
// -----------------------------------------------------------------------

/// The finalized fee always covers the signed size.
#[tokio::test]
async fn test_legacy_pipeline() {
    let dash_tx = DashTx::new(K256Signer::new());
    for values in [&[22227u64][..], &[20190, 152], &[8000, 15000, 10000]] {
        let summary = dash_tx.legacy(&coins(values), &pay_20000(), None).await.unwrap();
        assert!(summary.fee >= summary.size, "fee {} < size {}", summary.fee, summary.size);
        assert_eq!(summary.size, (summary.hex.len() / 2) as u64);

        let parsed = parse_unknown(&summary.hex).unwrap();
        assert_eq!(parsed.kind, TxKind::Signed);
        assert_eq!(parsed.transaction_id.as_deref(), Some(summary.id.as_str()));
    }
}

fn short_fee_draft(full_transfer: bool) -> TxDraft {
    let dash_tx = DashTx::new(K256Signer::new());
    let coin = coins(&[10200]);
    let recipient = Recipient::to_pub_key_hash(None, recipient_pkh());
    let mut draft = dash_tx.draft_single_output(&coin, &recipient, None).unwrap();
    // one satoshi short of the smallest possible size
    draft.fee_target = 190;
    draft.outputs[0] = TxOutput::p2pkh(10200 - 190, recipient_pkh());
    draft.full_transfer = full_transfer;
    draft
}

/// A full transfer walks its output down until the fee covers the size.
#[tokio::test]
async fn test_fee_walk_full_transfer() {
    let dash_tx = DashTx::new(K256Signer::new());
    let summary = dash_tx.finalize_presorted(&short_fee_draft(true)).await.unwrap();
    assert!(summary.fee >= summary.size);
    assert!(summary.fee <= 193, "walk is bounded by the max estimate: {}", summary.fee);
    assert!(summary.full_transfer);
}

/// Identical re-signatures from a randomized signer also end in the walk.
#[tokio::test]
async fn test_identical_signatures_escalate() {
    let signer = K256Signer { deterministic: false, ..K256Signer::new() };
    let dash_tx = DashTx::new(signer);
    let summary = dash_tx.finalize_presorted(&short_fee_draft(true)).await.unwrap();
    assert!(summary.fee >= summary.size);
}

/// Without change or a full transfer there is nothing to walk.
#[tokio::test]
async fn test_no_convergence() {
    let dash_tx = DashTx::new(K256Signer::new());
    let err = dash_tx.finalize_presorted(&short_fee_draft(false)).await.unwrap_err();
    assert_eq!(err.code(), "E_NO_CONVERGE");
}

/// Finalizing refuses a partially signed result.
#[tokio::test]
async fn test_finalize_requires_all_signatures() {
    let dash_tx = DashTx::new(K256Signer::skipping(vec![0]));
    let draft = dash_tx.draft_single_output(&coins(&[22227]), &pay_20000(), None).unwrap();
    let err = dash_tx.finalize_presorted(&draft).await.unwrap_err();
    assert_eq!(err.code(), "E_SIGNER");
}

// -----------------------------------------------------------------------
// Parsing
// -----------------------------------------------------------------------

/// The reference transaction parses into signed inputs and P2PKH outputs.
#[test]
fn test_parse_signed() {
    let parsed = parse_unknown(SIGNED_TX).unwrap();
    assert_eq!(parsed.kind, TxKind::Signed);
    assert_eq!(parsed.version, 3);
    assert_eq!(parsed.tx_type, 0);
    assert_eq!(parsed.input_count, 2);
    assert_eq!(parsed.output_count, 2);
    assert_eq!(parsed.locktime, 0);
    assert_eq!(parsed.extra_payload, None);
    assert_eq!(parsed.sig_hash_type, None);
    assert_eq!(parsed.inputs[1].outpoint.txid.to_hex(), SOURCE_TXID);

    match &parsed.inputs[0].script {
        ParsedInputScript::Signed(sig) => {
            assert_eq!(sig.script_size, 107);
            assert_eq!(sig.sig_size, 0x48);
            assert_eq!(sig.asn1_seq, 0x30);
            assert_eq!(sig.r_size, 33);
            assert_eq!(sig.s_size, 32);
            assert_eq!(sig.sig_hash_type, 0x01);
            assert_eq!(hex::encode(&sig.public_key), PUBLIC_KEY);
            assert!(sig.spurious_extra.is_empty());
        }
        other => panic!("expected a signed input, got {:?}", other),
    }
    assert_eq!(
        parsed.outputs[0],
        ParsedOutput::PayToPubKeyHash { satoshis: 2314, pub_key_hash: recipient_pkh() }
    );
    assert_eq!(
        parsed.transaction_id.as_deref(),
        Some(crate::transaction::get_id(SIGNED_TX).unwrap().as_str())
    );

    // rebuilt model serializes back to the same hex
    assert_eq!(parsed.to_transaction().unwrap().to_hex().unwrap(), SIGNED_TX);
}

/// A signing preimage is recognized by its trailing SIGHASH word.
#[test]
fn test_parse_preimage() {
    let tx = reference_tx();
    let preimage = hex::encode(sighash::calc_preimage(&tx, 0, SIGHASH_ALL).unwrap());
    let parsed = parse_unknown(&preimage).unwrap();

    assert_eq!(parsed.kind, TxKind::Preimage);
    assert_eq!(parsed.sig_hash_type, Some(SIGHASH_ALL));
    assert_eq!(
        parsed.transaction_hash,
        Some(hex::encode(sighash::signature_hash(&tx, 0, SIGHASH_ALL).unwrap()))
    );
    assert_eq!(parsed.transaction_id, None);
    assert_eq!(parsed.inputs[0].script, ParsedInputScript::Hashable { pub_key_hash: source_pkh() });
    assert_eq!(parsed.inputs[1].script, ParsedInputScript::Raw);
}

/// Without signatures or a trailer, neither hash nor id is reported.
#[test]
fn test_parse_unsigned_with_memo() {
    let mut tx = reference_tx();
    tx.outputs.push(TxOutput::message("hello dash").unwrap());
    tx.outputs.push(TxOutput::Memo(crate::output::OutputMemo::new(vec![0xff, 0xfe]).unwrap()));
    let parsed = parse_unknown(&tx.to_hex().unwrap()).unwrap();

    assert_eq!(parsed.kind, TxKind::Unsigned);
    assert_eq!(parsed.transaction_hash, None);
    assert_eq!(parsed.transaction_id, None);
    match &parsed.outputs[2] {
        ParsedOutput::Memo { satoshis: 0, message, .. } => assert_eq!(message, "hello dash"),
        other => panic!("expected a memo, got {:?}", other),
    }
    match &parsed.outputs[3] {
        ParsedOutput::Memo { memo, message, .. } => {
            assert_eq!(memo, &vec![0xff, 0xfe]);
            assert_eq!(message, crate::parser::NON_UTF8_MESSAGE);
        }
        other => panic!("expected a memo, got {:?}", other),
    }
    assert_eq!(parsed.to_transaction().unwrap().to_hex().unwrap(), tx.to_hex().unwrap());
}

/// OP_RETURN scripts that are not canonical memos come back byte for byte.
#[test]
fn test_parse_keeps_nonstandard_op_return_scripts() {
    let padded = Script::from_hex("6a4c050102030405").unwrap();
    let mut oversized = vec![0x6a, 0x4d, 0x2c, 0x01];
    oversized.extend_from_slice(&[0x42; 300]);
    let oversized = Script::from_bytes(&oversized);

    let mut tx = reference_tx();
    tx.outputs.push(TxOutput::Value(OutputValue::to_script(1000, padded.clone())));
    tx.outputs.push(TxOutput::Value(OutputValue::to_script(0, oversized.clone())));
    let hex = tx.to_hex().unwrap();
    let parsed = parse_unknown(&hex).unwrap();

    match &parsed.outputs[2] {
        ParsedOutput::Script { satoshis: 1000, script } => assert_eq!(script, &padded),
        other => panic!("expected a script output, got {:?}", other),
    }
    match &parsed.outputs[3] {
        ParsedOutput::Script { satoshis: 0, script } => assert_eq!(script, &oversized),
        other => panic!("expected a script output, got {:?}", other),
    }
    assert_eq!(parsed.to_transaction().unwrap().to_hex().unwrap(), hex);
}

/// Special transactions carry their extra payload.
#[test]
fn test_parse_extra_payload() {
    let mut tx = reference_tx().to_raw();
    tx.tx_type = 5;
    tx.extra_payload = vec![0xab; 3];
    let parsed = parse_unknown(&tx.to_hex().unwrap()).unwrap();
    assert_eq!(parsed.tx_type, 5);
    assert_eq!(parsed.extra_payload, Some(vec![0xab; 3]));
    assert_eq!(parsed.to_transaction().unwrap(), tx);
}

/// An unknown script size fails but keeps what was parsed.
#[test]
fn test_parse_error_keeps_partial() {
    // second input's script length changed from 0x6b to 0x05
    let second_input = SIGNED_TX.find("010000006b").unwrap();
    let bad = format!(
        "{}0100000005{}",
        &SIGNED_TX[..second_input],
        &SIGNED_TX[second_input + 10..]
    );
    let err = parse_unknown(&bad).unwrap_err();
    assert_eq!(err.code(), "E_TX_PARSE");
    assert!(err.to_string().contains("unrecognized script size 5"), "{}", err);

    let partial = err.partial().expect("partial structure");
    assert_eq!(partial.version, 3);
    assert_eq!(partial.input_count, 2);
    assert_eq!(partial.inputs.len(), 1);
    assert!(partial.outputs.is_empty());
}

/// Truncated and non-hex input are parse errors.
#[test]
fn test_parse_malformed() {
    let err = parse_unknown(&SIGNED_TX[..SIGNED_TX.len() - 8]).unwrap_err();
    assert_eq!(err.code(), "E_TX_PARSE");
    assert_eq!(err.partial().unwrap().outputs.len(), 2);

    let err = parse_unknown("03000zz").unwrap_err();
    assert_eq!(err.code(), "E_TX_PARSE");

    let err = parse_unknown(&format!("{}00", SIGNED_TX)).unwrap_err();
    assert!(err.to_string().contains("trailing"), "{}", err);
}

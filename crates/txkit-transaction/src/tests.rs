//! Tests for the transaction crate: wire round-trips, TXID, SIGHASH
//! boundary behavior, the fee engine, and end-to-end P2PKH signing
//! verified through the script interpreter.

use std::sync::Arc;

use txkit_codec::digest::hash160;
use txkit_codec::Hash256;
use txkit_script::{verify_scripts, Limits, Script};

use crate::context::TxSigContext;
use crate::crypto::{CryptoOracle, PrivateKey, Secp256k1Oracle};
use crate::fee::{ChangeDistribution, FeeModel};
use crate::input::{TxInput, DEFAULT_SEQUENCE};
use crate::output::TxOutput;
use crate::sighash::{self, SighashBase, SighashScope};
use crate::template::{p2pkh, UnlockingScriptTemplate};
use crate::transaction::{parse_script_offsets, Transaction};
use crate::TransactionError;

/// A mainnet transaction with one input and two outputs.
const SOURCE_RAW_TX: &str = "010000000138c7c61c14ffb063c3bb2664041a3e29ea6ea0412a0c18ff725ba4e9e12afae2030000006a47304402203e9ab8e4c14addf3b4741540b556cfb0e0efb67dc1a7b5ce84c3ac56b3fd447802203c9f49f7bd893ebd7060176dfc36bcaff9d2c443d9a0dd6cd2d59b372c024d20412102798913bc057b344de675dac34faafe3dc2f312c758cd9068209f810877306d66ffffffff02dc050000000000002076a914eb0bd5edba389198e73f8efabddfc61666969ff788ac6a0568656c6c6faa0d0000000000001976a914eb0bd5edba389198e73f8efabddfc61666969ff788ac00000000";

/// A coinbase transaction.
const COINBASE_TX_HEX: &str = "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff17033f250d2f43555656452f2c903fb60859897700d02700ffffffff01d864a012000000001976a914d648686cf603c11850f39600e37312738accca8f88ac00000000";

/// A version-2 transaction with three inputs and two outputs.
const MULTI_INPUT_TX_HEX: &str = "0200000003a9bc457fdc6a54d99300fb137b23714d860c350a9d19ff0f571e694a419ff3a0010000006b48304502210086c83beb2b2663e4709a583d261d75be538aedcafa7766bd983e5c8db2f8b2fc02201a88b178624ab0ad1748b37c875f885930166237c88f5af78ee4e61d337f935f412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff0092bb9a47e27bf64fc98f557c530c04d9ac25e2f2a8b600e92a0b1ae7c89c20010000006b483045022100f06b3db1c0a11af348401f9cebe10ae2659d6e766a9dcd9e3a04690ba10a160f02203f7fbd7dfcfc70863aface1a306fcc91bbadf6bc884c21a55ef0d32bd6b088c8412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff9d0d4554fa692420a0830ca614b6c60f1bf8eaaa21afca4aa8c99fb052d9f398000000006b483045022100d920f2290548e92a6235f8b2513b7f693a64a0d3fa699f81a034f4b4608ff82f0220767d7d98025aff3c7bd5f2a66aab6a824f5990392e6489aae1e1ae3472d8dffb412103e8be830d98bb3b007a0343ee5c36daa48796ae8bb57946b1e87378ad6e8a090dfeffffff02807c814a000000001976a9143a6bf34ebfcf30e8541bbb33a7882845e5a29cb488ac76b0e60e000000001976a914bd492b67f90cb85918494767ebb23102c4f06b7088ac67000000";

fn test_key() -> PrivateKey {
    PrivateKey::from_bytes([0x11; 32])
}

fn test_lock_script() -> Script {
    let oracle = Secp256k1Oracle;
    let public_key = oracle.derive_public_key(test_key().as_bytes()).unwrap();
    p2pkh::lock(&hash160(&public_key))
}

/// A spendable funding transaction paying `satoshis` to the test key.
fn funding_tx(satoshis: u64) -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(TxInput::new(Hash256::new([0x77; 32]), 0));
    tx.inputs[0].unlocking_script = Some(Script::new());
    tx.add_output(TxOutput::new(satoshis, test_lock_script()));
    tx
}

/// A spend of `funding`'s first output with one payment and one change
/// output, both P2PKH, ready for fee() and sign().
fn spend_shape(funding: Arc<Transaction>, pay: u64) -> Transaction {
    let mut tx = Transaction::new();
    let input = TxInput::from_source(funding, 0)
        .unwrap()
        .with_template(Arc::new(p2pkh::unlock(test_key(), None)));
    tx.add_input(input);
    tx.add_output(TxOutput::new(pay, test_lock_script()));
    tx.add_output(TxOutput::change(test_lock_script()));
    tx
}

// -----------------------------------------------------------------------
// Wire round-trips and identity
// -----------------------------------------------------------------------

#[test]
fn legacy_roundtrip() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert_eq!(tx.version, 1);
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.lock_time, 0);
    assert_eq!(tx.to_hex().unwrap(), SOURCE_RAW_TX);
}

#[test]
fn multi_input_roundtrip() {
    let tx = Transaction::from_hex(MULTI_INPUT_TX_HEX).unwrap();
    assert_eq!(tx.version, 2);
    assert_eq!(tx.inputs.len(), 3);
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.lock_time, 103);
    assert_eq!(tx.to_hex().unwrap(), MULTI_INPUT_TX_HEX);
}

#[test]
fn trailing_bytes_rejected() {
    let extended = format!("{}deadbeef", SOURCE_RAW_TX);
    assert!(Transaction::from_hex(&extended).is_err());
}

#[test]
fn truncated_input_rejected() {
    let bytes = hex::decode(SOURCE_RAW_TX).unwrap();
    assert!(Transaction::from_bytes(&bytes[..bytes.len() - 2]).is_err());
    assert!(Transaction::from_bytes(&[]).is_err());
}

#[test]
fn txid_display_order() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let txid = tx.txid().unwrap();
    let hex_str = tx.txid_hex().unwrap();
    assert_eq!(hex_str.len(), 64);
    assert_eq!(Hash256::from_hex(&hex_str).unwrap(), txid);
}

#[test]
fn known_output_values() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert_eq!(tx.outputs[0].satoshis, Some(1500));
    assert_eq!(tx.outputs[1].satoshis, Some(3498));
    assert_eq!(tx.total_output_satoshis().unwrap(), 4998);
    assert_eq!(tx.inputs[0].sequence, DEFAULT_SEQUENCE);
}

#[test]
fn coinbase_detection() {
    assert!(Transaction::from_hex(COINBASE_TX_HEX).unwrap().is_coinbase());
    assert!(!Transaction::from_hex(SOURCE_RAW_TX).unwrap().is_coinbase());
}

#[test]
fn empty_transaction_is_ten_bytes() {
    let tx = Transaction::new();
    let bytes = tx.to_bytes().unwrap();
    assert_eq!(bytes.len(), 10);
    let back = Transaction::from_bytes(&bytes).unwrap();
    assert_eq!(back.version, 1);
    assert!(back.inputs.is_empty());
}

// -----------------------------------------------------------------------
// Zero-copy script offsets
// -----------------------------------------------------------------------

#[test]
fn script_offsets_match_full_parse() {
    let bytes = hex::decode(MULTI_INPUT_TX_HEX).unwrap();
    let tx = Transaction::from_bytes(&bytes).unwrap();
    let offsets = parse_script_offsets(&bytes).unwrap();

    assert_eq!(offsets.inputs.len(), 3);
    assert_eq!(offsets.outputs.len(), 2);

    for (slice, input) in offsets.inputs.iter().zip(&tx.inputs) {
        let expected = input.unlocking_script.as_ref().unwrap().as_bytes();
        assert_eq!(&bytes[slice.offset..slice.offset + slice.length], expected);
    }
    for (slice, output) in offsets.outputs.iter().zip(&tx.outputs) {
        let expected = output.locking_script.as_bytes();
        assert_eq!(&bytes[slice.offset..slice.offset + slice.length], expected);
    }
}

// -----------------------------------------------------------------------
// Extended Format
// -----------------------------------------------------------------------

#[test]
fn extended_format_roundtrip() {
    let mut tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    tx.inputs[0].set_source_output(Some(TxOutput::new(
        5000,
        Script::from_hex("76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac").unwrap(),
    )));

    let ef = tx.to_ef_bytes().unwrap();
    assert_eq!(&ef[4..10], &[0x00, 0x00, 0x00, 0x00, 0x00, 0xEF]);

    let back = Transaction::from_bytes(&ef).unwrap();
    assert_eq!(back.inputs[0].source_satoshis(), Some(5000));
    // The legacy identity is unchanged by the extended envelope.
    assert_eq!(back.txid().unwrap(), tx.txid().unwrap());
}

#[test]
fn extended_format_requires_source_info() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert!(matches!(
        tx.to_ef_bytes(),
        Err(TransactionError::UnresolvedSource(_))
    ));
}

// -----------------------------------------------------------------------
// SIGHASH
// -----------------------------------------------------------------------

#[test]
fn preimage_structure() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    let sub_script =
        Script::from_hex("76a914eb0bd5edba389198e73f8efabddfc61666969ff788ac").unwrap();

    let preimage =
        sighash::preimage(&tx, 0, &sub_script, 1500, SighashScope::default()).unwrap();

    // version + hashPrevouts + hashSequence + outpoint + varint + script
    // + amount + sequence + hashOutputs + locktime + scope
    let expected = 4 + 32 + 32 + 36 + 1 + 25 + 8 + 4 + 32 + 4 + 4;
    assert_eq!(preimage.len(), expected);

    let version = u32::from_le_bytes(preimage[0..4].try_into().unwrap());
    assert_eq!(version, 1);
    let scope = u32::from_le_bytes(preimage[expected - 4..].try_into().unwrap());
    assert_eq!(scope, sighash::SIGHASH_ALL_FORKID as u32);
}

#[test]
fn sighash_single_beyond_outputs_hashes_zero() {
    // Two inputs, one output: SINGLE for input 1 has no matching output.
    let mut tx = Transaction::new();
    tx.add_input(TxInput::new(Hash256::new([0x01; 32]), 0));
    tx.add_input(TxInput::new(Hash256::new([0x02; 32]), 1));
    tx.add_output(TxOutput::new(900, test_lock_script()));

    let scope = SighashScope {
        base: SighashBase::Single,
        anyone_can_pay: false,
    };
    let preimage = sighash::preimage(&tx, 1, &test_lock_script(), 1000, scope).unwrap();

    // hashOutputs sits 40 bytes from the end (32 + locktime 4 + scope 4).
    let tail = preimage.len();
    assert_eq!(&preimage[tail - 40..tail - 8], &[0u8; 32]);
}

#[test]
fn preimage_out_of_range_input() {
    let tx = Transaction::from_hex(SOURCE_RAW_TX).unwrap();
    assert!(sighash::preimage(&tx, 9, &Script::new(), 0, SighashScope::default()).is_err());
}

// -----------------------------------------------------------------------
// Fee engine
// -----------------------------------------------------------------------

#[test]
fn default_fee_model_change() {
    // One 4000-sat input, one 1000-sat output, one change output at
    // 1 sat/KB: the ~227-byte estimate costs 1 satoshi.
    let funding = Arc::new(funding_tx(4000));
    let mut tx = spend_shape(funding, 1000);

    tx.fee(&FeeModel::default(), ChangeDistribution::Equal).unwrap();

    let change = tx.outputs.iter().find(|o| o.change).unwrap();
    assert_eq!(change.satoshis, Some(2999));
}

#[test]
fn fixed_fee_change_and_idempotence() {
    let funding = Arc::new(funding_tx(4000));
    let mut tx = spend_shape(funding, 1000);

    let model = FeeModel::Fixed(1033);
    tx.fee(&model, ChangeDistribution::Equal).unwrap();
    let first = tx.outputs.iter().find(|o| o.change).unwrap().satoshis;
    assert_eq!(first, Some(1967));

    // fee() is idempotent.
    tx.fee(&model, ChangeDistribution::Equal).unwrap();
    let second = tx.outputs.iter().find(|o| o.change).unwrap().satoshis;
    assert_eq!(second, first);
}

#[test]
fn equal_split_across_two_change_outputs() {
    let funding = Arc::new(funding_tx(10_000));
    let mut tx = spend_shape(funding, 1000);
    tx.add_output(TxOutput::change(test_lock_script()));

    tx.fee(&FeeModel::Fixed(100), ChangeDistribution::Equal).unwrap();

    let shares: Vec<u64> = tx
        .outputs
        .iter()
        .filter(|o| o.change)
        .map(|o| o.satoshis.unwrap())
        .collect();
    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0], shares[1]);

    // Residual satoshis (at most n-1) fall into the fee, never lost.
    let paid = tx.total_input_satoshis().unwrap() - tx.total_output_satoshis().unwrap();
    assert!(paid >= 100);
    assert!(paid < 100 + 2);
}

#[test]
fn random_split_conserves_value_exactly() {
    let funding = Arc::new(funding_tx(50_000));
    let mut tx = spend_shape(funding, 1000);
    tx.add_output(TxOutput::change(test_lock_script()));
    tx.add_output(TxOutput::change(test_lock_script()));

    let model = FeeModel::Fixed(200);
    tx.fee(&model, ChangeDistribution::Random).unwrap();

    let shares: Vec<u64> = tx
        .outputs
        .iter()
        .filter(|o| o.change)
        .map(|o| o.satoshis.unwrap())
        .collect();
    assert_eq!(shares.len(), 3);
    assert!(shares.iter().all(|&s| s >= 1));

    // Sum of inputs minus outputs is the fee, exactly.
    let paid = tx.total_input_satoshis().unwrap() - tx.total_output_satoshis().unwrap();
    assert_eq!(paid, 200);
}

#[test]
fn insufficient_funds() {
    let funding = Arc::new(funding_tx(500));
    let mut tx = spend_shape(funding, 1000);
    let err = tx.fee(&FeeModel::default(), ChangeDistribution::Equal).unwrap_err();
    assert!(matches!(err, TransactionError::InsufficientFunds { .. }));
}

#[test]
fn dust_change_is_dropped() {
    // Input exactly covers output + fee; the change output cannot receive
    // a satoshi and is removed on the retry.
    let funding = Arc::new(funding_tx(1001));
    let mut tx = spend_shape(funding, 1000);

    tx.fee(&FeeModel::Fixed(1), ChangeDistribution::Equal).unwrap();
    assert!(tx.outputs.iter().all(|o| !o.change));
    assert_eq!(tx.outputs.len(), 1);
}

#[test]
fn no_change_outputs_surrenders_remainder() {
    let funding = Arc::new(funding_tx(2000));
    let mut tx = Transaction::new();
    let input = TxInput::from_source(funding, 0)
        .unwrap()
        .with_template(Arc::new(p2pkh::unlock(test_key(), None)));
    tx.add_input(input);
    tx.add_output(TxOutput::new(1500, test_lock_script()));

    tx.fee(&FeeModel::Fixed(10), ChangeDistribution::Equal).unwrap();
    // The 490 uncollected satoshis become fee.
    let paid = tx.total_input_satoshis().unwrap() - tx.total_output_satoshis().unwrap();
    assert_eq!(paid, 500);
}

// -----------------------------------------------------------------------
// Signing
// -----------------------------------------------------------------------

#[test]
fn sign_produces_two_push_chunks_and_verifies() {
    let funding = Arc::new(funding_tx(4000));
    let mut tx = spend_shape(funding.clone(), 1000);

    tx.fee(&FeeModel::default(), ChangeDistribution::Equal).unwrap();
    tx.sign().unwrap();

    let unlocking = tx.inputs[0].unlocking_script.as_ref().unwrap();
    let chunks = unlocking.chunks().unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].data.is_some(), "signature push");
    assert_eq!(chunks[1].data.as_ref().unwrap().len(), 33, "pubkey push");

    // The signed input satisfies its locking script.
    let oracle = Secp256k1Oracle;
    let ctx = TxSigContext::new(&tx, &oracle);
    let locking = &funding.outputs[0].locking_script;
    verify_scripts(unlocking, locking, &Limits::default(), Some(&ctx), 0).unwrap();
}

#[test]
fn signing_changes_the_txid() {
    let funding = Arc::new(funding_tx(4000));
    let mut tx = spend_shape(funding, 1000);
    tx.fee(&FeeModel::default(), ChangeDistribution::Equal).unwrap();

    let unsigned = tx.txid().unwrap();
    tx.sign().unwrap();
    let signed = tx.txid().unwrap();
    assert_ne!(unsigned, signed);
}

#[test]
fn sign_before_fee_is_rejected() {
    let funding = Arc::new(funding_tx(4000));
    let mut tx = spend_shape(funding, 1000);
    assert!(matches!(tx.sign(), Err(TransactionError::SignBeforeFee)));
}

#[test]
fn sign_requires_script_or_template() {
    let mut tx = Transaction::new();
    tx.add_input(TxInput::new(Hash256::new([0x09; 32]), 0));
    tx.add_output(TxOutput::new(100, test_lock_script()));
    assert!(matches!(
        tx.sign(),
        Err(TransactionError::SigningMissingSource(_))
    ));
}

#[test]
fn single_anyonecanpay_survives_added_inputs() {
    let scope = SighashScope {
        base: SighashBase::Single,
        anyone_can_pay: true,
    };

    let funding_a = Arc::new(funding_tx(3000));
    let funding_b = Arc::new(funding_tx(2000));

    let mut tx = Transaction::new();
    tx.add_input(
        TxInput::from_source(funding_a.clone(), 0)
            .unwrap()
            .with_template(Arc::new(p2pkh::unlock(test_key(), Some(scope)))),
    );
    tx.add_input(
        TxInput::from_source(funding_b, 0)
            .unwrap()
            .with_template(Arc::new(p2pkh::unlock(test_key(), None))),
    );
    tx.add_output(TxOutput::new(1200, test_lock_script()));
    tx.add_output(TxOutput::new(800, test_lock_script()));

    // Sign only input 0 under SINGLE | ANYONECANPAY.
    let unlocker = p2pkh::unlock(test_key(), Some(scope));
    let unlocking = unlocker.sign(&tx, 0).unwrap();
    tx.inputs[0].unlocking_script = Some(unlocking.clone());

    let oracle = Secp256k1Oracle;
    let locking = funding_a.outputs[0].locking_script.clone();

    let verify = |tx: &Transaction| {
        let ctx = TxSigContext::new(tx, &oracle);
        verify_scripts(&unlocking, &locking, &Limits::default(), Some(&ctx), 0)
    };
    verify(&tx).unwrap();

    // Appending a third input leaves the signature valid.
    let funding_c = Arc::new(funding_tx(700));
    tx.add_input(TxInput::from_source(funding_c, 0).unwrap());
    verify(&tx).unwrap();

    // Touching the committed output (same index as the input) breaks it.
    let mut tampered = tx.clone();
    tampered.outputs[0].satoshis = Some(1199);
    assert!(verify(&tampered).is_err());

    // The uncommitted output at the other index is free to change.
    let mut other = tx.clone();
    other.outputs[1].satoshis = Some(799);
    verify(&other).unwrap();
}

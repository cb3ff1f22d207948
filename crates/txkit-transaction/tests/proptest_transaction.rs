use proptest::prelude::*;

use txkit_codec::Hash256;
use txkit_script::Script;
use txkit_transaction::{parse_script_offsets, Transaction, TxInput, TxOutput};

fn arb_script() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..120)
}

fn arb_input() -> impl Strategy<Value = TxInput> {
    (
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        any::<u32>(),
        arb_script(),
    )
        .prop_map(|(txid, index, sequence, script)| {
            let mut input = TxInput::new(Hash256::new(txid), index);
            input.sequence = sequence;
            if !script.is_empty() {
                input.unlocking_script = Some(Script::from_bytes(&script));
            }
            input
        })
}

fn arb_output() -> impl Strategy<Value = TxOutput> {
    (0u64..21_000_000_00_000_000, arb_script())
        .prop_map(|(satoshis, script)| TxOutput::new(satoshis, Script::from_bytes(&script)))
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        1u32..3,
        prop::collection::vec(arb_input(), 0..5),
        prop::collection::vec(arb_output(), 0..5),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| {
            let mut tx = Transaction::new();
            tx.version = version;
            tx.lock_time = lock_time;
            for input in inputs {
                tx.add_input(input);
            }
            for output in outputs {
                tx.add_output(output);
            }
            tx
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn wire_roundtrip(tx in arb_transaction()) {
        let bytes = tx.to_bytes().unwrap();
        let decoded = Transaction::from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded.to_bytes().unwrap(), bytes);
        prop_assert_eq!(decoded.txid().unwrap(), tx.txid().unwrap());
    }

    #[test]
    fn script_offsets_agree_with_parser(tx in arb_transaction()) {
        let bytes = tx.to_bytes().unwrap();
        let offsets = parse_script_offsets(&bytes).unwrap();
        prop_assert_eq!(offsets.inputs.len(), tx.inputs.len());
        prop_assert_eq!(offsets.outputs.len(), tx.outputs.len());

        for (slice, input) in offsets.inputs.iter().zip(&tx.inputs) {
            let expected: &[u8] = input
                .unlocking_script
                .as_ref()
                .map(|s| s.as_bytes())
                .unwrap_or(&[]);
            prop_assert_eq!(&bytes[slice.offset..slice.offset + slice.length], expected);
        }
        for (slice, output) in offsets.outputs.iter().zip(&tx.outputs) {
            prop_assert_eq!(
                &bytes[slice.offset..slice.offset + slice.length],
                output.locking_script.as_bytes()
            );
        }
    }

    #[test]
    fn size_matches_serialization(tx in arb_transaction()) {
        // With every script materialized, the estimate is exact.
        prop_assert_eq!(tx.estimated_size(), tx.to_bytes().unwrap().len());
    }
}

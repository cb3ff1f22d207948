use proptest::prelude::*;

use txkit_codec::{ByteReader, ByteWriter, Hash256, VarInt};

proptest! {
    #[test]
    fn varint_roundtrip(v in any::<u64>()) {
        let bytes = VarInt(v).to_bytes();
        prop_assert_eq!(bytes.len(), VarInt(v).encoded_len());
        let mut reader = ByteReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap(), VarInt(v));
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn var_bytes_roundtrip(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut w = ByteWriter::new();
        w.write_var_bytes(&data);
        let encoded = w.into_bytes();
        let mut reader = ByteReader::new(&encoded);
        prop_assert_eq!(reader.read_var_bytes().unwrap(), &data[..]);
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn hash256_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash256::new(bytes);
        let hex_str = hash.to_string();
        prop_assert_eq!(Hash256::from_hex(&hex_str).unwrap(), hash);
    }

    #[test]
    fn write_reverse_is_involutive(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut w = ByteWriter::new();
        w.write_reverse(&data);
        let once = w.into_bytes();
        let mut w2 = ByteWriter::new();
        w2.write_reverse(&once);
        prop_assert_eq!(w2.into_bytes(), data);
    }
}

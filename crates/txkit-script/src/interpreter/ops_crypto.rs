//! Hashing and signature-checking operations.

use sha1::{Digest, Sha1};
use txkit_codec::digest::{hash160, ripemd160, sha256, sha256d};

use crate::error::{ScriptError, ScriptErrorKind};
use crate::opcodes::*;

use super::machine::Machine;
use super::parsed::{remove_opcode, remove_push_of, unparse};

const SIGHASH_FORKID: u8 = 0x40;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Validate a sighash scope byte: base in {ALL=1, NONE=2, SINGLE=3},
/// mandatory FORKID, optional ANYONECANPAY, no other bits.
pub(crate) fn check_sighash_byte(byte: u8) -> Result<(), ScriptError> {
    let base = byte & !(SIGHASH_FORKID | SIGHASH_ANYONECANPAY);
    if !(1..=3).contains(&base) {
        return Err(ScriptError::new(
            ScriptErrorKind::InvalidSighashFlag,
            format!("sighash base scope 0x{:02x} is not ALL/NONE/SINGLE", byte),
        ));
    }
    if byte & SIGHASH_FORKID == 0 {
        return Err(ScriptError::new(
            ScriptErrorKind::InvalidSighashFlag,
            format!("sighash scope 0x{:02x} is missing the FORKID bit", byte),
        ));
    }
    Ok(())
}

/// Strict DER check for a signature without its trailing scope byte.
pub(crate) fn check_signature_encoding(sig: &[u8]) -> Result<(), ScriptError> {
    fn bad(reason: String) -> ScriptError {
        ScriptError::new(ScriptErrorKind::InvalidSignatureEncoding, reason)
    }

    if sig.is_empty() {
        return Ok(());
    }
    let len = sig.len();
    if len < 8 {
        return Err(bad(format!("signature too short: {} < 8", len)));
    }
    if len > 72 {
        return Err(bad(format!("signature too long: {} > 72", len)));
    }
    if sig[0] != 0x30 {
        return Err(bad(format!("wrong sequence tag {:#x}", sig[0])));
    }
    if sig[1] as usize != len - 2 {
        return Err(bad(format!("bad length byte: {} != {}", sig[1], len - 2)));
    }

    let r_len = sig[3] as usize;
    let s_type_offset = 4 + r_len;
    let s_len_offset = s_type_offset + 1;
    if s_type_offset >= len {
        return Err(bad("S integer tag missing".to_string()));
    }
    if s_len_offset >= len {
        return Err(bad("S length missing".to_string()));
    }
    let s_offset = s_len_offset + 1;
    let s_len = sig[s_len_offset] as usize;
    if s_offset + s_len != len {
        return Err(bad("S length inconsistent with total".to_string()));
    }

    if sig[2] != 0x02 {
        return Err(bad(format!("R integer tag {:#x} != 0x02", sig[2])));
    }
    if r_len == 0 {
        return Err(bad("R length is zero".to_string()));
    }
    if sig[4] & 0x80 != 0 {
        return Err(bad("R is negative".to_string()));
    }
    if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(bad("R has excess padding".to_string()));
    }

    if sig[s_type_offset] != 0x02 {
        return Err(bad(format!("S integer tag {:#x} != 0x02", sig[s_type_offset])));
    }
    if s_len == 0 {
        return Err(bad("S length is zero".to_string()));
    }
    if sig[s_offset] & 0x80 != 0 {
        return Err(bad("S is negative".to_string()));
    }
    if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
        return Err(bad("S has excess padding".to_string()));
    }
    Ok(())
}

/// SEC1 shape check for a public key: 33 bytes 02/03 or 65 bytes 04.
pub(crate) fn check_pub_key_encoding(pub_key: &[u8]) -> Result<(), ScriptError> {
    if pub_key.len() == 33 && (pub_key[0] == 0x02 || pub_key[0] == 0x03) {
        return Ok(());
    }
    if pub_key.len() == 65 && pub_key[0] == 0x04 {
        return Ok(());
    }
    Err(ScriptError::new(
        ScriptErrorKind::InvalidPublicKey,
        "unsupported public key encoding",
    ))
}

impl<'a> Machine<'a> {
    pub(crate) fn op_hash(&mut self, opcode: u8) -> Result<(), ScriptError> {
        let data = self.stack.pop()?;
        let digest: Vec<u8> = match opcode {
            OP_RIPEMD160 => ripemd160(&data).to_vec(),
            OP_SHA1 => {
                let mut hasher = Sha1::new();
                hasher.update(&data);
                hasher.finalize().to_vec()
            }
            OP_SHA256 => sha256(&data).to_vec(),
            OP_HASH160 => hash160(&data).to_vec(),
            OP_HASH256 => sha256d(&data).to_vec(),
            _ => unreachable!("non-hash opcode dispatched to op_hash"),
        };
        self.stack.push(digest)
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), ScriptError> {
        let pub_key = self.stack.pop()?;
        let full_sig = self.stack.pop()?;

        if full_sig.is_empty() {
            return self.stack.push_bool(false);
        }

        let ctx = self.ctx.ok_or_else(|| {
            ScriptError::new(
                ScriptErrorKind::BadOperand,
                "OP_CHECKSIG requires a transaction context",
            )
        })?;

        let scope_byte = *full_sig.last().unwrap();
        let sig_der = &full_sig[..full_sig.len() - 1];

        check_sighash_byte(scope_byte)?;
        check_signature_encoding(sig_der)?;
        check_pub_key_encoding(&pub_key)?;

        // Subscript: from the last OP_CODESEPARATOR, with the exact
        // signature bytes scrubbed.
        let mut sub = self.sub_script();
        sub = remove_push_of(&sub, &full_sig);
        sub = remove_opcode(&sub, OP_CODESEPARATOR);
        let sub_script = unparse(&sub);

        let valid = ctx
            .check_signature(&full_sig, &pub_key, &sub_script, self.input_index)
            .unwrap_or(false);
        self.stack.push_bool(valid)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), ScriptError> {
        let key_count = self.pop_count("public key count")?;
        if key_count > self.limits.max_multisig_keys {
            return Err(ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!(
                    "{} public keys exceeds the multisig limit of {}",
                    key_count, self.limits.max_multisig_keys
                ),
            ));
        }
        self.bump_op_count(key_count)?;

        let mut pub_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            pub_keys.push(self.stack.pop()?);
        }

        let sig_count = self.pop_count("signature count")?;
        if sig_count > key_count {
            return Err(ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("{} signatures for {} keys", sig_count, key_count),
            ));
        }
        let mut signatures = Vec::with_capacity(sig_count);
        for _ in 0..sig_count {
            signatures.push(self.stack.pop()?);
        }

        // The historical extra pop, kept for on-chain compatibility.
        self.stack.pop()?;

        let ctx = match self.ctx {
            Some(ctx) => ctx,
            None => return self.stack.push_bool(false),
        };

        let mut sub = self.sub_script();
        for sig in &signatures {
            sub = remove_push_of(&sub, sig);
        }
        sub = remove_opcode(&sub, OP_CODESEPARATOR);
        let sub_script = unparse(&sub);

        let mut success = true;
        let mut key_idx = 0usize;
        let mut sig_idx = 0usize;
        while sig_idx < signatures.len() {
            if signatures.len() - sig_idx > pub_keys.len() - key_idx {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx];
            key_idx += 1;
            if sig.is_empty() {
                continue;
            }

            let scope_byte = *sig.last().unwrap();
            check_sighash_byte(scope_byte)?;
            check_signature_encoding(&sig[..sig.len() - 1])?;
            check_pub_key_encoding(pub_key)?;

            if ctx
                .check_signature(sig, pub_key, &sub_script, self.input_index)
                .unwrap_or(false)
            {
                sig_idx += 1;
            }
        }
        if sig_idx < signatures.len() {
            success = false;
        }

        self.stack.push_bool(success)
    }

    fn pop_count(&mut self, what: &str) -> Result<usize, ScriptError> {
        let n = self.stack.pop_num()?;
        n.to_usize().ok_or_else(|| {
            ScriptError::new(
                ScriptErrorKind::BadOperand,
                format!("negative {}: {}", what, n.to_i64()),
            )
        })
    }
}

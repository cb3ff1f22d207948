//! Fee computation and change distribution.
//!
//! The solver estimates the final transaction size before signatures
//! exist, using each unsigned input's template length estimate, computes
//! the fee, and splits the remainder over the change outputs. Signature
//! length depends on what is signed, so the estimate is a worst case and
//! the realized fee can only be slightly higher than the model requires.

use rand::Rng;

use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Fee requirement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeModel {
    /// A flat fee in satoshis.
    Fixed(u64),
    /// Satoshis per kilobyte of transaction size, rounded up.
    SatsPerKb(u64),
}

impl Default for FeeModel {
    fn default() -> Self {
        FeeModel::SatsPerKb(1)
    }
}

impl FeeModel {
    /// The fee required for a transaction of `size` bytes.
    pub fn fee_for_size(&self, size: usize) -> u64 {
        match *self {
            FeeModel::Fixed(satoshis) => satoshis,
            FeeModel::SatsPerKb(rate) => (size as u64 * rate + 999) / 1000,
        }
    }
}

/// How the remainder is split across change outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDistribution {
    /// Integer-divide equally; any residual satoshis go to the fee.
    Equal,
    /// A uniform random partition with at least one satoshi per output;
    /// the shares sum to the remainder exactly.
    Random,
}

/// Solve the fee and assign change output values on `tx`.
///
/// Change outputs that cannot receive at least one satoshi are removed and
/// the allocation re-solved once; the removed outputs shrink the
/// transaction, so the retry has strictly more room.
pub(crate) fn allocate(
    tx: &mut Transaction,
    model: &FeeModel,
    distribution: ChangeDistribution,
) -> Result<(), TransactionError> {
    // Re-solving from scratch keeps fee() idempotent.
    for output in tx.outputs.iter_mut().filter(|o| o.change) {
        output.satoshis = None;
    }

    let total_in = tx.total_input_satoshis()?;
    let fixed_out: u64 = {
        let mut sum = 0u64;
        for output in tx.outputs.iter().filter(|o| !o.change) {
            sum += output.satoshis.ok_or(TransactionError::SignBeforeFee)?;
        }
        sum
    };

    for _attempt in 0..2 {
        let change_count = tx.outputs.iter().filter(|o| o.change).count();
        let size = tx.estimated_size();
        let fee = model.fee_for_size(size);

        let required = fixed_out + fee;
        let remainder = total_in
            .checked_sub(required)
            .ok_or(TransactionError::InsufficientFunds {
                required,
                available: total_in,
            })?;

        if change_count == 0 {
            // No change recipients: the remainder is surrendered to the fee.
            return Ok(());
        }

        if remainder >= change_count as u64 {
            distribute(tx, remainder, distribution);
            return Ok(());
        }

        // Not every change output can receive a satoshi: drop the excess
        // and re-solve with the smaller transaction.
        let mut keep = remainder as usize;
        tx.outputs.retain(|o| {
            if !o.change {
                return true;
            }
            if keep > 0 {
                keep -= 1;
                true
            } else {
                false
            }
        });
    }

    Err(TransactionError::FeeSolverDidNotConverge)
}

fn distribute(tx: &mut Transaction, remainder: u64, distribution: ChangeDistribution) {
    let change_count = tx.outputs.iter().filter(|o| o.change).count() as u64;
    let shares: Vec<u64> = match distribution {
        ChangeDistribution::Equal => {
            let share = remainder / change_count;
            vec![share; change_count as usize]
        }
        ChangeDistribution::Random => {
            let mut rng = rand::thread_rng();
            let mut shares = vec![1u64; change_count as usize];
            let mut left = remainder - change_count;
            for share in shares.iter_mut().take(change_count as usize - 1) {
                let take = rng.gen_range(0..=left);
                *share += take;
                left -= take;
            }
            if let Some(last) = shares.last_mut() {
                *last += left;
            }
            shares
        }
    };

    let mut share_iter = shares.into_iter();
    for output in tx.outputs.iter_mut().filter(|o| o.change) {
        output.satoshis = share_iter.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_model_ignores_size() {
        assert_eq!(FeeModel::Fixed(1033).fee_for_size(1), 1033);
        assert_eq!(FeeModel::Fixed(1033).fee_for_size(100_000), 1033);
    }

    #[test]
    fn per_kb_model_rounds_up() {
        let model = FeeModel::SatsPerKb(1);
        assert_eq!(model.fee_for_size(1), 1);
        assert_eq!(model.fee_for_size(227), 1);
        assert_eq!(model.fee_for_size(1000), 1);
        assert_eq!(model.fee_for_size(1001), 2);

        let model = FeeModel::SatsPerKb(500);
        assert_eq!(model.fee_for_size(250), 125);
    }

    #[test]
    fn default_model_is_one_sat_per_kb() {
        assert_eq!(FeeModel::default(), FeeModel::SatsPerKb(1));
    }
}

//! Coin selection and fee-target finalization for one-satoshi-per-byte
//! ("legacy") fees.
//!
//! A [`TxDraft`] is built from spendable [`Coin`]s with a fee target taken
//! from [`appraise_counts`](crate::fees::appraise_counts). Because the final
//! signature sizes are unknown until signing, [`DashTx::finalize_presorted`]
//! signs the draft and, if the realized size outgrows the fee, either
//! re-signs (randomized signers) or shaves the change output one satoshi at
//! a time until the fee covers the size.

use dash_script::Script;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dash_tx::{DashTx, SignedTx};
use crate::fees::{self, FeeEstimate, MAX_INPUT_PAD, OUTPUT_SIZE};
use crate::input::{InputForSig, LockSource, Outpoint, TxId, TxInput};
use crate::output::{OutputValue, TxOutput};
use crate::signer::TxSigner;
use crate::transaction::{add_satoshis, sum_satoshis, Transaction};
use crate::{sort, TransactionError};

/// Extra fee reserved for the second input.
pub const SECOND_INPUT_MARGIN: u64 = 1;

// ---------------------------------------------------------------------------
// Coins and recipients
// ---------------------------------------------------------------------------

/// A spendable output owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    #[serde(rename = "txId")]
    pub txid: TxId,
    pub output_index: u32,
    pub satoshis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        with = "crate::output::opt_hex20",
        skip_serializing_if = "Option::is_none"
    )]
    pub pub_key_hash: Option<[u8; 20]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
}

impl Coin {
    /// A coin locked to a public key hash.
    pub fn p2pkh(txid: TxId, output_index: u32, satoshis: u64, pub_key_hash: [u8; 20]) -> Self {
        Coin {
            txid,
            output_index,
            satoshis,
            address: None,
            pub_key_hash: Some(pub_key_hash),
            script: None,
        }
    }

    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid, self.output_index)
    }

    /// An output paying `satoshis` back to where this coin is locked.
    fn pay_back(&self, satoshis: u64) -> OutputValue {
        OutputValue {
            satoshis,
            pub_key_hash: self.pub_key_hash,
            address: self.address.clone(),
            script: if self.pub_key_hash.is_some() { None } else { self.script.clone() },
            change: false,
        }
    }
}

/// Destination of a single-output payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Amount to pay; `None` sends every coin minus the fee.
    #[serde(default)]
    pub satoshis: Option<u64>,
    #[serde(
        default,
        with = "crate::output::opt_hex20",
        skip_serializing_if = "Option::is_none"
    )]
    pub pub_key_hash: Option<[u8; 20]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Script>,
}

impl Recipient {
    pub fn to_pub_key_hash(satoshis: Option<u64>, pub_key_hash: [u8; 20]) -> Self {
        Recipient { satoshis, pub_key_hash: Some(pub_key_hash), ..Default::default() }
    }

    pub fn to_address(satoshis: Option<u64>, address: impl Into<String>) -> Self {
        Recipient { satoshis, address: Some(address.into()), ..Default::default() }
    }

    fn has_destination(&self) -> bool {
        self.pub_key_hash.is_some() || self.address.is_some() || self.script.is_some()
    }

    fn output(&self, satoshis: u64) -> OutputValue {
        OutputValue {
            satoshis,
            pub_key_hash: self.pub_key_hash,
            address: self.address.clone(),
            script: self.script.clone(),
            change: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts and summaries
// ---------------------------------------------------------------------------

/// An unsigned transaction with its fee target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxDraft {
    pub version: u16,
    pub tx_type: u16,
    pub locktime: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Fee the draft pays: inputs minus outputs.
    pub fee_target: u64,
    /// Appraised size bracket of the draft as built.
    pub fee_estimate: FeeEstimate,
    /// Every selected coin goes to the single output.
    pub full_transfer: bool,
}

impl TxDraft {
    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            version: self.version,
            tx_type: self.tx_type,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            locktime: self.locktime,
            extra_payload: Vec::new(),
        }
    }

    /// Position of the change output, if any.
    pub fn change_index(&self) -> Option<usize> {
        self.outputs.iter().position(TxOutput::is_change)
    }

    /// Put inputs and outputs in deterministic order.
    pub fn sort(&mut self) -> Result<(), TransactionError> {
        sort::sort_outputs(&mut self.outputs)?;
        sort::sort_inputs(&mut self.inputs);
        Ok(())
    }

    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        sum_satoshis(self.inputs.iter().filter_map(TxInput::satoshis))
    }

    pub fn total_output_satoshis(&self) -> Result<u64, TransactionError> {
        sum_satoshis(self.outputs.iter().map(TxOutput::satoshis))
    }
}

/// A finalized, fully signed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSummary {
    pub transaction: Transaction,
    pub hex: String,
    pub id: String,
    /// Realized fee in satoshis.
    pub fee: u64,
    /// Realized size in bytes; never above `fee`.
    pub size: u64,
    pub change_index: Option<usize>,
    pub full_transfer: bool,
}

// ---------------------------------------------------------------------------
// Fee targets
// ---------------------------------------------------------------------------

/// Fee margin reserved for signature padding across `input_count` inputs.
///
/// The chance that every signature comes out unpadded falls by 1/4 per
/// input, so the margin grows by one for the second input and by
/// [`MAX_INPUT_PAD`] for each input after that.
pub fn input_margin(input_count: usize) -> u64 {
    match input_count {
        0 | 1 => 0,
        n => SECOND_INPUT_MARGIN + (n as u64 - 2) * MAX_INPUT_PAD,
    }
}

/// Fee to aim for when spending `input_count` coins into `outputs`.
pub fn fee_target(input_count: usize, outputs: &[TxOutput]) -> Result<u64, TransactionError> {
    Ok(fees::appraise_counts(input_count, outputs)?.min + input_margin(input_count))
}

/// Choose coins covering `amount` plus the fee for `outputs`.
///
/// # Returns
/// The smallest single coin strictly above the one-input target if there
/// is one; otherwise coins taken largest-first until they cover the target
/// for that many inputs.
pub fn select_coins<'a>(
    coins: &'a [Coin],
    amount: u64,
    outputs: &[TxOutput],
) -> Result<Vec<&'a Coin>, TransactionError> {
    let mut by_value: Vec<&Coin> = coins.iter().collect();
    by_value.sort_by(|a, b| b.satoshis.cmp(&a.satoshis).then(a.outpoint().cmp(&b.outpoint())));

    // a target past u64::MAX is unreachable
    if let Some(single_target) = amount.checked_add(fee_target(1, outputs)?) {
        if let Some(coin) = by_value.iter().rev().find(|c| c.satoshis > single_target) {
            return Ok(vec![*coin]);
        }
    }

    let mut selected = Vec::new();
    let mut sum = 0u64;
    for coin in by_value {
        selected.push(coin);
        sum = add_satoshis(sum, coin.satoshis)?;
        let target = amount.checked_add(fee_target(selected.len(), outputs)?);
        if target.is_some_and(|target| sum >= target) {
            return Ok(selected);
        }
    }

    Err(TransactionError::InsufficientFunds {
        amount,
        fee: fee_target(coins.len().max(1), outputs)?,
        balance: sum,
    })
}

// ---------------------------------------------------------------------------
// Building and finalizing
// ---------------------------------------------------------------------------

impl<S: TxSigner> DashTx<S> {
    /// Draft a payment to several outputs, adding change when it is worth it.
    ///
    /// # Arguments
    /// * `coins`     - Spendable coins to choose from.
    /// * `outputs`   - Payments; their sum is the amount to cover.
    /// * `change_to` - Change destination; defaults to the first selected coin's.
    ///
    /// # Returns
    /// A sorted draft, or `InsufficientFunds`.
    pub fn create_legacy_tx(
        &self,
        coins: &[Coin],
        mut outputs: Vec<TxOutput>,
        change_to: Option<&Recipient>,
    ) -> Result<TxDraft, TransactionError> {
        if outputs.is_empty() {
            if !self.config().allow_donation {
                return Err(TransactionError::EmptyOutputs);
            }
            outputs.push(TxOutput::donation());
        }
        let amount = sum_satoshis(outputs.iter().map(TxOutput::satoshis))?;
        let selected = select_coins(coins, amount, &outputs)?;
        let total = sum_satoshis(selected.iter().map(|c| c.satoshis))?;

        let mut fee = fee_target(selected.len(), &outputs)?;
        let leftover = total - amount - fee;
        if leftover >= self.config().dust.saturating_add(OUTPUT_SIZE) {
            let mut change = match change_to {
                Some(recipient) => recipient.output(0),
                None => selected[0].pay_back(0),
            };
            change.satoshis = leftover - OUTPUT_SIZE;
            change.change = true;
            outputs.push(TxOutput::Value(change));
            fee += OUTPUT_SIZE;
        } else {
            fee += leftover;
        }
        debug!(inputs = selected.len(), amount, fee, "drafted legacy transaction");

        let mut draft = self.draft(&selected, outputs, fee, false)?;
        draft.sort()?;
        Ok(draft)
    }

    /// Draft a payment to one recipient.
    ///
    /// With `recipient.satoshis == None` every coin is spent and the single
    /// output receives the balance minus the fee target.
    pub fn draft_single_output(
        &self,
        coins: &[Coin],
        recipient: &Recipient,
        change_to: Option<&Recipient>,
    ) -> Result<TxDraft, TransactionError> {
        if !recipient.has_destination() {
            return Err(TransactionError::InvalidTransaction(
                "output must have a 'pubKeyHash', 'address' or 'script'".to_string(),
            ));
        }
        if let Some(amount) = recipient.satoshis {
            let outputs = vec![TxOutput::Value(recipient.output(amount))];
            return self.create_legacy_tx(coins, outputs, change_to);
        }

        let selected: Vec<&Coin> = coins.iter().collect();
        let balance = sum_satoshis(selected.iter().map(|c| c.satoshis))?;
        let fee = fee_target(selected.len(), &[TxOutput::Value(recipient.output(0))])?;
        let minimum = self.config().dust;
        if selected.is_empty() || balance < fee.saturating_add(minimum) {
            return Err(TransactionError::InsufficientFunds { amount: minimum, fee, balance });
        }

        let outputs = vec![TxOutput::Value(recipient.output(balance - fee))];
        let mut draft = self.draft(&selected, outputs, fee, true)?;
        draft.sort()?;
        Ok(draft)
    }

    /// Sign a sorted draft so that its fee covers its signed size.
    ///
    /// Randomized signers are first re-run up to `max_entropy_retries`
    /// times. If the size still exceeds the fee, the change output (or the
    /// sole output of a full transfer) is lowered one satoshi per attempt,
    /// at most `max - min + 1` times.
    pub async fn finalize_presorted(&self, draft: &TxDraft) -> Result<TxSummary, TransactionError> {
        let mut tx = draft.to_transaction();
        let total_in = tx.total_input_satoshis()?;

        let attempts = if self.signer().is_deterministic() {
            1
        } else {
            self.config().max_entropy_retries.max(1)
        };
        let mut previous: Option<String> = None;
        for attempt in 1..=attempts {
            let signed = self.hash_and_sign_all(&tx).await?;
            if let Some(summary) = check_fee(&signed, total_in, draft)? {
                return Ok(summary);
            }
            debug!(attempt, size = signed.size(), "signed size exceeds fee, re-signing");
            if previous.as_deref() == Some(signed.hex.as_str()) {
                // identical output: the signer is deterministic after all
                break;
            }
            previous = Some(signed.hex);
        }

        let index = match draft.change_index() {
            Some(index) => index,
            None if draft.full_transfer && tx.outputs.len() == 1 => 0,
            None => {
                return Err(TransactionError::NoConvergence(
                    "signed size exceeds the fee and there is no change or full-transfer output \
                     to take the difference from"
                        .to_string(),
                ))
            }
        };

        let steps = draft.fee_estimate.max - draft.fee_estimate.min + 1;
        for step in 1..=steps {
            match &mut tx.outputs[index] {
                TxOutput::Value(output) if output.satoshis > 0 => output.satoshis -= 1,
                _ => break,
            }
            let signed = self.hash_and_sign_all(&tx).await?;
            if let Some(summary) = check_fee(&signed, total_in, draft)? {
                debug!(step, fee = summary.fee, size = summary.size, "fee walk converged");
                return Ok(summary);
            }
        }

        Err(TransactionError::NoConvergence(format!(
            "fee still below the signed size after {} fee-walk steps",
            steps
        )))
    }

    /// Draft, sort, and finalize a single-recipient payment.
    pub async fn legacy(
        &self,
        coins: &[Coin],
        recipient: &Recipient,
        change_to: Option<&Recipient>,
    ) -> Result<TxSummary, TransactionError> {
        let draft = self.draft_single_output(coins, recipient, change_to)?;
        self.finalize_presorted(&draft).await
    }

    fn draft(
        &self,
        selected: &[&Coin],
        outputs: Vec<TxOutput>,
        fee_target: u64,
        full_transfer: bool,
    ) -> Result<TxDraft, TransactionError> {
        let inputs = selected
            .iter()
            .map(|coin| self.coin_input(coin).map(TxInput::ForSig))
            .collect::<Result<Vec<_>, _>>()?;
        let fee_estimate = fees::appraise_counts(inputs.len(), &outputs)?;
        let config = self.config();
        Ok(TxDraft {
            version: config.version,
            tx_type: config.tx_type,
            locktime: config.locktime,
            inputs,
            outputs,
            fee_target,
            fee_estimate,
            full_transfer,
        })
    }

    fn coin_input(&self, coin: &Coin) -> Result<InputForSig, TransactionError> {
        let lock = match (&coin.pub_key_hash, &coin.script, &coin.address) {
            (Some(pkh), _, _) => LockSource::PubKeyHash(*pkh),
            (None, Some(script), _) => LockSource::Script(script.clone()),
            (None, None, Some(address)) => {
                LockSource::PubKeyHash(self.signer().addr_to_pub_key_hash(address)?)
            }
            (None, None, None) => {
                return Err(TransactionError::InvalidTransaction(format!(
                    "coin {}:{} needs a 'pubKeyHash', 'address' or 'script'",
                    coin.txid, coin.output_index
                )))
            }
        };
        Ok(InputForSig {
            sig_hash_type: self.config().sig_hash_type,
            satoshis: Some(coin.satoshis),
            address: coin.address.clone(),
            ..InputForSig::new(coin.outpoint(), lock)
        })
    }
}

fn check_fee(
    signed: &SignedTx,
    total_in: u64,
    draft: &TxDraft,
) -> Result<Option<TxSummary>, TransactionError> {
    if let Some(index) = signed.transaction.inputs.iter().position(|i| !i.is_signed()) {
        return Err(TransactionError::SigningError(format!(
            "finalizing needs every input signed, but the signer skipped inputs[{}]",
            index
        )));
    }
    let fee = total_in
        .checked_sub(signed.transaction.total_output_satoshis()?)
        .ok_or_else(|| TransactionError::InvalidTransaction("outputs exceed inputs".to_string()))?;
    let size = signed.size();
    if fee < size {
        return Ok(None);
    }
    Ok(Some(TxSummary {
        transaction: signed.transaction.clone(),
        hex: signed.hex.clone(),
        id: signed.id()?,
        fee,
        size,
        change_index: draft.change_index(),
        full_transfer: draft.full_transfer,
    }))
}

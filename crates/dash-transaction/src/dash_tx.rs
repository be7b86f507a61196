//! The library entry point: [`DashTx`] holds the injected signer and the
//! configuration, and drives per-input signing.

use tracing::{debug, warn};

use crate::config::{DashTxConfig, SortPolicy};
use crate::fees::{self, FeeEstimate};
use crate::input::{InputSigned, TxInput};
use crate::output::TxOutput;
use crate::parser::{self, ParsedTransaction};
use crate::signer::{KeyListSigner, PrivateKey, TxSigner};
use crate::transaction::{self, Transaction};
use crate::{sighash, sort, TransactionError};

/// Result of signing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    /// The transaction with every signed input replaced by its signed form.
    pub transaction: Transaction,
    /// The inputs as they were given.
    pub inputs: Vec<TxInput>,
    /// The outputs as they were serialized.
    pub outputs: Vec<TxOutput>,
    /// Serialized transaction.
    pub hex: String,
}

impl SignedTx {
    /// Serialized size in bytes.
    pub fn size(&self) -> u64 {
        (self.hex.len() / 2) as u64
    }

    /// Transaction id (double hash, byte-reversed).
    pub fn id(&self) -> Result<String, TransactionError> {
        transaction::get_id(&self.hex)
    }

    /// Whether every input carries a signature.
    pub fn is_fully_signed(&self) -> bool {
        self.transaction.inputs.iter().all(TxInput::is_signed)
    }
}

/// Builds, signs, appraises and parses Dash transactions.
///
/// Holds no state besides the signer and configuration; every call works on
/// caller-owned values.
pub struct DashTx<S> {
    signer: S,
    config: DashTxConfig,
}

impl<S: TxSigner> DashTx<S> {
    /// Create with the default configuration.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, DashTxConfig::default())
    }

    pub fn with_config(signer: S, config: DashTxConfig) -> Self {
        DashTx { signer, config }
    }

    pub fn config(&self) -> &DashTxConfig {
        &self.config
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Assemble a transaction using the configured version, type and locktime.
    ///
    /// With no outputs, a zero-value memo output is added when
    /// `allow_donation` is set; otherwise this fails with `EmptyOutputs`.
    pub fn create(
        &self,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
    ) -> Result<Transaction, TransactionError> {
        let mut tx = Transaction {
            version: self.config.version,
            tx_type: self.config.tx_type,
            locktime: self.config.locktime,
            ..Transaction::with_parts(inputs, outputs)
        };
        if self.config.allow_donation {
            tx.donate_if_empty();
        }
        if tx.outputs.is_empty() {
            return Err(TransactionError::EmptyOutputs);
        }
        Ok(tx)
    }

    /// Copy of `tx` with every input reduced to its outpoint.
    pub fn create_raw(&self, tx: &Transaction) -> Transaction {
        tx.to_raw()
    }

    /// The zero-value empty memo output used for explicit donations.
    pub fn create_donation_output(&self) -> TxOutput {
        TxOutput::donation()
    }

    /// The restricted transaction hashed to sign `input_index`.
    pub fn create_hashable(
        &self,
        tx: &Transaction,
        input_index: usize,
        sig_hash_type: u32,
    ) -> Result<Transaction, TransactionError> {
        sighash::create_hashable(tx, input_index, sig_hash_type)
    }

    /// Serialize to hex; `Some(flags)` renders a signature preimage.
    pub fn serialize(
        &self,
        tx: &Transaction,
        sig_hash_type: Option<u32>,
    ) -> Result<String, TransactionError> {
        tx.serialize(sig_hash_type)
    }

    /// Signature hash for one input.
    pub fn hash_partial(
        &self,
        tx: &Transaction,
        input_index: usize,
        sig_hash_type: u32,
    ) -> Result<[u8; 32], TransactionError> {
        sighash::signature_hash(tx, input_index, sig_hash_type)
    }

    /// Transaction id of serialized hex.
    pub fn get_id(&self, tx_hex: &str) -> Result<String, TransactionError> {
        transaction::get_id(tx_hex)
    }

    pub fn appraise(&self, tx: &Transaction) -> Result<FeeEstimate, TransactionError> {
        fees::appraise(tx)
    }

    pub fn sort_inputs(&self, inputs: &mut [TxInput]) {
        sort::sort_inputs(inputs)
    }

    /// Sort outputs in deterministic order; see [`sort::compare_outputs`].
    pub fn sort_outputs(&self, outputs: &mut [TxOutput]) -> Result<(), TransactionError> {
        sort::sort_outputs(outputs)
    }

    pub fn parse_unknown(&self, tx_hex: &str) -> Result<ParsedTransaction, TransactionError> {
        parser::parse_unknown(tx_hex)
    }

    /// Replace address-only destinations with their public key hash.
    pub fn resolve_addresses(&self, outputs: &mut [TxOutput]) -> Result<(), TransactionError> {
        for output in outputs.iter_mut() {
            if let TxOutput::Value(value) = output {
                if let (None, None, Some(address)) = (&value.pub_key_hash, &value.script, &value.address) {
                    value.pub_key_hash = Some(self.signer.addr_to_pub_key_hash(address)?);
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------------

    /// Sign every input the signer has a key for.
    ///
    /// Inputs whose key lookup returns `None` stay unsigned.
    pub async fn hash_and_sign_all(&self, tx: &Transaction) -> Result<SignedTx, TransactionError> {
        self.sign_all_with(&self.signer, tx).await
    }

    /// Sign every input with the key at the same position in `keys`.
    pub async fn hash_and_sign_all_with_keys(
        &self,
        tx: &Transaction,
        keys: Vec<PrivateKey>,
    ) -> Result<SignedTx, TransactionError> {
        let keyed = KeyListSigner::new(
            &self.signer,
            keys.into_iter().map(Some).collect(),
            tx.inputs.len(),
        )?;
        self.sign_all_with(&keyed, tx).await
    }

    /// Sign a single input with the given key.
    pub async fn hash_and_sign_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        private_key: &[u8],
    ) -> Result<InputSigned, TransactionError> {
        sign_input_with(&self.signer, tx, input_index, private_key).await
    }

    async fn sign_all_with<T: TxSigner + ?Sized>(
        &self,
        signer: &T,
        tx: &Transaction,
    ) -> Result<SignedTx, TransactionError> {
        let mut prepared = tx.clone();
        self.resolve_addresses(&mut prepared.outputs)?;
        if prepared.outputs.is_empty() {
            return Err(TransactionError::EmptyOutputs);
        }
        self.check_order(&prepared)?;

        let mut signed_inputs = Vec::with_capacity(prepared.inputs.len());
        for (index, input) in prepared.inputs.iter().enumerate() {
            let key = signer.get_private_key(input, index, &prepared.inputs).await?;
            let Some(key) = key else {
                debug!(index, outpoint = ?input.outpoint(), "no key, leaving input unsigned");
                signed_inputs.push(input.clone());
                continue;
            };
            if key.is_empty() {
                return Err(TransactionError::SigningError(format!(
                    "get_private_key returned an empty key for inputs[{}]; return None to skip an input",
                    index
                )));
            }
            let signed = sign_input_with(signer, &prepared, index, &key).await?;
            debug!(index, outpoint = ?input.outpoint(), "signed input");
            signed_inputs.push(TxInput::Signed(signed));
        }

        let transaction = Transaction { inputs: signed_inputs, ..prepared.clone() };
        let hex = transaction.to_hex()?;
        Ok(SignedTx {
            transaction,
            inputs: tx.inputs.clone(),
            outputs: prepared.outputs,
            hex,
        })
    }

    fn check_order(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let inputs_ok = sort::inputs_sorted(&tx.inputs);
        let outputs_ok = match sort::outputs_sorted(&tx.outputs) {
            Ok(sorted) => sorted,
            Err(e) if self.config.sort_policy == SortPolicy::Require => return Err(e),
            Err(e) => {
                warn!(error = %e, "outputs cannot be ordered deterministically");
                true
            }
        };
        if inputs_ok && outputs_ok {
            return Ok(());
        }
        let what = match (inputs_ok, outputs_ok) {
            (false, false) => "inputs and outputs are",
            (false, true) => "inputs are",
            _ => "outputs are",
        };
        match self.config.sort_policy {
            SortPolicy::Require => Err(TransactionError::Unsorted(format!(
                "{} not in deterministic order; sort before signing",
                what
            ))),
            SortPolicy::Warn => {
                warn!("{} not in deterministic order; sort before signing", what);
                Ok(())
            }
        }
    }
}

/// Sign one sign-ready input of `tx`.
async fn sign_input_with<T: TxSigner + ?Sized>(
    signer: &T,
    tx: &Transaction,
    index: usize,
    private_key: &[u8],
) -> Result<InputSigned, TransactionError> {
    let input = match tx.inputs.get(index) {
        Some(TxInput::ForSig(input)) => input,
        _ => {
            return Err(TransactionError::InvalidTransaction(format!(
                "signable input must have either 'pubKeyHash' or 'script' (inputs[{}])",
                index
            )))
        }
    };

    let hash = sighash::signature_hash(tx, index, input.sig_hash_type)?;
    let signature = signer.sign(private_key, &hash).await?;
    if signature.is_empty() {
        return Err(TransactionError::SigningError(format!(
            "signer returned an empty signature for inputs[{}]",
            index
        )));
    }

    let public_key = match &input.public_key {
        Some(public_key) => public_key.clone(),
        None => match signer.get_public_key(&tx.inputs[index], index, &tx.inputs).await? {
            Some(public_key) => public_key,
            None => signer.to_public_key(private_key)?,
        },
    };

    Ok(InputSigned {
        outpoint: input.outpoint,
        signature,
        public_key,
        sig_hash_type: input.sig_hash_type,
    })
}

//! The injected key and signature collaborator.
//!
//! The SDK never touches elliptic-curve math or address encoding. A
//! [`TxSigner`] supplies private keys just in time, signs digests, derives
//! public keys, and decodes addresses.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::input::TxInput;
use crate::TransactionError;

/// Private key bytes, wiped from memory on drop.
pub type PrivateKey = Zeroizing<Vec<u8>>;

/// Key lookup and signing capabilities used by [`DashTx`](crate::DashTx).
///
/// Calls are awaited one at a time in input order.
#[async_trait]
pub trait TxSigner: Send + Sync {
    /// Look up the private key for an input.
    ///
    /// # Returns
    /// `Some(key)` to sign the input, `None` to leave it unsigned
    /// (partial signing). An error aborts signing.
    async fn get_private_key(
        &self,
        input: &TxInput,
        index: usize,
        inputs: &[TxInput],
    ) -> Result<Option<PrivateKey>, TransactionError>;

    /// Look up the public key for an input.
    ///
    /// Returning `None` falls back to [`to_public_key`](Self::to_public_key).
    async fn get_public_key(
        &self,
        _input: &TxInput,
        _index: usize,
        _inputs: &[TxInput],
    ) -> Result<Option<Vec<u8>>, TransactionError> {
        Ok(None)
    }

    /// Derive the serialized public key for a private key.
    fn to_public_key(&self, _private_key: &[u8]) -> Result<Vec<u8>, TransactionError> {
        Err(TransactionError::SigningError(
            "no public key: the input has none and the signer does not implement to_public_key"
                .to_string(),
        ))
    }

    /// Sign a 32-byte digest.
    ///
    /// # Returns
    /// The DER-encoded signature, without a SIGHASH byte.
    async fn sign(&self, private_key: &[u8], hash: &[u8; 32]) -> Result<Vec<u8>, TransactionError>;

    /// Decode an address into its 20-byte public key hash.
    fn addr_to_pub_key_hash(&self, address: &str) -> Result<[u8; 20], TransactionError> {
        Err(TransactionError::InvalidTransaction(format!(
            "cannot resolve address {:?}: the signer does not implement addr_to_pub_key_hash",
            address
        )))
    }

    /// Whether signing the same digest with the same key always yields the
    /// same signature (e.g. RFC6979 nonces). Re-signing such a signer cannot
    /// change the signature size.
    fn is_deterministic(&self) -> bool {
        false
    }
}

/// A signer that takes keys from a list matched to inputs by position.
///
/// All other capabilities are delegated to the wrapped signer.
pub struct KeyListSigner<'a, S: ?Sized> {
    inner: &'a S,
    keys: Vec<Option<PrivateKey>>,
}

impl<'a, S: TxSigner + ?Sized> KeyListSigner<'a, S> {
    /// Pair `keys` with the inputs of a transaction.
    ///
    /// # Returns
    /// The signer, or `KeyCountMismatch` if the counts differ.
    pub fn new(
        inner: &'a S,
        keys: Vec<Option<PrivateKey>>,
        input_count: usize,
    ) -> Result<Self, TransactionError> {
        if keys.len() != input_count {
            return Err(TransactionError::KeyCountMismatch { keys: keys.len(), inputs: input_count });
        }
        Ok(KeyListSigner { inner, keys })
    }
}

#[async_trait]
impl<'a, S: TxSigner + ?Sized> TxSigner for KeyListSigner<'a, S> {
    async fn get_private_key(
        &self,
        _input: &TxInput,
        index: usize,
        _inputs: &[TxInput],
    ) -> Result<Option<PrivateKey>, TransactionError> {
        Ok(self.keys.get(index).cloned().flatten())
    }

    async fn get_public_key(
        &self,
        input: &TxInput,
        index: usize,
        inputs: &[TxInput],
    ) -> Result<Option<Vec<u8>>, TransactionError> {
        self.inner.get_public_key(input, index, inputs).await
    }

    fn to_public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, TransactionError> {
        self.inner.to_public_key(private_key)
    }

    async fn sign(&self, private_key: &[u8], hash: &[u8; 32]) -> Result<Vec<u8>, TransactionError> {
        self.inner.sign(private_key, hash).await
    }

    fn addr_to_pub_key_hash(&self, address: &str) -> Result<[u8; 20], TransactionError> {
        self.inner.addr_to_pub_key_hash(address)
    }

    fn is_deterministic(&self) -> bool {
        self.inner.is_deterministic()
    }
}

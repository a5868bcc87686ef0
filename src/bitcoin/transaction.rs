use std::str::FromStr;

use bitcoin::blockdata::script::ScriptBuf;
use bitcoin::blockdata::transaction::{Transaction, TxIn, TxOut};
use bitcoin::blockdata::witness::Witness;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::{OutPoint, Sequence};
use bitcoin::{absolute, Address, AddressType, Amount, NetworkKind, Txid};
use bitcoin::{PrivateKey, PublicKey};

use super::fees::{FeeRateTier, FeeRates};
use super::network::{NetworkParams, SATS_PER_BTC};
use super::utxo::Utxo;
use crate::chain::ChainId;
use crate::config::WalletConfig;
use crate::error::WalletError;

/// Largest amount that can ever exist, in satoshis
const MAX_MONEY_SATS: u64 = 21_000_000 * SATS_PER_BTC;

/// One send, as handed down the pipeline
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub network: ChainId,
    pub sender_address: String,
    pub recipient_address: String,
    pub amount_major_units: f64,
    /// Filled in by the orchestrator before building
    pub utxos: Option<Vec<Utxo>>,
}

/// A signed transaction ready for broadcast
///
/// Not `Clone`: it is handed to the broadcaster by value and never rebuilt.
#[derive(Debug)]
pub struct BuiltTransaction {
    pub raw_hex: String,
    pub txid: String,
    pub fee_rate_used: u64,
    pub total_fee_sats: u64,
    /// Change returned to the sender, `None` when folded into the fee
    pub change_sats: Option<u64>,
}

/// Convert a BTC amount to satoshis, rounding to the nearest satoshi
pub fn btc_to_sats(amount_btc: f64) -> Result<u64, WalletError> {
    if !amount_btc.is_finite() || amount_btc < 0.0 {
        return Err(WalletError::InvalidAmount(format!("{}", amount_btc)));
    }

    let sats = (amount_btc * SATS_PER_BTC as f64).round();
    if sats > MAX_MONEY_SATS as f64 {
        return Err(WalletError::InvalidAmount(format!(
            "{} BTC exceeds the 21M supply",
            amount_btc
        )));
    }
    if sats < 1.0 {
        return Err(WalletError::InvalidAmount(format!(
            "{} BTC is less than one satoshi",
            amount_btc
        )));
    }

    Ok(sats as u64)
}

/// `max(rate, 1) * size`, floored to the network minimum
pub fn estimate_fee(fee_rate_sat_vb: u64, params: &NetworkParams) -> u64 {
    fee_rate_sat_vb
        .max(1)
        .saturating_mul(params.size_estimate_vbytes)
        .max(params.min_fee_sats)
}

/// Decode a WIF private key for `params.network`
///
/// A key encoded for the other network is re-tagged when `allow_fallback`
/// is set, and rejected otherwise. Either way the mismatch is logged.
pub fn decode_wif(
    wif: &str,
    params: &NetworkParams,
    allow_fallback: bool,
) -> Result<PrivateKey, WalletError> {
    let key = PrivateKey::from_wif(wif.trim())
        .map_err(|e| WalletError::KeyDecode(format!("Invalid WIF: {}", e)))?;

    let expected = NetworkKind::from(params.network);
    if key.network == expected {
        return Ok(key);
    }

    if !allow_fallback {
        return Err(WalletError::KeyDecode(format!(
            "WIF is encoded for {:?}, expected {:?} (network fallback disabled)",
            params.alternate(),
            params.network
        )));
    }

    log::warn!(
        "WIF is encoded for {:?}; accepting it for {:?}. Set ALLOW_KEY_NETWORK_FALLBACK=false to refuse such keys",
        params.alternate(),
        params.network
    );

    Ok(PrivateKey {
        compressed: key.compressed,
        network: expected,
        inner: key.inner,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SigningMode {
    P2wpkh,
    P2pkh,
}

pub struct TransactionBuilder {
    params: NetworkParams,
    allow_key_network_fallback: bool,
    secp: Secp256k1<All>,
}

impl TransactionBuilder {
    /// Create a new transaction builder for the configured network
    pub fn new(config: &WalletConfig) -> Self {
        Self::with_params(
            NetworkParams::for_network(config.bitcoin_network),
            config.allow_key_network_fallback,
        )
    }

    pub fn with_params(params: NetworkParams, allow_key_network_fallback: bool) -> Self {
        Self {
            params,
            allow_key_network_fallback,
            secp: Secp256k1::new(),
        }
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Build and sign a transaction spending every UTXO in the request
    ///
    /// `fees` falls back to the network's default table when `None`. Nothing
    /// is signed unless the inputs cover amount plus fee.
    pub fn build(
        &self,
        request: &TransactionRequest,
        private_key_wif: &str,
        public_key_hex: &str,
        tier: FeeRateTier,
        fees: Option<&FeeRates>,
    ) -> Result<BuiltTransaction, WalletError> {
        if request.network.bitcoin_network() != Some(self.params.network) {
            return Err(WalletError::UnsupportedChain(request.network));
        }

        let utxos = request.utxos.as_deref().unwrap_or_default();
        validate_utxos(utxos)?;

        let private_key = decode_wif(
            private_key_wif,
            &self.params,
            self.allow_key_network_fallback,
        )?;
        let public_key = self.check_public_key(&private_key, public_key_hex)?;

        let sender = self.parse_address(&request.sender_address)?;
        let recipient = self.parse_address(&request.recipient_address)?;
        let mode = signing_mode(&sender, &public_key)?;

        let mut inputs = Vec::with_capacity(utxos.len());
        let mut total_input_sats = 0u64;
        for utxo in utxos {
            let txid = Txid::from_str(&utxo.txid).map_err(|e| {
                WalletError::InvalidUtxoSet(format!("Invalid txid {}: {}", utxo.txid, e))
            })?;
            inputs.push(TxIn {
                previous_output: OutPoint {
                    txid,
                    vout: utxo.vout,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            });
            total_input_sats = total_input_sats
                .checked_add(utxo.value_sats)
                .ok_or_else(|| WalletError::InvalidUtxoSet("Input total overflows".into()))?;
        }

        let fee_rate = fees
            .unwrap_or(&self.params.default_fees)
            .rate_for(tier);
        let estimated_fee = estimate_fee(fee_rate, &self.params);

        let amount_sats = btc_to_sats(request.amount_major_units)?;
        let total_required = amount_sats
            .checked_add(estimated_fee)
            .ok_or_else(|| WalletError::InvalidAmount("Amount plus fee overflows".into()))?;

        if total_input_sats < total_required {
            return Err(WalletError::InsufficientFunds {
                required: total_required,
                available: total_input_sats,
            });
        }

        let mut outputs = vec![TxOut {
            value: Amount::from_sat(amount_sats),
            script_pubkey: recipient.script_pubkey(),
        }];

        let change = total_input_sats - total_required;
        let change_sats = if change > self.params.dust_threshold_sats {
            outputs.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: sender.script_pubkey(),
            });
            Some(change)
        } else {
            if change > 0 {
                log::debug!(
                    "Change of {} sats is at or below dust ({}), leaving it to the miner",
                    change,
                    self.params.dust_threshold_sats
                );
            }
            None
        };

        let unsigned = Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: inputs,
            output: outputs,
        };

        let signed = self.sign_transaction(
            unsigned,
            utxos,
            &sender.script_pubkey(),
            mode,
            &private_key,
            &public_key,
        )?;

        log::debug!(
            "Built {} ({} inputs, {} outputs, fee {} sats at {} sat/vB)",
            signed.compute_txid(),
            signed.input.len(),
            signed.output.len(),
            estimated_fee,
            fee_rate
        );

        Ok(BuiltTransaction {
            raw_hex: bitcoin::consensus::encode::serialize_hex(&signed),
            txid: signed.compute_txid().to_string(),
            fee_rate_used: fee_rate,
            total_fee_sats: estimated_fee,
            change_sats,
        })
    }

    fn check_public_key(
        &self,
        private_key: &PrivateKey,
        public_key_hex: &str,
    ) -> Result<PublicKey, WalletError> {
        let derived = PublicKey::from_private_key(&self.secp, private_key);
        let supplied = PublicKey::from_str(public_key_hex.trim())
            .map_err(|e| WalletError::KeyDecode(format!("Invalid public key: {}", e)))?;

        if derived != supplied {
            return Err(WalletError::KeyDecode(
                "Public key does not match the private key".into(),
            ));
        }
        Ok(derived)
    }

    fn parse_address(&self, address: &str) -> Result<Address, WalletError> {
        Address::from_str(address.trim())
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?
            .require_network(self.params.network)
            .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))
    }

    /// Sign every input with the one sender key
    fn sign_transaction(
        &self,
        mut tx: Transaction,
        utxos: &[Utxo],
        script_pubkey: &ScriptBuf,
        mode: SigningMode,
        private_key: &PrivateKey,
        public_key: &PublicKey,
    ) -> Result<Transaction, WalletError> {
        let mut signatures = Vec::with_capacity(tx.input.len());

        {
            let mut sighash_cache = SighashCache::new(&tx);

            for (input_index, utxo) in utxos.iter().enumerate() {
                let digest = match mode {
                    SigningMode::P2wpkh => sighash_cache
                        .p2wpkh_signature_hash(
                            input_index,
                            script_pubkey,
                            Amount::from_sat(utxo.value_sats),
                            EcdsaSighashType::All,
                        )
                        .map_err(|e| WalletError::KeyDecode(e.to_string()))?
                        .to_byte_array(),
                    SigningMode::P2pkh => sighash_cache
                        .legacy_signature_hash(
                            input_index,
                            script_pubkey,
                            EcdsaSighashType::All.to_u32(),
                        )
                        .map_err(|e| WalletError::KeyDecode(e.to_string()))?
                        .to_byte_array(),
                };

                let message = Message::from_digest(digest);
                let signature = self.secp.sign_ecdsa(&message, &private_key.inner);

                let mut sig_with_hashtype = signature.serialize_der().to_vec();
                sig_with_hashtype.push(EcdsaSighashType::All.to_u32() as u8);
                signatures.push(sig_with_hashtype);
            }
        }

        for (input, sig) in tx.input.iter_mut().zip(signatures) {
            match mode {
                SigningMode::P2wpkh => {
                    input.witness.push(sig);
                    input.witness.push(public_key.to_bytes());
                }
                SigningMode::P2pkh => {
                    let sig = PushBytesBuf::try_from(sig)
                        .map_err(|e| WalletError::KeyDecode(e.to_string()))?;
                    input.script_sig = Builder::new()
                        .push_slice(sig)
                        .push_key(public_key)
                        .into_script();
                }
            }
        }

        Ok(tx)
    }
}

fn validate_utxos(utxos: &[Utxo]) -> Result<(), WalletError> {
    if utxos.is_empty() {
        return Err(WalletError::InvalidUtxoSet("No UTXOs to spend".into()));
    }
    if let Some(utxo) = utxos.iter().find(|u| u.value_sats == 0) {
        return Err(WalletError::InvalidUtxoSet(format!(
            "UTXO {} has no value",
            utxo.outpoint()
        )));
    }
    Ok(())
}

/// The sender address must be a P2WPKH or P2PKH address of the signing key
fn signing_mode(sender: &Address, public_key: &PublicKey) -> Result<SigningMode, WalletError> {
    let mode = match sender.address_type() {
        Some(AddressType::P2wpkh) => SigningMode::P2wpkh,
        Some(AddressType::P2pkh) => SigningMode::P2pkh,
        other => {
            return Err(WalletError::InvalidAddress(format!(
                "Sender {} has unsupported type {:?}, expected P2WPKH or P2PKH",
                sender, other
            )))
        }
    };

    if !sender.is_related_to_pubkey(public_key) {
        return Err(WalletError::KeyDecode(format!(
            "Key does not control sender address {}",
            sender
        )));
    }

    Ok(mode)
}

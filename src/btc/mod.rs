//! Bitcoin input classification
//!
//! Decides whether a transaction input is spent as legacy (full weight) or as
//! native/wrapped segwit (witness discount), which drives fee-weight
//! accounting for swap transactions.

pub mod script;

use ::bitcoin::psbt::Psbt;
use ::bitcoin::{Script, ScriptBuf};
use serde::{Deserialize, Serialize};

pub use script::{decode_push, decode_pushes, PushOperand, ScriptDecodeError};

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Standard output script templates recognised by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Unknown,
}

impl OutputType {
    pub fn of(script: &Script) -> Self {
        if script.is_p2tr() {
            OutputType::P2tr
        } else if script.is_p2wsh() {
            OutputType::P2wsh
        } else if script.is_p2wpkh() {
            OutputType::P2wpkh
        } else if script.is_p2sh() {
            OutputType::P2sh
        } else if script.is_p2pkh() {
            OutputType::P2pkh
        } else {
            OutputType::Unknown
        }
    }

    pub fn is_native_segwit(self) -> bool {
        matches!(self, OutputType::P2wpkh | OutputType::P2wsh | OutputType::P2tr)
    }
}

/// Spend-type tag carried by wallet UTXOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UtxoType {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
    P2wsh,
    P2tr,
}

/// Unspent output owned by an on-chain wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinUtxo {
    pub address: String,
    #[serde(rename = "type")]
    pub utxo_type: UtxoType,
    pub confirmations: u32,
    pub output_script: ScriptBuf,
    pub value: u64,
    pub tx_id: String,
    pub vout: u32,
}

impl BitcoinUtxo {
    /// Spending this UTXO pays full (non-witness) weight for its input.
    pub fn is_legacy(&self) -> bool {
        self.utxo_type == UtxoType::P2pkh
    }
}

// ============================================================================
// INPUT CLASSIFICATION
// ============================================================================

/// The parts of a transaction input the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitcoinInput {
    /// Script of the output being spent
    pub previous_output_script: ScriptBuf,
    /// Redeem script, when the spender supplied it explicitly
    pub redeem_script: Option<ScriptBuf>,
    /// Finalized scriptSig, if the input is already signed
    pub final_script_sig: Option<ScriptBuf>,
}

impl BitcoinInput {
    pub fn new(previous_output_script: ScriptBuf) -> Self {
        Self {
            previous_output_script,
            ..Default::default()
        }
    }

    /// Builds a classifier input from PSBT input `index`.
    ///
    /// The previous output script comes from the witness UTXO, or from the
    /// non-witness UTXO at the spent vout.
    pub fn from_psbt(psbt: &Psbt, index: usize) -> anyhow::Result<Self> {
        let input = psbt
            .inputs
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("PSBT has no input {}", index))?;

        let previous_output_script = if let Some(utxo) = &input.witness_utxo {
            utxo.script_pubkey.clone()
        } else if let Some(tx) = &input.non_witness_utxo {
            let txin = psbt
                .unsigned_tx
                .input
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("Unsigned tx has no input {}", index))?;
            let vout = txin.previous_output.vout as usize;
            tx.output
                .get(vout)
                .ok_or_else(|| anyhow::anyhow!("Previous tx has no output {}", vout))?
                .script_pubkey
                .clone()
        } else {
            anyhow::bail!("PSBT input {} carries no previous output", index);
        };

        Ok(Self {
            previous_output_script,
            redeem_script: input.redeem_script.clone(),
            final_script_sig: input.final_script_sig.clone(),
        })
    }
}

/// Returns whether `input` is spent without the segwit discount.
///
/// Native segwit outputs (p2wpkh, p2wsh, p2tr) are never legacy. A p2sh
/// output is wrapped segwit, and therefore not legacy, when its redeem script
/// is p2wpkh or p2wsh. Everything else is legacy.
///
/// # Returns
///
/// * `Ok(bool)` - Classification result
/// * `Err(ScriptDecodeError)` - The scriptSig could not be decoded as pushes
pub fn is_legacy_input(input: &BitcoinInput) -> Result<bool, ScriptDecodeError> {
    let output_type = OutputType::of(&input.previous_output_script);
    if output_type.is_native_segwit() {
        return Ok(false);
    }
    if output_type != OutputType::P2sh {
        return Ok(true);
    }

    let redeem_script = match (&input.redeem_script, &input.final_script_sig) {
        (Some(redeem), _) => Some(redeem.clone()),
        (None, Some(script_sig)) => redeem_script_from_script_sig(script_sig)?,
        (None, None) => None,
    };

    Ok(match redeem_script {
        Some(redeem) => {
            let redeem_type = OutputType::of(&redeem);
            !matches!(redeem_type, OutputType::P2wpkh | OutputType::P2wsh)
        }
        None => true,
    })
}

/// Recovers the redeem script from a p2sh scriptSig: its final push operand.
fn redeem_script_from_script_sig(script_sig: &Script) -> Result<Option<ScriptBuf>, ScriptDecodeError> {
    let operands = decode_pushes(script_sig.as_bytes())?;
    Ok(operands
        .last()
        .and_then(PushOperand::as_data)
        .map(|data| ScriptBuf::from_bytes(data.to_vec())))
}

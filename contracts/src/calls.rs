//!
//! Typed argument lists of every contract `unlock` method. Each call pushes
//! its arguments in the exact order and width the compiled template expects.
//!

use crate::proof::{TxInputProof, TxOutputProof};
use sensible_consensus_core::{
    hashing::{BytesWriter, HasherExtensions, tx::output_serialized_size},
    tx::TransactionOutput,
};
use sensible_hashes::Hash160;
use sensible_txscript::script_builder::{ScriptBuilder, ScriptBuilderResult};

/// Operation selector of the token contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOperation {
    Transfer = 1,
    UnlockFromContract = 2,
}

/// An `unlock` invocation of a contract.
pub trait ContractCall {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()>;

    fn to_unlocking_script(&self) -> ScriptBuilderResult<Vec<u8>> {
        let mut builder = ScriptBuilder::new();
        self.push_args(&mut builder)?;
        Ok(builder.drain())
    }
}

fn push_input_proof(builder: &mut ScriptBuilder, proof: &TxInputProof) -> ScriptBuilderResult<()> {
    builder.add_data(&proof.hash_proof)?.add_data(&proof.prev_tx_hash)?.add_data(&proof.output_index_bytes)?.add_data(&proof.sequence_bytes)?;
    Ok(())
}

fn push_output_proof(builder: &mut ScriptBuilder, proof: &TxOutputProof) -> ScriptBuilderResult<()> {
    builder.add_data(&proof.tx_header)?.add_data(&proof.hash_proof)?.add_data(&proof.satoshi_bytes)?.add_data(&proof.script_hash)?;
    Ok(())
}

/// Concatenates variable sized elements, each prefixed by its 4 byte length.
pub fn length_prefixed<I, T>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut bytes = Vec::new();
    for item in items {
        let item = item.as_ref();
        bytes.extend_from_slice(&(item.len() as u32).to_le_bytes());
        bytes.extend_from_slice(item);
    }
    bytes
}

/// Concatenates serialized outputs the way unlock-check contracts expect them.
pub fn other_outputs_array(outputs: &[TransactionOutput]) -> Vec<u8> {
    let mut writer = BytesWriter::default();
    for output in outputs {
        writer
            .write_u32(output_serialized_size(output) as u32)
            .write_u64(output.value)
            .write_var_bytes(output.script_public_key.script());
    }
    writer.into_bytes()
}

/// Issues new supply from a genesis contract.
#[derive(Debug, Clone, Default)]
pub struct FtGenesisUnlock {
    pub preimage: Vec<u8>,
    pub pub_key: Vec<u8>,
    pub sig: Vec<u8>,
    pub token_script: Vec<u8>,
    pub genesis_tx_header: Vec<u8>,
    pub prev_input_index: u32,
    pub genesis_tx_input_proof: TxInputProof,
    pub prev_genesis_tx_output_proof: TxOutputProof,
    pub genesis_satoshis: u64,
    pub token_satoshis: u64,
    pub change_address: Hash160,
    pub change_satoshis: u64,
    pub op_return_script: Vec<u8>,
}

impl ContractCall for FtGenesisUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.pub_key)?
            .add_data(&self.sig)?
            .add_data(&self.token_script)?
            .add_data(&self.genesis_tx_header)?
            .add_num(self.prev_input_index as i128)?;
        push_input_proof(builder, &self.genesis_tx_input_proof)?;
        push_output_proof(builder, &self.prev_genesis_tx_output_proof)?;
        builder
            .add_num(self.genesis_satoshis as i128)?
            .add_num(self.token_satoshis as i128)?
            .add_data(self.change_address.as_ref())?
            .add_num(self.change_satoshis as i128)?
            .add_data(&self.op_return_script)?;
        Ok(())
    }
}

/// Spends a token output, either as part of a checked transfer or to be
/// released by an unlock-check contract.
#[derive(Debug, Clone)]
pub struct FtTokenUnlock {
    pub preimage: Vec<u8>,
    pub prevouts: Vec<u8>,
    pub prev_token_input_index: u32,
    pub prev_token_address: Hash160,
    pub prev_token_amount: u64,
    pub token_tx_header: Vec<u8>,
    pub token_tx_input_proof: TxInputProof,
    pub prev_token_tx_output_proof: TxOutputProof,
    pub sender_pub_key: Vec<u8>,
    pub sender_sig: Vec<u8>,
    pub contract_input_index: u32,
    pub contract_tx_output_proof: TxOutputProof,
    pub operation: TokenOperation,
}

impl ContractCall for FtTokenUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.prevouts)?
            .add_num(self.prev_token_input_index as i128)?
            .add_data(self.prev_token_address.as_ref())?
            .add_num(self.prev_token_amount as i128)?
            .add_data(&self.token_tx_header)?;
        push_input_proof(builder, &self.token_tx_input_proof)?;
        push_output_proof(builder, &self.prev_token_tx_output_proof)?;
        builder.add_data(&self.sender_pub_key)?.add_data(&self.sender_sig)?.add_num(self.contract_input_index as i128)?;
        push_output_proof(builder, &self.contract_tx_output_proof)?;
        builder.add_num(self.operation as i128)?;
        Ok(())
    }
}

/// Per token input data the check contracts re-verify.
#[derive(Debug, Clone, Default)]
pub struct TokenInputArrays {
    /// Transaction headers, concatenated.
    pub tx_headers: Vec<u8>,
    /// Output hash proofs, length prefixed.
    pub tx_hash_proofs: Vec<u8>,
    /// 8 byte satoshi values, concatenated.
    pub satoshi_bytes: Vec<u8>,
    /// 20 byte owner addresses, concatenated.
    pub addresses: Vec<u8>,
    /// 8 byte token amounts, concatenated.
    pub amounts: Vec<u8>,
}

impl TokenInputArrays {
    /// Appends one token input given the proof of the output it spends.
    pub fn push(&mut self, proof: &TxOutputProof, address: &Hash160, amount: u64) {
        self.tx_headers.extend_from_slice(&proof.tx_header);
        self.tx_hash_proofs.extend(length_prefixed([&proof.hash_proof]));
        self.satoshi_bytes.extend_from_slice(&proof.satoshi_bytes);
        self.addresses.extend_from_slice(address.as_ref());
        self.amounts.extend_from_slice(&amount.to_le_bytes());
    }

    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.tx_headers)?
            .add_data(&self.tx_hash_proofs)?
            .add_data(&self.satoshi_bytes)?
            .add_data(&self.addresses)?
            .add_data(&self.amounts)?;
        Ok(())
    }
}

/// Verifies token conservation of a transfer.
#[derive(Debug, Clone, Default)]
pub struct FtTransferCheckUnlock {
    pub preimage: Vec<u8>,
    pub prevouts: Vec<u8>,
    pub token_script: Vec<u8>,
    pub token_inputs: TokenInputArrays,
    /// 8 byte satoshi values of the token outputs, concatenated.
    pub receiver_satoshi_array: Vec<u8>,
    pub change_satoshis: u64,
    pub change_address: Hash160,
    pub op_return_script: Vec<u8>,
}

impl ContractCall for FtTransferCheckUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder.add_data(&self.preimage)?.add_data(&self.prevouts)?.add_data(&self.token_script)?;
        self.token_inputs.push_args(builder)?;
        builder
            .add_data(&self.receiver_satoshi_array)?
            .add_num(self.change_satoshis as i128)?
            .add_data(self.change_address.as_ref())?
            .add_data(&self.op_return_script)?;
        Ok(())
    }
}

/// Releases token inputs from the token contract, used for burns.
#[derive(Debug, Clone, Default)]
pub struct FtUnlockCheckUnlock {
    pub preimage: Vec<u8>,
    pub prevouts: Vec<u8>,
    pub token_script: Vec<u8>,
    /// 4 byte input indexes, concatenated.
    pub token_input_index_array: Vec<u8>,
    pub token_inputs: TokenInputArrays,
    pub n_outputs: u32,
    /// 4 byte output indexes, concatenated.
    pub token_output_index_array: Vec<u8>,
    pub token_output_satoshi_array: Vec<u8>,
    pub other_output_array: Vec<u8>,
}

impl ContractCall for FtUnlockCheckUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.prevouts)?
            .add_data(&self.token_script)?
            .add_data(&self.token_input_index_array)?;
        self.token_inputs.push_args(builder)?;
        builder
            .add_num(self.n_outputs as i128)?
            .add_data(&self.token_output_index_array)?
            .add_data(&self.token_output_satoshi_array)?
            .add_data(&self.other_output_array)?;
        Ok(())
    }
}

/// Issues the next NFT of a genesis contract.
#[derive(Debug, Clone, Default)]
pub struct NftGenesisUnlock {
    pub preimage: Vec<u8>,
    pub pub_key: Vec<u8>,
    pub sig: Vec<u8>,
    pub nft_script: Vec<u8>,
    pub genesis_tx_header: Vec<u8>,
    pub prev_input_index: u32,
    pub genesis_tx_input_proof: TxInputProof,
    pub prev_genesis_tx_output_proof: TxOutputProof,
    pub genesis_satoshis: u64,
    pub nft_satoshis: u64,
    pub change_address: Hash160,
    pub change_satoshis: u64,
    pub op_return_script: Vec<u8>,
}

impl ContractCall for NftGenesisUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.pub_key)?
            .add_data(&self.sig)?
            .add_data(&self.nft_script)?
            .add_data(&self.genesis_tx_header)?
            .add_num(self.prev_input_index as i128)?;
        push_input_proof(builder, &self.genesis_tx_input_proof)?;
        push_output_proof(builder, &self.prev_genesis_tx_output_proof)?;
        builder
            .add_num(self.genesis_satoshis as i128)?
            .add_num(self.nft_satoshis as i128)?
            .add_data(self.change_address.as_ref())?
            .add_num(self.change_satoshis as i128)?
            .add_data(&self.op_return_script)?;
        Ok(())
    }
}

/// Spends an NFT output: a direct transfer or a release through the
/// unlock-check contract.
#[derive(Debug, Clone)]
pub struct NftTokenUnlock {
    pub preimage: Vec<u8>,
    pub prevouts: Vec<u8>,
    pub prev_nft_input_index: u32,
    pub prev_nft_address: Hash160,
    pub nft_tx_header: Vec<u8>,
    pub nft_tx_input_proof: TxInputProof,
    pub prev_nft_tx_output_proof: TxOutputProof,
    pub sender_pub_key: Vec<u8>,
    pub sender_sig: Vec<u8>,
    pub receiver_address: Hash160,
    pub nft_output_satoshis: u64,
    pub op_return_script: Vec<u8>,
    pub change_address: Hash160,
    pub change_satoshis: u64,
    pub contract_input_index: u32,
    pub contract_tx_output_proof: TxOutputProof,
    pub operation: TokenOperation,
}

impl ContractCall for NftTokenUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.prevouts)?
            .add_num(self.prev_nft_input_index as i128)?
            .add_data(self.prev_nft_address.as_ref())?
            .add_data(&self.nft_tx_header)?;
        push_input_proof(builder, &self.nft_tx_input_proof)?;
        push_output_proof(builder, &self.prev_nft_tx_output_proof)?;
        builder
            .add_data(&self.sender_pub_key)?
            .add_data(&self.sender_sig)?
            .add_data(self.receiver_address.as_ref())?
            .add_num(self.nft_output_satoshis as i128)?
            .add_data(&self.op_return_script)?
            .add_data(self.change_address.as_ref())?
            .add_num(self.change_satoshis as i128)?
            .add_num(self.contract_input_index as i128)?;
        push_output_proof(builder, &self.contract_tx_output_proof)?;
        builder.add_num(self.operation as i128)?;
        Ok(())
    }
}

/// Releases an NFT input, `nft_output_index == -1` burns it.
#[derive(Debug, Clone, Default)]
pub struct NftUnlockCheckUnlock {
    pub preimage: Vec<u8>,
    pub prevouts: Vec<u8>,
    pub nft_input_index: u32,
    pub nft_script: Vec<u8>,
    pub nft_tx_header: Vec<u8>,
    pub nft_tx_hash_proof: Vec<u8>,
    pub nft_tx_satoshi_bytes: Vec<u8>,
    pub n_outputs: u32,
    pub nft_output_index: i64,
    pub nft_output_address: Hash160,
    pub nft_output_satoshis: u64,
    pub other_output_array: Vec<u8>,
}

impl ContractCall for NftUnlockCheckUnlock {
    fn push_args(&self, builder: &mut ScriptBuilder) -> ScriptBuilderResult<()> {
        builder
            .add_data(&self.preimage)?
            .add_data(&self.prevouts)?
            .add_num(self.nft_input_index as i128)?
            .add_data(&self.nft_script)?
            .add_data(&self.nft_tx_header)?
            .add_data(&self.nft_tx_hash_proof)?
            .add_data(&self.nft_tx_satoshi_bytes)?
            .add_num(self.n_outputs as i128)?
            .add_i64(self.nft_output_index)?
            .add_data(self.nft_output_address.as_ref())?
            .add_num(self.nft_output_satoshis as i128)?
            .add_data(&self.other_output_array)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensible_consensus_core::tx::ScriptPublicKey;
    use sensible_txscript::opcodes::codes::{Op0, Op1, Op1Negate, Op2, Op3, OpData20, OpPushData1};

    #[test]
    fn test_nft_unlock_check_burn_args() {
        let call = NftUnlockCheckUnlock {
            preimage: vec![0xaa; 3],
            nft_input_index: 2,
            nft_output_index: -1,
            n_outputs: 1,
            ..Default::default()
        };
        let script = call.to_unlocking_script().unwrap();
        let mut expected = vec![0x03, 0xaa, 0xaa, 0xaa, Op0, Op2, Op0, Op0, Op0, Op0, Op1, Op1Negate, OpData20];
        expected.extend([0; 20]);
        expected.extend([Op0, Op0]);
        assert_eq!(script, expected);
    }

    #[test]
    fn test_token_unlock_args_order() {
        let proof = TxOutputProof { tx_header: vec![0x11; 112], hash_proof: vec![0x22; 80], satoshi_bytes: vec![0x33; 8], script_hash: vec![0x44; 32] };
        let call = FtTokenUnlock {
            preimage: vec![0x01; 200],
            prevouts: vec![0x02; 80],
            prev_token_input_index: 0,
            prev_token_address: Hash160::from_bytes([0x05; 20]),
            prev_token_amount: 1000,
            token_tx_header: proof.tx_header.clone(),
            token_tx_input_proof: TxInputProof::empty(),
            prev_token_tx_output_proof: TxOutputProof::empty(),
            sender_pub_key: vec![0x02; 33],
            sender_sig: vec![0x30; 72],
            contract_input_index: 3,
            contract_tx_output_proof: proof,
            operation: TokenOperation::Transfer,
        };
        let script = call.to_unlocking_script().unwrap();

        assert_eq!(&script[..2], &[OpPushData1, 200]);
        assert_eq!(&script[202..204], &[OpPushData1, 80]);
        assert_eq!(&script[284..286], &[Op0, OpData20]);
        assert_eq!(&script[306..309], &[0x02, 0xe8, 0x03]);
        // empty input and output proofs push eight empty elements
        assert_eq!(&script[423..431], &[Op0; 8]);
        assert_eq!(script[538], Op3);
        assert_eq!(*script.last().unwrap(), Op1);
        assert_eq!(script.len(), 778);
    }

    #[test]
    fn test_token_input_arrays() {
        let proof = TxOutputProof { tx_header: vec![1; 112], hash_proof: vec![2; 40], satoshi_bytes: vec![3; 8], script_hash: vec![4; 32] };
        let mut arrays = TokenInputArrays::default();
        arrays.push(&proof, &Hash160::from_bytes([5; 20]), 7);
        arrays.push(&proof, &Hash160::from_bytes([6; 20]), 8);
        assert_eq!(arrays.tx_headers.len(), 224);
        assert_eq!(arrays.tx_hash_proofs.len(), 88);
        assert_eq!(&arrays.tx_hash_proofs[..4], &[40, 0, 0, 0]);
        assert_eq!(arrays.addresses.len(), 40);
        assert_eq!(&arrays.amounts[8..], &8u64.to_le_bytes());
    }

    #[test]
    fn test_other_outputs_array() {
        let outputs = vec![TransactionOutput::new(546, ScriptPublicKey::new(vec![0x51; 3]))];
        let bytes = other_outputs_array(&outputs);
        let mut expected = vec![12, 0, 0, 0];
        expected.extend(546u64.to_le_bytes());
        expected.extend([3, 0x51, 0x51, 0x51]);
        assert_eq!(bytes, expected);
        assert_eq!(length_prefixed([[0xab; 2]]), vec![2, 0, 0, 0, 0xab, 0xab]);
    }
}

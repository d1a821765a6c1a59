/// First value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MIN_VAL: u8 = 1;
/// Last value in the range formed by the "small integer" Op# opcodes
pub const OP_SMALL_INT_MAX_VAL: u8 = 16;
/// First value in the range formed by OpData# opcodes (where opcode == value)
pub const OP_DATA_MIN_VAL: u8 = self::codes::OpData1;
/// Last value in the range formed by OpData# opcodes (where opcode == value)
pub const OP_DATA_MAX_VAL: u8 = self::codes::OpData75;
/// Minus 1 value
pub const OP_1_NEGATE_VAL: u8 = 0x81;

/// Opcode values used by the builders in this workspace. Contract code parts
/// are opaque byte blobs, so only the push and standard-script opcodes are
/// named here.
#[allow(non_upper_case_globals)]
pub mod codes {
    pub const OpFalse: u8 = 0x00;
    pub const Op0: u8 = 0x00;
    pub const OpData1: u8 = 0x01;
    pub const OpData2: u8 = 0x02;
    pub const OpData3: u8 = 0x03;
    pub const OpData4: u8 = 0x04;
    pub const OpData8: u8 = 0x08;
    pub const OpData17: u8 = 0x11;
    pub const OpData20: u8 = 0x14;
    pub const OpData32: u8 = 0x20;
    pub const OpData33: u8 = 0x21;
    pub const OpData36: u8 = 0x24;
    pub const OpData75: u8 = 0x4b;
    pub const OpPushData1: u8 = 0x4c;
    pub const OpPushData2: u8 = 0x4d;
    pub const OpPushData4: u8 = 0x4e;
    pub const Op1Negate: u8 = 0x4f;
    pub const OpTrue: u8 = 0x51;
    pub const Op1: u8 = 0x51;
    pub const Op2: u8 = 0x52;
    pub const Op3: u8 = 0x53;
    pub const Op4: u8 = 0x54;
    pub const Op5: u8 = 0x55;
    pub const Op6: u8 = 0x56;
    pub const Op7: u8 = 0x57;
    pub const Op8: u8 = 0x58;
    pub const Op9: u8 = 0x59;
    pub const Op10: u8 = 0x5a;
    pub const Op11: u8 = 0x5b;
    pub const Op12: u8 = 0x5c;
    pub const Op13: u8 = 0x5d;
    pub const Op14: u8 = 0x5e;
    pub const Op15: u8 = 0x5f;
    pub const Op16: u8 = 0x60;
    pub const OpNop: u8 = 0x61;
    pub const OpIf: u8 = 0x63;
    pub const OpElse: u8 = 0x67;
    pub const OpEndIf: u8 = 0x68;
    pub const OpVerify: u8 = 0x69;
    pub const OpReturn: u8 = 0x6a;
    pub const OpToAltStack: u8 = 0x6b;
    pub const OpFromAltStack: u8 = 0x6c;
    pub const OpDrop: u8 = 0x75;
    pub const OpDup: u8 = 0x76;
    pub const OpSwap: u8 = 0x7c;
    pub const OpCat: u8 = 0x7e;
    pub const OpSplit: u8 = 0x7f;
    pub const OpSize: u8 = 0x82;
    pub const OpEqual: u8 = 0x87;
    pub const OpEqualVerify: u8 = 0x88;
    pub const OpSha256: u8 = 0xa8;
    pub const OpHash160: u8 = 0xa9;
    pub const OpHash256: u8 = 0xaa;
    pub const OpCheckSig: u8 = 0xac;
    pub const OpCheckSigVerify: u8 = 0xad;
}

/// Returns the value pushed by a small-int opcode (`Op0`, `Op1`..`Op16`).
pub fn to_small_int(opcode: u8) -> Option<u8> {
    match opcode {
        codes::Op0 => Some(0),
        codes::Op1..=codes::Op16 => Some(opcode - (codes::Op1 - 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_int() {
        assert_eq!(to_small_int(codes::Op0), Some(0));
        assert_eq!(to_small_int(codes::Op1), Some(1));
        assert_eq!(to_small_int(codes::Op16), Some(16));
        assert_eq!(to_small_int(codes::OpNop), None);
        assert_eq!(to_small_int(codes::OpData1), None);
    }
}

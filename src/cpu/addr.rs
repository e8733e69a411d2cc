use std::fmt;

/// An addressing mode together with the operand bytes that followed the opcode.
#[derive(Debug, PartialEq)]
pub enum Address {
    Absolute(u16),
    AbsoluteX(u16),
    AbsoluteY(u16),
    ZeroPage(u8),
    ZeroPageX(u8),
    ZeroPageY(u8),
    Immediate(u8),
    Relative(i8),
    Implicit,
    Indirect(u16),
    IndexedIndirect(u8),
    IndirectIndexed(u8),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Absolute(a) => write!(f, "${:04X}", a),
            Address::AbsoluteX(a) => write!(f, "${:04X},X", a),
            Address::AbsoluteY(a) => write!(f, "${:04X},Y", a),
            Address::ZeroPage(a) => write!(f, "${:02X}", a),
            Address::ZeroPageX(a) => write!(f, "${:02X},X", a),
            Address::ZeroPageY(a) => write!(f, "${:02X},Y", a),
            Address::Immediate(v) => write!(f, "#${:02X}", v),
            Address::Relative(r) => write!(f, "*{:+}", r),
            Address::Implicit => Ok(()),
            Address::Indirect(a) => write!(f, "(${:04X})", a),
            Address::IndexedIndirect(a) => write!(f, "(${:02X},X)", a),
            Address::IndirectIndexed(a) => write!(f, "(${:02X}),Y", a),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AddrMode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Immediate,
    Relative,
    Implicit,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

impl AddrMode {
    /// Number of operand bytes following the opcode.
    pub fn size(&self) -> u8 {
        match self {
            Self::Absolute => 2,
            Self::AbsoluteX => 2,
            Self::AbsoluteY => 2,
            Self::ZeroPage => 1,
            Self::ZeroPageX => 1,
            Self::ZeroPageY => 1,
            Self::Immediate => 1,
            Self::Relative => 1,
            Self::Implicit => 0,
            Self::Indirect => 2,
            Self::IndexedIndirect => 1,
            Self::IndirectIndexed => 1,
        }
    }

    /// Consume this mode's operand bytes from `bytes`. `None` if the input runs out.
    pub fn fetch<'a, I>(&self, bytes: I) -> Option<Address>
    where
        I: Iterator<Item = &'a u8>,
    {
        let addr = read_bytes(bytes, self.size())?;
        let address = match self {
            Self::Absolute => Address::Absolute(addr),
            Self::AbsoluteX => Address::AbsoluteX(addr),
            Self::AbsoluteY => Address::AbsoluteY(addr),
            Self::ZeroPage => Address::ZeroPage(addr as u8),
            Self::ZeroPageX => Address::ZeroPageX(addr as u8),
            Self::ZeroPageY => Address::ZeroPageY(addr as u8),
            Self::Immediate => Address::Immediate(addr as u8),
            Self::Relative => Address::Relative(addr as u8 as i8),
            Self::Implicit => Address::Implicit,
            Self::Indirect => Address::Indirect(addr),
            Self::IndexedIndirect => Address::IndexedIndirect(addr as u8),
            Self::IndirectIndexed => Address::IndirectIndexed(addr as u8),
        };
        Some(address)
    }
}

fn read_bytes<'a, I>(mut bytes: I, num_bytes: u8) -> Option<u16>
where
    I: Iterator<Item = &'a u8>,
{
    match num_bytes {
        0 => Some(0u16),
        1 => bytes.next().map(|b| *b as u16),
        _ => {
            let b0 = bytes.next()?;
            let b1 = bytes.next()?;
            Some(u16::from_le_bytes([*b0, *b1]))
        }
    }
}

#[cfg(test)]
mod test {
    use itertools::izip;

    use super::*;

    #[test]
    fn test_addr_mode_fetch_single_addr() {
        let bytes_list: Vec<Vec<u8>> = vec![
            vec![0xAB, 0xCD],
            vec![0x10],
            vec![0x00],
            vec![0xF8],
            vec![],
        ];
        let addr_modes: Vec<AddrMode> = vec![
            AddrMode::Absolute,
            AddrMode::Immediate,
            AddrMode::ZeroPageX,
            AddrMode::Relative,
            AddrMode::Implicit,
        ];
        let expected_addrs: Vec<Address> = vec![
            Address::Absolute(0xCDAB),
            Address::Immediate(0x10),
            Address::ZeroPageX(0x00),
            Address::Relative(-8),
            Address::Implicit,
        ];
        for (bytes, addr_mode, expected_addr) in izip!(bytes_list, addr_modes, expected_addrs) {
            let actual_addr = addr_mode.fetch(bytes.iter());
            assert_eq!(actual_addr, Some(expected_addr));
        }
    }

    #[test]
    fn test_addr_mode_fetch_multiple_addr() {
        let bytes = vec![0xA0, 0xB0, 0xC0, 0xD0, 0x12, 0x34, 0x56];
        let mut iter = bytes.iter();
        assert_eq!(
            AddrMode::Absolute.fetch(&mut iter),
            Some(Address::Absolute(0xB0A0))
        );
        assert_eq!(
            AddrMode::AbsoluteX.fetch(&mut iter),
            Some(Address::AbsoluteX(0xD0C0))
        );
        assert_eq!(
            AddrMode::Immediate.fetch(&mut iter),
            Some(Address::Immediate(0x12))
        );
        assert_eq!(
            AddrMode::Indirect.fetch(&mut iter),
            Some(Address::Indirect(0x5634))
        );
        assert_eq!(AddrMode::ZeroPage.fetch(&mut iter), None);
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address::ZeroPageX(0x00).to_string(), "$00,X");
        assert_eq!(Address::Immediate(0x0A).to_string(), "#$0A");
        assert_eq!(Address::Relative(-8).to_string(), "*-8");
        assert_eq!(Address::IndirectIndexed(0xC0).to_string(), "($C0),Y");
    }
}

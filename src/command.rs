/// Packs a two-character command mnemonic into the 16-bit code field.
const fn mnemonic(c1: u8, c0: u8) -> u16 {
    ((c1 as u16) << 8) | c0 as u16
}

/// The operation requested from the hypervisor by a [`CommandWord`].
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// `NI`: number of sub-channels exposed by the instance.
    CountInterfaces = mnemonic(b'N', b'I'),
    /// `GI`: interrupt token bound to a sub-channel.
    GetInterruptToken = mnemonic(b'G', b'I'),
    /// `GS`: level status of a sub-channel.
    GetStatus = mnemonic(b'G', b'S'),
    /// `GE`: status edges latched since the previous query.
    GetEvent = mnemonic(b'G', b'E'),
    /// `WR`: send one frame.
    Write = mnemonic(b'W', b'R'),
    /// `RD`: receive one frame.
    Read = mnemonic(b'R', b'D'),
}

impl CommandCode {
    const ALL: [CommandCode; 6] = [
        CommandCode::CountInterfaces,
        CommandCode::GetInterruptToken,
        CommandCode::GetStatus,
        CommandCode::GetEvent,
        CommandCode::Write,
        CommandCode::Read,
    ];

    /// Decodes a raw 16-bit code field.
    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|code| *code as u16 == raw)
    }

    /// The two ASCII characters naming this command.
    pub const fn mnemonic(self) -> [u8; 2] {
        let raw = self as u16;
        [(raw >> 8) as u8, raw as u8]
    }
}

/// An encoded hypercall request.
///
/// Layout: bits 63..32 carry the instance id, bits 31..16 the command code and
/// bits 15..0 the sub-channel index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandWord(u64);

impl CommandWord {
    /// Encodes a request. The channel index is dropped for
    /// [`CommandCode::CountInterfaces`], which addresses the whole instance.
    pub const fn encode(instance_id: u32, code: CommandCode, channel: u16) -> Self {
        let channel = match code {
            CommandCode::CountInterfaces => 0,
            _ => channel,
        };
        Self(((instance_id as u64) << 32) | ((code as u64) << 16) | channel as u64)
    }

    /// The raw 64-bit value handed to the hypervisor.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn instance_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn code(self) -> Option<CommandCode> {
        CommandCode::from_raw((self.0 >> 16) as u16)
    }

    pub const fn channel(self) -> u16 {
        self.0 as u16
    }
}

impl From<CommandWord> for u64 {
    fn from(cmd: CommandWord) -> u64 {
        cmd.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_hypervisor_abi() {
        let cmd = CommandWord::encode(0x1234_5678, CommandCode::Read, 3);
        assert_eq!(cmd.bits(), 0x1234_5678_5244_0003);

        let cmd = CommandWord::encode(1, CommandCode::GetStatus, 0xffff);
        assert_eq!(cmd.bits(), 0x0000_0001_4753_ffff);
    }

    #[test]
    fn test_count_interfaces_ignores_channel() {
        let a = CommandWord::encode(7, CommandCode::CountInterfaces, 0);
        let b = CommandWord::encode(7, CommandCode::CountInterfaces, 42);
        assert_eq!(a, b);
        assert_eq!(b.channel(), 0);
        assert_eq!(b.bits(), 0x0000_0007_4e49_0000);
    }

    #[test]
    fn test_decode_fields() {
        let cmd = CommandWord::encode(0xdead_beef, CommandCode::GetInterruptToken, 9);
        assert_eq!(cmd.instance_id(), 0xdead_beef);
        assert_eq!(cmd.code(), Some(CommandCode::GetInterruptToken));
        assert_eq!(cmd.channel(), 9);
        assert_eq!(CommandCode::GetEvent.mnemonic(), *b"GE");
        assert_eq!(CommandCode::from_raw(0x4142), None);
    }

    #[test]
    fn test_unique_per_code_and_channel() {
        let mut seen = alloc::vec::Vec::new();
        for code in CommandCode::ALL {
            for channel in 0..4 {
                let cmd = CommandWord::encode(5, code, channel);
                if code == CommandCode::CountInterfaces && channel != 0 {
                    continue;
                }
                assert!(!seen.contains(&cmd), "{:?} collides", cmd);
                seen.push(cmd);
            }
        }
    }
}

use bitflags::bitflags;

bitflags! {
    /// Area status word reported by the panel.
    ///
    /// Only the arm-mode and alarm bits decide the semantic state; the
    /// rest are surfaced for diagnostics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AreaStateFlags: u32 {
        const ARMED                   = 0x0000_0001;
        const ALARM                   = 0x0000_0002;
        const ENTRY_DELAY             = 0x0000_0004;
        const EXIT_DELAY              = 0x0000_0008;
        const ARM_WARNING             = 0x0000_0010;
        const DEFER_DISARMED          = 0x0000_0020;
        const DETECTING_ACTIVE_INPUTS = 0x0000_0040;
        const WALK_TEST_ACTIVE        = 0x0000_0080;
        const AWAY_ARMED              = 0x0000_0100;
        const STAY_ARMED              = 0x0000_0200;
        const SLEEP_ARMED             = 0x0000_0400;
        const DISARMED                = 0x0000_0800;
        const ARM_READY               = 0x0000_1000;
    }
}

impl AreaStateFlags {
    /// Bits that never influence the semantic state.
    pub const AUXILIARY: Self = Self::ENTRY_DELAY
        .union(Self::EXIT_DELAY)
        .union(Self::ARM_WARNING)
        .union(Self::DEFER_DISARMED)
        .union(Self::DETECTING_ACTIVE_INPUTS)
        .union(Self::WALK_TEST_ACTIVE)
        .union(Self::DISARMED)
        .union(Self::ARM_READY);

    /// The auxiliary bits set in this word, for logging.
    pub fn auxiliary(self) -> Self {
        self.intersection(Self::AUXILIARY)
    }

    /// Names of the set bits, in bit order. Unknown bits are ignored.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_kept_but_unnamed() {
        let flags = AreaStateFlags::from_bits_retain(0x8000_0101);
        assert!(flags.contains(AreaStateFlags::ARMED | AreaStateFlags::AWAY_ARMED));
        assert_eq!(flags.names(), vec!["ARMED", "AWAY_ARMED"]);
    }

    #[test]
    fn auxiliary_excludes_deciding_bits() {
        let flags = AreaStateFlags::ARMED
            | AreaStateFlags::EXIT_DELAY
            | AreaStateFlags::ARM_READY
            | AreaStateFlags::ALARM;
        assert_eq!(
            flags.auxiliary(),
            AreaStateFlags::EXIT_DELAY | AreaStateFlags::ARM_READY
        );
    }
}

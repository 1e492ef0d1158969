use bitflags::bitflags;

bitflags! {
    /// Intent passed by the protocol layer when opening a path for writing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Materialize the path when it does not exist.
        const CREATE = 1 << 0;
        /// Fail with `AlreadyExists` when the path exists.
        const EXCLUSIVE = 1 << 1;
        /// Allow overwriting an existing file.
        const TRUNCATE = 1 << 2;

        const CREATE_OR_REPLACE = Self::CREATE.bits() | Self::TRUNCATE.bits();
    }
}

impl From<u32> for OpenFlags {
    fn from(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl OpenFlags {
    /// Whether an existing file may be overwritten under these flags.
    #[must_use]
    pub const fn allows_overwrite(self) -> bool {
        self.contains(Self::TRUNCATE) && !self.contains(Self::EXCLUSIVE)
    }
}

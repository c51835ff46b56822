#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("no free page found")]
    NoFreePage,
    #[error("virtual address out of range: {0:#x}")]
    VirtualAddressTooLarge(usize),
}

impl From<sv39::MapError> for KernelError {
    fn from(error: sv39::MapError) -> Self {
        match error {
            sv39::MapError::VirtualAddressTooLarge(va) => Self::VirtualAddressTooLarge(va),
            sv39::MapError::OutOfFrames => Self::NoFreePage,
        }
    }
}

/// Readiness a descriptor is registered for.
///
/// Only read interest exists in this crate; `edge` selects edge-triggered
/// delivery, which obliges the consumer to drain until would-block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Interest {
    pub(crate) read: bool,
    pub(crate) edge: bool,
}

impl Interest {
    /// Read interest, edge-triggered.
    pub(crate) const READ_EDGE: Self = Self {
        read: true,
        edge: true,
    };
}

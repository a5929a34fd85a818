#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Delete the subscription at the gateway right away.
    Immediate,
    /// Keep the subscription running until the current billing period ends.
    EndOfPeriod,
}

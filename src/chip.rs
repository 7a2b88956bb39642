use crate::{
    error::{Error, Result},
    metric::Metric,
};

/// Chip-level operations a profile can expose without knowing the concrete chip model.
pub trait PseChip {
    type BusError: core::fmt::Debug;

    /// Chip model name, e.g. `"IP8008"`.
    fn model(&self) -> &'static str;

    fn num_ports(&self) -> usize;

    /// Upper bound on the number of chip metrics.
    fn metric_count(&self) -> usize;

    /// Check the chip identifies as the expected model. Bus errors count as offline.
    fn device_online(&mut self) -> bool;

    /// Chip metric at `index`, or `None` past the last one.
    fn export_metric(&mut self, index: usize) -> Result<Option<Metric>, Self::BusError>;
}

/// Validate a port index against the chip's port count.
pub(crate) fn check_port<E: core::fmt::Debug>(port: usize, num_ports: usize) -> Result<u8, E> {
    if port < num_ports {
        // Port counts are far below 256.
        Ok(port as u8)
    } else {
        Err(Error::InvalidPort(port))
    }
}

//! Display queries.

use crate::command::{Command, DisplayId, Reply, MAX_LIST_LEN};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::ipc::codec::ProtocolError;
use crate::traits::Connector;

impl<C: Connector> Context<C> {
    /// Number of active displays.
    pub fn display_get_count(&self) -> Result<u32> {
        match self.call(Command::DisplayCount)? {
            Reply::Count(count) => Ok(count),
            _ => Err(ProtocolError::ShapeMismatch.into()),
        }
    }

    /// Ids of at most `max_count` active displays.
    ///
    /// Extra ids reported by the scripting addition are dropped while
    /// decoding, so the result never holds more than `max_count` entries.
    pub fn display_get_list(&self, max_count: usize) -> Result<Vec<DisplayId>> {
        if max_count == 0 || max_count > MAX_LIST_LEN {
            return Err(Error::InvalidArg(format!(
                "max_count must lie in 1..={}, got {}",
                MAX_LIST_LEN, max_count
            )));
        }
        let max_count = max_count as u32;
        match self.call(Command::DisplayList { max_count })? {
            Reply::Ids(ids) => Ok(ids),
            _ => Err(ProtocolError::ShapeMismatch.into()),
        }
    }

    /// Fill `out` with display ids and return how many were written.
    ///
    /// `out` is left untouched when the call fails.
    pub fn display_get_list_into(&self, out: &mut [DisplayId]) -> Result<usize> {
        let ids = self.display_get_list(out.len())?;
        out[..ids.len()].copy_from_slice(&ids);
        Ok(ids.len())
    }
}

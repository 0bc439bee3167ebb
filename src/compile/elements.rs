//! Elements section parser

use crate::caps::CapabilityRegistry;
use crate::descriptor::ElementSource;
use crate::driver::Driver;
use crate::error::CompileError;
use crate::pool::ScratchPool;
use crate::resources::element::{ElementHandle, ElementManager};

/// Materialize index data into an element buffer, or pass an existing
/// handle through after a staleness check.
pub(crate) fn parse_elements<D: Driver>(
    driver: &mut D,
    elements: &mut ElementManager,
    pool: &mut ScratchPool,
    caps: &CapabilityRegistry,
    source: &ElementSource,
) -> Result<ElementHandle, CompileError> {
    match source {
        ElementSource::Data(data) => elements.create(driver, pool, caps, data, None),
        ElementSource::Handle(handle) => {
            elements
                .get(*handle)
                .ok_or(CompileError::StaleHandle { kind: "elements" })?;
            Ok(*handle)
        }
    }
}

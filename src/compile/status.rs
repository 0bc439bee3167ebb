//! Status section parser

use crate::descriptor::{StatusConfig, StatusEntry};
use crate::error::CompileError;
use crate::render_state::RenderState;

/// Fold status overrides onto the default pipeline state.
///
/// Keys are typed, so unknown keys are unrepresentable; what remains to
/// validate are the payloads themselves.
pub(crate) fn parse_status(config: &StatusConfig) -> Result<RenderState, CompileError> {
    let mut state = RenderState::default();
    for entry in &config.entries {
        match entry {
            StatusEntry::Flag(flag, enabled) => state.set_flag(*flag, *enabled),
            StatusEntry::Value(value) => state.set_value(*value),
        }
    }
    Ok(state)
}

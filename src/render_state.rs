//! Pipeline state and the state-diff engine
//!
//! A pipeline carries the complete desired flag and variable set; the
//! context carries the applied snapshot. Applying a pipeline walks the
//! desired set and touches the driver only where the snapshot differs.

use std::collections::HashMap;

use crate::driver::{
    BlendFactor, BlendOp, CompareFunc, Driver, Face, StateFlag, StateKey, StateValue,
    StencilAction, Winding,
};

/// Desired state of one compiled pipeline
///
/// Starts from the defaults of a fresh context; a status configuration
/// overrides individual entries. Viewport and scissor rectangles stay
/// absent until given.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    flags: Vec<(StateFlag, bool)>,
    values: Vec<StateValue>,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            flags: vec![
                (StateFlag::Dither, false),
                (StateFlag::Blend, false),
                (StateFlag::DepthTest, true),
                (StateFlag::CullFace, false),
                (StateFlag::PolygonOffsetFill, false),
                (StateFlag::SampleAlphaToCoverage, false),
                (StateFlag::SampleCoverage, false),
                (StateFlag::StencilTest, false),
                (StateFlag::ScissorTest, false),
            ],
            values: vec![
                StateValue::BlendColor([0.0; 4]),
                StateValue::BlendEquation {
                    rgb: BlendOp::Add,
                    alpha: BlendOp::Add,
                },
                StateValue::BlendFunc {
                    src_rgb: BlendFactor::One,
                    dst_rgb: BlendFactor::Zero,
                    src_alpha: BlendFactor::One,
                    dst_alpha: BlendFactor::Zero,
                },
                StateValue::DepthFunc(CompareFunc::Less),
                StateValue::DepthRange {
                    near: 0.0,
                    far: 1.0,
                },
                StateValue::DepthMask(true),
                StateValue::ColorMask([true; 4]),
                StateValue::CullFace(Face::Back),
                StateValue::FrontFace(Winding::Ccw),
                StateValue::LineWidth(1.0),
                StateValue::PolygonOffset {
                    factor: 0.0,
                    units: 0.0,
                },
                StateValue::SampleCoverage {
                    value: 1.0,
                    invert: false,
                },
                StateValue::StencilMask(u32::MAX),
                StateValue::StencilFunc {
                    func: CompareFunc::Always,
                    reference: 0,
                    mask: u32::MAX,
                },
                StateValue::StencilOp {
                    fail: StencilAction::Keep,
                    zfail: StencilAction::Keep,
                    zpass: StencilAction::Keep,
                },
            ],
        }
    }
}

impl RenderState {
    /// Override one flag entry.
    pub fn set_flag(&mut self, flag: StateFlag, enabled: bool) {
        match self.flags.iter_mut().find(|(f, _)| *f == flag) {
            Some(entry) => entry.1 = enabled,
            None => self.flags.push((flag, enabled)),
        }
    }

    /// Override one variable entry, keyed by the payload's identity.
    pub fn set_value(&mut self, value: StateValue) {
        match self.values.iter_mut().find(|v| v.key() == value.key()) {
            Some(entry) => *entry = value,
            None => self.values.push(value),
        }
    }

    pub fn flag(&self, flag: StateFlag) -> Option<bool> {
        self.flags.iter().find(|(f, _)| *f == flag).map(|(_, e)| *e)
    }

    pub fn value(&self, key: StateKey) -> Option<&StateValue> {
        self.values.iter().find(|v| v.key() == key)
    }

    /// Issue driver calls for every entry the snapshot disagrees on and
    /// fold the result back into the snapshot.
    pub fn apply<D: Driver>(&self, driver: &mut D, current: &mut CurrentState) {
        for (flag, enabled) in &self.flags {
            if current.flags.get(flag) != Some(enabled) {
                driver.set_flag(*flag, *enabled);
                current.flags.insert(*flag, *enabled);
            }
        }
        for value in &self.values {
            if current.values.get(&value.key()) != Some(value) {
                driver.set_state(value);
                current.values.insert(value.key(), *value);
            }
        }
    }
}

/// Context-wide snapshot of the state actually applied to the driver
///
/// Starts empty, so the first pipeline application announces every entry.
#[derive(Debug, Default)]
pub struct CurrentState {
    flags: HashMap<StateFlag, bool>,
    values: HashMap<StateKey, StateValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        flag_calls: usize,
        value_calls: usize,
    }

    fn apply_counting(state: &RenderState, current: &mut CurrentState, counter: &mut Counter) {
        for (flag, enabled) in &state.flags {
            if current.flags.get(flag) != Some(enabled) {
                counter.flag_calls += 1;
                current.flags.insert(*flag, *enabled);
            }
        }
        for value in &state.values {
            if current.values.get(&value.key()) != Some(value) {
                counter.value_calls += 1;
                current.values.insert(value.key(), *value);
            }
        }
    }

    #[test]
    fn second_apply_is_silent() {
        let state = RenderState::default();
        let mut current = CurrentState::default();
        let mut counter = Counter::default();
        apply_counting(&state, &mut current, &mut counter);
        assert!(counter.flag_calls > 0);
        assert!(counter.value_calls > 0);
        let mut counter = Counter::default();
        apply_counting(&state, &mut current, &mut counter);
        assert_eq!(counter.flag_calls, 0);
        assert_eq!(counter.value_calls, 0);
    }

    #[test]
    fn only_changed_entries_are_reapplied() {
        let mut state = RenderState::default();
        let mut current = CurrentState::default();
        let mut counter = Counter::default();
        apply_counting(&state, &mut current, &mut counter);

        state.set_flag(StateFlag::Blend, true);
        state.set_value(StateValue::LineWidth(2.0));
        let mut counter = Counter::default();
        apply_counting(&state, &mut current, &mut counter);
        assert_eq!(counter.flag_calls, 1);
        assert_eq!(counter.value_calls, 1);
    }

    #[test]
    fn override_replaces_in_place() {
        let mut state = RenderState::default();
        let before = state.values.len();
        state.set_value(StateValue::DepthFunc(CompareFunc::LessEqual));
        assert_eq!(state.values.len(), before);
        assert_eq!(
            state.value(StateKey::DepthFunc),
            Some(&StateValue::DepthFunc(CompareFunc::LessEqual))
        );
        state.set_value(StateValue::Viewport {
            x: 0,
            y: 0,
            width: 64,
            height: 64,
        });
        assert_eq!(state.values.len(), before + 1);
    }
}

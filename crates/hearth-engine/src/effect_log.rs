// SPDX-License-Identifier: MIT

//! Uniform tracing for [`hearth_core::Effect`]s, so every side-effecting
//! operation the dispatcher/orchestrator hands off to a collaborator is
//! logged the same way regardless of call site (see `hearth_core::effect`'s
//! doc comment).

use hearth_core::Effect;

pub fn log_effect(effect: &Effect) {
    if effect.verbose() {
        tracing::debug!(effect = effect.name(), fields = ?effect.fields(), "dispatching effect");
    } else {
        tracing::debug!(effect = effect.name(), "dispatching effect");
    }
}

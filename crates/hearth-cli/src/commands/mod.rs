// SPDX-License-Identifier: MIT

pub mod automation;
pub mod worker;

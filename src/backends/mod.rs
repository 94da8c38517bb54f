// SPDX-License-Identifier: GPL-3.0-only

//! Device backend abstraction

pub mod camera;

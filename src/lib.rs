// SPDX-License-Identifier: MIT

pub mod pastego;
pub mod query;

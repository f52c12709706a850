// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Call graph construction by Rapid Type Analysis over a language-neutral program
//! model.

#![allow(
    clippy::single_match,
    clippy::needless_lifetimes,
    clippy::len_zero
)]

pub mod graph;
pub mod model;
pub mod rta;
pub mod util;

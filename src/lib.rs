// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Offline transport-catalog engine.
//!
//! The engine runs in two phases. `make_base` ingests a JSON description of a
//! transit network (stops, buses, road distances), a yellow-pages directory
//! and rendering/routing settings, builds the routing graph and the schematic
//! map layout, and freezes everything into a single binary artifact.
//! `process_requests` reloads that artifact and answers stat requests: bus
//! and stop info, shortest-time routes, routes to the closest open company,
//! and SVG map rendering.

pub mod artifact;
pub mod catalog;
pub mod input;
pub mod layout;
pub mod model;
pub mod model_builder;
pub mod objects;
pub mod render;
pub mod routing;
pub(crate) mod serde_utils;
pub mod svg;
pub mod yellow_pages;

pub use crate::catalog::Catalog;
pub use crate::model::{Collections, Model};

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

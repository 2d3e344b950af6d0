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

//! Provides an easy way to create a `crate::Model`
//!
//! ```
//! # use transit_atlas::model_builder::ModelBuilder;
//! # use transit_atlas::objects::RouteKind;
//! let model = ModelBuilder::default()
//!     .stop("A", 55.61, 37.20, &[("B", 500)])
//!     .stop("B", 55.59, 37.21, &[])
//!     .bus("297", &["A", "B"], RouteKind::TwoWay)
//!     .build();
//! ```

use crate::model::{Collections, Model};
use crate::objects::{Bus, Coord, RouteKind, Stop};
use crate::yellow_pages::{Company, Rubric};
use std::collections::BTreeMap;

/// Builder used to easily create a `Model` for tests.
#[derive(Default)]
pub struct ModelBuilder {
    stops: Vec<Stop>,
    buses: Vec<Bus>,
    companies: Vec<Company>,
    rubrics: BTreeMap<u64, Rubric>,
}

impl ModelBuilder {
    /// Add a stop with its road-distance table.
    pub fn stop(mut self, name: &str, lat: f64, lon: f64, distances: &[(&str, u32)]) -> Self {
        let table = distances
            .iter()
            .map(|&(to, meters)| (to.to_string(), meters))
            .collect();
        self.stops.push(Stop::new(name, Coord::new(lat, lon), table));
        self
    }

    /// Add a bus over the given stop names.
    pub fn bus(mut self, name: &str, stops: &[&str], kind: RouteKind) -> Self {
        let stops = stops.iter().map(|stop| stop.to_string()).collect();
        self.buses.push(Bus::new(name, stops, kind));
        self
    }

    /// Add a fully-formed company.
    pub fn company(mut self, company: Company) -> Self {
        self.companies.push(company);
        self
    }

    /// Add a rubric.
    pub fn rubric(mut self, id: u64, name: &str) -> Self {
        self.rubrics.insert(
            id,
            Rubric {
                name: name.to_string(),
                keywords: Default::default(),
            },
        );
        self
    }

    /// The assembled collections, stops and buses sorted by name.
    pub fn collections(self) -> Collections {
        Collections::from_parts(self.stops, self.buses, self.companies, self.rubrics)
            .expect("builder produced invalid collections")
    }

    /// The assembled and validated model.
    pub fn build(self) -> Model {
        Model::new(self.collections()).expect("builder produced an invalid model")
    }
}

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

//! Definition of the transit catalog model.

use crate::objects::{Bus, Stop};
use crate::yellow_pages::{Company, Rubric};
use crate::Result;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops;
use typed_index_collection::{Collection, CollectionWithId};

/// The set of collections representing the catalog.
///
/// Stops and buses are kept in ascending name order; graph vertex ids and
/// palette assignment rely on it.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct Collections {
    pub stops: CollectionWithId<Stop>,
    pub buses: CollectionWithId<Bus>,
    /// Bus names passing through each stop; every stop has an entry.
    pub stop_to_buses: BTreeMap<String, BTreeSet<String>>,
    pub companies: Collection<Company>,
    pub rubrics: BTreeMap<u64, Rubric>,
}

impl Collections {
    /// Builds collections from raw objects: stops and buses are sorted by
    /// name and the stop→buses index is derived. Fails on duplicate names.
    pub fn from_parts(
        mut stops: Vec<Stop>,
        mut buses: Vec<Bus>,
        companies: Vec<Company>,
        rubrics: BTreeMap<u64, Rubric>,
    ) -> Result<Self> {
        stops.sort_by(|a, b| a.name.cmp(&b.name));
        buses.sort_by(|a, b| a.name.cmp(&b.name));
        let mut stop_to_buses: BTreeMap<String, BTreeSet<String>> = stops
            .iter()
            .map(|stop| (stop.name.clone(), BTreeSet::new()))
            .collect();
        for bus in &buses {
            for stop_name in &bus.stops {
                stop_to_buses
                    .entry(stop_name.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(bus.name.clone());
            }
        }
        Ok(Collections {
            stops: CollectionWithId::new(stops)?,
            buses: CollectionWithId::new(buses)?,
            stop_to_buses,
            companies: Collection::new(companies),
            rubrics,
        })
    }
}

/// Stops adjacent on any bus, in both directions.
pub type StopNeighbours = BTreeMap<String, BTreeSet<String>>;

/// Derives the stop adjacency relation from the bus stop sequences.
pub fn stop_neighbours(collections: &Collections) -> StopNeighbours {
    let mut neighbours = StopNeighbours::new();
    for (_, bus) in collections.buses.iter() {
        for pair in bus.stops.windows(2) {
            neighbours
                .entry(pair[0].clone())
                .or_insert_with(BTreeSet::new)
                .insert(pair[1].clone());
            neighbours
                .entry(pair[1].clone())
                .or_insert_with(BTreeSet::new)
                .insert(pair[0].clone());
        }
    }
    neighbours
}

/// Computes the derived lengths and curvature of every bus. Fails when a
/// consecutive stop pair has no road distance in either direction.
pub fn evaluate_route_lengths(collections: &mut Collections) -> Result<()> {
    let mut buses = collections.buses.take();
    for bus in &mut buses {
        bus.evaluate_lengths(&collections.stops)?;
    }
    collections.buses = CollectionWithId::new(buses)?;
    Ok(())
}

/// Assigns palette indices in bus-name order, wrapping modulo the palette
/// size.
pub fn assign_color_ids(collections: &mut Collections, palette_len: usize) {
    let mut buses = collections.buses.take();
    for (position, bus) in buses.iter_mut().enumerate() {
        bus.color_id = position % palette_len;
    }
    collections.buses = CollectionWithId::new(buses)
        .expect("reinserting the same buses cannot introduce duplicate ids");
}

/// The frozen, validated catalog.
#[derive(Debug, Default)]
pub struct Model {
    collections: Collections,
}

impl Model {
    /// Validates the collections. Fails when a bus references a stop that
    /// does not exist.
    pub fn new(collections: Collections) -> Result<Self> {
        for (_, bus) in collections.buses.iter() {
            for stop_name in &bus.stops {
                if collections.stops.get(stop_name).is_none() {
                    bail!(
                        "bus '{}' references unknown stop '{}'",
                        bus.name,
                        stop_name
                    );
                }
            }
        }
        Ok(Model { collections })
    }

    /// Consume the model in order to access the underlying collections.
    pub fn into_collections(self) -> Collections {
        self.collections
    }
}

impl ops::Deref for Model {
    type Target = Collections;
    fn deref(&self) -> &Self::Target {
        &self.collections
    }
}

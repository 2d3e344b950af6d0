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

//! The routing graph over the transit network and the all-pairs
//! shortest-time search on it.

use crate::model::Model;
use crate::objects::{road_distance, RouteKind, RouterSettings, Stop};
use crate::yellow_pages::NearbyStop;
use crate::Result;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A directed edge; the weight is minutes, with the boarding wait already
/// folded in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    pub weight: f64,
}

/// Side data of an edge: the bus ridden and how many stop positions the ride
/// spans.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub bus: String,
    pub span_count: u32,
}

/// The serializable part of the router: vertex names in id order plus the
/// expanded edge set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct GraphData {
    pub vertices: Vec<String>,
    pub edges: Vec<Edge>,
    pub edge_infos: Vec<EdgeInfo>,
}

/// One step of a reconstructed itinerary.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteItem {
    WaitBus {
        stop: String,
        time: f64,
    },
    RideBus {
        bus: String,
        stop_begin: String,
        stop_end: String,
        span_count: u32,
        time: f64,
    },
    WalkToCompany {
        stop: String,
        time: f64,
    },
    WaitCompany {
        time: f64,
    },
}

impl RouteItem {
    pub fn time(&self) -> f64 {
        match self {
            RouteItem::WaitBus { time, .. }
            | RouteItem::RideBus { time, .. }
            | RouteItem::WalkToCompany { time, .. }
            | RouteItem::WaitCompany { time } => *time,
        }
    }
}

/// A reconstructed itinerary; item times sum to `total_time`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteInfo {
    pub total_time: f64,
    pub items: Vec<RouteItem>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RouteEntry {
    weight: f64,
    /// The vertex the pair was relaxed through, when any.
    midpoint: Option<u32>,
    /// The direct edge, when the pair was never relaxed.
    edge: Option<u32>,
}

/// Dense all-pairs route table, row-major by `from`.
#[derive(Debug)]
struct RouteTable {
    vertex_count: usize,
    entries: Vec<Option<RouteEntry>>,
}

impl RouteTable {
    /// Floyd–Warshall relaxation over the expanded edge set. Weights are
    /// non-negative by construction, so no guard is needed.
    fn build(vertex_count: usize, edges: &[Edge]) -> Self {
        let mut entries: Vec<Option<RouteEntry>> = vec![None; vertex_count * vertex_count];
        for vertex in 0..vertex_count {
            entries[vertex * vertex_count + vertex] = Some(RouteEntry {
                weight: 0.0,
                midpoint: None,
                edge: None,
            });
        }
        for (edge_id, edge) in edges.iter().enumerate() {
            let slot = &mut entries[edge.from as usize * vertex_count + edge.to as usize];
            if slot.map_or(true, |current| edge.weight < current.weight) {
                *slot = Some(RouteEntry {
                    weight: edge.weight,
                    midpoint: None,
                    edge: Some(edge_id as u32),
                });
            }
        }
        for k in 0..vertex_count {
            for i in 0..vertex_count {
                let left = match entries[i * vertex_count + k] {
                    Some(entry) => entry,
                    None => continue,
                };
                for j in 0..vertex_count {
                    let right = match entries[k * vertex_count + j] {
                        Some(entry) => entry,
                        None => continue,
                    };
                    let candidate = left.weight + right.weight;
                    let slot = &mut entries[i * vertex_count + j];
                    if slot.map_or(true, |current| candidate < current.weight) {
                        *slot = Some(RouteEntry {
                            weight: candidate,
                            midpoint: Some(k as u32),
                            edge: None,
                        });
                    }
                }
            }
        }
        RouteTable {
            vertex_count,
            entries,
        }
    }

    /// Total weight and edge sequence of the best route, reconstructed into
    /// a per-query scratch buffer.
    fn route(&self, from: u32, to: u32) -> Option<(f64, Vec<u32>)> {
        let entry = self.entries[from as usize * self.vertex_count + to as usize]?;
        let mut edges = Vec::new();
        self.collect_edges(from as usize, to as usize, &mut edges);
        Some((entry.weight, edges))
    }

    /// Splits the pair around its midpoint recursively; a pair without a
    /// midpoint is a single edge (or an empty self-route).
    fn collect_edges(&self, from: usize, to: usize, out: &mut Vec<u32>) {
        if let Some(entry) = self.entries[from * self.vertex_count + to] {
            if let Some(midpoint) = entry.midpoint {
                self.collect_edges(from, midpoint as usize, out);
                self.collect_edges(midpoint as usize, to, out);
            } else if let Some(edge) = entry.edge {
                out.push(edge);
            }
        }
    }
}

/// The transit router: one vertex per stop (ids in ascending stop-name
/// order), one edge per reachable ordered stop pair per bus direction.
#[derive(Debug)]
pub struct TransportRouter {
    stop_names: Vec<String>,
    stop_ids: HashMap<String, u32>,
    edges: Vec<Edge>,
    edge_infos: Vec<EdgeInfo>,
    settings: RouterSettings,
    table: Option<RouteTable>,
}

impl TransportRouter {
    /// Expands every bus into direct edges. Riding from position `i` to `j`
    /// costs the road time of the traversed segment plus one boarding wait.
    pub fn new(model: &Model, settings: RouterSettings) -> Result<Self> {
        let stop_names: Vec<String> = model.stops.values().map(|stop| stop.name.clone()).collect();
        let stop_ids: HashMap<String, u32> = stop_names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u32))
            .collect();
        let mut edges = Vec::new();
        let mut edge_infos = Vec::new();
        let wait = f64::from(settings.bus_wait_time);
        for (_, bus) in model.buses.iter() {
            let stops: Vec<&Stop> = bus
                .stops
                .iter()
                .map(|name| {
                    model.stops.get(name).ok_or_else(|| {
                        anyhow!("bus '{}' references unknown stop '{}'", bus.name, name)
                    })
                })
                .collect::<Result<_>>()?;
            let ids: Vec<u32> = stops.iter().map(|stop| stop_ids[&stop.name]).collect();
            for i in 0..stops.len().saturating_sub(1) {
                let mut time = 0.0;
                for j in i + 1..stops.len() {
                    time += f64::from(road_distance(stops[j - 1], stops[j])?)
                        / settings.bus_velocity;
                    edges.push(Edge {
                        from: ids[i],
                        to: ids[j],
                        weight: time + wait,
                    });
                    edge_infos.push(EdgeInfo {
                        bus: bus.name.clone(),
                        span_count: (j - i) as u32,
                    });
                }
            }
            if bus.kind == RouteKind::TwoWay {
                for i in 0..stops.len().saturating_sub(1) {
                    let mut time = 0.0;
                    for j in i + 1..stops.len() {
                        time += f64::from(road_distance(stops[j], stops[j - 1])?)
                            / settings.bus_velocity;
                        edges.push(Edge {
                            from: ids[j],
                            to: ids[i],
                            weight: time + wait,
                        });
                        edge_infos.push(EdgeInfo {
                            bus: bus.name.clone(),
                            span_count: (j - i) as u32,
                        });
                    }
                }
            }
        }
        debug!(
            "routing graph: {} vertices, {} edges",
            stop_names.len(),
            edges.len()
        );
        Ok(TransportRouter {
            stop_names,
            stop_ids,
            edges,
            edge_infos,
            settings,
            table: None,
        })
    }

    /// Restores a router from its persisted graph; the route table is not
    /// built yet.
    pub fn from_graph(graph: GraphData, settings: RouterSettings) -> Self {
        let stop_ids = graph
            .vertices
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u32))
            .collect();
        TransportRouter {
            stop_names: graph.vertices,
            stop_ids,
            edges: graph.edges,
            edge_infos: graph.edge_infos,
            settings,
            table: None,
        }
    }

    pub fn graph_data(&self) -> GraphData {
        GraphData {
            vertices: self.stop_names.clone(),
            edges: self.edges.clone(),
            edge_infos: self.edge_infos.clone(),
        }
    }

    /// Precomputes the all-pairs route table; required before any
    /// `build_route` call.
    pub fn prepare(&mut self) {
        info!(
            "computing the all-pairs route table over {} vertices",
            self.stop_names.len()
        );
        self.table = Some(RouteTable::build(self.stop_names.len(), &self.edges));
    }

    /// The shortest-time itinerary between two stops, or `None` when either
    /// stop is unknown or no path exists.
    pub fn build_route(&self, from: &str, to: &str) -> Option<RouteInfo> {
        let table = self
            .table
            .as_ref()
            .expect("route table must be prepared before building routes");
        let &from_id = self.stop_ids.get(from)?;
        let &to_id = self.stop_ids.get(to)?;
        let (total_time, edge_ids) = table.route(from_id, to_id)?;
        let wait = f64::from(self.settings.bus_wait_time);
        let mut items = Vec::with_capacity(edge_ids.len() * 2);
        for edge_id in edge_ids {
            let edge = &self.edges[edge_id as usize];
            let info = &self.edge_infos[edge_id as usize];
            items.push(RouteItem::WaitBus {
                stop: self.stop_names[edge.from as usize].clone(),
                time: wait,
            });
            items.push(RouteItem::RideBus {
                bus: info.bus.clone(),
                stop_begin: self.stop_names[edge.from as usize].clone(),
                stop_end: self.stop_names[edge.to as usize].clone(),
                span_count: info.span_count,
                time: edge.weight - wait,
            });
        }
        Some(RouteInfo { total_time, items })
    }

    /// A route ending with the walk from a nearby stop to its company.
    /// Starting at the nearby stop itself yields a pure walk.
    pub fn build_route_to_company(&self, from: &str, stop: &NearbyStop) -> Option<RouteInfo> {
        let mut route = if from != stop.name {
            self.build_route(from, &stop.name)?
        } else {
            RouteInfo::default()
        };
        let walk_time = f64::from(stop.meters) / self.settings.pedestrian_velocity;
        route.total_time += walk_time;
        route.items.push(RouteItem::WalkToCompany {
            stop: stop.name.clone(),
            time: walk_time,
        });
        Some(route)
    }
}

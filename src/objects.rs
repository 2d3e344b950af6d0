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

//! Transit objects: stops, buses and the settings they are built with.

use crate::svg::{Color, Point};
use crate::Result;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use typed_index_collection::{CollectionWithId, Id};

/// Mean Earth radius in meters.
const EARTH_RADIUS: f64 = 6_371_000.0;

/// A geographic position in decimal degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coord { lat, lon }
    }

    /// Geodesic distance to `other` in meters, by the spherical law of
    /// cosines.
    pub fn distance_to(&self, other: &Coord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lon = (self.lon - other.lon).abs().to_radians();
        let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * delta_lon.cos();
        // rounding can push the cosine of a zero-length arc past 1
        cosine.min(1.0).max(-1.0).acos() * EARTH_RADIUS
    }
}

/// A transit stop.
///
/// `geo` keeps the coordinates as given in the input; `display` starts equal
/// to `geo` and is moved by the layout straightening pass; `xy` is the final
/// schematic position in map pixels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    pub geo: Coord,
    pub display: Coord,
    pub xy: Point,
    pub is_base: bool,
    /// Road meters to neighbor stops; may be asymmetric.
    pub distances: BTreeMap<String, u32>,
}

impl Stop {
    pub fn new<S: Into<String>>(name: S, geo: Coord, distances: BTreeMap<String, u32>) -> Self {
        Stop {
            name: name.into(),
            geo,
            display: geo,
            xy: Point::default(),
            is_base: false,
            distances,
        }
    }
}

impl Id<Stop> for Stop {
    fn id(&self) -> &str {
        &self.name
    }
    fn set_id(&mut self, id: String) {
        self.name = id;
    }
}

/// Road distance between two stops in meters, falling back to the opposite
/// direction when only that one is declared.
pub fn road_distance(from: &Stop, to: &Stop) -> Result<u32> {
    from.distances
        .get(&to.name)
        .or_else(|| to.distances.get(&from.name))
        .copied()
        .ok_or_else(|| {
            anyhow!(
                "no road distance between stop '{}' and stop '{}'",
                from.name,
                to.name
            )
        })
}

/// How a bus traverses its stop list.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// First stop equals the last one; the listed order is the traversal.
    Round,
    /// Listed one direction, traversed there and back.
    TwoWay,
}

/// A named bus route with its derived figures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bus {
    pub name: String,
    pub stops: Vec<String>,
    pub kind: RouteKind,
    pub stop_count: u32,
    pub unique_stop_count: u32,
    pub geo_length: f64,
    pub road_length: u32,
    pub curvature: f64,
    pub color_id: usize,
}

impl Bus {
    pub fn new<S: Into<String>>(name: S, stops: Vec<String>, kind: RouteKind) -> Self {
        let stop_count = match kind {
            RouteKind::Round => stops.len() as u32,
            RouteKind::TwoWay => 2 * stops.len() as u32 - 1,
        };
        let unique_stop_count = stops.iter().collect::<BTreeSet<_>>().len() as u32;
        Bus {
            name: name.into(),
            stops,
            kind,
            stop_count,
            unique_stop_count,
            geo_length: 0.0,
            road_length: 0,
            curvature: 0.0,
            color_id: 0,
        }
    }

    /// Computes `geo_length`, `road_length` and `curvature` over the full
    /// traversal. A two-way bus covers the listed segments in both
    /// directions; the reverse direction uses the symmetric fallback when
    /// its own distance is missing.
    pub fn evaluate_lengths(&mut self, stops: &CollectionWithId<Stop>) -> Result<()> {
        let stop = |name: &str| {
            stops
                .get(name)
                .ok_or_else(|| anyhow!("bus '{}' references unknown stop '{}'", self.name, name))
        };
        let mut geo_length = 0.0;
        let mut road_length = 0;
        for pair in self.stops.windows(2) {
            let from = stop(&pair[0])?;
            let to = stop(&pair[1])?;
            geo_length += from.geo.distance_to(&to.geo);
            road_length += road_distance(from, to)?;
        }
        if self.kind == RouteKind::TwoWay {
            for pair in self.stops.windows(2) {
                let from = stop(&pair[1])?;
                let to = stop(&pair[0])?;
                road_length += road_distance(from, to)?;
            }
            geo_length *= 2.0;
        }
        self.geo_length = geo_length;
        self.road_length = road_length;
        self.curvature = f64::from(road_length) / geo_length;
        Ok(())
    }
}

impl Id<Bus> for Bus {
    fn id(&self) -> &str {
        &self.name
    }
    fn set_id(&mut self, id: String) {
        self.name = id;
    }
}

/// Routing parameters; both velocities are in meters per minute.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct RouterSettings {
    pub bus_wait_time: u32,
    pub bus_velocity: f64,
    pub pedestrian_velocity: f64,
}

/// The drawing layers, rendered in the order listed in the settings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    BusLines,
    BusLabels,
    StopPoints,
    StopLabels,
    CompanyLines,
    CompanyPoints,
    CompanyLabels,
}

/// Map rendering parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub stop_radius: f64,
    pub line_width: f64,
    pub stop_label_font_size: u32,
    pub stop_label_offset: Point,
    pub underlayer_color: Color,
    pub underlayer_width: f64,
    pub color_palette: Vec<Color>,
    pub bus_label_font_size: u32,
    pub bus_label_offset: Point,
    pub layers: Vec<Layer>,
    pub outer_margin: f64,
    pub company_radius: f64,
    pub company_line_width: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn stops_with_distances(distances: &[(&str, &str, u32)]) -> CollectionWithId<Stop> {
        let names: BTreeSet<&str> = distances
            .iter()
            .flat_map(|(from, to, _)| vec![*from, *to])
            .collect();
        let stops = names
            .into_iter()
            .map(|name| {
                let table = distances
                    .iter()
                    .filter(|(from, _, _)| *from == name)
                    .map(|(_, to, meters)| (to.to_string(), *meters))
                    .collect();
                Stop::new(name, Coord::new(55.0, 37.0), table)
            })
            .collect();
        CollectionWithId::new(stops).unwrap()
    }

    #[test]
    fn geo_distance_is_symmetric_and_zero_on_self() {
        let a = Coord::new(55.611087, 37.20829);
        let b = Coord::new(55.595884, 37.209755);
        assert_relative_eq!(a.distance_to(&b), b.distance_to(&a));
        assert_relative_eq!(a.distance_to(&b), 1693.0, max_relative = 1e-3);
        assert_relative_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn road_distance_prefers_own_entry_then_falls_back() {
        let stops = stops_with_distances(&[("X", "Y", 100), ("Y", "Z", 50), ("Z", "Y", 60)]);
        let x = stops.get("X").unwrap();
        let y = stops.get("Y").unwrap();
        let z = stops.get("Z").unwrap();
        assert_eq!(100, road_distance(x, y).unwrap());
        // no Y -> X entry, symmetric fallback
        assert_eq!(100, road_distance(y, x).unwrap());
        assert_eq!(50, road_distance(y, z).unwrap());
        assert_eq!(60, road_distance(z, y).unwrap());
        assert!(road_distance(x, z).is_err());
    }

    #[test]
    fn round_bus_counts_and_lengths() {
        let stops = stops_with_distances(&[("A", "B", 100), ("B", "C", 200), ("C", "A", 300)]);
        let mut bus = Bus::new(
            "14",
            vec!["A".into(), "B".into(), "C".into(), "A".into()],
            RouteKind::Round,
        );
        assert_eq!(4, bus.stop_count);
        assert_eq!(3, bus.unique_stop_count);
        bus.evaluate_lengths(&stops).unwrap();
        assert_eq!(600, bus.road_length);
    }

    #[test]
    fn twoway_bus_uses_symmetric_fallback_on_the_way_back() {
        let stops = stops_with_distances(&[("X", "Y", 100), ("Y", "Z", 50), ("Z", "Y", 60)]);
        let mut bus = Bus::new("7", vec!["X".into(), "Y".into(), "Z".into()], RouteKind::TwoWay);
        assert_eq!(5, bus.stop_count);
        assert_eq!(3, bus.unique_stop_count);
        bus.evaluate_lengths(&stops).unwrap();
        // forward 100 + 50, back 60 + fallback 100
        assert_eq!(310, bus.road_length);
    }

    #[test]
    fn curvature_is_at_least_one_for_consistent_input() {
        let mut stops = vec![
            Stop::new("A", Coord::new(55.611087, 37.20829), BTreeMap::new()),
            Stop::new("B", Coord::new(55.595884, 37.209755), BTreeMap::new()),
        ];
        stops[0].distances.insert("B".to_string(), 2000);
        let stops = CollectionWithId::new(stops).unwrap();
        let mut bus = Bus::new("1", vec!["A".into(), "B".into()], RouteKind::TwoWay);
        bus.evaluate_lengths(&stops).unwrap();
        assert!(bus.curvature >= 1.0);
        assert_relative_eq!(
            bus.curvature,
            f64::from(bus.road_length) / bus.geo_length
        );
    }
}

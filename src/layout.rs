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

//! Schematic map layout: base-stop marking, chord straightening of
//! intermediate stops, and neighbor-constrained coordinate compression.

use crate::model::{Collections, StopNeighbours};
use crate::objects::{RenderSettings, RouteKind, Stop};
use crate::yellow_pages::Company;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use typed_index_collection::Idx;

/// The projection frame the layout worked in; persisted with the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MapFrame {
    pub min_lon: f64,
    pub max_lat: f64,
    pub zoom: f64,
}

impl MapFrame {
    /// Computed over the original stop and company coordinates, before any
    /// straightening.
    fn compute(collections: &Collections, settings: &RenderSettings) -> Self {
        let coords = collections
            .stops
            .values()
            .map(|stop| stop.display)
            .chain(collections.companies.values().map(|c| c.address.coords));
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut empty = true;
        for coord in coords {
            empty = false;
            min_lat = min_lat.min(coord.lat);
            max_lat = max_lat.max(coord.lat);
            min_lon = min_lon.min(coord.lon);
            max_lon = max_lon.max(coord.lon);
        }
        if empty {
            return MapFrame::default();
        }
        let usable_width = settings.width - 2.0 * settings.padding;
        let usable_height = settings.height - 2.0 * settings.padding;
        let width_zoom = if max_lon > min_lon {
            usable_width / (max_lon - min_lon)
        } else {
            0.0
        };
        let height_zoom = if max_lat > min_lat {
            usable_height / (max_lat - min_lat)
        } else {
            0.0
        };
        let zoom = if width_zoom > 0.0 && height_zoom > 0.0 {
            width_zoom.min(height_zoom)
        } else {
            width_zoom + height_zoom
        };
        MapFrame {
            min_lon,
            max_lat,
            zoom,
        }
    }

    fn x(&self, lon: f64, settings: &RenderSettings) -> f64 {
        (lon - self.min_lon) * self.zoom + settings.padding
    }

    fn y(&self, lat: f64, settings: &RenderSettings) -> f64 {
        (self.max_lat - lat) * self.zoom + settings.padding
    }
}

/// Runs the whole layout: marks base stops, straightens the intermediate
/// ones, then compresses both axes and writes the final pixel positions
/// back to the stops and companies.
pub fn run(
    collections: &mut Collections,
    neighbours: &StopNeighbours,
    settings: &RenderSettings,
) -> MapFrame {
    let frame = MapFrame::compute(collections, settings);
    mark_base_stops(collections);
    straighten(collections);
    compress(collections, neighbours, settings, &frame);
    frame
}

/// A stop is a base stop when no bus or more than one bus touches it, when
/// it is a terminal of some bus, or when one bus visits it often enough:
/// more than twice for a round bus, at least twice for a two-way bus (each
/// listed visit counts double because of the return trip).
fn mark_base_stops(collections: &mut Collections) {
    let mut base: Vec<Idx<Stop>> = Vec::new();
    for (idx, stop) in collections.stops.iter() {
        let bus_count = collections
            .stop_to_buses
            .get(&stop.name)
            .map_or(0, |buses| buses.len());
        if bus_count != 1 {
            base.push(idx);
        }
    }
    for (_, bus) in collections.buses.iter() {
        if bus.stops.is_empty() {
            continue;
        }
        let first = collections.stops.get_idx(&bus.stops[0]);
        let last = collections.stops.get_idx(&bus.stops[bus.stops.len() - 1]);
        base.extend(first);
        base.extend(last);
        let mut visits: HashMap<&str, u32> = HashMap::new();
        for stop_name in &bus.stops {
            *visits.entry(stop_name.as_str()).or_insert(0) += 1;
        }
        let threshold = match bus.kind {
            RouteKind::Round => 3,
            RouteKind::TwoWay => 2,
        };
        for (stop_name, count) in visits {
            if count >= threshold {
                base.extend(collections.stops.get_idx(stop_name));
            }
        }
    }
    debug!("marked {} base stop candidates", base.len());
    for idx in base {
        collections.stops.index_mut(idx).is_base = true;
    }
}

/// Flattens the non-base stops of every bus onto the chord between the
/// surrounding base stops by linear interpolation of the display
/// coordinates.
fn straighten(collections: &mut Collections) {
    for (_, bus) in collections.buses.iter() {
        let stops = &bus.stops;
        let mut left = 0;
        while left + 1 < stops.len() {
            let right = match (left + 1..stops.len())
                .find(|&j| collections.stops.get(&stops[j]).map_or(false, |s| s.is_base))
            {
                Some(right) => right,
                // the terminal is always a base stop
                None => break,
            };
            let from = collections.stops.get(&stops[left]).map(|s| s.display);
            let to = collections.stops.get(&stops[right]).map(|s| s.display);
            if let (Some(from), Some(to)) = (from, to) {
                let span = (right - left) as f64;
                let lat_step = (to.lat - from.lat) / span;
                let lon_step = (to.lon - from.lon) / span;
                for k in left..=right {
                    if let Some(idx) = collections.stops.get_idx(&stops[k]) {
                        let offset = (k - left) as f64;
                        let mut stop = collections.stops.index_mut(idx);
                        stop.display.lat = from.lat + lat_step * offset;
                        stop.display.lon = from.lon + lon_step * offset;
                    }
                }
            }
            left = right;
        }
    }
}

enum Owner {
    Stop(Idx<Stop>, String),
    Company(usize),
}

struct MapItem {
    coord: f64,
    owner: Owner,
    rank: usize,
}

fn are_neighbours(
    left: &MapItem,
    right: &MapItem,
    neighbours: &StopNeighbours,
    companies: &[Company],
) -> bool {
    let company_near_stop = |company: &Company, stop_name: &str| {
        company
            .nearby_stops
            .iter()
            .any(|nearby| nearby.name == stop_name)
    };
    match (&left.owner, &right.owner) {
        (Owner::Stop(_, left_name), Owner::Stop(_, right_name)) => neighbours
            .get(left_name)
            .map_or(false, |set| set.contains(right_name)),
        (Owner::Company(company), Owner::Stop(_, stop_name))
        | (Owner::Stop(_, stop_name), Owner::Company(company)) => {
            company_near_stop(&companies[*company], stop_name)
        }
        (Owner::Company(_), Owner::Company(_)) => false,
    }
}

/// Assigns each item the smallest rank larger than the ranks of all its
/// earlier neighbors; unrelated items freely share ranks.
fn assign_ranks(
    items: &mut [MapItem],
    neighbours: &StopNeighbours,
    companies: &[Company],
) -> usize {
    let mut max_rank = 0;
    for i in 1..items.len() {
        let mut rank = 0;
        for j in 0..i {
            if are_neighbours(&items[i], &items[j], neighbours, companies) {
                rank = rank.max(items[j].rank + 1);
            }
        }
        items[i].rank = rank;
        max_rank = max_rank.max(rank);
    }
    max_rank
}

fn compress(
    collections: &mut Collections,
    neighbours: &StopNeighbours,
    settings: &RenderSettings,
    frame: &MapFrame,
) {
    let mut companies = collections.companies.take();

    // X axis: ascending by projected coordinate
    let mut items: Vec<MapItem> = collections
        .stops
        .iter()
        .map(|(idx, stop)| MapItem {
            coord: frame.x(stop.display.lon, settings),
            owner: Owner::Stop(idx, stop.name.clone()),
            rank: 0,
        })
        .chain(companies.iter().enumerate().map(|(position, company)| {
            MapItem {
                coord: frame.x(company.address.coords.lon, settings),
                owner: Owner::Company(position),
                rank: 0,
            }
        }))
        .collect();
    items.sort_by(|a, b| a.coord.partial_cmp(&b.coord).expect("coords are finite"));
    let max_rank = assign_ranks(&mut items, neighbours, &companies);
    let step = if max_rank > 0 {
        (settings.width - 2.0 * settings.padding) / max_rank as f64
    } else {
        0.0
    };
    for item in &items {
        let x = settings.padding + item.rank as f64 * step;
        match &item.owner {
            Owner::Stop(idx, _) => collections.stops.index_mut(*idx).xy.x = x,
            Owner::Company(position) => companies[*position].address.coords.lon = x,
        }
    }

    // Y axis: descending by projected coordinate
    let mut items: Vec<MapItem> = collections
        .stops
        .iter()
        .map(|(idx, stop)| MapItem {
            coord: frame.y(stop.display.lat, settings),
            owner: Owner::Stop(idx, stop.name.clone()),
            rank: 0,
        })
        .chain(companies.iter().enumerate().map(|(position, company)| {
            MapItem {
                coord: frame.y(company.address.coords.lat, settings),
                owner: Owner::Company(position),
                rank: 0,
            }
        }))
        .collect();
    items.sort_by(|a, b| b.coord.partial_cmp(&a.coord).expect("coords are finite"));
    let max_rank = assign_ranks(&mut items, neighbours, &companies);
    let step = if max_rank > 0 {
        (settings.height - 2.0 * settings.padding) / max_rank as f64
    } else {
        0.0
    };
    for item in &items {
        let y = settings.height - settings.padding - item.rank as f64 * step;
        match &item.owner {
            Owner::Stop(idx, _) => collections.stops.index_mut(*idx).xy.y = y,
            Owner::Company(position) => companies[*position].address.coords.lat = y,
        }
    }

    collections.companies = typed_index_collection::Collection::new(companies);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model;
    use crate::model_builder::ModelBuilder;
    use crate::objects::{Layer, RouteKind};
    use crate::svg::{Color, Point};
    use crate::yellow_pages::NearbyStop;
    use approx::assert_relative_eq;

    fn settings() -> RenderSettings {
        RenderSettings {
            width: 600.0,
            height: 400.0,
            padding: 50.0,
            stop_radius: 5.0,
            line_width: 14.0,
            stop_label_font_size: 20,
            stop_label_offset: Point::new(7.0, -3.0),
            underlayer_color: Color::named("white"),
            underlayer_width: 3.0,
            color_palette: vec![Color::named("green"), Color::named("red")],
            bus_label_font_size: 20,
            bus_label_offset: Point::new(7.0, 15.0),
            layers: vec![Layer::BusLines],
            outer_margin: 150.0,
            company_radius: 5.0,
            company_line_width: 2.0,
        }
    }

    fn run_layout(mut collections: Collections) -> Collections {
        let neighbours = model::stop_neighbours(&collections);
        run(&mut collections, &neighbours, &settings());
        collections
    }

    #[test]
    fn terminals_and_shared_stops_are_base() {
        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.60, 37.20, &[("B", 500)])
                .stop("B", 55.61, 37.21, &[("C", 500)])
                .stop("C", 55.62, 37.22, &[("D", 500)])
                .stop("D", 55.63, 37.23, &[])
                .stop("lonely", 55.70, 37.30, &[])
                .bus("1", &["A", "B", "C", "D"], RouteKind::TwoWay)
                .bus("2", &["C", "D"], RouteKind::TwoWay)
                .collections(),
        );
        let is_base = |name: &str| collections.stops.get(name).unwrap().is_base;
        assert!(is_base("A"), "terminal");
        assert!(!is_base("B"), "plain intermediate");
        assert!(is_base("C"), "two buses");
        assert!(is_base("D"), "terminal of both");
        assert!(is_base("lonely"), "no buses at all");
    }

    #[test]
    fn repeated_visits_make_a_stop_base() {
        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.60, 37.20, &[("B", 500)])
                .stop("B", 55.61, 37.21, &[("C", 500), ("A", 500)])
                .stop("C", 55.62, 37.22, &[("B", 500)])
                .bus("r", &["A", "B", "C", "B", "A"], RouteKind::Round)
                .collections(),
        );
        // B is listed twice on a round bus: not enough
        assert!(!collections.stops.get("B").unwrap().is_base);

        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.60, 37.20, &[("B", 500)])
                .stop("B", 55.61, 37.21, &[("C", 500), ("A", 500)])
                .stop("C", 55.62, 37.22, &[("B", 500)])
                .bus("t", &["A", "B", "C", "B"], RouteKind::TwoWay)
                .collections(),
        );
        // on a two-way bus every listed visit counts double
        assert!(collections.stops.get("B").unwrap().is_base);
    }

    #[test]
    fn intermediates_land_on_the_chord() {
        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.0, 37.0, &[("B", 500)])
                .stop("B", 55.9, 37.2, &[("C", 500)])
                .stop("C", 56.0, 38.0, &[])
                .bus("1", &["A", "B", "C"], RouteKind::TwoWay)
                .collections(),
        );
        let display = collections.stops.get("B").unwrap().display;
        assert_relative_eq!(55.5, display.lat);
        assert_relative_eq!(37.5, display.lon);
        // base stops keep their coordinates
        let display = collections.stops.get("A").unwrap().display;
        assert_relative_eq!(55.0, display.lat);
        assert_relative_eq!(37.0, display.lon);
    }

    #[test]
    fn identical_coordinates_share_a_rank_unless_neighbours() {
        let strangers = run_layout(
            ModelBuilder::default()
                .stop("A", 55.0, 37.0, &[])
                .stop("B", 55.0, 37.0, &[])
                .collections(),
        );
        let a = strangers.stops.get("A").unwrap().xy;
        let b = strangers.stops.get("B").unwrap().xy;
        assert_relative_eq!(a.x, b.x);
        assert_relative_eq!(a.y, b.y);
        assert_relative_eq!(50.0, a.x);
        assert_relative_eq!(350.0, a.y);

        let connected = run_layout(
            ModelBuilder::default()
                .stop("A", 55.0, 37.0, &[("B", 100)])
                .stop("B", 55.0, 37.0, &[])
                .bus("1", &["A", "B"], RouteKind::TwoWay)
                .collections(),
        );
        let a = connected.stops.get("A").unwrap().xy;
        let b = connected.stops.get("B").unwrap().xy;
        // ranks 0 and 1 spread over the full usable axis
        assert_relative_eq!(50.0, a.x);
        assert_relative_eq!(550.0, b.x);
        assert_relative_eq!(350.0, a.y);
        assert_relative_eq!(50.0, b.y);
    }

    #[test]
    fn company_shares_the_axis_with_its_nearby_stop() {
        let company = Company {
            nearby_stops: vec![NearbyStop {
                name: "A".to_string(),
                meters: 100,
            }],
            ..Company::default()
        };
        let mut with_coords = company;
        with_coords.address.coords = crate::objects::Coord::new(55.0, 37.0);
        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.0, 37.0, &[])
                .company(with_coords)
                .collections(),
        );
        let stop = collections.stops.get("A").unwrap().xy;
        let company = &collections.companies.values().next().unwrap().address.coords;
        // same projected coordinate, but the company is pushed to rank 1
        assert_relative_eq!(50.0, stop.x);
        assert_relative_eq!(550.0, company.lon);
        assert_relative_eq!(350.0, stop.y);
        assert_relative_eq!(50.0, company.lat);
    }

    #[test]
    fn all_stops_stay_inside_the_padded_frame() {
        let collections = run_layout(
            ModelBuilder::default()
                .stop("A", 55.60, 37.20, &[("B", 500)])
                .stop("B", 55.61, 37.21, &[("C", 500)])
                .stop("C", 55.62, 37.22, &[])
                .bus("1", &["A", "B", "C"], RouteKind::TwoWay)
                .collections(),
        );
        let settings = settings();
        for stop in collections.stops.values() {
            assert!(stop.xy.x >= settings.padding);
            assert!(stop.xy.x <= settings.width - settings.padding);
            assert!(stop.xy.y >= settings.padding);
            assert!(stop.xy.y <= settings.height - settings.padding);
        }
    }
}

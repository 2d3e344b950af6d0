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

//! Drives the whole pipeline: build the base from JSON, persist it, reload
//! it and answer a batch of stat requests, the way the two CLI subcommands
//! do.

use pretty_assertions::assert_eq;
use serde_json::json;
use transit_atlas::input::{self, StatRequest};
use transit_atlas::Catalog;

fn base_document(artifact: &std::path::Path) -> serde_json::Value {
    json!({
        "serialization_settings": {"file": artifact},
        "routing_settings": {
            "bus_wait_time": 2,
            "bus_velocity": 30,
            "pedestrian_velocity": 6
        },
        "render_settings": {
            "width": 1200, "height": 500, "padding": 50,
            "stop_radius": 5, "line_width": 14,
            "stop_label_font_size": 20, "stop_label_offset": [7, -3],
            "underlayer_color": [255, 255, 255, 0.85], "underlayer_width": 3,
            "color_palette": ["green", [255, 160, 0], "red"],
            "bus_label_font_size": 20, "bus_label_offset": [7, 15],
            "layers": ["bus_lines", "bus_labels", "stop_points", "stop_labels",
                       "company_lines", "company_points", "company_labels"],
            "outer_margin": 150, "company_radius": 5, "company_line_width": 2
        },
        "base_requests": [
            {"type": "Bus", "name": "289",
             "stops": ["Zagorye", "Lipetskaya ulitsa 46", "Lipetskaya ulitsa 40",
                       "Lipetskaya ulitsa 34", "Pokrovskaya", "Moskvorechye"],
             "is_roundtrip": false},
            {"type": "Stop", "name": "Zagorye", "latitude": 55.579909, "longitude": 37.68372,
             "road_distances": {"Lipetskaya ulitsa 46": 300}},
            {"type": "Stop", "name": "Lipetskaya ulitsa 46", "latitude": 55.581441,
             "longitude": 37.682205,
             "road_distances": {"Lipetskaya ulitsa 40": 500, "Zagorye": 250}},
            {"type": "Stop", "name": "Lipetskaya ulitsa 40", "latitude": 55.584496,
             "longitude": 37.679133,
             "road_distances": {"Lipetskaya ulitsa 34": 550}},
            {"type": "Stop", "name": "Lipetskaya ulitsa 34", "latitude": 55.587559,
             "longitude": 37.676077,
             "road_distances": {"Pokrovskaya": 3200}},
            {"type": "Stop", "name": "Pokrovskaya", "latitude": 55.603406,
             "longitude": 37.635898,
             "road_distances": {"Moskvorechye": 4500}},
            {"type": "Stop", "name": "Moskvorechye", "latitude": 55.641049,
             "longitude": 37.638703}
        ],
        "yellow_pages": {
            "rubrics": {"1": {"name": "Parking"}},
            "companies": [{
                "names": [{"value": "Central parking", "type": "MAIN"},
                          {"value": "CP", "type": "SHORT"}],
                "rubrics": [1],
                "urls": [{"value": "http://parking.example"}],
                "phones": [{"type": "PHONE", "country_code": "7",
                            "local_code": "495", "number": "7654321"}],
                "address": {"coords": {"lat": "55.60", "lon": "37.66"}},
                "working_time": {"intervals": [
                    {"day": "MONDAY", "minutes_from": 480, "minutes_to": 1080},
                    {"day": "TUESDAY", "minutes_from": 480, "minutes_to": 1080}
                ]},
                "nearby_stops": [{"name": "Pokrovskaya", "meters": 180}]
            }]
        }
    })
}

fn stat_requests(values: serde_json::Value) -> Vec<StatRequest> {
    serde_json::from_value(values).unwrap()
}

#[test]
fn make_base_then_process_requests() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("transit.db");

    let base: input::BaseInput =
        serde_json::from_value(base_document(&artifact)).unwrap();
    let catalog = Catalog::from_base_input(base).unwrap();
    catalog.save(&artifact).unwrap();

    let mut catalog = Catalog::load(&artifact).unwrap();
    let responses = catalog
        .process(stat_requests(json!([
            {"type": "Bus", "id": 1, "name": "289"},
            {"type": "Stop", "id": 2, "name": "Pokrovskaya"},
            {"type": "Route", "id": 3, "from": "Zagorye", "to": "Moskvorechye"},
            {"type": "Map", "id": 4},
            {"type": "FindCompanies", "id": 5, "rubrics": ["Parking"]},
            {"type": "RouteToCompany", "id": 6, "from": "Zagorye",
             "datetime": [0, 6, 0],
             "companies": {"rubrics": ["Parking"]}},
            {"type": "Bus", "id": 7, "name": "ghost"}
        ])))
        .unwrap();

    assert_eq!(
        json!({
            "request_id": 1,
            "stop_count": 11,
            "unique_stop_count": 6,
            "route_length": 18050,
            "curvature": responses[0]["curvature"]
        }),
        responses[0]
    );
    let curvature = responses[0]["curvature"].as_f64().unwrap();
    assert!(curvature > 1.0 && curvature < 2.0);

    assert_eq!(json!({"request_id": 2, "buses": ["289"]}), responses[1]);

    let route = &responses[2];
    assert_eq!(json!(3), route["request_id"]);
    let items = route["items"].as_array().unwrap();
    assert_eq!(json!("WaitBus"), items[0]["type"]);
    assert_eq!(json!("Zagorye"), items[0]["stop_name"]);
    assert_eq!(json!("RideBus"), items[1]["type"]);
    let total: f64 = items
        .iter()
        .map(|item| item["time"].as_f64().unwrap())
        .sum();
    assert!((route["total_time"].as_f64().unwrap() - total).abs() < 1e-9);
    assert!(route["total_time"].as_f64().unwrap() >= 2.0);

    let map = responses[3]["map"].as_str().unwrap();
    assert!(map.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(map.contains("<polyline"));
    assert!(map.contains(">289</text>"));

    assert_eq!(
        json!({"request_id": 5, "companies": ["Central parking"]}),
        responses[4]
    );

    let to_company = &responses[5];
    let items = to_company["items"].as_array().unwrap();
    let last = items.last().unwrap();
    // Monday 6:00 plus the ride and walk lands before the 8:00 opening
    assert_eq!(json!("WalkToCompany"), items[items.len() - 2]["type"]);
    assert_eq!(json!("WaitCompany"), last["type"]);
    assert_eq!(json!("Central parking"), last["company"]);
    let map = to_company["map"].as_str().unwrap();
    assert!(map.contains("<rect"));

    assert_eq!(
        json!({"request_id": 7, "error_message": "not found"}),
        responses[6]
    );
}

#[test]
fn reloaded_catalog_serializes_to_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.db");
    let second = dir.path().join("second.db");

    let base: input::BaseInput = serde_json::from_value(base_document(&first)).unwrap();
    let catalog = Catalog::from_base_input(base).unwrap();
    catalog.save(&first).unwrap();

    let reloaded = Catalog::load(&first).unwrap();
    reloaded.save(&second).unwrap();

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn queries_are_idempotent_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("transit.db");
    let base: input::BaseInput =
        serde_json::from_value(base_document(&artifact)).unwrap();
    Catalog::from_base_input(base)
        .unwrap()
        .save(&artifact)
        .unwrap();

    let route = json!([{"type": "Route", "id": 1, "from": "Zagorye", "to": "Pokrovskaya"}]);
    let mut first = Catalog::load(&artifact).unwrap();
    let mut second = Catalog::load(&artifact).unwrap();
    assert_eq!(
        first.process(stat_requests(route.clone())).unwrap(),
        second.process(stat_requests(route)).unwrap()
    );
}

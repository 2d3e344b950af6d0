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

//! The catalog engine: builds the base in `make_base`, reloads it in
//! `process_requests`, and answers stat requests.

use crate::artifact::{self, Dataset};
use crate::input::{self, BaseInput, StatRequest};
use crate::layout::{self, MapFrame};
use crate::model::{self, Model};
use crate::objects::{RenderSettings, RouterSettings};
use crate::render::{self, RenderContext};
use crate::routing::{RouteInfo, RouteItem, TransportRouter};
use crate::svg::Document;
use crate::yellow_pages::{Company, CompanyQuery, MINUTES_PER_WEEK};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// The engine behind both phases. Queries are read-only apart from the
/// lazily rendered base map, which is memoized after the first use.
pub struct Catalog {
    model: Model,
    router_settings: RouterSettings,
    render_settings: RenderSettings,
    map_frame: MapFrame,
    router: TransportRouter,
    rubric_ids: HashMap<String, u64>,
    base_map: Option<Document>,
}

impl Catalog {
    /// Builds the whole base: collections, route lengths, palette, layout
    /// and the routing graph. The all-pairs route table is deliberately left
    /// unbuilt; only `process_requests` needs it.
    pub fn from_base_input(input: BaseInput) -> Result<Self> {
        let router_settings = input.routing_settings.into_settings();
        let render_settings = input.render_settings.into_settings()?;
        let mut collections = input::build_collections(input.base_requests, input.yellow_pages)?;
        info!(
            "building the catalog: {} stops, {} buses, {} companies",
            collections.stops.len(),
            collections.buses.len(),
            collections.companies.len()
        );
        model::evaluate_route_lengths(&mut collections)?;
        model::assign_color_ids(&mut collections, render_settings.color_palette.len());
        let neighbours = model::stop_neighbours(&collections);
        let map_frame = layout::run(&mut collections, &neighbours, &render_settings);
        let model = Model::new(collections)?;
        let router = TransportRouter::new(&model, router_settings)?;
        Ok(Catalog::assemble(
            model,
            router_settings,
            render_settings,
            map_frame,
            router,
        ))
    }

    /// Restores a catalog from the artifact and prepares the route table;
    /// coordinates and edges are reloaded, not recomputed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = artifact::read(path)?;
        let model = Model::new(dataset.collections)?;
        let mut router = TransportRouter::from_graph(dataset.graph, dataset.router_settings);
        router.prepare();
        Ok(Catalog::assemble(
            model,
            dataset.router_settings,
            dataset.render_settings,
            dataset.map_frame,
            router,
        ))
    }

    fn assemble(
        model: Model,
        router_settings: RouterSettings,
        render_settings: RenderSettings,
        map_frame: MapFrame,
        router: TransportRouter,
    ) -> Self {
        let rubric_ids = model
            .rubrics
            .iter()
            .map(|(id, rubric)| (rubric.name.clone(), *id))
            .collect();
        Catalog {
            model,
            router_settings,
            render_settings,
            map_frame,
            router,
            rubric_ids,
            base_map: None,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let dataset = Dataset {
            collections: (*self.model).clone(),
            router_settings: self.router_settings,
            render_settings: self.render_settings.clone(),
            map_frame: self.map_frame,
            graph: self.router.graph_data(),
        };
        artifact::write(path, &dataset)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn map_frame(&self) -> MapFrame {
        self.map_frame
    }

    /// Answers the stat requests in order. Query misses become per-response
    /// error objects; they never abort the batch.
    pub fn process(&mut self, requests: Vec<StatRequest>) -> Result<Vec<Value>> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            let response = match request {
                StatRequest::Bus { id, name } => match self.model.buses.get(&name) {
                    Some(bus) => to_value(&BusResponse {
                        request_id: id,
                        stop_count: bus.stop_count,
                        unique_stop_count: bus.unique_stop_count,
                        route_length: bus.road_length,
                        curvature: bus.curvature,
                    })?,
                    None => not_found(id)?,
                },
                StatRequest::Stop { id, name } => match self.model.stop_to_buses.get(&name) {
                    Some(buses) => to_value(&StopResponse {
                        request_id: id,
                        buses: buses.iter().cloned().collect(),
                    })?,
                    None => not_found(id)?,
                },
                StatRequest::Route { id, from, to } => {
                    match self.router.build_route(&from, &to) {
                        Some(route) => {
                            let map = self.render_route(&route, None)?;
                            to_value(&RouteResponse {
                                request_id: id,
                                total_time: route.total_time,
                                items: items_to_json(&route.items, None),
                                map,
                            })?
                        }
                        None => not_found(id)?,
                    }
                }
                StatRequest::Map { id } => {
                    let map = self.base_document().render()?;
                    to_value(&MapResponse {
                        request_id: id,
                        map,
                    })?
                }
                StatRequest::FindCompanies {
                    id,
                    names,
                    urls,
                    rubrics,
                    phones,
                } => {
                    let query = input::CompanyFilterInput {
                        names,
                        urls,
                        rubrics,
                        phones,
                    }
                    .into_query();
                    let rubric_ids = self.resolve_rubrics(&query);
                    let companies = self
                        .model
                        .companies
                        .values()
                        .filter(|company| query.matches(company, &rubric_ids))
                        .map(|company| company.main_name().to_string())
                        .collect();
                    to_value(&CompaniesResponse {
                        request_id: id,
                        companies,
                    })?
                }
                StatRequest::RouteToCompany {
                    id,
                    from,
                    datetime,
                    companies,
                } => {
                    let query = companies.into_query();
                    let rubric_ids = self.resolve_rubrics(&query);
                    let start = input::start_minutes(datetime);
                    match self.closest_company_route(&from, start, &query, &rubric_ids) {
                        Some((route, position)) => {
                            let map = self.render_route(&route, Some(position))?;
                            let company_name = self
                                .company_at(position)
                                .map(|company| company.main_name().to_string())
                                .unwrap_or_default();
                            to_value(&RouteResponse {
                                request_id: id,
                                total_time: route.total_time,
                                items: items_to_json(&route.items, Some(&company_name)),
                                map,
                            })?
                        }
                        None => not_found(id)?,
                    }
                }
            };
            responses.push(response);
        }
        Ok(responses)
    }

    fn resolve_rubrics(&self, query: &CompanyQuery) -> Vec<u64> {
        // unknown rubric names resolve to nothing and then never match
        query
            .rubrics
            .iter()
            .filter_map(|name| self.rubric_ids.get(name).copied())
            .collect()
    }

    fn company_at(&self, position: usize) -> Option<&Company> {
        self.model.companies.values().nth(position)
    }

    /// The earliest-arrival route over every candidate company and every one
    /// of its nearby stops, waiting for the company to open when needed.
    /// The first candidate encountered wins ties.
    fn closest_company_route(
        &self,
        from: &str,
        start: f64,
        query: &CompanyQuery,
        rubric_ids: &[u64],
    ) -> Option<(RouteInfo, usize)> {
        let mut best: Option<(RouteInfo, usize)> = None;
        for (position, company) in self.model.companies.values().enumerate() {
            if !query.matches(company, rubric_ids) {
                continue;
            }
            for stop in &company.nearby_stops {
                let mut route = match self.router.build_route_to_company(from, stop) {
                    Some(route) => route,
                    None => continue,
                };
                let finish = (start + route.total_time) % f64::from(MINUTES_PER_WEEK);
                let wait = company.working_time.wait_for_open(finish);
                if wait > 0.0 {
                    route.items.push(RouteItem::WaitCompany { time: wait });
                    route.total_time += wait;
                }
                let better = best
                    .as_ref()
                    .map_or(true, |(current, _)| route.total_time < current.total_time);
                if better {
                    best = Some((route, position));
                }
            }
        }
        best
    }

    fn render_context(&self) -> RenderContext {
        RenderContext {
            stops: &self.model.stops,
            buses: &self.model.buses,
            rubrics: &self.model.rubrics,
            settings: &self.render_settings,
        }
    }

    fn base_document(&mut self) -> &Document {
        if self.base_map.is_none() {
            let document = render::base_map(&self.render_context());
            self.base_map = Some(document);
        }
        self.base_map.as_ref().expect("the base map was just built")
    }

    fn render_route(&mut self, route: &RouteInfo, company_position: Option<usize>) -> Result<String> {
        let base = self.base_document().clone();
        let company = company_position.and_then(|position| self.company_at(position));
        let document = render::route_map(&self.render_context(), base, route, company);
        document.render()
    }
}

fn to_value<T: Serialize>(response: &T) -> Result<Value> {
    Ok(serde_json::to_value(response)?)
}

fn not_found(request_id: u64) -> Result<Value> {
    to_value(&ErrorResponse {
        request_id,
        error_message: "not found",
    })
}

#[derive(Serialize)]
struct ErrorResponse {
    request_id: u64,
    error_message: &'static str,
}

#[derive(Serialize)]
struct BusResponse {
    request_id: u64,
    stop_count: u32,
    unique_stop_count: u32,
    route_length: u32,
    curvature: f64,
}

#[derive(Serialize)]
struct StopResponse {
    request_id: u64,
    buses: Vec<String>,
}

#[derive(Serialize)]
struct MapResponse {
    request_id: u64,
    map: String,
}

#[derive(Serialize)]
struct RouteResponse {
    request_id: u64,
    total_time: f64,
    items: Vec<ItemResponse>,
    map: String,
}

#[derive(Serialize)]
struct CompaniesResponse {
    request_id: u64,
    companies: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ItemResponse {
    WaitBus {
        stop_name: String,
        time: f64,
    },
    RideBus {
        bus: String,
        span_count: u32,
        time: f64,
    },
    WalkToCompany {
        stop_name: String,
        time: f64,
        company: String,
    },
    WaitCompany {
        time: f64,
        company: String,
    },
}

fn items_to_json(items: &[RouteItem], company: Option<&str>) -> Vec<ItemResponse> {
    items
        .iter()
        .map(|item| match item {
            RouteItem::WaitBus { stop, time } => ItemResponse::WaitBus {
                stop_name: stop.clone(),
                time: *time,
            },
            RouteItem::RideBus {
                bus,
                span_count,
                time,
                ..
            } => ItemResponse::RideBus {
                bus: bus.clone(),
                span_count: *span_count,
                time: *time,
            },
            RouteItem::WalkToCompany { stop, time } => ItemResponse::WalkToCompany {
                stop_name: stop.clone(),
                time: *time,
                company: company.unwrap_or("").to_string(),
            },
            RouteItem::WaitCompany { time } => ItemResponse::WaitCompany {
                time: *time,
                company: company.unwrap_or("").to_string(),
            },
        })
        .collect()
}

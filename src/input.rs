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

//! The JSON documents the two phases read, and their conversion into the
//! catalog model. Malformed or unknown request shapes are fatal; query-time
//! misses are not decided here.

use crate::model::Collections;
use crate::objects::{Bus, Coord, Layer, RenderSettings, RouteKind, RouterSettings, Stop};
use crate::serde_utils::de_f64_from_string_or_number;
use crate::svg::{Color, Point};
use crate::yellow_pages::{
    Address, AddressComponent, AddressComponentKind, Company, CompanyName, CompanyQuery, NameKind,
    NearbyStop, Phone, PhoneKind, PhoneQuery, Rubric, WorkingInterval, WorkingTime,
    MINUTES_PER_DAY,
};
use crate::Result;
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

/// Kilometers per hour to meters per minute.
const KPH_TO_MPM: f64 = 1000.0 / 60.0;

/// The whole `make_base` input document.
#[derive(Deserialize, Debug)]
pub struct BaseInput {
    pub routing_settings: RoutingSettingsInput,
    pub render_settings: RenderSettingsInput,
    pub base_requests: Vec<BaseRequest>,
    pub serialization_settings: SerializationSettings,
    pub yellow_pages: YellowPagesInput,
}

/// The whole `process_requests` input document.
#[derive(Deserialize, Debug)]
pub struct StatInput {
    pub stat_requests: Vec<StatRequest>,
    pub serialization_settings: SerializationSettings,
}

#[derive(Deserialize, Debug)]
pub struct SerializationSettings {
    pub file: std::path::PathBuf,
}

pub fn read_base_input<R: Read>(reader: R) -> Result<BaseInput> {
    serde_json::from_reader(reader).context("failed to parse the make_base input document")
}

pub fn read_stat_input<R: Read>(reader: R) -> Result<StatInput> {
    serde_json::from_reader(reader).context("failed to parse the process_requests input document")
}

#[derive(Deserialize, Debug)]
pub struct RoutingSettingsInput {
    bus_wait_time: u32,
    bus_velocity: f64,
    pedestrian_velocity: f64,
}

impl RoutingSettingsInput {
    pub fn into_settings(self) -> RouterSettings {
        RouterSettings {
            bus_wait_time: self.bus_wait_time,
            bus_velocity: self.bus_velocity * KPH_TO_MPM,
            pedestrian_velocity: self.pedestrian_velocity * KPH_TO_MPM,
        }
    }
}

/// A color is either a name, `[r, g, b]` or `[r, g, b, a]`.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ColorInput {
    Name(String),
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, f64),
}

impl From<ColorInput> for Color {
    fn from(color: ColorInput) -> Self {
        match color {
            ColorInput::Name(name) => Color::Named(name),
            ColorInput::Rgb(red, green, blue) => Color::Rgb { red, green, blue },
            ColorInput::Rgba(red, green, blue, alpha) => Color::Rgba {
                red,
                green,
                blue,
                alpha,
            },
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RenderSettingsInput {
    width: f64,
    height: f64,
    padding: f64,
    stop_radius: f64,
    line_width: f64,
    stop_label_font_size: u32,
    stop_label_offset: [f64; 2],
    underlayer_color: ColorInput,
    underlayer_width: f64,
    color_palette: Vec<ColorInput>,
    bus_label_font_size: u32,
    bus_label_offset: [f64; 2],
    layers: Vec<Layer>,
    outer_margin: f64,
    company_radius: f64,
    company_line_width: f64,
}

impl RenderSettingsInput {
    pub fn into_settings(self) -> Result<RenderSettings> {
        ensure!(!self.color_palette.is_empty(), "empty color palette");
        Ok(RenderSettings {
            width: self.width,
            height: self.height,
            padding: self.padding,
            stop_radius: self.stop_radius,
            line_width: self.line_width,
            stop_label_font_size: self.stop_label_font_size,
            stop_label_offset: Point::new(self.stop_label_offset[0], self.stop_label_offset[1]),
            underlayer_color: self.underlayer_color.into(),
            underlayer_width: self.underlayer_width,
            color_palette: self.color_palette.into_iter().map(Color::from).collect(),
            bus_label_font_size: self.bus_label_font_size,
            bus_label_offset: Point::new(self.bus_label_offset[0], self.bus_label_offset[1]),
            layers: self.layers,
            outer_margin: self.outer_margin,
            company_radius: self.company_radius,
            company_line_width: self.company_line_width,
        })
    }
}

/// One entry of `base_requests`.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum BaseRequest {
    Bus {
        name: String,
        stops: Vec<String>,
        is_roundtrip: bool,
    },
    Stop {
        name: String,
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        road_distances: BTreeMap<String, u32>,
    },
}

#[derive(Deserialize, Debug, Default)]
pub struct YellowPagesInput {
    #[serde(default)]
    rubrics: BTreeMap<String, RubricInput>,
    #[serde(default)]
    companies: Vec<CompanyInput>,
}

#[derive(Deserialize, Debug)]
struct RubricInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    keywords: BTreeSet<String>,
}

#[derive(Deserialize, Debug, Default)]
struct CompanyInput {
    #[serde(default)]
    address: Option<AddressInput>,
    #[serde(default)]
    names: Vec<NameInput>,
    #[serde(default)]
    phones: Vec<PhoneInput>,
    #[serde(default)]
    urls: Vec<UrlInput>,
    #[serde(default)]
    rubrics: Vec<u64>,
    #[serde(default)]
    working_time: Option<WorkingTimeInput>,
    #[serde(default)]
    nearby_stops: Vec<NearbyStopInput>,
}

#[derive(Deserialize, Debug)]
struct AddressInput {
    #[serde(default)]
    formatted: String,
    #[serde(default)]
    components: Vec<AddressComponentInput>,
    #[serde(default)]
    coords: Option<CoordsInput>,
    #[serde(default)]
    comment: String,
}

#[derive(Deserialize, Debug)]
struct AddressComponentInput {
    #[serde(default)]
    value: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CoordsInput {
    #[serde(deserialize_with = "de_f64_from_string_or_number")]
    lat: f64,
    #[serde(deserialize_with = "de_f64_from_string_or_number")]
    lon: f64,
}

#[derive(Deserialize, Debug)]
struct NameInput {
    #[serde(default)]
    value: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize, Debug)]
struct PhoneInput {
    #[serde(default)]
    formatted: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    local_code: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    extension: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Debug)]
struct UrlInput {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize, Debug)]
struct WorkingTimeInput {
    #[serde(default)]
    intervals: Vec<WorkingIntervalInput>,
}

#[derive(Deserialize, Debug)]
struct WorkingIntervalInput {
    #[serde(default)]
    day: Day,
    #[serde(default)]
    minutes_from: u32,
    #[serde(default)]
    minutes_to: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
enum Day {
    Everyday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Default for Day {
    fn default() -> Self {
        Day::Everyday
    }
}

impl Day {
    /// Minutes from week start to this day's midnight.
    fn offset(self) -> u32 {
        match self {
            Day::Everyday | Day::Monday => 0,
            Day::Tuesday => MINUTES_PER_DAY,
            Day::Wednesday => 2 * MINUTES_PER_DAY,
            Day::Thursday => 3 * MINUTES_PER_DAY,
            Day::Friday => 4 * MINUTES_PER_DAY,
            Day::Saturday => 5 * MINUTES_PER_DAY,
            Day::Sunday => 6 * MINUTES_PER_DAY,
        }
    }
}

#[derive(Deserialize, Debug)]
struct NearbyStopInput {
    #[serde(default)]
    name: String,
    #[serde(default)]
    meters: u32,
}

fn name_kind(kind: Option<&str>) -> NameKind {
    match kind {
        Some("SYNONYM") => NameKind::Synonym,
        Some("SHORT") => NameKind::Short,
        _ => NameKind::Main,
    }
}

fn phone_kind(kind: Option<&str>) -> Option<PhoneKind> {
    match kind {
        Some("PHONE") => Some(PhoneKind::Phone),
        Some("FAX") => Some(PhoneKind::Fax),
        _ => None,
    }
}

fn address_component_kind(kind: Option<&str>) -> AddressComponentKind {
    match kind {
        Some("REGION") => AddressComponentKind::Region,
        Some("CITY") => AddressComponentKind::City,
        Some("STREET") => AddressComponentKind::Street,
        Some("HOUSE") => AddressComponentKind::House,
        _ => AddressComponentKind::Country,
    }
}

impl CompanyInput {
    fn into_company(self) -> Company {
        let address = self
            .address
            .map(|address| Address {
                formatted: address.formatted,
                components: address
                    .components
                    .into_iter()
                    .map(|component| AddressComponent {
                        value: component.value,
                        kind: address_component_kind(component.kind.as_deref()),
                    })
                    .collect(),
                coords: address
                    .coords
                    .map(|coords| Coord::new(coords.lat, coords.lon))
                    .unwrap_or_default(),
                comment: address.comment,
            })
            .unwrap_or_default();
        let working_time = self
            .working_time
            .map(|working_time| {
                let mut is_everyday = true;
                let mut intervals: Vec<WorkingInterval> = working_time
                    .intervals
                    .into_iter()
                    .map(|interval| {
                        if interval.day != Day::Everyday {
                            is_everyday = false;
                        }
                        WorkingInterval {
                            minutes_from: interval.day.offset() + interval.minutes_from,
                            minutes_to: interval.day.offset() + interval.minutes_to,
                        }
                    })
                    .collect();
                intervals.sort_by_key(|interval| interval.minutes_to);
                WorkingTime {
                    is_everyday,
                    intervals,
                }
            })
            .unwrap_or_default();
        Company {
            address,
            names: self
                .names
                .into_iter()
                .map(|name| CompanyName {
                    value: name.value,
                    kind: name_kind(name.kind.as_deref()),
                })
                .collect(),
            phones: self
                .phones
                .into_iter()
                .map(|phone| Phone {
                    formatted: phone.formatted,
                    // unmarked company phones are plain phones
                    kind: phone_kind(phone.kind.as_deref()).or(Some(PhoneKind::Phone)),
                    country_code: phone.country_code,
                    local_code: phone.local_code,
                    number: phone.number,
                    extension: phone.extension,
                    description: phone.description,
                })
                .collect(),
            urls: self.urls.into_iter().map(|url| url.value).collect(),
            rubrics: self.rubrics,
            working_time,
            nearby_stops: self
                .nearby_stops
                .into_iter()
                .map(|stop| NearbyStop {
                    name: stop.name,
                    meters: stop.meters,
                })
                .collect(),
        }
    }
}

/// Converts the parsed base requests and yellow pages into collections.
pub fn build_collections(
    base_requests: Vec<BaseRequest>,
    yellow_pages: YellowPagesInput,
) -> Result<Collections> {
    let mut stops = Vec::new();
    let mut buses = Vec::new();
    for request in base_requests {
        match request {
            BaseRequest::Stop {
                name,
                latitude,
                longitude,
                road_distances,
            } => {
                stops.push(Stop::new(
                    name,
                    Coord::new(latitude, longitude),
                    road_distances,
                ));
            }
            BaseRequest::Bus {
                name,
                stops: bus_stops,
                is_roundtrip,
            } => {
                let kind = if is_roundtrip {
                    RouteKind::Round
                } else {
                    RouteKind::TwoWay
                };
                buses.push(Bus::new(name, bus_stops, kind));
            }
        }
    }
    let mut rubrics = BTreeMap::new();
    for (id, rubric) in yellow_pages.rubrics {
        let id: u64 = id
            .parse()
            .with_context(|| format!("invalid rubric id '{}'", id))?;
        rubrics.insert(
            id,
            Rubric {
                name: rubric.name,
                keywords: rubric.keywords,
            },
        );
    }
    let companies = yellow_pages
        .companies
        .into_iter()
        .map(CompanyInput::into_company)
        .collect();
    Collections::from_parts(stops, buses, companies, rubrics)
}

/// One entry of `stat_requests`.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum StatRequest {
    Bus {
        id: u64,
        name: String,
    },
    Stop {
        id: u64,
        name: String,
    },
    Route {
        id: u64,
        from: String,
        to: String,
    },
    Map {
        id: u64,
    },
    FindCompanies {
        id: u64,
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        urls: Vec<String>,
        #[serde(default)]
        rubrics: Vec<String>,
        #[serde(default)]
        phones: Vec<PhoneQueryInput>,
    },
    RouteToCompany {
        id: u64,
        from: String,
        #[serde(default)]
        datetime: Option<(u32, u32, f64)>,
        companies: CompanyFilterInput,
    },
}

#[derive(Deserialize, Debug, Default)]
pub struct CompanyFilterInput {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub rubrics: Vec<String>,
    #[serde(default)]
    pub phones: Vec<PhoneQueryInput>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PhoneQueryInput {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    country_code: String,
    #[serde(default)]
    local_code: String,
    #[serde(default)]
    number: String,
    #[serde(default)]
    extension: String,
}

impl CompanyFilterInput {
    pub fn into_query(self) -> CompanyQuery {
        CompanyQuery {
            names: self.names,
            urls: self.urls,
            rubrics: self.rubrics,
            phones: self
                .phones
                .into_iter()
                .map(|phone| PhoneQuery {
                    kind: phone_kind(phone.kind.as_deref()),
                    country_code: phone.country_code,
                    local_code: phone.local_code,
                    number: phone.number,
                    extension: phone.extension,
                })
                .collect(),
        }
    }
}

/// Minutes from week start of a `[day, hour, minutes]` datetime.
pub fn start_minutes(datetime: Option<(u32, u32, f64)>) -> f64 {
    match datetime {
        Some((day, hour, minutes)) => {
            f64::from(day * MINUTES_PER_DAY) + f64::from(hour * 60) + minutes
        }
        None => 0.0,
    }
}

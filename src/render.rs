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

//! Layered SVG rendering of the base map and of per-route overlays.

use crate::objects::{Bus, Layer, RenderSettings, RouteKind, Stop};
use crate::routing::{RouteInfo, RouteItem};
use crate::svg::{Circle, Color, Document, Point, Polyline, Text};
use crate::yellow_pages::{Company, Rubric};
use std::collections::BTreeMap;
use typed_index_collection::CollectionWithId;

/// Everything the drawing functions read.
pub struct RenderContext<'a> {
    pub stops: &'a CollectionWithId<Stop>,
    pub buses: &'a CollectionWithId<Bus>,
    pub rubrics: &'a BTreeMap<u64, Rubric>,
    pub settings: &'a RenderSettings,
}

impl RenderContext<'_> {
    fn stop_xy(&self, name: &str) -> Option<Point> {
        self.stops.get(name).map(|stop| stop.xy)
    }

    fn palette(&self, color_id: usize) -> Color {
        self.settings.color_palette[color_id % self.settings.color_palette.len()].clone()
    }

    /// The underlayer/toplayer pair every label is drawn with.
    fn layered_label(
        &self,
        position: Point,
        offset: Point,
        font_size: u32,
        bold: bool,
        content: &str,
        top_fill: Color,
    ) -> (Text, Text) {
        let mut base = Text::new()
            .position(position)
            .offset(offset)
            .font_size(font_size)
            .font_family("Verdana")
            .content(content);
        if bold {
            base = base.bold();
        }
        let underlayer = base
            .clone()
            .fill(self.settings.underlayer_color.clone())
            .stroke(self.settings.underlayer_color.clone())
            .stroke_width(self.settings.underlayer_width)
            .round_line_caps();
        let toplayer = base.fill(top_fill);
        (underlayer, toplayer)
    }

    fn bus_label(&self, doc: &mut Document, position: Point, bus: &Bus) {
        let (underlayer, toplayer) = self.layered_label(
            position,
            self.settings.bus_label_offset,
            self.settings.bus_label_font_size,
            true,
            &bus.name,
            self.palette(bus.color_id),
        );
        doc.add(underlayer);
        doc.add(toplayer);
    }

    fn stop_label(&self, doc: &mut Document, position: Point, content: &str) {
        let (underlayer, toplayer) = self.layered_label(
            position,
            self.settings.stop_label_offset,
            self.settings.stop_label_font_size,
            false,
            content,
            Color::named("black"),
        );
        doc.add(underlayer);
        doc.add(toplayer);
    }

    fn stop_circle(&self, position: Point) -> Circle {
        Circle::new()
            .center(position)
            .radius(self.settings.stop_radius)
            .fill(Color::named("white"))
    }

    fn bus_polyline(&self, bus: &Bus) -> Polyline {
        Polyline::new()
            .stroke(self.palette(bus.color_id))
            .stroke_width(self.settings.line_width)
            .round_line_caps()
    }
}

/// Renders every layer of the base map, in settings order.
pub fn base_map(ctx: &RenderContext) -> Document {
    let mut doc = Document::default();
    for layer in &ctx.settings.layers {
        match layer {
            Layer::BusLines => draw_bus_lines(ctx, &mut doc),
            Layer::BusLabels => draw_bus_labels(ctx, &mut doc),
            Layer::StopPoints => draw_stop_points(ctx, &mut doc),
            Layer::StopLabels => draw_stop_labels(ctx, &mut doc),
            // company layers only exist on route overlays
            Layer::CompanyLines | Layer::CompanyPoints | Layer::CompanyLabels => {}
        }
    }
    doc
}

/// Dims the base map and renders the route overlay layers on top of it.
pub fn route_map(
    ctx: &RenderContext,
    base: Document,
    route: &RouteInfo,
    company: Option<&Company>,
) -> Document {
    let mut doc = base;
    dim_base(ctx, &mut doc);
    for layer in &ctx.settings.layers {
        match layer {
            Layer::BusLines => draw_route_bus_lines(ctx, &mut doc, route),
            Layer::BusLabels => draw_route_bus_labels(ctx, &mut doc, route),
            Layer::StopPoints => draw_route_stop_points(ctx, &mut doc, route),
            Layer::StopLabels => draw_route_stop_labels(ctx, &mut doc, route),
            Layer::CompanyLines => draw_company_line(ctx, &mut doc, route, company),
            Layer::CompanyPoints => draw_company_point(ctx, &mut doc, route, company),
            Layer::CompanyLabels => draw_company_label(ctx, &mut doc, route, company),
        }
    }
    doc
}

fn dim_base(ctx: &RenderContext, doc: &mut Document) {
    let margin = ctx.settings.outer_margin;
    doc.add(
        crate::svg::Rect::new()
            .corner(Point::new(-margin, -margin))
            .width(ctx.settings.width + 2.0 * margin)
            .height(ctx.settings.height + 2.0 * margin)
            .fill(ctx.settings.underlayer_color.clone()),
    );
}

fn draw_bus_lines(ctx: &RenderContext, doc: &mut Document) {
    for (_, bus) in ctx.buses.iter() {
        let mut line = ctx.bus_polyline(bus);
        match bus.kind {
            RouteKind::Round => {
                for name in &bus.stops {
                    if let Some(xy) = ctx.stop_xy(name) {
                        line = line.point(xy);
                    }
                }
            }
            RouteKind::TwoWay => {
                // forward, then fold back over the same stops
                for name in bus.stops.iter().chain(bus.stops.iter().rev().skip(1)) {
                    if let Some(xy) = ctx.stop_xy(name) {
                        line = line.point(xy);
                    }
                }
            }
        }
        doc.add(line);
    }
}

fn draw_bus_labels(ctx: &RenderContext, doc: &mut Document) {
    for (_, bus) in ctx.buses.iter() {
        let (first, last) = match (bus.stops.first(), bus.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => continue,
        };
        if let Some(xy) = ctx.stop_xy(first) {
            ctx.bus_label(doc, xy, bus);
        }
        if bus.kind == RouteKind::TwoWay && first != last {
            if let Some(xy) = ctx.stop_xy(last) {
                ctx.bus_label(doc, xy, bus);
            }
        }
    }
}

fn draw_stop_points(ctx: &RenderContext, doc: &mut Document) {
    for stop in ctx.stops.values() {
        doc.add(ctx.stop_circle(stop.xy));
    }
}

fn draw_stop_labels(ctx: &RenderContext, doc: &mut Document) {
    for stop in ctx.stops.values() {
        ctx.stop_label(doc, stop.xy, &stop.name);
    }
}

/// The stop indices a ride covers, in traversal order. The begin stop must
/// appear `span` positions before the end stop (forward), or after it on a
/// two-way bus (reverse).
fn ride_segment(bus: &Bus, begin: &str, end: &str, span: usize) -> Option<Vec<usize>> {
    let stops = &bus.stops;
    for j in 0..stops.len() {
        if stops[j] != begin {
            continue;
        }
        if let Some(candidate) = stops.get(j + span) {
            if candidate == end {
                return Some((j..=j + span).collect());
            }
        }
        if bus.kind == RouteKind::TwoWay && j >= span && stops[j - span] == end {
            return Some((j - span..=j).rev().collect());
        }
    }
    None
}

fn rides<'a>(route: &'a RouteInfo) -> impl Iterator<Item = (&'a str, &'a str, &'a str, usize)> + 'a {
    route.items.iter().filter_map(|item| match item {
        RouteItem::RideBus {
            bus,
            stop_begin,
            stop_end,
            span_count,
            ..
        } => Some((
            bus.as_str(),
            stop_begin.as_str(),
            stop_end.as_str(),
            *span_count as usize,
        )),
        _ => None,
    })
}

fn draw_route_bus_lines(ctx: &RenderContext, doc: &mut Document, route: &RouteInfo) {
    for (bus_name, begin, end, span) in rides(route) {
        let bus = match ctx.buses.get(bus_name) {
            Some(bus) => bus,
            None => continue,
        };
        if let Some(segment) = ride_segment(bus, begin, end, span) {
            let mut line = ctx.bus_polyline(bus);
            for index in segment {
                if let Some(xy) = ctx.stop_xy(&bus.stops[index]) {
                    line = line.point(xy);
                }
            }
            doc.add(line);
        }
    }
}

fn draw_route_bus_labels(ctx: &RenderContext, doc: &mut Document, route: &RouteInfo) {
    for (bus_name, begin, end, span) in rides(route) {
        let bus = match ctx.buses.get(bus_name) {
            Some(bus) => bus,
            None => continue,
        };
        if ride_segment(bus, begin, end, span).is_none() {
            continue;
        }
        let first = bus.stops.first().map(String::as_str);
        let last = bus.stops.last().map(String::as_str);
        let is_terminal = |name: &str| match bus.kind {
            RouteKind::Round => false,
            RouteKind::TwoWay => first == Some(name) || last == Some(name),
        };
        // a round bus is labeled at its first stop only, a two-way one at
        // both terminals
        let begin_labeled = match bus.kind {
            RouteKind::Round => first == Some(begin),
            RouteKind::TwoWay => is_terminal(begin),
        };
        let end_labeled = match bus.kind {
            RouteKind::Round => last == Some(end),
            RouteKind::TwoWay => is_terminal(end),
        };
        if begin_labeled {
            if let Some(xy) = ctx.stop_xy(begin) {
                ctx.bus_label(doc, xy, bus);
            }
        }
        if end_labeled {
            if let Some(xy) = ctx.stop_xy(end) {
                ctx.bus_label(doc, xy, bus);
            }
        }
    }
}

fn draw_route_stop_points(ctx: &RenderContext, doc: &mut Document, route: &RouteInfo) {
    for (bus_name, begin, end, span) in rides(route) {
        let bus = match ctx.buses.get(bus_name) {
            Some(bus) => bus,
            None => continue,
        };
        if let Some(segment) = ride_segment(bus, begin, end, span) {
            for index in segment {
                if let Some(xy) = ctx.stop_xy(&bus.stops[index]) {
                    doc.add(ctx.stop_circle(xy));
                }
            }
        }
    }
}

fn draw_route_stop_labels(ctx: &RenderContext, doc: &mut Document, route: &RouteInfo) {
    for item in &route.items {
        if let RouteItem::WaitBus { stop, .. } = item {
            if let Some(xy) = ctx.stop_xy(stop) {
                ctx.stop_label(doc, xy, stop);
            }
        }
    }
    // also label where the rider ends up
    let final_stop = match route.items.first() {
        Some(RouteItem::WalkToCompany { stop, .. }) => Some(stop),
        Some(_) => route.items.iter().rev().find_map(|item| match item {
            RouteItem::RideBus { stop_end, .. } => Some(stop_end),
            _ => None,
        }),
        None => None,
    };
    if let Some(stop) = final_stop {
        if let Some(xy) = ctx.stop_xy(stop) {
            ctx.stop_label(doc, xy, stop);
        }
    }
}

fn final_walk(route: &RouteInfo) -> Option<&str> {
    route.items.iter().rev().find_map(|item| match item {
        RouteItem::WalkToCompany { stop, .. } => Some(stop.as_str()),
        _ => None,
    })
}

fn company_xy(company: &Company) -> Point {
    // pixel coordinates live in the lon/lat fields after layout
    Point::new(company.address.coords.lon, company.address.coords.lat)
}

fn draw_company_line(
    ctx: &RenderContext,
    doc: &mut Document,
    route: &RouteInfo,
    company: Option<&Company>,
) {
    let (company, stop) = match (company, final_walk(route)) {
        (Some(company), Some(stop)) => (company, stop),
        _ => return,
    };
    if let Some(xy) = ctx.stop_xy(stop) {
        doc.add(
            Polyline::new()
                .stroke(Color::named("black"))
                .stroke_width(ctx.settings.company_line_width)
                .round_line_caps()
                .point(xy)
                .point(company_xy(company)),
        );
    }
}

fn draw_company_point(
    ctx: &RenderContext,
    doc: &mut Document,
    route: &RouteInfo,
    company: Option<&Company>,
) {
    let company = match (company, final_walk(route)) {
        (Some(company), Some(_)) => company,
        _ => return,
    };
    doc.add(
        Circle::new()
            .center(company_xy(company))
            .radius(ctx.settings.company_radius)
            .fill(Color::named("black")),
    );
}

fn draw_company_label(
    ctx: &RenderContext,
    doc: &mut Document,
    route: &RouteInfo,
    company: Option<&Company>,
) {
    let company = match (company, final_walk(route)) {
        (Some(company), Some(_)) => company,
        _ => return,
    };
    let mut content = company.main_name().to_string();
    if let Some(rubric) = company
        .rubrics
        .first()
        .and_then(|id| ctx.rubrics.get(id))
    {
        content = format!("{} {}", rubric.name, content);
    }
    ctx.stop_label(doc, company_xy(company), &content);
}

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

//! Minimal SVG primitives and a compact document writer.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// A position in map pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// An SVG color, as found in the render settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Color {
    Named(String),
    Rgb { red: u8, green: u8, blue: u8 },
    Rgba { red: u8, green: u8, blue: u8, alpha: f64 },
}

impl Color {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Color::Named(name.into())
    }

    fn to_attr(&self) -> String {
        match self {
            Color::Named(name) => name.clone(),
            Color::Rgb { red, green, blue } => format!("rgb({},{},{})", red, green, blue),
            Color::Rgba {
                red,
                green,
                blue,
                alpha,
            } => format!("rgba({},{},{},{})", red, green, blue, alpha),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Style {
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: f64,
    line_cap: Option<&'static str>,
    line_join: Option<&'static str>,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            line_cap: None,
            line_join: None,
        }
    }
}

impl Style {
    fn push_attrs(&self, start: &mut BytesStart) {
        let fill = self.fill.as_ref().map_or_else(|| "none".to_string(), Color::to_attr);
        start.push_attribute(("fill", fill.as_str()));
        let stroke = self
            .stroke
            .as_ref()
            .map_or_else(|| "none".to_string(), Color::to_attr);
        start.push_attribute(("stroke", stroke.as_str()));
        start.push_attribute(("stroke-width", fmt_num(self.stroke_width).as_str()));
        if let Some(cap) = self.line_cap {
            start.push_attribute(("stroke-linecap", cap));
        }
        if let Some(join) = self.line_join {
            start.push_attribute(("stroke-linejoin", join));
        }
    }
}

macro_rules! style_setters {
    ($shape:ty) => {
        impl $shape {
            pub fn fill(mut self, color: Color) -> Self {
                self.style.fill = Some(color);
                self
            }
            pub fn stroke(mut self, color: Color) -> Self {
                self.style.stroke = Some(color);
                self
            }
            pub fn stroke_width(mut self, width: f64) -> Self {
                self.style.stroke_width = width;
                self
            }
            /// Round both the line caps and the line joins.
            pub fn round_line_caps(mut self) -> Self {
                self.style.line_cap = Some("round");
                self.style.line_join = Some("round");
                self
            }
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circle {
    center: Point,
    radius: f64,
    style: Style,
}

impl Circle {
    pub fn new() -> Self {
        Circle {
            radius: 1.0,
            ..Circle::default()
        }
    }

    pub fn center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }
}
style_setters!(Circle);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    points: Vec<Point>,
    style: Style,
}

impl Polyline {
    pub fn new() -> Self {
        Polyline::default()
    }

    pub fn point(mut self, point: Point) -> Self {
        self.points.push(point);
        self
    }
}
style_setters!(Polyline);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rect {
    corner: Point,
    width: f64,
    height: f64,
    style: Style,
}

impl Rect {
    pub fn new() -> Self {
        Rect::default()
    }

    pub fn corner(mut self, corner: Point) -> Self {
        self.corner = corner;
        self
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }
}
style_setters!(Rect);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    position: Point,
    offset: Point,
    font_size: u32,
    font_family: Option<String>,
    font_weight: Option<&'static str>,
    content: String,
    style: Style,
}

impl Text {
    pub fn new() -> Self {
        Text {
            font_size: 1,
            ..Text::default()
        }
    }

    pub fn position(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    pub fn font_family<S: Into<String>>(mut self, family: S) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn bold(mut self) -> Self {
        self.font_weight = Some("bold");
        self
    }

    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }
}
style_setters!(Text);

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Polyline(Polyline),
    Rect(Rect),
    Text(Text),
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}
impl From<Polyline> for Shape {
    fn from(polyline: Polyline) -> Self {
        Shape::Polyline(polyline)
    }
}
impl From<Rect> for Shape {
    fn from(rect: Rect) -> Self {
        Shape::Rect(rect)
    }
}
impl From<Text> for Shape {
    fn from(text: Text) -> Self {
        Shape::Text(text)
    }
}

/// An ordered list of shapes, rendered back to front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    shapes: Vec<Shape>,
}

impl Document {
    pub fn add<S: Into<Shape>>(&mut self, shape: S) {
        self.shapes.push(shape.into());
    }

    pub fn write_to<W: Write>(&self, inner: W) -> io::Result<()> {
        let mut writer = Writer::new(inner);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err_to_io)?;
        let mut svg = BytesStart::new("svg");
        svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        svg.push_attribute(("version", "1.1"));
        writer
            .write_event(Event::Start(svg))
            .map_err(xml_err_to_io)?;
        for shape in &self.shapes {
            write_shape(&mut writer, shape)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("svg")))
            .map_err(xml_err_to_io)?;
        Ok(())
    }

    /// Renders the document as a compact, single-line SVG string.
    pub fn render(&self) -> crate::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn xml_err_to_io(err: quick_xml::Error) -> io::Error {
    match err {
        quick_xml::Error::Io(err) => match std::sync::Arc::try_unwrap(err) {
            Ok(err) => err,
            Err(err) => io::Error::new(err.kind(), err.to_string()),
        },
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

fn write_shape<W: Write>(writer: &mut Writer<W>, shape: &Shape) -> io::Result<()> {
    match shape {
        Shape::Circle(circle) => {
            let mut start = BytesStart::new("circle");
            start.push_attribute(("cx", fmt_num(circle.center.x).as_str()));
            start.push_attribute(("cy", fmt_num(circle.center.y).as_str()));
            start.push_attribute(("r", fmt_num(circle.radius).as_str()));
            circle.style.push_attrs(&mut start);
            writer.write_event(Event::Empty(start)).map_err(xml_err_to_io)
        }
        Shape::Polyline(polyline) => {
            let mut start = BytesStart::new("polyline");
            let points = polyline
                .points
                .iter()
                .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
                .collect::<Vec<_>>()
                .join(" ");
            start.push_attribute(("points", points.as_str()));
            polyline.style.push_attrs(&mut start);
            writer.write_event(Event::Empty(start)).map_err(xml_err_to_io)
        }
        Shape::Rect(rect) => {
            let mut start = BytesStart::new("rect");
            start.push_attribute(("x", fmt_num(rect.corner.x).as_str()));
            start.push_attribute(("y", fmt_num(rect.corner.y).as_str()));
            start.push_attribute(("width", fmt_num(rect.width).as_str()));
            start.push_attribute(("height", fmt_num(rect.height).as_str()));
            rect.style.push_attrs(&mut start);
            writer.write_event(Event::Empty(start)).map_err(xml_err_to_io)
        }
        Shape::Text(text) => {
            let mut start = BytesStart::new("text");
            start.push_attribute(("x", fmt_num(text.position.x).as_str()));
            start.push_attribute(("y", fmt_num(text.position.y).as_str()));
            start.push_attribute(("dx", fmt_num(text.offset.x).as_str()));
            start.push_attribute(("dy", fmt_num(text.offset.y).as_str()));
            start.push_attribute(("font-size", text.font_size.to_string().as_str()));
            if let Some(family) = &text.font_family {
                start.push_attribute(("font-family", family.as_str()));
            }
            if let Some(weight) = text.font_weight {
                start.push_attribute(("font-weight", weight));
            }
            text.style.push_attrs(&mut start);
            writer
                .write_event(Event::Start(start))
                .map_err(xml_err_to_io)?;
            writer
                .write_event(Event::Text(BytesText::new(&text.content)))
                .map_err(xml_err_to_io)?;
            writer
                .write_event(Event::End(BytesEnd::new("text")))
                .map_err(xml_err_to_io)
        }
    }
}

fn fmt_num(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_attrs() {
        assert_eq!("white", Color::named("white").to_attr());
        assert_eq!(
            "rgb(1,2,3)",
            Color::Rgb {
                red: 1,
                green: 2,
                blue: 3
            }
            .to_attr()
        );
        assert_eq!(
            "rgba(1,2,3,0.5)",
            Color::Rgba {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 0.5
            }
            .to_attr()
        );
    }

    #[test]
    fn circle_document() {
        let mut doc = Document::default();
        doc.add(
            Circle::new()
                .center(Point::new(10.0, 20.5))
                .radius(3.0)
                .fill(Color::named("white")),
        );
        let svg = doc.render().unwrap();
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">"));
        assert!(svg.contains("<circle cx=\"10\" cy=\"20.5\" r=\"3\" fill=\"white\" stroke=\"none\" stroke-width=\"1\"/>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn polyline_points_and_caps() {
        let mut doc = Document::default();
        doc.add(
            Polyline::new()
                .point(Point::new(0.0, 0.0))
                .point(Point::new(1.5, 2.0))
                .stroke(Color::named("green"))
                .stroke_width(2.0)
                .round_line_caps(),
        );
        let svg = doc.render().unwrap();
        assert!(svg.contains("points=\"0,0 1.5,2\""));
        assert!(svg.contains("stroke-linecap=\"round\" stroke-linejoin=\"round\""));
    }

    #[test]
    fn text_is_escaped() {
        let mut doc = Document::default();
        doc.add(
            Text::new()
                .position(Point::new(1.0, 1.0))
                .font_size(12)
                .font_family("Verdana")
                .bold()
                .content("Fish & Chips"),
        );
        let svg = doc.render().unwrap();
        assert!(svg.contains("font-family=\"Verdana\" font-weight=\"bold\""));
        assert!(svg.contains(">Fish &amp; Chips</text>"));
    }
}

//! Hyperlink and anchor discovery on fixed pages.
//!
//! A page is walked in document order with the current transform, and the
//! page-space bounds of every element are reported to a [`LinkResolver`]
//! through [`LinkResolver::extract_anchor_info`]. Bounds come from:
//!
//! - `FixedPage`: its `Width`/`Height`
//! - `Path`: the abbreviated geometry in `Data` (or `PathGeometry Figures`)
//! - `Canvas`: the union of its children
//!
//! Elements whose bounds cannot be computed (glyph runs, resource
//! references) report nothing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::geometry::{Matrix, Point, Rect};
use crate::links::LinkResolver;
use crate::xml::XmlElement;

lazy_static! {
    /// Path-geometry token: a command letter or a number
    static ref RE_PATH_TOKEN: Regex =
        Regex::new(r"[A-Za-z]|[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").unwrap();
}

/// Report the navigable regions and anchors of `page` to `resolver`.
///
/// The resolver's base should be the page part so relative targets resolve.
pub fn scan_page(page: &XmlElement, resolver: &mut LinkResolver) {
    let mut reported = 0usize;
    visit(page, &Matrix::identity(), resolver, &mut reported);
    log::trace!("page '{}': {} elements with bounds", resolver.base(), reported);
}

fn visit(
    element: &XmlElement,
    parent: &Matrix,
    resolver: &mut LinkResolver,
    reported: &mut usize,
) -> Option<Rect> {
    let ctm = match render_transform(element) {
        Some(local) => local.then(parent),
        None => *parent,
    };

    let mut children_bounds: Option<Rect> = None;
    for child in element.children() {
        if let Some(rect) = visit(child, &ctm, resolver, reported) {
            children_bounds = Some(match children_bounds {
                Some(acc) => union(&acc, &rect),
                None => rect,
            });
        }
    }

    let bounds = match element.local_name() {
        "FixedPage" => page_bounds(element),
        "Path" => path_data(element)
            .and_then(path_bounds)
            .map(|rect| rect.transform(&ctm)),
        "Canvas" => children_bounds,
        _ => None,
    }?;

    *reported += 1;
    resolver.extract_anchor_info(element, bounds);
    Some(bounds)
}

fn union(a: &Rect, b: &Rect) -> Rect {
    Rect::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
}

fn page_bounds(page: &XmlElement) -> Option<Rect> {
    let width: f32 = page.attr("Width")?.trim().parse().ok()?;
    let height: f32 = page.attr("Height")?.trim().parse().ok()?;
    Some(Rect::new(0.0, 0.0, width, height))
}

/// `RenderTransform` attribute, or a `<X.RenderTransform><MatrixTransform/>` child.
fn render_transform(element: &XmlElement) -> Option<Matrix> {
    if let Some(text) = element.attr("RenderTransform") {
        return Matrix::parse(text);
    }
    let property = format!("{}.RenderTransform", element.local_name());
    let matrix = element
        .children_named(&property)
        .flat_map(|wrapper| wrapper.children_named("MatrixTransform"))
        .find_map(|transform| transform.attr("Matrix").and_then(Matrix::parse));
    matrix
}

fn path_data(path: &XmlElement) -> Option<&str> {
    if let Some(data) = path.attr("Data") {
        return Some(data);
    }
    path.children_named("Path.Data")
        .flat_map(|wrapper| wrapper.children_named("PathGeometry"))
        .find_map(|geometry| geometry.attr("Figures"))
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Command(char),
    Number(f32),
}

fn tokenize(data: &str) -> Option<Vec<Token>> {
    RE_PATH_TOKEN
        .find_iter(data)
        .map(|m| {
            let text = m.as_str();
            match text.chars().next() {
                Some(c) if c.is_ascii_alphabetic() && text.len() == 1 => Some(Token::Command(c)),
                _ => text.parse().ok().map(Token::Number),
            }
        })
        .collect()
}

/// Bounds of abbreviated path geometry, control points included.
///
/// Returns `None` for resource references and unknown commands.
///
/// ```
/// use xps_structure::geometry::Rect;
/// use xps_structure::page::path_bounds;
///
/// assert_eq!(path_bounds("M 10,10 L 110,10 110,60 Z"), Some(Rect::new(10.0, 10.0, 110.0, 60.0)));
/// assert_eq!(path_bounds("{StaticResource Shape}"), None);
/// ```
pub fn path_bounds(data: &str) -> Option<Rect> {
    if data.trim_start().starts_with('{') {
        return None;
    }
    let tokens = tokenize(data)?;

    let mut points = Vec::new();
    let mut current = Point::new(0.0, 0.0);
    let mut start = current;
    let mut command: Option<char> = None;
    let mut i = 0;

    while i < tokens.len() {
        if let Token::Command(c) = tokens[i] {
            i += 1;
            match c {
                // Fill rule flag, followed by 0 or 1.
                'F' | 'f' => {
                    i += 1;
                    command = None;
                },
                'Z' | 'z' => {
                    current = start;
                    command = None;
                },
                other => command = Some(other),
            }
            continue;
        }

        let c = command?;
        let arity = match c.to_ascii_uppercase() {
            'M' | 'L' => 2,
            'H' | 'V' => 1,
            'C' => 6,
            'Q' | 'S' => 4,
            'A' => 7,
            _ => return None,
        };
        let mut args = [0f32; 7];
        for slot in args.iter_mut().take(arity) {
            match tokens.get(i) {
                Some(Token::Number(n)) => *slot = *n,
                _ => return Rect::bounding(points),
            }
            i += 1;
        }

        let origin = if c.is_ascii_lowercase() {
            current
        } else {
            Point::new(0.0, 0.0)
        };
        let at = |x: f32, y: f32| Point::new(origin.x + x, origin.y + y);

        match c.to_ascii_uppercase() {
            'M' | 'L' => {
                current = at(args[0], args[1]);
                if c.eq_ignore_ascii_case(&'M') {
                    start = current;
                    // Further coordinate pairs are implicit line segments.
                    command = Some(if c == 'M' { 'L' } else { 'l' });
                }
                points.push(current);
            },
            'H' => {
                current = Point::new(origin.x + args[0], current.y);
                points.push(current);
            },
            'V' => {
                current = Point::new(current.x, origin.y + args[0]);
                points.push(current);
            },
            'A' => {
                current = at(args[5], args[6]);
                points.push(current);
            },
            _ => {
                for pair in args[..arity].chunks(2) {
                    points.push(at(pair[0], pair[1]));
                }
                current = at(args[arity - 2], args[arity - 1]);
            },
        }
    }

    Rect::bounding(points)
}

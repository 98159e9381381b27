//! Parser for the subset of OGC CQL used in layer filters.
//!
//! Supported: comparisons (`= <> != < <= > >=`), `[NOT] LIKE`,
//! `IS [NOT] NULL`, `[NOT] BETWEEN .. AND ..`, `[NOT] IN (..)`,
//! `BBOX(prop, minx, miny, maxx, maxy[, 'srs'])`, `INTERSECTS`, `WITHIN`
//! and `CONTAINS` against a WKT geometry, `DWITHIN(prop, geom, distance,
//! units)`, `INCLUDE`, `EXCLUDE`, combined with `NOT`, `AND`, `OR` and
//! parentheses. Keywords are case-insensitive; `AND` binds tighter than `OR`.

use foundation::Extent;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, none_of, one_of, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::feature::FeatureGeometry;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialOp {
    Intersects,
    Within,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Include,
    Exclude,
    Comparison {
        property: String,
        op: ComparisonOp,
        value: Literal,
    },
    Like {
        property: String,
        pattern: String,
        negated: bool,
    },
    IsNull {
        property: String,
        negated: bool,
    },
    Between {
        property: String,
        low: Literal,
        high: Literal,
        negated: bool,
    },
    In {
        property: String,
        values: Vec<Literal>,
        negated: bool,
    },
    BBox {
        property: String,
        extent: Extent,
        srs: Option<String>,
    },
    Spatial {
        op: SpatialOp,
        property: String,
        geometry: FeatureGeometry,
    },
    DWithin {
        property: String,
        geometry: FeatureGeometry,
        distance: f64,
        units: String,
    },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CqlError {
    /// Byte offset where parsing stopped.
    pub offset: usize,
    pub input: String,
}

impl std::fmt::Display for CqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid CQL filter at offset {}: {:?}",
            self.offset, self.input
        )
    }
}

impl std::error::Error for CqlError {}

const KEYWORDS: &[&str] = &[
    "AND",
    "OR",
    "NOT",
    "LIKE",
    "IS",
    "NULL",
    "BETWEEN",
    "IN",
    "INCLUDE",
    "EXCLUDE",
    "BBOX",
    "INTERSECTS",
    "WITHIN",
    "CONTAINS",
    "DWITHIN",
];

pub fn parse(input: &str) -> Result<Filter, CqlError> {
    match all_consuming(ws(or_expr))(input) {
        Ok((_, filter)) => Ok(filter),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(CqlError {
            offset: input.len() - e.input.len(),
            input: input.to_string(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(CqlError {
            offset: input.len(),
            input: input.to_string(),
        }),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':' || c == '.'
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(satisfy(is_ident_char)))
}

fn bare_identifier(i: &str) -> IResult<&str, String> {
    let (rest, id) = recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(i)?;
    if KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(id)) {
        return Err(nom::Err::Error(Error::new(i, ErrorKind::Tag)));
    }
    Ok((rest, id.to_string()))
}

fn quoted_identifier(i: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while1(|c| c != '"'), char('"')),
        |s: &str| s.to_string(),
    )(i)
}

fn property(i: &str) -> IResult<&str, String> {
    alt((quoted_identifier, bare_identifier))(i)
}

fn text(i: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        map(
            many0(alt((value('\'', tag("''")), none_of("'")))),
            |chars: Vec<char>| chars.into_iter().collect(),
        ),
        char('\''),
    )(i)
}

fn number(i: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), opt(digit1))),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>(),
    )(i)
}

fn literal(i: &str) -> IResult<&str, Literal> {
    alt((map(text, Literal::Text), map(number, Literal::Number)))(i)
}

fn comparison_op(i: &str) -> IResult<&str, ComparisonOp> {
    alt((
        value(ComparisonOp::Ne, tag("<>")),
        value(ComparisonOp::Ne, tag("!=")),
        value(ComparisonOp::Le, tag("<=")),
        value(ComparisonOp::Ge, tag(">=")),
        value(ComparisonOp::Eq, tag("=")),
        value(ComparisonOp::Lt, tag("<")),
        value(ComparisonOp::Gt, tag(">")),
    ))(i)
}

fn negation(i: &str) -> IResult<&str, bool> {
    map(opt(ws(keyword("NOT"))), |n| n.is_some())(i)
}

fn predicate(i: &str) -> IResult<&str, Filter> {
    let (i, name) = ws(property)(i)?;
    let p = name.as_str();
    alt((
        map(pair(ws(comparison_op), ws(literal)), |(op, value)| {
            Filter::Comparison {
                property: p.to_string(),
                op,
                value,
            }
        }),
        map(
            tuple((negation, ws(keyword("LIKE")), ws(text))),
            |(negated, _, pattern)| Filter::Like {
                property: p.to_string(),
                pattern,
                negated,
            },
        ),
        map(
            tuple((ws(keyword("IS")), negation, ws(keyword("NULL")))),
            |(_, negated, _)| Filter::IsNull {
                property: p.to_string(),
                negated,
            },
        ),
        map(
            tuple((
                negation,
                ws(keyword("BETWEEN")),
                ws(literal),
                ws(keyword("AND")),
                ws(literal),
            )),
            |(negated, _, low, _, high)| Filter::Between {
                property: p.to_string(),
                low,
                high,
                negated,
            },
        ),
        map(
            tuple((
                negation,
                ws(keyword("IN")),
                delimited(
                    ws(char('(')),
                    separated_list1(ws(char(',')), ws(literal)),
                    ws(char(')')),
                ),
            )),
            |(negated, _, values)| Filter::In {
                property: p.to_string(),
                values,
                negated,
            },
        ),
    ))(i)
}

fn comma(i: &str) -> IResult<&str, char> {
    ws(char(','))(i)
}

fn bbox(i: &str) -> IResult<&str, Filter> {
    map(
        preceded(
            ws(keyword("BBOX")),
            delimited(
                ws(char('(')),
                tuple((
                    ws(property),
                    preceded(comma, ws(number)),
                    preceded(comma, ws(number)),
                    preceded(comma, ws(number)),
                    preceded(comma, ws(number)),
                    opt(preceded(comma, ws(text))),
                )),
                ws(char(')')),
            ),
        ),
        |(property, minx, miny, maxx, maxy, srs)| Filter::BBox {
            property,
            extent: Extent::from_bounds([minx, miny, maxx, maxy]),
            srs,
        },
    )(i)
}

fn coordinate(i: &str) -> IResult<&str, [f64; 2]> {
    map(pair(ws(number), ws(number)), |(x, y)| [x, y])(i)
}

fn parenthesised<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(ws(char('(')), inner, ws(char(')')))
}

fn coordinates(i: &str) -> IResult<&str, Vec<[f64; 2]>> {
    parenthesised(separated_list1(comma, coordinate))(i)
}

fn rings(i: &str) -> IResult<&str, Vec<Vec<[f64; 2]>>> {
    parenthesised(separated_list1(comma, coordinates))(i)
}

/// Two-dimensional WKT geometry.
fn geometry(i: &str) -> IResult<&str, FeatureGeometry> {
    alt((
        map(
            preceded(ws(keyword("POINT")), parenthesised(coordinate)),
            FeatureGeometry::Point,
        ),
        map(
            preceded(
                ws(keyword("MULTIPOINT")),
                parenthesised(separated_list1(
                    comma,
                    alt((parenthesised(coordinate), coordinate)),
                )),
            ),
            FeatureGeometry::MultiPoint,
        ),
        map(
            preceded(ws(keyword("LINESTRING")), coordinates),
            FeatureGeometry::LineString,
        ),
        map(
            preceded(ws(keyword("MULTILINESTRING")), rings),
            FeatureGeometry::MultiLineString,
        ),
        map(
            preceded(ws(keyword("POLYGON")), rings),
            FeatureGeometry::Polygon,
        ),
        map(
            preceded(
                ws(keyword("MULTIPOLYGON")),
                parenthesised(separated_list1(comma, rings)),
            ),
            FeatureGeometry::MultiPolygon,
        ),
    ))(i)
}

fn spatial_op(i: &str) -> IResult<&str, SpatialOp> {
    alt((
        value(SpatialOp::Intersects, keyword("INTERSECTS")),
        value(SpatialOp::Within, keyword("WITHIN")),
        value(SpatialOp::Contains, keyword("CONTAINS")),
    ))(i)
}

fn spatial(i: &str) -> IResult<&str, Filter> {
    map(
        pair(
            ws(spatial_op),
            parenthesised(pair(ws(property), preceded(comma, geometry))),
        ),
        |(op, (property, geometry))| Filter::Spatial {
            op,
            property,
            geometry,
        },
    )(i)
}

fn units(i: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        |s: &str| s.to_string(),
    )(i)
}

fn dwithin(i: &str) -> IResult<&str, Filter> {
    map(
        preceded(
            ws(keyword("DWITHIN")),
            parenthesised(tuple((
                ws(property),
                preceded(comma, geometry),
                preceded(comma, ws(number)),
                preceded(comma, ws(units)),
            ))),
        ),
        |(property, geometry, distance, units)| Filter::DWithin {
            property,
            geometry,
            distance,
            units,
        },
    )(i)
}

fn primary(i: &str) -> IResult<&str, Filter> {
    alt((
        value(Filter::Include, ws(keyword("INCLUDE"))),
        value(Filter::Exclude, ws(keyword("EXCLUDE"))),
        bbox,
        spatial,
        dwithin,
        delimited(ws(char('(')), or_expr, ws(char(')'))),
        predicate,
    ))(i)
}

fn not_expr(i: &str) -> IResult<&str, Filter> {
    alt((
        map(preceded(ws(keyword("NOT")), not_expr), |f| {
            Filter::Not(Box::new(f))
        }),
        primary,
    ))(i)
}

fn and_expr(i: &str) -> IResult<&str, Filter> {
    let (i, first) = not_expr(i)?;
    let (i, rest) = many0(preceded(ws(keyword("AND")), not_expr))(i)?;
    Ok((i, combine(first, rest, Filter::And)))
}

fn or_expr(i: &str) -> IResult<&str, Filter> {
    let (i, first) = and_expr(i)?;
    let (i, rest) = many0(preceded(ws(keyword("OR")), and_expr))(i)?;
    Ok((i, combine(first, rest, Filter::Or)))
}

fn combine(first: Filter, rest: Vec<Filter>, join: fn(Vec<Filter>) -> Filter) -> Filter {
    if rest.is_empty() {
        return first;
    }
    let mut all = Vec::with_capacity(rest.len() + 1);
    all.push(first);
    all.extend(rest);
    join(all)
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Number(n) => write!(f, "{n}"),
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for SpatialOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SpatialOp::Intersects => "INTERSECTS",
            SpatialOp::Within => "WITHIN",
            SpatialOp::Contains => "CONTAINS",
        })
    }
}

struct Wkt<'a>(&'a FeatureGeometry);

fn write_coordinates(f: &mut std::fmt::Formatter<'_>, points: &[[f64; 2]]) -> std::fmt::Result {
    f.write_str("(")?;
    for (i, [x, y]) in points.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{x} {y}")?;
    }
    f.write_str(")")
}

fn write_rings(f: &mut std::fmt::Formatter<'_>, rings: &[Vec<[f64; 2]>]) -> std::fmt::Result {
    f.write_str("(")?;
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_coordinates(f, ring)?;
    }
    f.write_str(")")
}

impl std::fmt::Display for Wkt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            FeatureGeometry::Point([x, y]) => write!(f, "POINT({x} {y})"),
            FeatureGeometry::MultiPoint(points) => {
                f.write_str("MULTIPOINT")?;
                write_coordinates(f, points)
            }
            FeatureGeometry::LineString(points) => {
                f.write_str("LINESTRING")?;
                write_coordinates(f, points)
            }
            FeatureGeometry::MultiLineString(lines) => {
                f.write_str("MULTILINESTRING")?;
                write_rings(f, lines)
            }
            FeatureGeometry::Polygon(rings) => {
                f.write_str("POLYGON")?;
                write_rings(f, rings)
            }
            FeatureGeometry::MultiPolygon(polygons) => {
                f.write_str("MULTIPOLYGON(")?;
                for (i, polygon) in polygons.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_rings(f, polygon)?;
                }
                f.write_str(")")
            }
        }
    }
}

struct Property<'a>(&'a str);

impl std::fmt::Display for Property<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match bare_identifier(self.0) {
            Ok(("", _)) => f.write_str(self.0),
            _ => write!(f, "\"{}\"", self.0),
        }
    }
}

fn not_kw(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),
            Filter::Comparison {
                property,
                op,
                value,
            } => write!(f, "{} {op} {value}", Property(property)),
            Filter::Like {
                property,
                pattern,
                negated,
            } => write!(
                f,
                "{} {}LIKE {}",
                Property(property),
                not_kw(*negated),
                Literal::Text(pattern.clone())
            ),
            Filter::IsNull { property, negated } => {
                write!(f, "{} IS {}NULL", Property(property), not_kw(*negated))
            }
            Filter::Between {
                property,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}BETWEEN {low} AND {high}",
                Property(property),
                not_kw(*negated)
            ),
            Filter::In {
                property,
                values,
                negated,
            } => {
                write!(f, "{} {}IN (", Property(property), not_kw(*negated))?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
            Filter::BBox {
                property,
                extent,
                srs,
            } => {
                let [minx, miny, maxx, maxy] = extent.to_bounds();
                write!(
                    f,
                    "BBOX({}, {minx}, {miny}, {maxx}, {maxy}",
                    Property(property)
                )?;
                if let Some(srs) = srs {
                    write!(f, ", {}", Literal::Text(srs.clone()))?;
                }
                f.write_str(")")
            }
            Filter::Spatial {
                op,
                property,
                geometry,
            } => write!(f, "{op}({}, {})", Property(property), Wkt(geometry)),
            Filter::DWithin {
                property,
                geometry,
                distance,
                units,
            } => write!(
                f,
                "DWITHIN({}, {}, {distance}, {units})",
                Property(property),
                Wkt(geometry)
            ),
            Filter::Not(inner) => write!(f, "NOT ({inner})"),
            Filter::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    match part {
                        Filter::Or(_) => write!(f, "({part})")?,
                        _ => write!(f, "{part}")?,
                    }
                }
                Ok(())
            }
            Filter::Or(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

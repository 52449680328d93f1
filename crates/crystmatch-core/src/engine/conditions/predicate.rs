use crate::core::models::ids::PackId;
use crate::core::utils::geometry::{
    Plane, angle_degrees, centroid, distance, max_plane_deviation, plane_angle_degrees,
};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A template node of a pack. The pack key is generic so that queries can
/// refer to packs by position before they are registered with an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Anchor<P = PackId> {
    pub pack: P,
    /// Zero-based template node index.
    pub node: usize,
}

impl<P> Anchor<P> {
    pub fn new(pack: P, node: usize) -> Self {
        Self { pack, node }
    }
}

/// A geometric quantity measured over matched atoms. Lengths are in
/// Ångström, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Measure<P = PackId> {
    Distance(Anchor<P>, Anchor<P>),
    /// Angle at the middle anchor, in `[0, 180]`.
    Angle(Anchor<P>, Anchor<P>, Anchor<P>),
    /// Angle between the least-squares planes of two point sets, in `[0, 90]`.
    PlaneAngle(Vec<Anchor<P>>, Vec<Anchor<P>>),
    CentroidDistance(Vec<Anchor<P>>, Vec<Anchor<P>>),
    MaxPlaneDeviation(Vec<Anchor<P>>),
}

impl<P> Measure<P> {
    /// Plane angle between `anchors[..split]` and `anchors[split..]`.
    pub fn plane_angle_split(mut anchors: Vec<Anchor<P>>, split: usize) -> Self {
        let second = anchors.split_off(split.min(anchors.len()));
        Self::PlaneAngle(anchors, second)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Distance(..) => "distance",
            Self::Angle(..) => "angle",
            Self::PlaneAngle(..) => "plane-angle",
            Self::CentroidDistance(..) => "centroid-distance",
            Self::MaxPlaneDeviation(..) => "max-plane-deviation",
        }
    }

    /// The anchor sets of the measure, in argument order.
    pub fn anchor_sets(&self) -> Vec<&[Anchor<P>]> {
        match self {
            Self::Distance(a, b) => vec![std::slice::from_ref(a), std::slice::from_ref(b)],
            Self::Angle(a, b, c) => vec![
                std::slice::from_ref(a),
                std::slice::from_ref(b),
                std::slice::from_ref(c),
            ],
            Self::PlaneAngle(s1, s2) | Self::CentroidDistance(s1, s2) => {
                vec![s1.as_slice(), s2.as_slice()]
            }
            Self::MaxPlaneDeviation(s) => vec![s.as_slice()],
        }
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Anchor<P>> {
        self.anchor_sets().into_iter().flatten()
    }

    /// Replaces every pack key, failing on the first key `f` rejects.
    pub fn try_map_packs<Q, E>(
        &self,
        mut f: impl FnMut(&P) -> Result<Q, E>,
    ) -> Result<Measure<Q>, E> {
        let mut map =
            |a: &Anchor<P>| -> Result<Anchor<Q>, E> { Ok(Anchor::new(f(&a.pack)?, a.node)) };
        Ok(match self {
            Self::Distance(a, b) => Measure::Distance(map(a)?, map(b)?),
            Self::Angle(a, b, c) => Measure::Angle(map(a)?, map(b)?, map(c)?),
            Self::PlaneAngle(s1, s2) => Measure::PlaneAngle(
                s1.iter().map(&mut map).collect::<Result<_, _>>()?,
                s2.iter().map(&mut map).collect::<Result<_, _>>()?,
            ),
            Self::CentroidDistance(s1, s2) => Measure::CentroidDistance(
                s1.iter().map(&mut map).collect::<Result<_, _>>()?,
                s2.iter().map(&mut map).collect::<Result<_, _>>()?,
            ),
            Self::MaxPlaneDeviation(s) => {
                Measure::MaxPlaneDeviation(s.iter().map(&mut map).collect::<Result<_, _>>()?)
            }
        })
    }

    /// Computes the value for one placement of the anchors, or `None` when
    /// the geometry is degenerate (zero-length angle arm, fewer than three
    /// points for a plane).
    pub fn evaluate(&self, position: impl Fn(&Anchor<P>) -> Point3<f64>) -> Option<f64> {
        let points =
            |set: &[Anchor<P>]| -> Vec<Point3<f64>> { set.iter().map(&position).collect() };
        match self {
            Self::Distance(a, b) => Some(distance(&position(a), &position(b))),
            Self::Angle(a, b, c) => angle_degrees(&position(a), &position(b), &position(c)),
            Self::PlaneAngle(s1, s2) => {
                let first = Plane::fit(&points(s1))?;
                let second = Plane::fit(&points(s2))?;
                Some(plane_angle_degrees(&first, &second))
            }
            Self::CentroidDistance(s1, s2) => {
                Some(distance(&centroid(&points(s1))?, &centroid(&points(s2))?))
            }
            Self::MaxPlaneDeviation(s) => max_plane_deviation(&points(s)),
        }
    }
}

impl<P: PartialEq + Copy> Measure<P> {
    /// Distinct packs referenced, in order of first appearance.
    pub fn packs(&self) -> Vec<P> {
        let mut packs = Vec::new();
        for anchor in self.anchors() {
            if !packs.contains(&anchor.pack) {
                packs.push(anchor.pack);
            }
        }
        packs
    }
}

/// Acceptance test applied to a measured value. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparator {
    AtMost(f64),
    AtLeast(f64),
    Between(f64, f64),
}

impl Comparator {
    pub fn accepts(&self, value: f64) -> bool {
        match *self {
            Self::AtMost(max) => value <= max,
            Self::AtLeast(min) => value >= min,
            Self::Between(min, max) => (min..=max).contains(&value),
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            Self::AtMost(x) | Self::AtLeast(x) => !x.is_nan(),
            Self::Between(min, max) => !min.is_nan() && !max.is_nan() && min <= max,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtMost(max) => write!(f, "<= {max}"),
            Self::AtLeast(min) => write!(f, ">= {min}"),
            Self::Between(min, max) => write!(f, "in [{min}, {max}]"),
        }
    }
}

/// A named predicate over one or more packs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition<P = PackId> {
    pub name: String,
    pub measure: Measure<P>,
    pub comparator: Comparator,
}

impl<P> Condition<P> {
    pub fn new(name: impl Into<String>, measure: Measure<P>, comparator: Comparator) -> Self {
        Self {
            name: name.into(),
            measure,
            comparator,
        }
    }
}

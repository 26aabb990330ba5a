//! Shape-overlap admission policy.
//!
//! A candidate is checked against every present part whose bounds overlap
//! its own:
//!
//! 1. A candidate that overlaps nothing is accepted outright.
//! 2. A candidate already covered by the union of all present shapes is
//!    rejected as soon as it intersects some part: it would add no space.
//! 3. A candidate that would cover the whole exclusive remainder of a part
//!    (that part minus every other part overlapping it) is rejected: the
//!    part would be left with no space of its own.
//! 4. A candidate that partially overlaps a part needs both sides to accept
//!    the overlap.
//!
//! The cancellable offer event runs after these checks, in the container.

use crate::part::Part;
use multipart_types::{PartId, Shape};
use std::fmt;

/// Why a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The container already holds its maximum number of parts.
    Full,
    /// The candidate lies inside space that is already occupied.
    Covered { by: PartId },
    /// The candidate would leave `part` with no exclusive space.
    Absorbs { part: PartId },
    /// The candidate and `part` overlap without mutual consent.
    Incompatible { part: PartId },
    /// A listener vetoed the offer.
    Vetoed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Full => write!(f, "container full"),
            Rejection::Covered { by } => write!(f, "covered by occupied space (hit {by})"),
            Rejection::Absorbs { part } => write!(f, "would absorb part {part}"),
            Rejection::Incompatible { part } => write!(f, "incompatible overlap with {part}"),
            Rejection::Vetoed => write!(f, "vetoed by listener"),
        }
    }
}

/// Runs steps 1-4 for `candidate` against `present`, whose shapes union to
/// `occupied`.
pub(crate) fn evaluate<'a>(
    present: impl IntoIterator<Item = &'a (dyn Part + 'static)>,
    occupied: &Shape,
    candidate: &dyn Part,
) -> Result<(), Rejection> {
    let shape = candidate.shape();
    if !shape.overlaps(occupied) {
        return Ok(());
    }

    let present: Vec<(&'a (dyn Part + 'static), Shape)> = present.into_iter().map(|p| (p, p.shape())).collect();
    let covered = occupied.contains(&shape);

    for (index, (part, existing)) in present.iter().enumerate() {
        if !existing.bounds_overlap(&shape) || !existing.overlaps(&shape) {
            continue;
        }

        if covered {
            return Err(Rejection::Covered { by: part.handle().id() });
        }

        let neighbours = Shape::union_all(
            present
                .iter()
                .enumerate()
                .filter(|(other, (_, s))| *other != index && s.overlaps(existing))
                .map(|(_, (_, s))| s),
        );
        let remainder = existing.subtract(&neighbours);
        if shape.contains(&remainder) {
            return Err(Rejection::Absorbs { part: part.handle().id() });
        }

        let nested = shape.contains(existing) || existing.contains(&shape);
        if !nested && !(part.can_overlap_with(candidate) && candidate.can_overlap_with(*part)) {
            return Err(Rejection::Incompatible { part: part.handle().id() });
        }
    }
    Ok(())
}

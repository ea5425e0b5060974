//! Mutual destruction of opposing units
//!
//! Candidates come from the collision tree's buckets; the exact distance is
//! checked against each unit's live position. A unit can only be destroyed
//! once, so every candidate is revalidated against the pool first.

use crate::game::spatial::QuadTree;
use crate::game::state::{EntityId, RemovedSatellite, Satellite, UnitRef};
use crate::util::pool::Pool;

/// Release every opposing pair closer than `radius`. Returns units removed.
pub fn resolve(
    tree: &mut QuadTree<UnitRef>,
    satellites: &mut Pool<Satellite>,
    radius: f32,
    removed: &mut Vec<RemovedSatellite>,
) -> usize {
    let radius_sq = radius * radius;
    let before = removed.len();

    tree.walk(|local, inherited| {
        for (i, a) in local.iter().enumerate() {
            for b in local[i + 1..].iter().chain(inherited.iter()) {
                if a.item.owner == b.item.owner {
                    continue;
                }
                let (Some(sa), Some(sb)) = (satellites.get(a.item.id), satellites.get(b.item.id)) else {
                    continue;
                };
                if sa.position.distance_sq_to(sb.position) >= radius_sq {
                    continue;
                }

                let first = RemovedSatellite {
                    id: a.item.id,
                    owner: a.item.owner,
                    position: sa.position,
                    destroyed_by: Some(EntityId::Satellite(b.item.id)),
                };
                let second = RemovedSatellite {
                    id: b.item.id,
                    owner: b.item.owner,
                    position: sb.position,
                    destroyed_by: Some(EntityId::Satellite(a.item.id)),
                };
                satellites.release(a.item.id);
                satellites.release(b.item.id);
                removed.push(first);
                removed.push(second);
                // `a` is gone; the remaining pairs for it are moot
                break;
            }
        }
    });

    removed.len() - before
}

//! Work-range and line-of-sight rules shared by scoring and queue filtering.

use delve_core::{TerrainView, TileCoord, AGENT_HEIGHT};
use delve_system_reachability::ReachabilityMap;

const REACH_SIDEWAYS: i32 = 1;
const REACH_BELOW: i32 = 1;
const REACH_ABOVE: i32 = 3;

/// Reports whether `target` lies inside the work window around a foot tile.
///
/// The window spans one column either side, one row below the foot and
/// three rows above it.
#[must_use]
pub fn in_range(foot: TileCoord, target: TileCoord) -> bool {
    let dx = target.x() - foot.x();
    let dy = target.y() - foot.y();
    dx.abs() <= REACH_SIDEWAYS && (-REACH_BELOW..=REACH_ABOVE).contains(&dy)
}

/// Reports whether the agent would be digging out its own footing.
#[must_use]
pub fn is_standing_on(foot: TileCoord, target: TileCoord) -> bool {
    target == foot.below()
}

/// Reports whether no solid tile separates an agent at `foot` from `target`.
///
/// The sight line leaves the agent's body at the height nearest the target,
/// crosses to the target's column and then runs vertically to the target.
/// The tile under the agent's feet hides everything deeper than itself.
#[must_use]
pub fn has_line_of_sight(terrain: TerrainView<'_>, foot: TileCoord, target: TileCoord) -> bool {
    let head_y = foot.y() + AGENT_HEIGHT - 1;
    let dx = target.x() - foot.x();

    if dx == 0 && (foot.y()..=head_y).contains(&target.y()) {
        return true;
    }

    if target.y() < foot.y() - 1 && terrain.is_solid(foot.below()) {
        return false;
    }

    let anchor_y = target.y().clamp(foot.y(), head_y);
    let step_x = dx.signum();
    let mut x = foot.x();
    while x != target.x() {
        x += step_x;
        let cell = TileCoord::new(x, anchor_y);
        if cell == target {
            return true;
        }
        if terrain.is_solid(cell) {
            return false;
        }
    }

    let step_y = (target.y() - anchor_y).signum();
    let mut y = anchor_y + step_y;
    while y != target.y() {
        if terrain.is_solid(TileCoord::new(target.x(), y)) {
            return false;
        }
        y += step_y;
    }
    true
}

/// Reports whether an agent at `foot` can work `target` without moving.
#[must_use]
pub fn can_work_from(terrain: TerrainView<'_>, foot: TileCoord, target: TileCoord) -> bool {
    in_range(foot, target) && has_line_of_sight(terrain, foot, target)
}

/// Standable foot positions from which `target` can be worked.
///
/// Positions directly on top of the target are excluded. Standability is read
/// from the reachability cache, so callers should force-update it first when
/// staleness matters.
#[must_use]
pub fn work_positions(
    reachability: &ReachabilityMap,
    terrain: TerrainView<'_>,
    target: TileCoord,
) -> Vec<TileCoord> {
    let mut positions = Vec::new();
    for dy in -REACH_ABOVE..=REACH_BELOW {
        for dx in -REACH_SIDEWAYS..=REACH_SIDEWAYS {
            let foot = target.offset(dx, dy);
            if is_standing_on(foot, target) || !reachability.can_stand_at(foot) {
                continue;
            }
            if has_line_of_sight(terrain, foot, target) {
                positions.push(foot);
            }
        }
    }
    positions
}

//! ASCII terrain layouts used by adapters and tests to seed the world.
//!
//! The first line of a layout is the top row of the grid. Recognised glyphs:
//!
//! | Glyph | Tile | Extra |
//! |-------|------|-------|
//! | `.` | air | |
//! | `#` | rock | |
//! | `D` | rock | designated for digging |
//! | `H` | air | ladder overlay |
//! | `=` | air | platform overlay |
//! | `A` | air | agent spawn |

use delve_core::{FloorOverlay, TileCoord, TileType};
use thiserror::Error;

use crate::World;

/// Terrain and markers decoded from an ASCII layout.
#[derive(Clone, Debug)]
pub struct Layout {
    /// World populated with the layout's tiles and overlays.
    pub world: World,
    /// Solid tiles marked for digging, in row-major order from the bottom.
    pub dig_sites: Vec<TileCoord>,
    /// Foot positions where agents start, in row-major order from the bottom.
    pub agent_spawns: Vec<TileCoord>,
}

/// Reasons an ASCII layout may fail to decode.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout contained no rows.
    #[error("layout is empty")]
    Empty,
    /// A row's width differs from the first row's width.
    #[error("row {line} has width {found}, expected {expected}")]
    RaggedRow {
        /// One-based line number of the offending row.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph outside the recognised set was encountered.
    #[error("unknown glyph {glyph:?} at line {line}, column {column}")]
    UnknownGlyph {
        /// The unrecognised character.
        glyph: char,
        /// One-based line number.
        line: usize,
        /// One-based column number.
        column: usize,
    },
}

/// Decodes an ASCII layout into a world and its markers.
pub fn parse_layout(text: &str) -> Result<Layout, LayoutError> {
    let rows: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().collect())
        .collect();

    let Some(first) = rows.first() else {
        return Err(LayoutError::Empty);
    };
    let width = first.len();
    let height = rows.len();

    let mut world = World::with_dimensions(
        u32::try_from(width).unwrap_or(u32::MAX),
        u32::try_from(height).unwrap_or(u32::MAX),
    );
    let mut dig_sites = Vec::new();
    let mut agent_spawns = Vec::new();

    for (line_index, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(LayoutError::RaggedRow {
                line: line_index + 1,
                expected: width,
                found: row.len(),
            });
        }

        let y = i32::try_from(height - 1 - line_index).unwrap_or(i32::MAX);
        for (column_index, glyph) in row.iter().copied().enumerate() {
            let coord = TileCoord::new(i32::try_from(column_index).unwrap_or(i32::MAX), y);
            let Some(index) = world.index(coord) else {
                continue;
            };
            match glyph {
                '.' => {}
                '#' => world.tiles[index] = TileType::ROCK,
                'D' => {
                    world.tiles[index] = TileType::ROCK;
                    dig_sites.push(coord);
                }
                'H' => {
                    let _ = world.overlays.insert(coord, FloorOverlay::ladder());
                }
                '=' => {
                    let _ = world.overlays.insert(coord, FloorOverlay::platform());
                }
                'A' => agent_spawns.push(coord),
                other => {
                    return Err(LayoutError::UnknownGlyph {
                        glyph: other,
                        line: line_index + 1,
                        column: column_index + 1,
                    })
                }
            }
        }
    }

    dig_sites.sort_by_key(|coord| (coord.y(), coord.x()));
    agent_spawns.sort_by_key(|coord| (coord.y(), coord.x()));

    Ok(Layout {
        world,
        dig_sites,
        agent_spawns,
    })
}

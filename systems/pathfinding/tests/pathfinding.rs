use delve_core::TileCoord;
use delve_system_pathfinding::{can_traverse, Pathfinder};
use delve_world::{parse_layout, query, Layout};

fn layout(rows: &[&str]) -> Layout {
    parse_layout(&rows.join("\n")).expect("valid layout")
}

#[test]
fn three_tile_climb_without_ladder_is_impossible() {
    let layout = layout(&[
        "......", //
        "......", //
        "......", //
        "......", //
        "...###", //
        "...###", //
        "...###", //
        "######", //
    ]);
    let terrain = query::terrain_view(&layout.world);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder.find_path(terrain, TileCoord::new(1, 1), TileCoord::new(4, 4));

    assert!(path.is_none(), "expected no route up a three tile cliff");
}

#[test]
fn ladder_makes_a_tall_cliff_climbable() {
    let layout = layout(&[
        "......", //
        "......", //
        "......", //
        "..H###", //
        "..H###", //
        "..H###", //
        "..H###", //
        "..H###", //
        "######", //
    ]);
    let terrain = query::terrain_view(&layout.world);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder
        .find_path(terrain, TileCoord::new(0, 1), TileCoord::new(4, 6))
        .expect("ladder route");

    assert!(path.requires_vertical_transition());
    assert_eq!(path.tiles().first(), Some(&TileCoord::new(0, 1)));
    assert_eq!(path.tiles().last(), Some(&TileCoord::new(4, 6)));
}

#[test]
fn two_tile_step_is_climbable_without_ladder() {
    let layout = layout(&[
        "......", //
        "......", //
        "......", //
        "...###", //
        "...###", //
        "######", //
    ]);
    let terrain = query::terrain_view(&layout.world);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder
        .find_path(terrain, TileCoord::new(0, 1), TileCoord::new(5, 3))
        .expect("step route");

    assert!(!path.requires_vertical_transition());
    assert!(path
        .tiles()
        .windows(2)
        .any(|pair| pair[1].y() - pair[0].y() == 2));
}

#[test]
fn every_path_tile_has_a_clear_footprint() {
    let layout = layout(&[
        "##########", //
        "#........#", //
        "#........#", //
        "#..##....#", //
        "#..##..#.#", //
        "#.H##..#.#", //
        "#.H......#", //
        "##########", //
    ]);
    let terrain = query::terrain_view(&layout.world);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder
        .find_path(terrain, TileCoord::new(1, 1), TileCoord::new(4, 5))
        .expect("route over the pillar");

    for pair in path.tiles().windows(2) {
        assert!(can_traverse(terrain, pair[0], pair[1]));
    }
    for tile in path.tiles() {
        assert!(terrain.footprint_clear(*tile), "footprint blocked at {tile:?}");
        assert!(terrain.can_stand_at(*tile), "no footing at {tile:?}");
    }
}

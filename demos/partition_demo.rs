//! Demonstration of canton partitioning on a synthetic coastal map
//!
//! Run with `RUST_LOG=cantons=debug` to see the repair passes.

use canton_partition::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 24x12 map: the two right-most columns are ocean, a lake sits inland
    let (width, height) = (24, 12);
    let mut topology = MeshTopology::grid(width, height);
    for cell in 0..width * height {
        let (x, y) = (cell % width, cell / width);
        let terrain = if x >= width - 2 {
            BasicTerrainType::Ocean
        } else if (8..10).contains(&x) && (4..6).contains(&y) {
            BasicTerrainType::Lake
        } else if y < 3 {
            BasicTerrainType::Mountain
        } else if x < 6 {
            BasicTerrainType::Forest
        } else {
            BasicTerrainType::Plains
        };
        topology.set_terrain(cell, terrain.code())?;
    }

    // Two nations split the land at x = 11
    let land = |cell: &usize| {
        BasicTerrainType::from_code(topology.terrain(*cell)).map_or(true, |t| t.is_land())
    };
    let west: Vec<usize> = (0..width * height).filter(land).filter(|c| c % width < 11).collect();
    let east: Vec<usize> = (0..width * height).filter(land).filter(|c| c % width >= 11).collect();
    let territories = vec![
        NationTerritory::new("west", west, 6 * width + 3),
        NationTerritory::new("east", east, 6 * width + 15),
    ];

    let config = PartitionConfigBuilder::new()
        .seed_label("demo")
        .archetype(EconomicArchetype::Mercantile)
        .build()?;

    let registry = partition_nations(&topology, &territories, &config)?;

    for nation in registry.iter() {
        let report = nation.report();
        println!(
            "\n{}: {} cells in {} cantons ({} repair passes, converged: {})",
            nation.nation_id(),
            nation.area(),
            nation.cantons().len(),
            report.passes,
            report.converged
        );
        for canton in nation.cantons() {
            let dominant = canton
                .geography
                .dominant()
                .and_then(BasicTerrainType::from_code);
            println!(
                "  {} area {:3} compactness {:.2} coastal {:5} capital {:5} dominant {:?} neighbors {}",
                canton.id,
                canton.area,
                canton.compactness,
                canton.coastal,
                canton.capital,
                dominant,
                canton.neighbors.len()
            );
        }
    }

    #[cfg(feature = "spatial-index")]
    {
        let position = Vec2::new(14.3, 8.6);
        if let Some(canton) = registry.get("east").and_then(|n| n.canton_at(position)) {
            println!("\nPosition {:?} is in canton {}", position, canton.id);
        }
    }

    Ok(())
}

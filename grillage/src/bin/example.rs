//! Grillage example - skew slab-on-girder deck under dead load and a moving truck

use anyhow::Result;
use grillage::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Grillage Example: 20 m skew deck ===\n");

    let skew: f64 = 15.0;
    let geometry = GeometryModel::new(20.0, 8.0, 5, 9)
        .with_skew(skew)
        .with_mesh_type(MeshType::Skew)
        .with_edge_beam_dist(1.0);

    let mut mesh = GridMesher::generate(&geometry)?;
    println!(
        "Mesh: {} nodes, {} elements, {} supported nodes",
        mesh.nodes().len(),
        mesh.elements().len(),
        mesh.support_nodes().count()
    );

    let properties = PropertyTable::new()
        .with_material("concrete", Material::concrete(40e6))
        .with_section("edge", Section::rectangular(0.6, 1.0))
        .with_section("girder", Section::rectangular(0.5, 1.2))
        .with_section("slab", Section::slab(0.22))
        .with_section("diaphragm", Section::rectangular(0.3, 0.9))
        .with_group(MemberGroup::EdgeBeam, "concrete", "edge")
        .with_group(MemberGroup::InteriorBeam, "concrete", "girder")
        .with_group(MemberGroup::TransverseSlab, "concrete", "slab")
        .with_group(MemberGroup::EndTransverse, "concrete", "diaphragm");
    mesh.assign_properties(properties)?;

    // Surfacing over the carriageway plus a kerb line load (kN, m)
    let dead = LoadCase::new("superimposed dead")
        .with_load(PatchLoad::rectangle(4.0, 1.0, 16.0, 7.0, -2.5, LoadDirection::FY))
        .with_load(LineLoad::uniform(
            PlanPoint::new(3.0, 0.5),
            PlanPoint::new(18.0, 0.5),
            -4.0,
            LoadDirection::FY,
        ));

    // Lead axle travels along the deck centreline from edge to edge
    let shift = 4.0 * skew.to_radians().tan();
    let truck = MovingLoadCase::new(
        "truck",
        LoadPath::straight(PlanPoint::new(shift, 4.0), PlanPoint::new(20.0 + shift, 4.0)),
        1.0,
    )
    .with_axle(Axle::new(0.0, -60.0).with_track_width(1.8))
    .with_axle(Axle::new(4.3, -120.0).with_track_width(1.8))
    .with_axle(Axle::new(8.6, -120.0).with_track_width(1.8));

    let mut orchestrator = AnalysisOrchestrator::new(&mesh, LinearSolver::default());
    orchestrator.run_static(&dead)?;
    let steps = orchestrator.run_moving(&truck)?;
    println!("Analysed 1 static case and {} truck positions", steps);

    let mut results = orchestrator.compile()?;
    results.ensure_complete()?;

    let combo = LoadCombination::new("SLS")
        .with_case("superimposed dead", 1.0);
    let combined = results.combine(&combo)?;
    results.merge(combined)?;

    println!("\n=== Static Results ===");
    let dead_summary = results.summary("superimposed dead")?;
    println!(
        "Max deflection: {:.4} mm at node {:?}",
        dead_summary.max_deflection * 1000.0,
        dead_summary.max_deflection_node
    );
    println!(
        "Max reaction: {:.2} kN at node {:?}",
        dead_summary.max_reaction, dead_summary.max_reaction_node
    );

    println!("\n=== Truck Envelopes ===");
    let centre = mesh
        .node_at(geometry.num_trans_grid / 2, geometry.num_long_grid / 2)
        .map(|n| n.tag)
        .ok_or_else(|| anyhow::anyhow!("mesh has no centre node"))?;
    let deflection = results.envelope("truck", Entity::Node(centre), Quantity::Displacement(Dof::DY))?;
    println!(
        "Centre node {}: min deflection {:.4} mm at step {:?}",
        centre,
        deflection.min * 1000.0,
        deflection.min_step
    );

    if let Some((key, moment)) =
        results.critical("truck", Quantity::Force(MemberEnd::J, Dof::RZ), Extremum::AbsMax)
    {
        println!("Governing member moment: {:.2} kNm ({})", moment, key);
    }

    let truck_summary = results.summary("truck")?;
    println!(
        "Truck steps: {} completed, {} failed",
        truck_summary.completed_steps, truck_summary.failed_steps
    );

    println!("\n=== Example Complete ===");
    Ok(())
}

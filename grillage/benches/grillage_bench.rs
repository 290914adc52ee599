//! Benchmarks for meshing, load mapping and moving-load analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grillage::prelude::*;

fn create_deck(num_long: usize, num_trans: usize) -> Mesh {
    let geometry = GeometryModel::new(30.0, 12.0, num_long, num_trans)
        .with_skew(20.0)
        .with_mesh_type(MeshType::Skew);
    let mut mesh = GridMesher::generate(&geometry).unwrap();

    let properties = PropertyTable::new()
        .with_material("concrete", Material::concrete(40e6))
        .with_section("girder", Section::rectangular(0.5, 1.4))
        .with_section("slab", Section::slab(0.25))
        .with_group(MemberGroup::EdgeBeam, "concrete", "girder")
        .with_group(MemberGroup::InteriorBeam, "concrete", "girder")
        .with_group(MemberGroup::TransverseSlab, "concrete", "slab")
        .with_group(MemberGroup::EndTransverse, "concrete", "slab");
    mesh.assign_properties(properties).unwrap();
    mesh
}

fn create_truck(increment: f64) -> MovingLoadCase {
    let shift = 6.0 * 20.0_f64.to_radians().tan();
    MovingLoadCase::new(
        "truck",
        LoadPath::straight(PlanPoint::new(shift, 6.0), PlanPoint::new(30.0 + shift, 6.0)),
        increment,
    )
    .with_axle(Axle::new(0.0, -60.0).with_track_width(1.8))
    .with_axle(Axle::new(4.3, -120.0).with_track_width(1.8))
}

fn benchmark_mesh_generation(c: &mut Criterion) {
    let geometry = GeometryModel::new(30.0, 12.0, 11, 31)
        .with_skew(20.0)
        .with_mesh_type(MeshType::Skew);
    c.bench_function("mesh_skew_11x31", |b| {
        b.iter(|| {
            let mesh = GridMesher::generate(black_box(&geometry)).unwrap();
            black_box(mesh);
        })
    });
}

fn benchmark_patch_mapping(c: &mut Criterion) {
    let mesh = create_deck(11, 31);
    let patch: LoadDescriptor =
        PatchLoad::rectangle(8.0, 2.0, 24.0, 10.0, -5.0, LoadDirection::FY).into();
    c.bench_function("map_patch_11x31", |b| {
        b.iter(|| {
            let actions = LoadMapper::new(&mesh).map(black_box(&patch), "patch").unwrap();
            black_box(actions);
        })
    });
}

fn benchmark_static_analysis(c: &mut Criterion) {
    let mesh = create_deck(7, 16);
    let case = LoadCase::new("dead")
        .with_load(PatchLoad::rectangle(8.0, 2.0, 24.0, 10.0, -5.0, LoadDirection::FY));
    c.bench_function("static_7x16_linear", |b| {
        b.iter(|| {
            let mut orchestrator = AnalysisOrchestrator::new(&mesh, LinearSolver::default());
            orchestrator.run_static(&case).unwrap();
            black_box(orchestrator.compile().unwrap());
        })
    });
}

fn benchmark_moving_load(c: &mut Criterion) {
    let mesh = create_deck(5, 11);
    let truck = create_truck(2.0);
    c.bench_function("moving_truck_5x11", |b| {
        b.iter(|| {
            let mut orchestrator = AnalysisOrchestrator::new(&mesh, LinearSolver::default());
            orchestrator.run_moving(&truck).unwrap();
            black_box(orchestrator.compile().unwrap());
        })
    });
}

criterion_group!(
    benches,
    benchmark_mesh_generation,
    benchmark_patch_mapping,
    benchmark_static_analysis,
    benchmark_moving_load,
);

criterion_main!(benches);

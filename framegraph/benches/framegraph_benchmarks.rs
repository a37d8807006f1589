use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use redlilium_framegraph::{
    AccessType, DummyBackend, GraphBuilder, GraphManager, GraphManagerConfig, JobSystem,
    ResourceDescription, TaskKind, TextureFormat, ThreadPool,
};

fn manager() -> (Arc<DummyBackend>, Arc<GraphManager>) {
    let backend = Arc::new(DummyBackend::new());
    let manager = GraphManager::new(backend.clone(), GraphManagerConfig::default());
    (backend, manager)
}

/// Start a new frame and drop the dummy backend's event log so it does not
/// grow across iterations.
fn next_frame(backend: &DummyBackend, manager: &GraphManager) {
    manager.begin_frame();
    backend.take_events();
}

/// A deferred-shading style frame: a graphics chain with an async compute
/// pass every few nodes.
fn record_frame(manager: &Arc<GraphManager>, nodes: usize) -> GraphBuilder {
    let mut graph = manager.create_builder();
    let depth = graph
        .create_resource(ResourceDescription::full_resolution(TextureFormat::Depth32Float))
        .unwrap();
    let mut prev = graph
        .create_resource(ResourceDescription::full_resolution(TextureFormat::Rgba16Float))
        .unwrap();

    let prepass = graph.append_task_node("prepass", TaskKind::Graphics).unwrap();
    graph
        .record_resource_access(prepass, depth, AccessType::DepthTarget)
        .unwrap();
    graph
        .record_resource_access(prepass, prev, AccessType::RenderTarget)
        .unwrap();

    for i in 0..nodes {
        let compute = i % 4 == 3;
        let next = graph
            .create_resource(ResourceDescription::relative(
                0.5,
                0.5,
                TextureFormat::Rgba16Float,
            ))
            .unwrap();
        let kind = if compute {
            TaskKind::Compute
        } else {
            TaskKind::Graphics
        };
        let node = graph.append_task_node(format!("pass_{i}"), kind).unwrap();
        graph
            .record_resource_access(node, prev, AccessType::ShaderRead)
            .unwrap();
        let write = if compute {
            AccessType::UnorderedAccess
        } else {
            AccessType::RenderTarget
        };
        graph.record_resource_access(node, next, write).unwrap();
        graph
            .register_task_node_render_function(node, |ctx, cmds| {
                if let Ok(cmd) = cmds.get_or_create_back() {
                    cmd.debug_marker(ctx.node_name());
                }
            })
            .unwrap();
        prev = next;
    }
    graph
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

fn bench_record(c: &mut Criterion) {
    let (_, manager) = manager();
    c.bench_function("framegraph_record_32_nodes", |b| {
        b.iter(|| {
            let graph = record_frame(&manager, 32);
            black_box(graph.node_count());
        });
    });
}

// ---------------------------------------------------------------------------
// Compile
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let (backend, manager) = manager();
    c.bench_function("framegraph_compile_32_nodes", |b| {
        b.iter_batched(
            || {
                next_frame(&backend, &manager);
                record_frame(&manager, 32)
            },
            |mut graph| {
                graph.compile().unwrap();
                black_box(graph.plan().map(|plan| plan.resource_count()));
                graph.execute().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

fn bench_execute(c: &mut Criterion) {
    let (backend, manager) = manager();
    let pool = ThreadPool::new(4);

    let mut group = c.benchmark_group("framegraph_execute_64_nodes");
    group.bench_function("sequential", |b| {
        b.iter_batched(
            || {
                next_frame(&backend, &manager);
                let mut graph = record_frame(&manager, 64);
                graph.compile().unwrap();
                graph
            },
            |mut graph| black_box(graph.execute_with(None).unwrap()),
            BatchSize::SmallInput,
        );
    });
    group.bench_function("parallel", |b| {
        b.iter_batched(
            || {
                next_frame(&backend, &manager);
                let mut graph = record_frame(&manager, 64);
                graph.compile().unwrap();
                graph
            },
            |mut graph| black_box(graph.execute_with(Some(&pool as &dyn JobSystem)).unwrap()),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_record, bench_compile, bench_execute);
criterion_main!(benches);

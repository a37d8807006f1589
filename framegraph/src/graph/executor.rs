//! Frame graph execution.
//!
//! Every node becomes one job that acquires its command buffers, issues the
//! barriers compile derived for it and runs its render function. Jobs may run
//! in parallel; their outputs land in per-node slots and are assembled into
//! the per-queue sequences strictly in node order afterwards.

use super::registry::ResourceRegistry;
use super::{CompiledPlan, GraphContext, NodeId, RenderFn, TaskKind};
use crate::backend::TextureBarrier;
use crate::command::{CommandBuffer, CommandBufferAllocator, CommandBufferPool};
use crate::error::{GraphError, GraphicsError};
use crate::jobs::{Job, JobSystem};
use crate::scheduler::{FENCE_SIGNAL_VALUE, FrameSubmission, SubmitItem};
use crate::types::{Extent2d, QueueType};

/// Name and kind of a node, without its render function.
pub(crate) struct NodeInfo<'a> {
    pub name: &'a str,
    pub kind: TaskKind,
}

/// Everything execution reads from a compiled builder.
pub(crate) struct ExecuteInput<'a> {
    pub plan: &'a CompiledPlan,
    pub registry: &'a ResourceRegistry,
    pub nodes: Vec<NodeInfo<'a>>,
    pub base_resolution: Extent2d,
    pub frame_index: u64,
}

/// Command buffers one node produced.
#[derive(Default)]
struct NodeOutput {
    /// Graphics-queue barrier pass of a compute node.
    barrier_pass: Option<CommandBuffer>,
    /// The node's own command buffers, in allocator slot order.
    commands: Vec<CommandBuffer>,
}

type NodeSlot = Option<Result<NodeOutput, GraphicsError>>;

pub(crate) fn execute(
    input: ExecuteInput<'_>,
    renders: Vec<Option<RenderFn>>,
    pool: &CommandBufferPool,
    jobs: Option<&dyn JobSystem>,
) -> Result<FrameSubmission, GraphError> {
    crate::profile_scope!("framegraph_execute");

    let mut slots: Vec<NodeSlot> = (0..input.nodes.len()).map(|_| None).collect();
    let input = &input;

    match jobs {
        Some(jobs) if input.nodes.len() > 1 => {
            log::trace!(
                "Recording {} node(s) on {} worker(s)",
                input.nodes.len(),
                jobs.worker_count()
            );
            let batch: Vec<Job<'_>> = slots
                .iter_mut()
                .zip(renders)
                .enumerate()
                .map(|(index, (slot, render))| {
                    Box::new(move || {
                        *slot = Some(record_node(input, pool, NodeId::new(index), render));
                    }) as Job<'_>
                })
                .collect();
            jobs.run_batch(batch);
        }
        _ => {
            for (index, (slot, render)) in slots.iter_mut().zip(renders).enumerate() {
                *slot = Some(record_node(input, pool, NodeId::new(index), render));
            }
        }
    }

    let mut outputs = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(Ok(output)) => outputs.push(output),
            Some(Err(err)) => {
                log::error!(
                    "Recording node '{}' failed: {err}",
                    input.nodes[index].name
                );
                return Err(GraphError::Backend(err));
            }
            None => {
                log::error!("Node '{}' was never recorded", input.nodes[index].name);
                return Err(GraphError::Backend(GraphicsError::Internal(format!(
                    "node '{}' was never recorded",
                    input.nodes[index].name
                ))));
            }
        }
    }

    assemble(input, outputs, pool)
}

/// Record one node: barriers, render function, then end every command buffer.
///
/// A compute node's barriers are recorded into a separate graphics-queue
/// command buffer that the compute queue waits on. That pass is only ordered
/// after earlier graphics work. It does not wait on an earlier compute node
/// that wrote the same handle, so a compute write followed by a compute read
/// with a state change between them is not synchronized across the queues.
fn record_node(
    input: &ExecuteInput<'_>,
    pool: &CommandBufferPool,
    id: NodeId,
    render: Option<RenderFn>,
) -> Result<NodeOutput, GraphicsError> {
    let node = &input.nodes[id.index()];
    crate::profile_scope_dynamic!(node.name);

    let barriers = input.plan.node_barriers(id);
    let context = GraphContext::new(
        input.plan,
        input.registry,
        id,
        node.name,
        node.kind,
        input.base_resolution,
        input.frame_index,
    );

    let (barrier_pass, mut allocator) = match node.kind {
        TaskKind::Graphics => {
            let front = pool.acquire(QueueType::Graphics, node.name)?;
            front.texture_barriers(barriers);
            let allocator =
                CommandBufferAllocator::with_front(pool, QueueType::Graphics, node.name, front);
            (None, allocator)
        }
        TaskKind::Compute => {
            let barrier_pass = if barriers.is_empty() {
                None
            } else {
                let cmd = pool.acquire(QueueType::Graphics, node.name)?;
                cmd.texture_barriers(barriers);
                Some(cmd)
            };
            let allocator = CommandBufferAllocator::new(pool, QueueType::Compute, node.name);
            (barrier_pass, allocator)
        }
    };

    match render {
        Some(render) => render(&context, &mut allocator),
        None => log::trace!("Node '{}' has no render function", node.name),
    }

    let commands = allocator.finish()?;
    for cmd in barrier_pass.iter().chain(commands.iter()) {
        cmd.end()?;
    }
    log::trace!(
        "Recorded node '{}': {} barrier(s), {} command buffer(s)",
        node.name,
        barriers.len(),
        commands.len()
    );

    Ok(NodeOutput {
        barrier_pass,
        commands,
    })
}

/// Lay node outputs and fence operations into the per-queue sequences.
fn assemble(
    input: &ExecuteInput<'_>,
    outputs: Vec<NodeOutput>,
    pool: &CommandBufferPool,
) -> Result<FrameSubmission, GraphError> {
    let plan = input.plan;
    let mut graphics = Vec::new();
    let mut compute = Vec::new();

    for (index, output) in outputs.into_iter().enumerate() {
        let id = NodeId::new(index);
        let kind = input.nodes[index].kind;

        let waits = plan
            .dependencies()
            .iter()
            .filter(|edge| edge.to == id)
            .map(|edge| SubmitItem::Wait {
                fence: edge.fence,
                value: FENCE_SIGNAL_VALUE,
            });
        let signals = plan
            .dependencies()
            .iter()
            .filter(|edge| edge.from == id)
            .map(|edge| SubmitItem::Signal {
                fence: edge.fence,
                value: FENCE_SIGNAL_VALUE,
            });

        match kind {
            TaskKind::Graphics => {
                graphics.extend(waits);
                graphics.extend(output.commands.into_iter().map(SubmitItem::CommandBuffer));
                graphics.extend(signals);
            }
            TaskKind::Compute => {
                compute.extend(waits);
                if let Some(barrier_pass) = output.barrier_pass {
                    graphics.push(SubmitItem::CommandBuffer(barrier_pass));
                    if let Some(fence) = plan.compute_barrier_fence(id) {
                        graphics.push(SubmitItem::Signal {
                            fence,
                            value: FENCE_SIGNAL_VALUE,
                        });
                        compute.push(SubmitItem::Wait {
                            fence,
                            value: FENCE_SIGNAL_VALUE,
                        });
                    }
                }
                compute.extend(output.commands.into_iter().map(SubmitItem::CommandBuffer));
                compute.extend(signals);
            }
        }
    }

    let reconcile = plan.reconcile_barriers();
    if !reconcile.is_empty() {
        if let Some(fence) = plan.reconcile_fence() {
            compute.push(SubmitItem::Signal {
                fence,
                value: FENCE_SIGNAL_VALUE,
            });
            graphics.push(SubmitItem::Wait {
                fence,
                value: FENCE_SIGNAL_VALUE,
            });
        }
        let cmd = record_reconcile(pool, reconcile)?;
        graphics.push(SubmitItem::CommandBuffer(cmd));
    }

    let submission = FrameSubmission {
        graphics,
        compute,
        external_states: plan.external_states().to_vec(),
    };
    log::debug!(
        "Executed graph: {} graphics item(s), {} compute item(s)",
        submission.graphics.len(),
        submission.compute.len()
    );
    Ok(submission)
}

fn record_reconcile(
    pool: &CommandBufferPool,
    barriers: &[TextureBarrier],
) -> Result<CommandBuffer, GraphError> {
    let cmd = pool.acquire(QueueType::Graphics, "external reconcile")?;
    cmd.texture_barriers(barriers);
    cmd.end()?;
    Ok(cmd)
}

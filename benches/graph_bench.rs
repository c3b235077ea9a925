use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graphloop::prelude::*;
use serde_json::json;

fn counter_graph() -> Graph<FieldState, Built> {
    let mut graph = Graph::new("counter");
    graph
        .add_node(FunctionNode::new("step", |_ctx, state: FieldState| async move {
            let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(NodeOutput::Updates(vec![FieldUpdate::set("count", count + 1)]))
        }))
        .unwrap();
    graph
        .set_entry_point("step")
        .add_conditional_edge("step", |_: &FieldState| "again", [("again", "step")]);
    graph.build().unwrap()
}

fn tool_graph() -> Graph<FieldState, Built> {
    let echo = FnTool::new("echo", "Echoes the input", json!({"type": "object"}), |args, _| {
        Ok(args.to_string())
    });

    let mut graph = Graph::new("tools");
    graph
        .add_node(FunctionNode::new("caller", |_ctx, state: FieldState| async move {
            let call = ToolCall::new("c1", "echo", json!({"n": state.messages().len()}));
            Ok(NodeOutput::Updates(vec![FieldUpdate::AppendMessages(vec![
                Message::assistant("").with_tool_calls(vec![call]),
            ])]))
        }))
        .unwrap();
    graph
        .with_tools(ToolExecutor::new().with_tool(echo))
        .set_entry_point("caller")
        .add_conditional_edge("caller", |_: &FieldState| "again", [("again", "caller")]);
    graph.build().unwrap()
}

fn bench_bounded_loop(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let graph = counter_graph();
    let ctx = Context::new("bench");

    let mut group = c.benchmark_group("bounded_loop");
    for bound in [10usize, 100, 1000] {
        let config = RunConfig::new(bound).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(bound), &config, |b, config| {
            b.iter(|| {
                rt.block_on(graph.run(&ctx, black_box(FieldState::default()), *config))
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_tool_round_trips(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let graph = tool_graph();
    let ctx = Context::new("bench");
    let config = RunConfig::new(50).unwrap();

    c.bench_function("tool_round_trips_50", |b| {
        b.iter(|| {
            rt.block_on(graph.run(&ctx, black_box(FieldState::default()), config))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_bounded_loop, bench_tool_round_trips);
criterion_main!(benches);

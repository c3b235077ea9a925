use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use futures::{pin_mut, StreamExt};
use graphloop_core::completion::DEFAULT_MODEL;
use graphloop_core::prelude::*;
use graphloop_macros::{tools, RouteLabel, State};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphloop-demo", about = "Runs small graphloop graphs end to end")]
struct Cli {
    /// Iteration bound for every run
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Chat model used by the model-backed demos
    #[arg(long, global = true, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Branches on an operation (add, subtract, multiply, divide) and applies it
    Calculator {
        number1: f64,
        operation: String,
        number2: f64,
    },
    /// Counts in a self-loop that routes back while under the target
    Count {
        #[arg(long, default_value_t = 5)]
        target: i64,
    },
    /// Arithmetic agent that calls tools until it can answer
    React {
        #[arg(default_value = "What is (3 + 4) * 12?")]
        question: String,
    },
    /// Drafts a document in tool memory and saves it to a file
    Drafter {
        #[arg(default_value = "Write a short email announcing the launch moves to Friday")]
        task: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Research, write and critique a short piece on a topic
    Pipeline {
        #[arg(default_value = "memory safety in systems languages")]
        topic: String,
    },
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Operands {
    /// Left operand
    a: f64,
    /// Right operand
    b: f64,
}

pub struct Arithmetic;

#[tools(add = "Adds a and b", multiply = "Multiplies a and b")]
impl Arithmetic {
    fn add(&self, params: Operands) -> f64 {
        params.a + params.b
    }

    fn multiply(&self, params: Operands) -> f64 {
        params.a * params.b
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateParams {
    /// The complete new text of the document
    content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveParams {
    /// File name, relative to the output directory
    filename: String,
}

#[derive(Clone)]
pub struct DocumentTools {
    out_dir: PathBuf,
}

#[tools(
    update = "Replaces the document with new content",
    save = "Saves the current document to a text file"
)]
impl DocumentTools {
    fn update(&self, params: UpdateParams, memory: &mut ToolMemory) -> String {
        memory.insert("document", params.content.as_str());
        format!("Document updated:\n{}", params.content)
    }

    async fn save(&self, params: SaveParams, memory: &mut ToolMemory) -> Result<String, ToolError> {
        let document = memory.get_str("document").unwrap_or_default().to_string();
        let path = self.out_dir.join(&params.filename);
        tokio::fs::write(&path, document)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        Ok(format!("Document saved to {}", path.display()))
    }
}

#[derive(State, Debug, Clone, Default)]
struct ChatState {
    #[messages]
    messages: Vec<Message>,
    #[tool_memory]
    memory: ToolMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, RouteLabel)]
enum Progress {
    Continue,
    Saved,
}

fn divide(a: f64, b: f64) -> Result<f64, NodeError> {
    if b == 0.0 {
        return Err(NodeError::Execution("Cannot divide by zero".to_string()));
    }
    Ok(a / b)
}

fn operation_node(
    name: &'static str,
    op: fn(f64, f64) -> Result<f64, NodeError>,
) -> impl Node<FieldState> {
    FunctionNode::new(name, move |_ctx, state: FieldState| async move {
        let a = state.require_f64("number1")?;
        let b = state.require_f64("number2")?;
        Ok(NodeOutput::update(FieldUpdate::set("final_number", op(a, b)?)))
    })
}

async fn calculator(cli: &Cli, number1: f64, operation: &str, number2: f64) -> Result<()> {
    let mut graph = Graph::new("calculator");
    graph.add_node(FunctionNode::new("router", |_ctx, _: FieldState| async move {
        Ok(NodeOutput::unchanged())
    }))?;
    graph.add_node(operation_node("add_node", |a, b| Ok(a + b)))?;
    graph.add_node(operation_node("subtract_node", |a, b| Ok(a - b)))?;
    graph.add_node(operation_node("multiply_node", |a, b| Ok(a * b)))?;
    graph.add_node(operation_node("divide_node", divide))?;
    graph.set_entry_point("router").add_conditional_edge(
        "router",
        |s: &FieldState| s.require_str("operation").unwrap_or_default().to_string(),
        [
            ("add", "add_node"),
            ("subtract", "subtract_node"),
            ("multiply", "multiply_node"),
            ("divide", "divide_node"),
        ],
    );
    for node in ["add_node", "subtract_node", "multiply_node", "divide_node"] {
        graph.set_finish_point(node);
    }
    let graph = graph.build()?;
    println!("{}", graph.to_mermaid());

    let state = FieldState::initialize([
        ("number1", json!(number1)),
        ("number2", json!(number2)),
        ("operation", json!(operation)),
    ]);
    let outcome = graph
        .run(&Context::default(), state, RunConfig::new(cli.max_iterations)?)
        .await?;

    match outcome.state.get("final_number") {
        Some(result) => println!("{} {} {} = {}", number1, operation, number2, result),
        None => bail!("no result after {:?}", outcome.path),
    }
    Ok(())
}

async fn count(cli: &Cli, target: i64) -> Result<()> {
    let mut graph = Graph::new("counter");
    graph.add_node(FunctionNode::new("increment", |_ctx, state: FieldState| async move {
        let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(NodeOutput::update(FieldUpdate::set("count", count + 1)))
    }))?;
    graph.set_entry_point("increment").add_conditional_edge(
        "increment",
        move |s: &FieldState| {
            let count = s.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
            if count < target {
                "loop"
            } else {
                "exit"
            }
        },
        [("loop", "increment"), ("exit", END)],
    );
    let graph = graph.build()?;

    let events = graph.stream(
        &Context::default(),
        FieldState::default(),
        RunConfig::new(cli.max_iterations)?,
    );
    pin_mut!(events);

    while let Some(event) = events.next().await {
        match event? {
            GraphEvent::Step {
                node,
                iteration,
                state,
            } => println!(
                "step {}: {} -> count = {}",
                iteration,
                node,
                state.get("count").unwrap_or(&json!(0))
            ),
            GraphEvent::Finished(outcome) => println!(
                "finished after {} iterations ({:?})",
                outcome.iterations, outcome.termination
            ),
        }
    }
    Ok(())
}

fn chat_model(cli: &Cli, tools: Vec<ToolSpec>) -> Result<Arc<OpenAiChatModel>> {
    let mut model = OpenAiChatModel::from_env()?
        .with_model(cli.model.as_str())
        .with_tools(tools);
    if let Some(tracer) = LangSmithTracer::from_env() {
        model = model.with_tracer(Arc::new(tracer));
    }
    Ok(Arc::new(model))
}

async fn react(cli: &Cli, question: &str) -> Result<()> {
    let executor = ToolExecutor::new()
        .with_function(ArithmeticAdd(Arithmetic))
        .with_function(ArithmeticMultiply(Arithmetic));
    let model = chat_model(cli, executor.specs())?;

    let mut graph = Graph::new("react");
    graph.add_node(
        ModelNode::new("agent", model)
            .with_system_prompt("You are a careful assistant. Use the tools for every calculation."),
    )?;
    graph.add_node(ToolNode::new("tools", executor))?;
    graph
        .set_entry_point("agent")
        .add_conditional_edge(
            "agent",
            tools_condition,
            [(ToolsRoute::Tools, "tools"), (ToolsRoute::End, END)],
        )
        .add_edge("tools", "agent");
    let graph = graph.build()?;

    let state = ChatState {
        messages: vec![Message::user(question)],
        ..Default::default()
    };
    let outcome = graph
        .run(&Context::default(), state, RunConfig::new(cli.max_iterations)?)
        .await?;

    for message in &outcome.state.messages {
        println!("[{:?}] {}", message.role, message.content);
    }
    if outcome.bound_exceeded() {
        println!("stopped at the iteration bound without a final answer");
    }
    Ok(())
}

async fn drafter(cli: &Cli, task: &str, out_dir: PathBuf) -> Result<()> {
    let tools = DocumentTools { out_dir };
    let executor = ToolExecutor::new()
        .with_function(DocumentToolsUpdate(tools.clone()))
        .with_function(DocumentToolsSave(tools));
    let model = chat_model(cli, executor.specs())?;

    let mut graph = Graph::new("drafter");
    graph.add_node(ModelNode::new("agent", model).with_system_prompt(
        "You are a drafting assistant. Keep the document current with the update tool \
         and save it with the save tool once it is finished.",
    ))?;
    graph
        .with_tools(executor)
        .set_entry_point("agent")
        .add_conditional_edge(
            "agent",
            |s: &ChatState| match s.last_message() {
                Some(m) if m.name.as_deref() == Some("save") && m.status == Some(ToolStatus::Success) => {
                    Progress::Saved
                }
                _ => Progress::Continue,
            },
            [(Progress::Continue, "agent"), (Progress::Saved, END)],
        );
    let graph = graph.build()?;

    let state = ChatState {
        messages: vec![Message::user(task)],
        ..Default::default()
    };
    let outcome = graph
        .run(&Context::default(), state, RunConfig::new(cli.max_iterations)?)
        .await?;

    println!(
        "{}",
        outcome.state.memory.get_str("document").unwrap_or("(no document)")
    );
    if let Some(last) = outcome.state.last_message() {
        println!("\n{}", last.content);
    }
    Ok(())
}

async fn pipeline(cli: &Cli, topic: &str) -> Result<()> {
    let model = chat_model(cli, Vec::new())?;
    let options = ModelOptions::new().temperature(0.7)?;

    let mut graph = Graph::new("pipeline");
    graph.add_node(
        PromptNode::new(
            "research",
            model.clone(),
            "List the key facts a writer needs about {topic}.",
            "research",
        )
        .with_options(options.clone()),
    )?;
    graph.add_node(
        PromptNode::new(
            "write",
            model.clone(),
            "Write a short article about {topic} using these notes:\n{research}",
            "article",
        )
        .with_options(options),
    )?;
    graph.add_node(PromptNode::new(
        "critique",
        model,
        "Critique this article and suggest concrete improvements:\n{article}",
        "critique",
    ))?;
    graph
        .set_entry_point("research")
        .add_edge("research", "write")
        .add_edge("write", "critique")
        .set_finish_point("critique");
    let graph = graph.build()?;

    let state = FieldState::initialize([("topic", topic)]);
    let outcome = graph
        .run(&Context::default(), state, RunConfig::new(cli.max_iterations)?)
        .await?;

    for field in ["research", "article", "critique"] {
        println!("## {}\n\n{}\n", field, outcome.state.require_str(field)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("graphloop=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    info!(max_iterations = cli.max_iterations, model = %cli.model, "starting demo");
    match &cli.command {
        Command::Calculator {
            number1,
            operation,
            number2,
        } => calculator(&cli, *number1, operation, *number2).await,
        Command::Count { target } => count(&cli, *target).await,
        Command::React { question } => react(&cli, question).await,
        Command::Drafter { task, out_dir } => drafter(&cli, task, out_dir.clone()).await,
        Command::Pipeline { topic } => pipeline(&cli, topic).await,
    }
}

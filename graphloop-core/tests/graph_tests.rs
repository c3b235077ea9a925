use async_trait::async_trait;
use graphloop_core::prelude::*;
use graphloop_macros::State;
use mockall::{mock, Sequence};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

mock! {
    pub Model {}

    #[async_trait]
    impl ChatModel for Model {
        async fn invoke(&self, messages: &[Message], options: &ModelOptions) -> Result<Message, ModelError>;
    }
}

#[derive(State, Debug, Clone, PartialEq, Default)]
struct ChatState {
    #[messages]
    messages: Vec<Message>,
    #[tool_memory]
    memory: ToolMemory,
}

impl ChatState {
    fn asking(question: &str) -> Self {
        Self {
            messages: vec![Message::user(question)],
            ..Default::default()
        }
    }
}

/// Replays canned replies in order
struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, _: &[Message], _: &ModelOptions) -> Result<Message, ModelError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Permanent("script exhausted".into()))
    }
}

fn add_tool() -> FnTool {
    FnTool::new(
        "add",
        "Adds a and b",
        json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
        |args, _| {
            let a = args["a"].as_f64().ok_or_else(|| ToolError::InvalidArguments("a".into()))?;
            let b = args["b"].as_f64().ok_or_else(|| ToolError::InvalidArguments("b".into()))?;
            Ok((a + b).to_string())
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
struct CounterState {
    count: i32,
    history: Vec<String>,
}

impl GraphState for CounterState {
    type Update = String;

    fn apply(&mut self, update: String) {
        self.history.push(update);
    }
}

#[derive(Debug)]
struct IncrementNode {
    amount: i32,
}

#[async_trait]
impl Node<CounterState> for IncrementNode {
    async fn process(&self, _ctx: &Context, mut state: CounterState) -> NodeResult<CounterState> {
        state.count += self.amount;
        Ok(NodeOutput::Full(state))
    }

    fn name(&self) -> &str {
        "increment"
    }
}

#[tokio::test]
async fn test_hand_written_nodes_and_updates() {
    let record = FunctionNode::new("record", |_ctx, state: CounterState| async move {
        Ok(NodeOutput::Updates(vec![format!("count={}", state.count)]))
    });

    let mut graph = Graph::new("counter");
    graph.add_node(IncrementNode { amount: 5 }).unwrap();
    graph.add_node(record).unwrap();
    graph
        .set_entry_point("increment")
        .add_edge("increment", "record")
        .set_finish_point("record");
    let graph = graph.build().unwrap();

    let outcome = graph
        .run(
            &Context::new("test"),
            CounterState {
                count: 1,
                history: vec![],
            },
            RunConfig::new(5).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.state.count, 6);
    assert_eq!(outcome.state.history, vec!["count=6"]);
    assert_eq!(outcome.path, vec!["increment", "record"]);
}

#[tokio::test]
async fn test_react_agent_with_tool_node() {
    let mut model = MockModel::new();
    let mut seq = Sequence::new();
    model
        .expect_invoke()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|messages, _| messages.len() == 1)
        .returning(|_, _| {
            Ok(Message::assistant("")
                .with_tool_calls(vec![ToolCall::new("call_1", "add", json!({"a": 2, "b": 3}))]))
        });
    model
        .expect_invoke()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|messages, _| messages.last().map(|m| m.content.as_str()) == Some("5"))
        .returning(|_, _| Ok(Message::assistant("2 + 3 = 5")));

    let mut graph = Graph::new("react");
    graph.add_node(ModelNode::new("agent", Arc::new(model))).unwrap();
    graph
        .add_node(ToolNode::new("tools", ToolExecutor::new().with_tool(add_tool())))
        .unwrap();
    graph
        .set_entry_point("agent")
        .add_conditional_edge(
            "agent",
            tools_condition,
            [(ToolsRoute::Tools, "tools"), (ToolsRoute::End, END)],
        )
        .add_edge("tools", "agent");
    let graph = graph.build().unwrap();

    let outcome = graph
        .run(
            &Context::new("react"),
            ChatState::asking("What is 2 + 3?"),
            RunConfig::new(DEFAULT_MAX_ITERATIONS).unwrap(),
        )
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.path, vec!["agent", "tools", "agent"]);
    let messages = &outcome.state.messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, Role::Tool);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[3].content, "2 + 3 = 5");
}

#[tokio::test]
async fn test_permanent_model_failure_propagates() {
    let mut model = MockModel::new();
    model
        .expect_invoke()
        .returning(|_, _| Err(ModelError::Permanent("invalid api key".into())));

    let mut graph = Graph::new("auth");
    graph.add_node(ModelNode::new("agent", Arc::new(model))).unwrap();
    graph.set_entry_point("agent").set_finish_point("agent");
    let graph = graph.build().unwrap();

    let err = graph
        .run(
            &Context::new("auth"),
            ChatState::asking("hi"),
            RunConfig::new(3).unwrap(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GraphError::Node(NodeError::Model(ModelError::Permanent(
            "invalid api key".into()
        )))
    );
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_drafter_keeps_document_in_tool_memory() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().to_path_buf();

    let update = FnTool::new(
        "update",
        "Replaces the document",
        json!({"type": "object", "properties": {"content": {"type": "string"}}}),
        |args, memory| {
            let content = args["content"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("content must be a string".into()))?;
            memory.insert("document", content);
            Ok(format!("Document updated:\n{}", content))
        },
    );
    let save = FnTool::new(
        "save",
        "Saves the document to a file",
        json!({"type": "object", "properties": {"filename": {"type": "string"}}}),
        move |args, memory| {
            let filename = args["filename"].as_str().unwrap_or("document.txt");
            let document = memory.get_str("document").unwrap_or_default();
            std::fs::write(out_dir.join(filename), document)
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            Ok(format!("Saved to {}", filename))
        },
    );

    let model = ScriptedModel::new(vec![
        Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "c1",
            "update",
            json!({"content": "Dear team, the launch moves to Friday."}),
        )]),
        Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "c2",
            "save",
            json!({"filename": "email.txt"}),
        )]),
    ]);

    let mut graph = Graph::new("drafter");
    graph.add_node(ModelNode::new("agent", model)).unwrap();
    graph
        .with_tools(ToolExecutor::new().with_tool(update).with_tool(save))
        .set_entry_point("agent")
        .add_conditional_edge(
            "agent",
            |s: &ChatState| match s.last_message() {
                Some(m) if m.name.as_deref() == Some("save") => "saved",
                _ => "continue",
            },
            [("continue", "agent"), ("saved", END)],
        );
    let graph = graph.build().unwrap();

    let outcome = graph
        .run(
            &Context::new("drafter"),
            ChatState::asking("Write an email about the launch"),
            RunConfig::new(5).unwrap(),
        )
        .await
        .unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.iterations, 2);
    assert_eq!(
        outcome.state.memory.get_str("document"),
        Some("Dear team, the launch moves to Friday.")
    );
    let saved = std::fs::read_to_string(dir.path().join("email.txt")).unwrap();
    assert_eq!(saved, "Dear team, the launch moves to Friday.");
}

#[tokio::test]
async fn test_concurrent_runs_have_separate_memory() {
    let remember = FnTool::new("remember", "Stores a note", json!({"type": "object"}), |args, memory| {
        let note = args["note"].as_str().unwrap_or_default();
        Ok(memory.append_text("notes", note).to_string())
    });

    let build = |note: &str| {
        let model = ScriptedModel::new(vec![Message::assistant("")
            .with_tool_calls(vec![ToolCall::new("c1", "remember", json!({ "note": note }))])]);
        let mut graph = Graph::new("notes");
        graph.add_node(ModelNode::new("agent", model)).unwrap();
        graph
            .with_tools(ToolExecutor::new().with_tool(remember.clone()))
            .set_entry_point("agent")
            .set_finish_point("agent");
        graph.build().unwrap()
    };
    let first = build("alpha");
    let second = build("beta");

    let ctx = Context::new("notes");
    let config = RunConfig::new(1).unwrap();
    let (a, b) = tokio::join!(
        first.run(&ctx, ChatState::asking("a"), config),
        second.run(&ctx, ChatState::asking("b"), config),
    );

    assert_eq!(a.unwrap().state.memory.get_str("notes"), Some("alpha"));
    assert_eq!(b.unwrap().state.memory.get_str("notes"), Some("beta"));
}

mod common;

use common::*;
use std::sync::Arc;
use timegraph::entity::{Event, Process, User};
use timegraph::sink::json::load_kind;
use timegraph::{EdgeType, EmbeddedGraph, Label, OutputTarget, Pass, Pipeline, PipelineConfig, Sink};

fn lines() -> Vec<String> {
    vec![
        sysmon_process(0, r"C:\Windows\explorer.exe", "100", r"C:\Windows\userinit.exe", "90"),
        sysmon_process(5, r"C:\Tools\a.exe", "200", r"C:\Windows\explorer.exe", "100"),
        evtx_line(
            SECURITY,
            4688,
            6,
            &[
                ("SubjectUserName", "alice"),
                ("SubjectDomainName", "CORP"),
                ("NewProcessId", "0xc8"),
                ("NewProcessName", r"C:\Tools\a.exe"),
                ("ProcessId", "0x64"),
                ("ParentProcessName", r"C:\Windows\explorer.exe"),
            ],
        ),
        evtx_line(
            SECURITY,
            4624,
            10,
            &[
                ("SubjectUserName", "SYSTEM"),
                ("SubjectDomainName", "NT AUTHORITY"),
                ("TargetUserName", "alice"),
                ("TargetDomainName", "CORP"),
                ("LogonType", "2"),
            ],
        ),
        String::new(),
        "garbage".to_string(),
    ]
}

#[tokio::test]
async fn test_security_and_sysmon_views_of_a_process_merge() {
    let file = timeline(&lines());
    let (entities, stats) = Pipeline::new(&PipelineConfig::default()).run(file.path()).await.unwrap();

    assert_eq!(stats.lines, 5);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(entities.processes.len(), 2);

    let child = entities
        .processes
        .iter()
        .find(|p| p.filename == "a.exe")
        .unwrap();
    assert_eq!(child.pid, 200);
    assert_eq!(child.ppid, 100);
    assert_eq!(child.evidence.len(), 2);
    assert_eq!(stats.counts.processes, 2);
}

#[tokio::test]
async fn test_json_output_reads_back() {
    let file = timeline(&lines());
    let (entities, _) = Pipeline::new(&PipelineConfig::default()).run(file.path()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut sink = Sink::open(&OutputTarget::Json {
        dir: dir.path().to_path_buf(),
    })
    .unwrap();
    sink.emit(&entities).await.unwrap();
    assert!(sink.finish().await.unwrap().is_none());

    let processes: Vec<Process> = load_kind(dir.path()).unwrap();
    assert_eq!(processes, entities.processes.as_slice());
    let users: Vec<User> = load_kind(dir.path()).unwrap();
    assert_eq!(users, entities.users.as_slice());
    let events: Vec<Event> = load_kind(dir.path()).unwrap();
    assert_eq!(events, entities.events.as_slice());
}

#[tokio::test]
async fn test_missing_timeline_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = Pipeline::new(&PipelineConfig::default())
        .run(dir.path().join("absent.jsonl"))
        .await;
    assert!(matches!(result, Err(timegraph::Error::InputIo { .. })));
}

#[tokio::test]
async fn test_graph_output_is_linked() {
    let file = timeline(&lines());
    let (entities, _) = Pipeline::new(&PipelineConfig::default()).run(file.path()).await.unwrap();

    let graph = EmbeddedGraph::new();
    let mut sink = Sink::graph(Arc::new(graph.clone()));
    sink.emit(&entities).await.unwrap();
    let report = sink.finish().await.unwrap().unwrap();

    assert_eq!(report.passes.len(), Pass::ALL.len());
    assert_eq!(report.pass(Pass::Execute).unwrap().edges_created, 1);

    let store = graph.store_read().await;
    let node = |id| store.get_node(id).unwrap();

    let executes = store.get_edges_by_type(&EdgeType::new("EXECUTE"));
    assert_eq!(executes.len(), 1);
    assert_eq!(node(executes[0].source).text("filename"), "explorer.exe");
    assert_eq!(node(executes[0].target).text("filename"), "a.exe");

    let computers = store.get_nodes_by_label(&Label::new("Computer"));
    assert_eq!(computers.len(), 1);
    let hosted = store.get_outgoing_edges(computers[0].id);
    // two processes and the logon event
    assert_eq!(hosted.len(), 3);

    let logons = store.get_edges_by_type(&EdgeType::new("LOGON"));
    assert_eq!(logons.len(), 2);
    assert!(logons
        .iter()
        .any(|e| node(e.source).text("username") == "alice" && e.target == computers[0].id));
    assert!(logons
        .iter()
        .any(|e| node(e.source).text("username") == "SYSTEM" && node(e.target).text("username") == "alice"));

    let authored = store.get_edges_by_type(&EdgeType::new("BY"));
    assert_eq!(authored.len(), 2);
}

mod common;

use common::*;
use std::sync::Arc;
use timegraph::{EdgeType, EmbeddedGraph, GraphStore, Label, LinkReport, Pass, Pipeline, PipelineConfig, Sink};

async fn link(lines: &[String]) -> (EmbeddedGraph, LinkReport) {
    init_logging();
    let file = timeline(lines);
    let (entities, _) = Pipeline::new(&PipelineConfig::default()).run(file.path()).await.unwrap();

    let graph = EmbeddedGraph::new();
    let mut sink = Sink::graph(Arc::new(graph.clone()));
    sink.emit(&entities).await.unwrap();
    let report = sink.finish().await.unwrap().unwrap();
    (graph, report)
}

fn named<'a>(store: &'a GraphStore, edge_type: &str) -> Vec<(String, String)> {
    let name = |id| {
        let node = store.get_node(id).unwrap();
        ["username", "name", "fullpath", "ip"]
            .iter()
            .map(|key| node.text(key))
            .find(|text| !text.is_empty())
            .unwrap_or("")
            .to_string()
    };
    store
        .get_edges_by_type(&EdgeType::new(edge_type))
        .iter()
        .map(|edge| (name(edge.source), name(edge.target)))
        .collect()
}

#[tokio::test]
async fn test_account_management() {
    let (graph, report) = link(&[
        evtx_line(
            SECURITY,
            4720,
            0,
            &[
                ("TargetUserName", "bob"),
                ("TargetDomainName", "CORP"),
                ("SubjectUserName", "alice"),
                ("SubjectDomainName", "CORP"),
            ],
        ),
        evtx_line(
            SECURITY,
            4728,
            3,
            &[
                ("MemberName", "CN=bob,OU=Staff,DC=corp,DC=local"),
                ("MemberSid", "S-1-5-21-1-1002"),
                ("TargetUserName", "Admins"),
                ("TargetDomainName", "CORP"),
                ("SubjectUserName", "alice"),
                ("SubjectDomainName", "CORP"),
            ],
        ),
    ])
    .await;
    let store = graph.store_read().await;

    assert_eq!(named(&store, "CREATE"), vec![("alice".to_string(), "bob".to_string())]);
    assert_eq!(named(&store, "ADDED_TO"), vec![("bob".to_string(), "Admins".to_string())]);
    assert_eq!(named(&store, "ABOUT").len(), 1);
    assert_eq!(store.get_nodes_by_label(&Label::new("Group")).len(), 1);
    assert_eq!(report.pass(Pass::Groups).unwrap().nodes_synthesized, 0);
    assert_eq!(named(&store, "ACTS").len(), 2);
    assert_eq!(named(&store, "ON").len(), 2);
}

#[tokio::test]
async fn test_process_activity() {
    let image = r"C:\Tools\x.exe";
    let (graph, report) = link(&[
        sysmon_process(1, image, "77", r"C:\Windows\explorer.exe", "100"),
        evtx_line(
            SYSMON,
            3,
            5,
            &[
                ("Image", image),
                ("ProcessId", "77"),
                ("Protocol", "tcp"),
                ("Initiated", "true"),
                ("SourceIp", "10.0.0.5"),
                ("SourcePort", "49700"),
                ("DestinationIp", "93.184.216.34"),
                ("DestinationPort", "443"),
            ],
        ),
        evtx_line(
            SYSMON,
            11,
            6,
            &[("Image", image), ("ProcessId", "77"), ("TargetFilename", r"C:\Temp\drop.dll")],
        ),
        evtx_line(
            SYSMON,
            7,
            7,
            &[("Image", image), ("ProcessId", "77"), ("ImageLoaded", r"C:\Temp\drop.dll")],
        ),
        // before the process started: not attributed
        evtx_line(
            SYSMON,
            11,
            0,
            &[("Image", image), ("ProcessId", "77"), ("TargetFilename", r"C:\Temp\early.txt")],
        ),
    ])
    .await;
    let store = graph.store_read().await;

    assert_eq!(named(&store, "CONNECT"), vec![(image.to_string(), "93.184.216.34".to_string())]);
    assert_eq!(named(&store, "CREATE"), vec![(image.to_string(), r"C:\Temp\drop.dll".to_string())]);
    assert_eq!(named(&store, "LOAD"), vec![(image.to_string(), r"C:\Temp\drop.dll".to_string())]);
    assert_eq!(store.get_nodes_by_label(&Label::new("Host")).len(), 1);
    // drop.dll is shared by the create and the load; early.txt has no creator
    assert_eq!(store.get_nodes_by_label(&Label::new("File")).len(), 2);
    assert_eq!(report.pass(Pass::Connections).unwrap().nodes_synthesized, 1);

    let connect = store.get_edges_by_type(&EdgeType::new("CONNECT"))[0];
    assert_eq!(connect.get_property("port").and_then(|v| v.as_integer()), Some(443));
    assert_eq!(connect.timestamp(), BASE + 5_000_000);
}

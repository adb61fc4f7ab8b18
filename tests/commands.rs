use httpmock::prelude::*;
use tokio::time::{sleep, Duration};

use memwatch::config::Config;
use memwatch::monitor::Monitor;
use memwatch::view::ViewParams;

fn config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.connection.base_url = server.base_url();
    config.clamp();
    config
}

fn mock_empty_snapshot(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/api/processes");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"processes": [], "system_memory": {"total": 1, "available": 1}}"#);
    });
}

#[tokio::test]
async fn terminating_the_selected_pid_clears_the_selection() {
    let server = MockServer::start_async().await;
    mock_empty_snapshot(&server);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/processes/7/history");
            then.status(404).body("{}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/processes/kill")
                .json_body(serde_json::json!({ "pid": 7 }));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"success": true, "message": "Process 7 terminated successfully"}"#);
        })
        .await;

    let mut monitor = Monitor::start(config(&server), &ViewParams::default()).unwrap();
    monitor.session.select(7).await.unwrap();
    assert_eq!(monitor.session.selected(), Some(7));

    let message = monitor.commands.terminate(7).await.unwrap();
    assert!(message.contains("terminated"));
    assert_eq!(monitor.session.selected(), None);

    monitor.shutdown();
}

#[tokio::test]
async fn terminating_another_pid_leaves_the_selection_alone() {
    let server = MockServer::start_async().await;
    mock_empty_snapshot(&server);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/processes/9/history");
            then.status(404).body("{}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/processes/kill");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"success": true, "message": "Process 7 terminated successfully"}"#);
        })
        .await;

    let mut monitor = Monitor::start(config(&server), &ViewParams::default()).unwrap();
    monitor.session.select(9).await.unwrap();

    monitor.commands.terminate(7).await.unwrap();
    assert_eq!(monitor.session.selected(), Some(9));

    monitor.shutdown();
}

#[tokio::test]
async fn failed_termination_surfaces_backend_text_verbatim() {
    let server = MockServer::start_async().await;
    mock_empty_snapshot(&server);
    let kill_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/processes/kill");
            then.status(200).header("content-type", "application/json").body(
                r#"{"success": false, "message": "Access denied when trying to terminate process 1"}"#,
            );
        })
        .await;

    let mut monitor = Monitor::start(config(&server), &ViewParams::default()).unwrap();

    let err = monitor.commands.terminate(1).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Access denied when trying to terminate process 1"
    );

    // no automatic retry: exactly one kill request went out
    sleep(Duration::from_millis(200)).await;
    assert_eq!(kill_mock.hits_async().await, 1);
    monitor.shutdown();
}

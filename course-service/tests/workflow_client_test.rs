mod common;

use common::workflow_settings;
use course_service::services::workflow::{
    DetailParams, ModuleInfo, OutlineParams, WorkflowClient, WorkflowEngine, WorkflowError,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

async fn client_for(server: &MockServer) -> WorkflowClient {
    WorkflowClient::new(workflow_settings(&format!("{}/workflow/run", server.uri())))
        .expect("Failed to build client")
}

#[tokio::test]
async fn outline_call_sends_documented_request_and_decodes_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/workflow/run"))
        .and(header("authorization", "Bearer test-key:test-secret"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "flow_id": "flow-outline",
            "uid": "user_default",
            "parameters": {
                "TEXTBOOK_CONTENT": "Chapter 1: Fractions",
                "GRADE_LEVEL": "grade 3",
                "SUBJECT": "unspecified",
                "MODULE_COUNT": "4"
            },
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "output": "{\"a\":1}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut params = OutlineParams::new("Chapter 1: Fractions");
    params.grade_level = Some("grade 3".to_string());

    let result = client.invoke_outline_generation(params).await.unwrap();

    assert_eq!(result, object(json!({"a": 1})));
}

#[tokio::test]
async fn unparseable_output_falls_back_to_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": "not json"})))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .await
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap();

    assert_eq!(result, object(json!({"content": "not json"})));
}

#[tokio::test]
async fn non_success_status_is_an_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::Http {
            status: 500,
            body: "server error".to_string()
        }
    );
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"output": {"a": 1}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut settings = workflow_settings(&format!("{}/workflow/run", server.uri()));
    settings.timeout = Duration::from_millis(200);
    let client = WorkflowClient::new(settings).unwrap();

    let err = client
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::Timeout);
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let client = WorkflowClient::new(workflow_settings("http://127.0.0.1:1/workflow/run")).unwrap();

    let err = client
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::MalformedEnvelope(_)));
}

#[tokio::test]
async fn detail_call_passes_serialized_module_info_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"output": {"module_id": "m1"}})))
        .expect(1)
        .mount(&server)
        .await;

    let raw = r#"{"module_id": "m1", "title": "Halves"}"#.to_string();
    let mut params = DetailParams::new(ModuleInfo::Serialized(raw.clone()), "Chapter 1");
    params.exercise_count = 10;

    let result = client_for(&server)
        .await
        .invoke_detail_generation(params)
        .await
        .unwrap();
    assert_eq!(result, object(json!({"module_id": "m1"})));

    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["flow_id"], "flow-detail");
    assert_eq!(sent["parameters"]["MODULE_INFO"], raw);
    assert_eq!(sent["parameters"]["DETAIL_LEVEL"], "standard");
    assert_eq!(sent["parameters"]["EXERCISE_COUNT"], "10");
}

#[tokio::test]
async fn missing_flow_id_fails_without_calling_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = workflow_settings(&server.uri());
    settings.detail_flow_id = String::new();
    let client = WorkflowClient::new(settings).unwrap();

    let info = ModuleInfo::Structured(object(json!({"module_id": "m1"})));
    let err = client
        .invoke_detail_generation(DetailParams::new(info, "text"))
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::NotConfigured("DETAIL_FLOW_ID"));
}

// Accepts one connection and hands the socket to `handle` after the request
// head has been read.
async fn raw_upstream<F, Fut>(handle: F) -> String
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}/workflow/run", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 64 * 1024];
        let _ = socket.read(&mut buf).await;
        handle(socket).await;
    });

    address
}

#[tokio::test]
async fn unreadable_error_body_still_reports_status() {
    let address = raw_upstream(|mut socket| async move {
        let _ = socket
            .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 100\r\n\r\npartial")
            .await;
        let _ = socket.shutdown().await;
    })
    .await;

    let client = WorkflowClient::new(workflow_settings(&address)).unwrap();
    let err = client
        .invoke_outline_generation(OutlineParams::new("text"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::Http {
            status: 502,
            body: String::new()
        }
    );
}

#[tokio::test]
async fn abandoned_call_closes_upstream_connection() {
    let (closed_tx, closed_rx) = oneshot::channel();

    // Never answers; reports once the caller hangs up.
    let address = raw_upstream(|mut socket| async move {
        let mut buf = vec![0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    })
    .await;

    let client = WorkflowClient::new(workflow_settings(&address)).unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        client.invoke_outline_generation(OutlineParams::new("text")),
    )
    .await;
    assert!(outcome.is_err());

    // The client stays alive, so only the dropped call can close the socket.
    tokio::time::timeout(Duration::from_secs(2), closed_rx)
        .await
        .expect("upstream connection still open after the call was dropped")
        .unwrap();

    drop(client);
}

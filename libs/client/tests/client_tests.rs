use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use remote_api_client::{
    CancellationToken, ClientConfig, CodecKind, Descriptor, Error, RemoteApiClient, ReplyEnvelope,
    Value,
};
use remote_api_core::CallEnvelope;
use remote_api_fabric::codec::Codec;
use remote_api_fabric::transport::{MemoryTransport, Transport, TransportListener, WebSocketListener};
use remote_api_fabric::Frame;
use tokio::task::JoinHandle;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

type Calls = Arc<Mutex<Vec<CallEnvelope>>>;

/// Answer every call with `handler` until the client goes away
fn serve<T, F>(mut transport: T, codec: CodecKind, handler: F) -> (Calls, JoinHandle<()>)
where
    T: Transport + 'static,
    F: Fn(&CallEnvelope) -> ReplyEnvelope + Send + 'static,
{
    let calls: Calls = Arc::default();
    let recorded = calls.clone();
    let handle = tokio::spawn(async move {
        while let Ok(frame) = transport.receive().await {
            let call: CallEnvelope = codec.decode(&frame).unwrap();
            let reply = handler(&call);
            recorded.lock().unwrap().push(call);
            if transport.send(codec.encode(&reply).unwrap()).await.is_err() {
                break;
            }
        }
    });
    (calls, handle)
}

fn manifest(json: &str) -> Value {
    serde_json::from_str(json).unwrap()
}

/// A server exposing `root` with the given manifest, answering other calls with `handler`
fn sim_server<F>(
    transport: MemoryTransport,
    codec: CodecKind,
    root_manifest: Value,
    handler: F,
) -> Calls
where
    F: Fn(&CallEnvelope) -> ReplyEnvelope + Send + 'static,
{
    let (calls, _) = serve(transport, codec, move |call| {
        if call.func == "wsRemoteApi.info" {
            ReplyEnvelope::success(vec![root_manifest.clone()])
        } else {
            handler(call)
        }
    });
    calls
}

fn json_client(transport: MemoryTransport) -> RemoteApiClient {
    RemoteApiClient::with_transport(transport, ClientConfig::default().with_codec("json")).unwrap()
}

fn func_names(calls: &Calls) -> Vec<String> {
    calls.lock().unwrap().iter().map(|c| c.func.clone()).collect()
}

#[tokio::test]
async fn ping_through_a_proxy() {
    init_tracing();
    let (client_side, mut server_side) = MemoryTransport::pair();
    let client = json_client(client_side);

    let server = tokio::spawn(async move {
        let introspect = server_side.receive().await.unwrap();
        assert_eq!(
            introspect,
            Frame::Text(r#"{"func":"wsRemoteApi.info","args":["root"]}"#.to_string())
        );
        server_side
            .send(Frame::Text(
                r#"{"success":true,"ret":[{"ping":{"func":null}}]}"#.to_string(),
            ))
            .await
            .unwrap();

        let ping = server_side.receive().await.unwrap();
        assert_eq!(
            ping,
            Frame::Text(r#"{"func":"root.ping","args":[]}"#.to_string())
        );
        server_side
            .send(Frame::Text(r#"{"success":true,"ret":["pong"]}"#.to_string()))
            .await
            .unwrap();
        server_side
    });

    let root = client.get_object("root").await.unwrap();
    let ping = root.function("ping").unwrap();

    let mut result = None;
    ping.call_with(vec![], |ret| result = Some(ret), |e| panic!("unexpected error {}", e))
        .await
        .unwrap();
    assert_eq!(result, Some(vec![Value::from("pong")]));

    server.await.unwrap();
}

#[tokio::test]
async fn failure_reaches_only_the_error_handler() {
    init_tracing();
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    sim_server(
        server_side,
        CodecKind::Json,
        manifest(r#"{"ping": {"func": null}}"#),
        |_| ReplyEnvelope::failure("not found"),
    );

    let root = client.get_object("root").await.unwrap();

    let mut error = None;
    root.function("ping")
        .unwrap()
        .call_with(vec![], |_| panic!("success handler called"), |e| error = Some(e))
        .await
        .unwrap();
    assert_eq!(error.as_deref(), Some("not found"));

    // Without an error handler the failure is only logged
    root.function("ping")
        .unwrap()
        .call_then(vec![], |_| panic!("success handler called"))
        .await
        .unwrap();

    match root.call("ping", vec![]).await {
        Err(Error::Application(e)) => {
            assert_eq!(e.function, "root.ping");
            assert_eq!(e.message, "not found");
        }
        other => panic!("expected application error, got {:?}", other),
    }
}

#[tokio::test]
async fn constants_need_no_round_trip() {
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    let calls = sim_server(
        server_side,
        CodecKind::Json,
        manifest(r#"{"version": {"const": "1.2.0"}, "limits": {"max": {"const": 8}}}"#),
        |_| ReplyEnvelope::failure("unexpected call"),
    );

    let root = client.get_object("root").await.unwrap();
    assert_eq!(root.constant("version"), Some(&Value::from("1.2.0")));
    assert_eq!(
        root.lookup("limits.max").and_then(|n| n.as_constant()),
        Some(&Value::from(8))
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(func_names(&calls), vec!["wsRemoteApi.info"]);
}

#[tokio::test]
async fn proxy_tree_matches_the_manifest() {
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    let raw = manifest(
        r#"{
            "ping": {"func": null},
            "version": {"const": "1.2.0"},
            "scene": {
                "load": {"func": null},
                "objects": {"count": {"func": null}, "kinds": {"const": ["box", "sphere"]}}
            },
            "empty": {}
        }"#,
    );
    sim_server(server_side, CodecKind::Json, raw.clone(), |call| {
        ReplyEnvelope::success(vec![Value::from(call.func.as_str())])
    });

    let root = client.get_object("root").await.unwrap();

    let expected = Descriptor::parse_manifest("root", &raw).unwrap();
    assert_eq!(root.to_descriptors(), expected);
    assert!(root.namespace("empty").unwrap().is_empty());

    let count = root.lookup("scene.objects.count").unwrap().as_function().unwrap();
    assert_eq!(count.path(), "root.scene.objects.count");

    // Functions are called by their full dotted name
    let ret = count.call(vec![]).await.unwrap();
    assert_eq!(ret, vec![Value::from("root.scene.objects.count")]);
}

#[tokio::test]
async fn sequential_and_concurrent_calls_stay_paired() {
    init_tracing();
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    sim_server(
        server_side,
        CodecKind::Json,
        manifest(r#"{"echo": {"func": null}}"#),
        |call| ReplyEnvelope::success(call.args.clone()),
    );

    let root = client.get_object("root").await.unwrap();
    for i in 0..5 {
        let ret = root.call("echo", vec![Value::from(i)]).await.unwrap();
        assert_eq!(ret, vec![Value::from(i)]);
    }

    let echo = root.function("echo").unwrap();
    let calls = (0..8).map(|i| {
        let echo = echo.clone();
        async move { (i, echo.call(vec![Value::from(i)]).await) }
    });
    for (i, ret) in spawn_all(calls).await {
        assert_eq!(ret.unwrap(), vec![Value::from(i)]);
    }
}

/// Run futures as separate tasks and collect their outputs in order
async fn spawn_all<F>(futures: impl Iterator<Item = F>) -> Vec<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap());
    }
    out
}

#[tokio::test]
async fn custom_introspection_function() {
    let (client_side, server_side) = MemoryTransport::pair();
    let config = ClientConfig::default()
        .with_codec("json")
        .with_introspection_function("describe");
    let client = RemoteApiClient::with_transport(client_side, config).unwrap();

    let (calls, _) = serve(server_side, CodecKind::Json, |call| {
        assert_eq!(call.args, vec![Value::from("robot")]);
        ReplyEnvelope::success(vec![manifest(r#"{"home": {"func": null}}"#)])
    });

    let robot = client.get_object("robot").await.unwrap();
    assert_eq!(robot.function("home").unwrap().path(), "robot.home");
    assert_eq!(func_names(&calls), vec!["describe"]);
}

#[tokio::test]
async fn invalid_manifests_are_rejected() {
    let cases = [
        r#"{"bad": {"func": null, "extra": 1}}"#,
        r#"{"bad": {"func": null, "const": 1}}"#,
        r#"{"bad": 5}"#,
        r#""not a map""#,
    ];

    for case in cases {
        let (client_side, server_side) = MemoryTransport::pair();
        let client = json_client(client_side);
        sim_server(server_side, CodecKind::Json, manifest(case), |_| {
            ReplyEnvelope::success(vec![])
        });

        match client.get_object("root").await {
            Err(Error::InvalidManifest { root, .. }) => assert_eq!(root, "root"),
            other => panic!("{}: expected InvalidManifest, got {:?}", case, other),
        }
    }
}

#[tokio::test]
async fn introspection_without_return_value_is_rejected() {
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    serve(server_side, CodecKind::Json, |_| ReplyEnvelope::success(vec![]));

    let result = client.get_object("root").await;
    assert!(matches!(result, Err(Error::InvalidManifest { .. })));
}

#[tokio::test]
async fn unknown_object_is_an_application_error() {
    let (client_side, server_side) = MemoryTransport::pair();
    let client = json_client(client_side);
    serve(server_side, CodecKind::Json, |call| {
        ReplyEnvelope::failure(format!("no object {:?}", call.args[0]))
    });

    let err = client.get_object("missing").await.unwrap_err();
    assert!(err.is_application());
}

#[tokio::test]
async fn unknown_codec_fails_before_any_io() {
    let (client_side, mut server_side) = MemoryTransport::pair();
    let config = ClientConfig::default().with_codec("msgpack");

    let result = RemoteApiClient::with_transport(client_side, config);
    assert!(matches!(result, Err(Error::Configuration(_))));

    // The transport was dropped unused
    assert!(server_side.receive().await.is_err());

    // No connection attempt is made either
    let config = ClientConfig::default().with_port(1).with_codec("xml");
    let result = RemoteApiClient::connect(config).await;
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let (client_side, mut server_side) = MemoryTransport::pair();
    let client = json_client(client_side);

    tokio::spawn(async move {
        let _ = server_side.receive().await.unwrap();
        server_side
            .send(Frame::Text(r#"{"success":true,"ret":"pong"}"#.to_string()))
            .await
            .unwrap();
        let _ = server_side.receive().await.unwrap();
        server_side
            .send(Frame::Text(r#"{"success":true}"#.to_string()))
            .await
            .unwrap();
    });

    let err = client.call("root.ping", vec![]).await.unwrap_err();
    assert!(err.is_decode(), "got {:?}", err);

    // The connection survives and a missing `ret` means no return values
    assert_eq!(client.call("root.ping", vec![]).await.unwrap(), vec![]);
}

#[tokio::test]
async fn closed_connection_fails_calls() {
    let (client_side, mut server_side) = MemoryTransport::pair();
    let client = json_client(client_side);

    tokio::spawn(async move {
        let _ = server_side.receive().await.unwrap();
        drop(server_side);
    });

    let err = client.call("root.ping", vec![]).await.unwrap_err();
    assert!(err.is_connection_closed(), "got {:?}", err);
    assert!(client.is_closed());

    let err = client.call("root.ping", vec![]).await.unwrap_err();
    assert!(err.is_connection_closed());
}

#[tokio::test]
async fn cancelled_call_returns_cancelled() {
    let (client_side, mut server_side) = MemoryTransport::pair();
    let client = json_client(client_side);

    let token = CancellationToken::new();
    let call = tokio::spawn({
        let invoker = client.invoker().clone();
        let token = token.clone();
        async move {
            invoker
                .call_with_cancel("root.slow", vec![], &token)
                .await
        }
    });

    let _ = server_side.receive().await.unwrap();
    token.cancel();
    match call.await.unwrap() {
        Err(Error::Transport(remote_api_fabric::Error::Cancelled)) => {}
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[tokio::test]
async fn request_timeout_from_config() {
    let (client_side, _server_side) = MemoryTransport::pair();
    let config = ClientConfig::default()
        .with_codec("json")
        .with_request_timeout(Duration::from_millis(30));
    let client = RemoteApiClient::with_transport(client_side, config).unwrap();

    let err = client.call("root.slow", vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(remote_api_fabric::Error::Timeout)
    ));
}

#[tokio::test]
async fn cbor_over_websocket_end_to_end() {
    init_tracing();
    let listener = WebSocketListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();

    let calls: Arc<Mutex<Option<Calls>>> = Arc::default();
    let server_calls = calls.clone();
    tokio::spawn(async move {
        let transport = listener.accept().await.unwrap();
        let mut members = BTreeMap::new();
        members.insert("checksum".to_string(), Descriptor::Function);
        let root_manifest = Descriptor::manifest_to_value(&members);

        let (recorded, handle) = serve(transport, CodecKind::Cbor, move |call| {
            if call.func == "wsRemoteApi.info" {
                ReplyEnvelope::success(vec![root_manifest.clone()])
            } else {
                let len = call.args[0].as_bytes().map_or(0, <[u8]>::len);
                ReplyEnvelope::success(vec![Value::from(len), Value::from(vec![0xdeu8, 0xad])])
            }
        });
        *server_calls.lock().unwrap() = Some(recorded);
        let _ = handle.await;
    });

    let config = ClientConfig::default()
        .with_host("127.0.0.1")
        .with_port(port);
    let client = RemoteApiClient::connect(config).await.unwrap();
    assert_eq!(client.codec(), CodecKind::Cbor);

    let root = client.get_object("blob").await.unwrap();
    let ret = root
        .call("checksum", vec![Value::from(vec![1u8, 2, 3])])
        .await
        .unwrap();
    assert_eq!(ret, vec![Value::from(3), Value::Bytes(vec![0xde, 0xad])]);

    client.close().await;
    assert!(client.is_closed());

    let recorded = calls.lock().unwrap().clone().unwrap();
    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded[1].func, "blob.checksum");
    assert_eq!(recorded[1].args, vec![Value::Bytes(vec![1, 2, 3])]);
}

//! End-to-end client exchanges against an in-process broker
//!
//! The broker answers each request by operation, echoing its sequence
//! number, so every client call runs the full build/send/receive/validate
//! path.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use endpoint_protocol::config::ClientConfig;
use endpoint_protocol::core::codec::FrameCodec;
use endpoint_protocol::core::frame::{MessageContext, MessageFrame, HEADER_SIZE};
use endpoint_protocol::error::ProtocolError;
use endpoint_protocol::protocol::context::{check_context, Operation};
use endpoint_protocol::service::Client;
use endpoint_protocol::session::ClientSession;
use futures::{SinkExt, StreamExt};
use tokio::io::{duplex, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

const ROOT: u64 = 0x00AA_BBCC_DDEE_FF01;
const DENIED_UID: u64 = 666;

fn reply(request: &MessageFrame, context: MessageContext, payload: &[u8]) -> MessageFrame {
    let mut frame = MessageFrame::new();
    frame.set_blob(0, payload).unwrap();
    frame
        .prepare_header(
            0,
            request.source(),
            HEADER_SIZE + payload.len(),
            request.sequence_number(),
            request.session(),
            context,
        )
        .unwrap();
    frame
}

fn answer(request: &MessageFrame) -> Option<MessageFrame> {
    let is = |operation: Operation| check_context(request, operation.request());

    if is(Operation::Identify) {
        Some(reply(
            request,
            Operation::Identify.response(),
            &[0, 2, 0, 3, 0xA0, 0xA1, 0xB0, 0xB1, 0xB2],
        ))
    } else if is(Operation::Authenticate) {
        let mut proof = request.payload().to_vec();
        proof.reverse();
        Some(reply(request, Operation::Authenticate.response(), &proof))
    } else if is(Operation::Register) {
        let context = if request.source() == DENIED_UID {
            Operation::Register.rejection()
        } else {
            Operation::Register.response()
        };
        Some(reply(request, context, &[]))
    } else if is(Operation::GetKey) {
        let mut payload = vec![0u8; 64];
        payload.extend_from_slice(&[0x5A; 64]);
        Some(reply(request, Operation::GetKey.response(), &payload))
    } else if is(Operation::FindRoot) {
        let mut payload = request.payload().to_vec();
        payload.extend_from_slice(&ROOT.to_be_bytes());
        Some(reply(request, Operation::FindRoot.response(), &payload))
    } else if is(Operation::Subscribe) {
        Some(reply(request, Operation::Subscribe.response(), &[]))
    } else if is(Operation::Unsubscribe) {
        // Wrong qualifier on purpose for topic 99
        let context = if request.topic() == 99 {
            Operation::Subscribe.response()
        } else {
            Operation::Unsubscribe.response()
        };
        Some(reply(request, context, &[]))
    } else {
        None
    }
}

/// Serve `stream` until the client hangs up; publishes are forwarded to `published`
async fn broker(stream: DuplexStream, published: mpsc::UnboundedSender<MessageFrame>) {
    let mut framed = Framed::new(stream, FrameCodec);
    while let Some(Ok(request)) = framed.next().await {
        match answer(&request) {
            Some(response) => {
                if framed.send(response).await.is_err() {
                    break;
                }
            }
            None => {
                let _ = published.send(request);
            }
        }
    }
}

fn connected_client() -> (Client, mpsc::UnboundedReceiver<MessageFrame>) {
    let (client_side, broker_side) = duplex(8192);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(broker(broker_side, tx));
    (Client::from_stream(client_side), rx)
}

#[tokio::test]
async fn test_identify_and_authenticate() {
    let (mut client, _published) = connected_client();

    let identity = client.identify(42, &[1, 2, 3]).await.unwrap();
    assert_eq!(identity.salt, vec![0xA0, 0xA1]);
    assert_eq!(identity.nonce, vec![0xB0, 0xB1, 0xB2]);
    assert_eq!(client.session().local_identity(), 42);

    let proof = client.authenticate(&[1, 2, 3, 4]).await.unwrap();
    assert_eq!(proof, vec![4, 3, 2, 1]);
    assert_eq!(client.protocol().sequence_number(), 2);
}

#[tokio::test]
async fn test_register_and_get_key() {
    let (mut client, _published) = connected_client();

    client.register(7, Some(&[9u8; 16][..])).await.unwrap();
    let key = client.get_key(None).await.unwrap();
    assert_eq!(key.as_bytes(), &[0x5A; 64]);
}

#[tokio::test]
async fn test_denied_registration_keeps_connection() {
    let (mut client, _published) = connected_client();

    let result = client.register(DENIED_UID, None).await;
    assert!(matches!(result, Err(ProtocolError::ContextMismatch(_))));
    assert!(client.is_connected());
    assert_eq!(client.transport().metrics().snapshot().protocol_errors, 1);

    client.register(8, None).await.unwrap();
}

#[tokio::test]
async fn test_find_root_sets_remote_identity() {
    let (mut client, _published) = connected_client();

    let root = client.find_root(0x0102_0304_0506_0708).await.unwrap();
    assert_eq!(root, ROOT);
    assert_eq!(client.session().remote_identity(), ROOT);
}

#[tokio::test]
async fn test_publish_sends_without_waiting() {
    let (mut client, mut published) = connected_client();

    client.publish(17, Some(&b"temperature=21"[..])).await.unwrap();

    let frame = published.recv().await.unwrap();
    assert_eq!(frame.topic(), 17);
    assert_eq!(frame.payload(), b"temperature=21");
    assert!(check_context(&frame, Operation::Publish.request()));
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe() {
    let (mut client, _published) = connected_client();

    assert_eq!(client.subscribe(5).await.unwrap(), 5);
    assert_eq!(client.unsubscribe(5).await.unwrap(), 5);

    assert!(matches!(
        client.unsubscribe(99).await,
        Err(ProtocolError::ContextMismatch(_))
    ));
}

#[tokio::test]
async fn test_oversized_input_never_reaches_the_wire() {
    let (mut client, _published) = connected_client();

    let result = client.authenticate(&[0u8; 1001]).await;
    assert!(matches!(result, Err(ProtocolError::MalformedRequest(_))));
    assert_eq!(client.protocol().sequence_number(), 0);
    assert_eq!(client.transport().metrics().snapshot().frames_sent, 0);
}

#[tokio::test]
async fn test_close_then_call_fails() {
    let (mut client, _published) = connected_client();
    client.close().await;

    assert!(matches!(
        client.subscribe(1).await,
        Err(ProtocolError::ConnectionFailure(_))
    ));
}

#[tokio::test]
async fn test_connect_with_config_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(socket, FrameCodec);
        while let Some(Ok(request)) = framed.next().await {
            if let Some(response) = answer(&request) {
                framed.send(response).await.unwrap();
            }
        }
    });

    let config = ClientConfig {
        address: format!("127.0.0.1:{port}"),
        response_timeout: Duration::from_secs(3),
        ..ClientConfig::default()
    };
    let mut client = Client::connect_with_config(&config).await.unwrap();
    assert_eq!(client.transport().timeout(), Some(Duration::from_secs(3)));

    assert_eq!(client.subscribe(3).await.unwrap(), 3);
    client.close().await;
}

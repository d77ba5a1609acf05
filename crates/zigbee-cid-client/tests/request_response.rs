//! Request/response behaviour of `CidClient` against a scripted coordinator.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use zigbee_cid_client::protocol::*;
use zigbee_cid_client::{CidClient, ClientConfig, ClientError};

/// Sink that records every frame written.
#[derive(Clone, Default)]
struct Wire(Arc<Mutex<Vec<u8>>>);

impl Wire {
    fn written(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl Write for Wire {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn client() -> (Arc<CidClient<Wire>>, Wire) {
    let wire = Wire::default();
    let config = ClientConfig {
        default_timeout_ms: 100,
        ..ClientConfig::default()
    };
    (Arc::new(CidClient::new(wire.clone(), config)), wire)
}

fn ping_reply() -> Vec<u8> {
    let payload = [
        0x0F, 0x81, 0x12, 0x01, 0x04, 0x00, 0x00, 0x00, 0x0D, 0x6F, 0x00, 0x00, 0x00, 0x00, 0x2A,
    ];
    encode_frame(RESP_SYS_PING, &payload).unwrap()
}

fn time_reply(secs: u32) -> Vec<u8> {
    encode_frame(RESP_SYS_GET_TIME, &secs.to_be_bytes()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_ping_round_trip() {
    let (client, wire) = client();
    let responder = client.clone();
    let (info, ()) = tokio::join!(client.ping(), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        responder.on_bytes_received(&ping_reply());
    });

    let info = info.unwrap();
    assert_eq!(info.firmware_version, 0x12);
    assert_eq!(info.ieee_address, 0x000D_6F00_0000_002A);
    assert_eq!(wire.written(), CidPacket::ping().encode().unwrap());
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reply_split_across_chunks() {
    let (client, _wire) = client();
    let responder = client.clone();
    let reply = time_reply(86_400);
    let (time, ()) = tokio::join!(client.system_time(), async move {
        for chunk in reply.chunks(3) {
            tokio::time::sleep(Duration::from_millis(1)).await;
            responder.on_bytes_received(chunk);
        }
    });
    assert_eq!(time.unwrap().to_rfc3339(), "2000-01-02T00:00:00+00:00");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_match() {
    let (client, _wire) = client();
    let err = client
        .send_and_await(
            &CidPacket::get_system_time(),
            ResponseKind::SystemTime,
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    match err {
        ClientError::Timeout { kind, after } => {
            assert_eq!(kind, ResponseKind::SystemTime);
            assert_eq!(after, Duration::from_millis(50));
        }
        other => panic!("expected timeout, got {other}"),
    }
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_match_does_not_resolve_completed_call() {
    let (client, _wire) = client();
    let mut events = client.subscribe();

    let result = client
        .send_and_await(
            &CidPacket::get_system_time(),
            ResponseKind::SystemTime,
            Duration::from_millis(20),
        )
        .await;
    assert!(matches!(result, Err(ClientError::Timeout { .. })));

    // The late reply is still broadcast, but nobody is waiting for it.
    client.on_bytes_received(&time_reply(1));
    assert_eq!(events.try_recv().unwrap().kind(), ResponseKind::SystemTime);
    assert_eq!(client.pending_requests(), 0);

    // A fresh request does not pick up the stale reply.
    let fresh = client
        .send_and_await(
            &CidPacket::get_system_time(),
            ResponseKind::SystemTime,
            Duration::from_millis(20),
        )
        .await;
    assert!(matches!(fresh, Err(ClientError::Timeout { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_responses_do_not_resolve() {
    let (client, _wire) = client();
    let responder = client.clone();
    let (result, ()) = tokio::join!(client.ping(), async move {
        responder.on_bytes_received(&time_reply(5));
        responder.on_bytes_received(&encode_frame(0x0ABC, &[1, 2]).unwrap());
    });
    assert!(matches!(
        result,
        Err(ClientError::Timeout {
            kind: ResponseKind::Ping,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_of_distinct_kinds() {
    let (client, wire) = client();
    let responder = client.clone();

    // Replies arrive in the opposite order of the requests.
    let (ping, time, ()) = tokio::join!(client.ping(), client.system_time(), async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut both = time_reply(60);
        both.extend(ping_reply());
        responder.on_bytes_received(&both);
    });

    assert_eq!(ping.unwrap().firmware_version, 0x12);
    assert_eq!(time.unwrap().to_rfc3339(), "2000-01-01T00:01:00+00:00");
    assert_eq!(wire.written().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_deregisters() {
    let (client, _wire) = client();
    {
        let packet = CidPacket::ping();
        let call = client.send_and_await(
            &packet,
            ResponseKind::Ping,
            Duration::from_secs(10),
        );
        let outcome = tokio::time::timeout(Duration::from_millis(5), call).await;
        assert!(outcome.is_err());
    }
    assert_eq!(client.pending_requests(), 0);

    // Nothing is registered, so the reply only reaches subscribers.
    let mut events = client.subscribe();
    client.on_bytes_received(&ping_reply());
    assert_eq!(events.try_recv().unwrap().kind(), ResponseKind::Ping);
}

#[tokio::test]
async fn test_encode_error_writes_nothing() {
    let (client, wire) = client();
    let packet = CidPacket::new(0x0031, vec![0; 300]);
    let err = client
        .send_and_await(&packet, ResponseKind::ZclMessage, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Protocol(ProtocolError::InvalidArgument(_))
    ));
    assert!(wire.written().is_empty());
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_client() {
    let (client, wire) = client();
    let waiter = client.clone();
    let (result, ()) = tokio::join!(waiter.ping(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        client.shutdown();
    });
    assert!(matches!(result, Err(ClientError::Closed)));

    assert!(matches!(client.ping().await, Err(ClientError::Closed)));
    assert!(matches!(
        client.send_packet(&CidPacket::ping()),
        Err(ClientError::Closed)
    ));
    assert_eq!(wire.written(), CidPacket::ping().encode().unwrap());
    assert_eq!(Arc::strong_count(&wire.0), 1);
}

#[tokio::test]
async fn test_set_time_before_epoch_is_rejected() {
    let (client, wire) = client();
    let time = chrono::DateTime::parse_from_rfc3339("1999-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    assert!(matches!(
        client.set_system_time(time).await,
        Err(ClientError::Protocol(_))
    ));
    assert!(wire.written().is_empty());
}

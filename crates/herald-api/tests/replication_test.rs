//! End-to-end replication between a served event bus and HTTP clients.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use herald_bus::local::Subscription;
use herald_bus::server::EventBusServer;
use herald_client::client::EventBusClient;
use herald_client::config::ClientConfig;
use herald_client::registry::EventRegistry;
use herald_core::event::{Envelope, SharedEvent};
use herald_core::kind::EventKind;
use herald_test_support::{OrderPlaced, OrderShipped, at, order_placed, order_shipped};
use uuid::Uuid;

async fn serve(server: Arc<EventBusServer>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = common::build_test_app(server);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn registry() -> EventRegistry {
    EventRegistry::builder()
        .register_payload::<OrderPlaced>()
        .register_payload::<OrderShipped>()
        .build()
}

async fn next_event(subscription: &mut Subscription) -> SharedEvent {
    tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("timed out waiting for a replicated event")
        .expect("subscription ended")
}

#[tokio::test]
async fn test_client_replicates_server_events_in_order() {
    // Arrange
    let (server, _) = common::in_memory_server();
    let addr = serve(server.clone()).await;
    let config = ClientConfig::new(format!("http://{addr}/api/v1"))
        .with_poll_interval(Duration::from_millis(50))
        .with_initial_cursor(at(9, 59, 59));
    let client = EventBusClient::connect(config, registry()).unwrap();
    let mut subscription = client.subscribe(EventKind::Any);
    let e1 = order_placed(at(10, 0, 0), 100);
    let e2 = order_shipped(at(10, 0, 1), e1.payload.order_id);
    let e3 = order_placed(at(10, 0, 2), 300);

    // Act
    for event in [e1.clone().shared(), e2.clone().shared(), e3.clone().shared()] {
        server.publish(event).await.unwrap();
    }
    let received = [
        next_event(&mut subscription).await,
        next_event(&mut subscription).await,
        next_event(&mut subscription).await,
    ];

    // Assert
    let ids: Vec<Uuid> = received.iter().map(|e| e.metadata().event_id).collect();
    assert_eq!(
        ids,
        vec![e1.metadata.event_id, e2.metadata.event_id, e3.metadata.event_id]
    );
    let shipped = received[1].downcast_ref::<Envelope<OrderShipped>>().unwrap();
    assert_eq!(shipped, &e2);
    assert_eq!(client.cursor().await, at(10, 0, 2));
    client.close();
}

#[tokio::test]
async fn test_auto_forwarded_event_reaches_other_clients_once() {
    // Arrange
    let (server, repository) = common::in_memory_server();
    let addr = serve(server.clone()).await;
    let base = format!("http://{addr}/api/v1");
    let publisher = EventBusClient::connect(
        ClientConfig::new(base.clone())
            .with_poll_interval(Duration::from_millis(50))
            .with_initial_cursor(at(0, 0, 0))
            .with_auto_forward(true),
        registry(),
    )
    .unwrap();
    let observer = EventBusClient::connect(
        ClientConfig::new(base)
            .with_poll_interval(Duration::from_millis(50))
            .with_initial_cursor(at(0, 0, 0)),
        registry(),
    )
    .unwrap();
    let mut publisher_bus = publisher.subscribe(EventKind::Any);
    let mut observer_bus = observer.subscribe(EventKind::Any);
    let local = order_placed(at(10, 0, 0), 55);

    // Act
    publisher.publish(local.clone().shared()).unwrap();
    let seen_by_observer = next_event(&mut observer_bus).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Assert
    assert_eq!(seen_by_observer.metadata().event_id, local.metadata.event_id);
    assert_eq!(repository.len(), 1);
    // The publisher sees its own local publish, but not the server's echo.
    assert_eq!(
        next_event(&mut publisher_bus).await.metadata().event_id,
        local.metadata.event_id
    );
    assert!(publisher_bus.try_recv().is_none());
    assert!(observer_bus.try_recv().is_none());
    assert_eq!(publisher.cursor().await, at(10, 0, 0));
    publisher.close();
    observer.close();
}

#[tokio::test]
async fn test_client_keeps_polling_while_server_is_unreachable() {
    // Arrange: reserve a port, then free it so connections are refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = EventBusClient::connect(
        ClientConfig::new(format!("http://{addr}/api/v1"))
            .with_poll_interval(Duration::from_millis(20))
            .with_request_timeout(Duration::from_millis(200))
            .with_initial_cursor(at(9, 0, 0)),
        registry(),
    )
    .unwrap();

    // Act
    tokio::time::sleep(Duration::from_millis(150)).await;
    let explicit = client.poll_once().await;

    // Assert
    assert!(explicit.is_err());
    assert_eq!(client.cursor().await, at(9, 0, 0));
    assert_eq!(client.state(), herald_client::client::ClientState::Polling);
    client.close();
}

#[cfg(test)]
mod integration_tests {
    use crate::service::quick_match_service::QuickMatchQueue;
    use redis::aio::ConnectionManager;
    use redis::Client;
    use uuid::Uuid;

    // Run with: REDIS_URL=redis://127.0.0.1:6379/ cargo test -- --ignored
    async fn create_test_queue() -> QuickMatchQueue {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string());
        let client = Client::open(url).expect("Failed to create Redis client for testing");
        let conn = ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis for testing");

        QuickMatchQueue::with_key(conn, format!("quickmatch:test:{}", Uuid::new_v4()))
    }

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[tokio::test]
    #[ignore]
    async fn test_join_is_idempotent() {
        let queue = create_test_queue().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let status = queue.join(first).await.unwrap();
        assert_eq!((status.position, status.size, status.newly_joined), (1, 1, true));
        let status = queue.join(second).await.unwrap();
        assert_eq!((status.position, status.size, status.newly_joined), (2, 2, true));

        let status = queue.join(first).await.unwrap();
        assert_eq!((status.position, status.size, status.newly_joined), (1, 2, false));
        assert_eq!(queue.size().await.unwrap(), 2);
    }

    #[tokio::test]
    #[ignore]
    async fn test_pop_takes_exactly_ten() {
        let queue = create_test_queue().await;
        let players = ids(12);

        for id in &players[..9] {
            queue.join(*id).await.unwrap();
        }
        assert_eq!(queue.pop(10).await.unwrap(), None);
        assert_eq!(queue.size().await.unwrap(), 9);

        for id in &players[9..] {
            queue.join(*id).await.unwrap();
        }
        let popped = queue.pop(10).await.unwrap().unwrap();
        assert_eq!(popped, players[..10].to_vec());
        assert_eq!(queue.size().await.unwrap(), 2);

        let status = queue.status(players[11]).await.unwrap().unwrap();
        assert_eq!((status.position, status.size), (2, 2));
        assert_eq!(queue.status(players[0]).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_requeue_restores_head_order_without_duplicates() {
        let queue = create_test_queue().await;
        let players = ids(3);
        let waiting = Uuid::new_v4();

        queue.join(waiting).await.unwrap();
        // players[1] rejoined before the batch went back.
        queue.join(players[1]).await.unwrap();

        let size = queue.requeue(&players).await.unwrap();
        assert_eq!(size, 4);
        let popped = queue.pop(4).await.unwrap().unwrap();
        assert_eq!(popped, vec![players[0], players[2], waiting, players[1]]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_leave() {
        let queue = create_test_queue().await;
        let id = Uuid::new_v4();

        queue.join(id).await.unwrap();
        assert!(queue.leave(id).await.unwrap());
        assert!(!queue.leave(id).await.unwrap());
        assert_eq!(queue.size().await.unwrap(), 0);
    }
}

//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 事件线格式快照测试
//! - 分发顺序与生命周期端到端测试
//! - 配置 -> destination -> 输出 的完整链路

#[cfg(test)]
mod contract_tests {
    use contracts::Event;

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new("auth", "10.0.0.1")
            .with_name("login")
            .with_id(7);
        let json: serde_json::Value = serde_json::from_slice(&event.to_json()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "event": "login",
                "id": 7,
                "ip_addr": "10.0.0.1",
                "service_id": "auth",
            })
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, Destination, Event};
    use dispatcher::{
        CancellationToken, Dispatcher, DispatcherBuilder, DispatcherConfig, DispatcherError,
    };

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Destination writing every lifecycle call into a shared journal
    struct Recorder {
        name: String,
        journal: Journal,
        refuse_setup: bool,
    }

    impl Recorder {
        fn new(name: &str, journal: &Journal) -> Self {
            Self {
                name: name.to_string(),
                journal: Arc::clone(journal),
                refuse_setup: false,
            }
        }

        fn refusing(mut self) -> Self {
            self.refuse_setup = true;
            self
        }

        fn push(&self, entry: String) {
            self.journal.lock().unwrap().push(entry);
        }
    }

    impl Destination for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn setup(&mut self, _ctx: &CancellationToken) -> Result<(), ContractError> {
            if self.refuse_setup {
                self.push(format!("{} setup failed", self.name));
                return Err(ContractError::destination_setup(&self.name, "refused"));
            }
            self.push(format!("{} setup", self.name));
            Ok(())
        }

        async fn record(&mut self, _ctx: &CancellationToken, event: &Event) {
            self.push(format!("{} {}", self.name, event.name().unwrap_or("-")));
        }

        async fn teardown(&mut self, _ctx: &CancellationToken) {
            self.push(format!("{} teardown", self.name));
        }
    }

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    async fn wait_for_dispatch(dispatcher: &Dispatcher, count: u64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while dispatcher.metrics().dispatched_count < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("events were not dispatched in time");
        // The last dequeued event may still be in delivery; teardown waits
        // for it.
    }

    /// Two destinations, two events: every event reaches every destination
    /// in registration order, and teardown follows the same order.
    #[tokio::test]
    async fn test_fan_out_order_end_to_end() {
        let ctx = CancellationToken::new();
        let journal = journal();

        let dispatcher = DispatcherBuilder::new(DispatcherConfig::new("127.0.0.1"))
            .build(&ctx)
            .await
            .unwrap();
        dispatcher
            .register_destination(&ctx, Recorder::new("d1", &journal))
            .await
            .unwrap();
        dispatcher
            .register_destination(&ctx, Recorder::new("d2", &journal))
            .await
            .unwrap();

        dispatcher
            .record(Event::new("auth", "10.0.0.1").with_name("e1"))
            .await;
        dispatcher
            .record(Event::new("auth", "10.0.0.1").with_name("e2"))
            .await;
        wait_for_dispatch(&dispatcher, 2).await;
        dispatcher.teardown(&ctx).await.unwrap();

        assert_eq!(
            entries(&journal),
            vec![
                "d1 setup",
                "d2 setup",
                "d1 e1",
                "d2 e1",
                "d1 e2",
                "d2 e2",
                "d1 teardown",
                "d2 teardown",
            ]
        );

        let snapshot = dispatcher.metrics();
        assert_eq!(snapshot.recorded_count, 2);
        assert_eq!(snapshot.delivered_count, 4);
    }

    #[tokio::test]
    async fn test_failed_setup_receives_nothing() {
        let ctx = CancellationToken::new();
        let journal = journal();

        let dispatcher = DispatcherBuilder::new(
            DispatcherConfig::new("127.0.0.1").with_destination(Recorder::new("ok", &journal)),
        )
        .build(&ctx)
        .await
        .unwrap();

        let result = dispatcher
            .register_destination(&ctx, Recorder::new("bad", &journal).refusing())
            .await;
        assert!(matches!(
            result,
            Err(DispatcherError::DestinationSetup { ref name, .. }) if name == "bad"
        ));
        assert_eq!(dispatcher.destination_names().await, vec!["ok".to_string()]);

        dispatcher
            .record(Event::new("auth", "10.0.0.1").with_name("e1"))
            .await;
        wait_for_dispatch(&dispatcher, 1).await;
        dispatcher.teardown(&ctx).await.unwrap();

        assert_eq!(
            entries(&journal),
            vec!["ok setup", "bad setup failed", "ok e1", "ok teardown"]
        );
    }

    #[tokio::test]
    async fn test_lifecycle_after_teardown() {
        let ctx = CancellationToken::new();
        let journal = journal();

        let dispatcher = DispatcherBuilder::new(DispatcherConfig::new("127.0.0.1"))
            .build(&ctx)
            .await
            .unwrap();
        dispatcher.teardown(&ctx).await.unwrap();

        dispatcher.record(Event::new("auth", "10.0.0.1")).await;
        let late = dispatcher
            .register_destination(&ctx, Recorder::new("late", &journal))
            .await;

        assert!(matches!(late, Err(DispatcherError::ShutDown)));
        assert!(matches!(
            dispatcher.teardown(&ctx).await,
            Err(DispatcherError::AlreadyTornDown)
        ));
        assert!(entries(&journal).is_empty());
        assert_eq!(dispatcher.metrics().dropped_count, 1);
    }

    /// The only test in this crate that touches the process-wide dispatcher.
    #[tokio::test]
    async fn test_global_accessor_returns_one_instance() {
        let ctx = CancellationToken::new();
        let journal = journal();

        let (first, second) = tokio::join!(
            dispatcher::get(
                &ctx,
                DispatcherConfig::new("10.0.0.1").with_destination(Recorder::new("a", &journal)),
            ),
            dispatcher::get(
                &ctx,
                DispatcherConfig::new("10.0.0.2").with_destination(Recorder::new("b", &journal)),
            ),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &dispatcher::try_get().unwrap()));
        // Exactly one config won, and only its destination was set up.
        assert_eq!(entries(&journal).len(), 1);
        assert_eq!(first.destination_names().await.len(), 1);
    }

    #[tokio::test]
    async fn test_blueprint_to_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let toml = format!(
            r#"
bind_address = "0.0.0.0"
queue_capacity = 4

[[destinations]]
name = "console"
destination_type = "log"

[[destinations]]
name = "archive"
destination_type = "file"
params = {{ path = "{}" }}
"#,
            path.display()
        );

        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let ctx = CancellationToken::new();
        let dispatcher = DispatcherBuilder::new(DispatcherConfig::from_blueprint(&blueprint).unwrap())
            .build(&ctx)
            .await
            .unwrap();

        assert_eq!(dispatcher.bind_address(), "0.0.0.0");
        assert_eq!(dispatcher.queue_capacity(), 4);
        assert_eq!(
            dispatcher.destination_names().await,
            vec!["console".to_string(), "archive".to_string()]
        );

        for i in 0..3 {
            dispatcher
                .record(
                    Event::new("billing", "10.0.0.9")
                        .with_name("charge")
                        .with_id(i)
                        .with_data(serde_json::json!({ "amount": i * 10 })),
                )
                .await;
        }
        wait_for_dispatch(&dispatcher, 3).await;
        dispatcher.teardown(&ctx).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<_> = written
            .lines()
            .map(|line| Event::from_json(line.as_bytes()).unwrap().id())
            .collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_blueprint_to_network_destination() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let json = format!(
            r#"{{
                "destinations": [
                    {{
                        "name": "udp",
                        "destination_type": "network",
                        "params": {{ "addr": "{}" }}
                    }}
                ]
            }}"#,
            receiver.local_addr().unwrap()
        );

        let blueprint = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        let ctx = CancellationToken::new();
        let dispatcher = DispatcherBuilder::new(DispatcherConfig::from_blueprint(&blueprint).unwrap())
            .build(&ctx)
            .await
            .unwrap();

        let event = Event::new("auth", "10.0.0.1").with_name("login");
        dispatcher.record(event.clone()).await;

        let mut buf = vec![0u8; 65536];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Event::from_json(&buf[..len]).unwrap(), event);

        dispatcher.teardown(&ctx).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use crate::discover::nacos::NacosRegistry;
    use crate::discover::{LoadBalanceStrategy, RegistryClient, RegistryError, ServiceInstance};
    use httpmock::prelude::*;
    use risk_core::RegistryConfig;
    use serde_json::json;

    fn config(endpoints: Vec<String>) -> RegistryConfig {
        RegistryConfig {
            endpoints,
            username: None,
            password: None,
            timeout_ms: 2000,
            beat_interval_ms: 60_000,
            ..Default::default()
        }
    }

    fn instance() -> ServiceInstance {
        ServiceInstance::new("risk-service", "risk-b-0", 8081).with_weight(10.0)
    }

    #[tokio::test]
    async fn test_register_acknowledged() {
        let server = MockServer::start();
        let register = server.mock(|when, then| {
            when.method(Method::POST)
                .path("/nacos/v1/ns/instance")
                .query_param("serviceName", "risk-service")
                .query_param("groupName", "DEFAULT_GROUP")
                .query_param("namespaceId", "public")
                .query_param("ip", "risk-b-0")
                .query_param("port", "8081")
                .query_param("weight", "10")
                .query_param("healthy", "true")
                .query_param("ephemeral", "true");
            then.status(200).body("ok");
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()])).unwrap();
        assert!(registry.register(&instance()).await.unwrap());
        register.assert_hits(1);
        registry.stop_beats();
    }

    #[tokio::test]
    async fn test_register_without_ack_is_not_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/ns/instance");
            then.status(200).body("failed");
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()])).unwrap();
        assert!(!registry.register(&instance()).await.unwrap());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/ns/instance");
            then.status(503).body("server is starting");
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()])).unwrap();
        assert!(matches!(
            registry.register(&instance()).await,
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let registry = NacosRegistry::new(config(vec!["http://127.0.0.1:1".to_string()])).unwrap();
        assert!(matches!(
            registry.find_healthy("risk-service").await,
            Err(RegistryError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_falls_over_to_next_endpoint() {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method(Method::GET).path("/nacos/v1/ns/instance/list");
            then.status(200).json_body(json!({
                "hosts": [{"ip": "10.0.0.7", "port": 8081, "weight": 1.0, "healthy": true, "enabled": true}]
            }));
        });

        let registry = NacosRegistry::new(config(vec![
            "http://127.0.0.1:1".to_string(),
            server.base_url(),
        ]))
        .unwrap();
        let found = registry.find_healthy("risk-service").await.unwrap().unwrap();
        assert_eq!(found.authority(), "10.0.0.7:8081");
        list.assert_hits(1);
    }

    #[tokio::test]
    async fn test_find_healthy_skips_ineligible_hosts() {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/nacos/v1/ns/instance/list")
                .query_param("serviceName", "risk-service")
                .query_param("healthyOnly", "true");
            then.status(200).json_body(json!({
                "name": "DEFAULT_GROUP@@risk-service",
                "hosts": [
                    {"ip": "10.0.0.1", "port": 8081, "weight": 1.0, "healthy": false, "enabled": true},
                    {"ip": "10.0.0.2", "port": 8081, "weight": 1.0, "healthy": true, "enabled": false},
                    {"ip": "10.0.0.3", "port": 8081, "weight": 0.0, "healthy": true, "enabled": true},
                    {"ip": "10.0.0.4", "port": 8081, "weight": 10.0, "healthy": true, "enabled": true}
                ]
            }));
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()])).unwrap();
        for _ in 0..5 {
            let found = registry.find_healthy("risk-service").await.unwrap().unwrap();
            assert_eq!(found.address, "10.0.0.4");
            assert_eq!(found.service_name, "risk-service");
        }
        list.assert_hits(5);
    }

    #[tokio::test]
    async fn test_find_healthy_empty_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::GET).path("/nacos/v1/ns/instance/list");
            then.status(200).json_body(json!({"hosts": []}));
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()]))
            .unwrap()
            .with_strategy(LoadBalanceStrategy::First);
        assert!(registry.find_healthy("risk-service").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_token_is_cached_and_sent() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/auth/login");
            then.status(200)
                .json_body(json!({"accessToken": "tkn", "tokenTtl": 18000, "globalAdmin": true}));
        });
        let list = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/nacos/v1/ns/instance/list")
                .query_param("accessToken", "tkn");
            then.status(200).json_body(json!({"hosts": []}));
        });

        let mut cfg = config(vec![server.base_url()]);
        cfg.username = Some("nacos".to_string());
        cfg.password = Some("nacos".to_string());
        let registry = NacosRegistry::new(cfg).unwrap();

        registry.find_healthy("risk-service").await.unwrap();
        registry.find_healthy("risk-service").await.unwrap();
        login.assert_hits(1);
        list.assert_hits(2);
    }

    #[tokio::test]
    async fn test_huge_token_ttl_is_clamped() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/auth/login");
            then.status(200)
                .json_body(json!({"accessToken": "tkn", "tokenTtl": u64::MAX}));
        });
        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/nacos/v1/ns/instance/list")
                .query_param("accessToken", "tkn");
            then.status(200).json_body(json!({"hosts": []}));
        });

        let mut cfg = config(vec![server.base_url()]);
        cfg.username = Some("nacos".to_string());
        cfg.password = Some("nacos".to_string());
        let registry = NacosRegistry::new(cfg).unwrap();

        assert!(registry.find_healthy("risk-service").await.unwrap().is_none());
        assert!(registry.find_healthy("risk-service").await.unwrap().is_none());
        login.assert_hits(1);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/auth/login");
            then.status(403).body("unknown user!");
        });

        let mut cfg = config(vec![server.base_url()]);
        cfg.username = Some("nacos".to_string());
        cfg.password = Some("wrong".to_string());
        let registry = NacosRegistry::new(cfg).unwrap();

        assert!(matches!(
            registry.register(&instance()).await,
            Err(RegistryError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_deregister() {
        let server = MockServer::start();
        let deregister = server.mock(|when, then| {
            when.method(Method::DELETE)
                .path("/nacos/v1/ns/instance")
                .query_param("ip", "risk-b-0")
                .query_param("port", "8081");
            then.status(200).body("ok");
        });

        let registry = NacosRegistry::new(config(vec![server.base_url()])).unwrap();
        registry.deregister(&instance()).await.unwrap();
        deregister.assert_hits(1);
    }

    #[tokio::test]
    async fn test_beat_runs_until_deregistered() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(Method::POST).path("/nacos/v1/ns/instance");
            then.status(200).body("ok");
        });
        server.mock(|when, then| {
            when.method(Method::DELETE).path("/nacos/v1/ns/instance");
            then.status(200).body("ok");
        });
        let beat = server.mock(|when, then| {
            when.method(Method::PUT)
                .path("/nacos/v1/ns/instance/beat")
                .query_param("ip", "risk-b-0")
                .query_param("port", "8081")
                .query_param_exists("beat");
            then.status(200)
                .json_body(json!({"clientBeatInterval": 5000, "code": 10200}));
        });

        let registry = NacosRegistry::new(RegistryConfig {
            beat_interval_ms: 50,
            ..config(vec![server.base_url()])
        })
        .unwrap();
        assert!(registry.register(&instance()).await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(beat.hits() >= 1);

        registry.deregister(&instance()).await.unwrap();
        let after_deregister = beat.hits();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(beat.hits(), after_deregister);
    }

    #[test]
    fn test_empty_endpoints_rejected_at_construction() {
        assert!(NacosRegistry::new(config(vec![])).is_err());
    }
}

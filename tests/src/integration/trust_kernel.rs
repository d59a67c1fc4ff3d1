//! # Trust Kernel Flows
//!
//! The kernel's guarantees, exercised through a fully wired bus:
//!
//! 1. Calls without a valid identity are dropped without tripping anything
//! 2. One authentication failure latches the module for the process lifetime
//! 3. Tokens are bound to the key of their tier
//! 4. A reply resolves its caller exactly once
//! 5. The bootstrap path is confined to its allowlist

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{Bus, BOOTSTRAP_SECRET};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use shared_bus::{EventName, KernelHandle, NotificationFilter, Reply};
    use shared_types::{
        BusError, BusResult, IssueModuleTokenRequest, MeltdownReason, ModuleType, NotificationPriority,
        NotificationType, Payload, TrustLevel,
    };
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    // =========================================================================
    // STRATEGIES
    // =========================================================================

    fn non_public_event() -> impl Strategy<Value = EventName> {
        prop_oneof![
            Just(EventName::IssueModuleToken),
            Just(EventName::IssueUserToken),
            Just(EventName::VerifyToken),
            Just(EventName::RegistrySelect),
            Just(EventName::RegistryInsert),
            Just(EventName::RegistryUpdate),
            Just(EventName::ReactivateModule),
            Just(EventName::ModuleHeartbeat),
            "[a-z]{1,8}\\.[a-z]{1,8}".prop_map(EventName::custom),
        ]
    }

    fn invalid_identity() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            "[0-9 ./]{1,10}".prop_map(Some),
        ]
    }

    fn tamper_tier(token: &str, tier: &str) -> String {
        let (body, signature) = token.split_once('.').unwrap();
        let mut claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(body).unwrap()).unwrap();
        claims["trustLevel"] = json!(tier);
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        format!("{forged}.{signature}")
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_missing_identity_is_dropped_silently(
            event in non_public_event(),
            module_name in invalid_identity(),
            with_token in any::<bool>(),
            skip_jwt in any::<bool>(),
        ) {
            let bus = Bus::new();
            let hits = bus.counting_listener(event.clone(), "observer");

            let mut payload = Payload::default();
            payload.module_name = module_name;
            payload.skip_jwt = skip_jwt;
            if with_token {
                payload.jwt = Some(bus.module_token("observer", TrustLevel::High));
            }
            if skip_jwt {
                payload.auth_secret = Some(BOOTSTRAP_SECRET.to_string());
            }

            let forwarded = bus.kernel.emit(event, payload, Reply::from_fn(|_| {}));
            prop_assert!(!forwarded);
            prop_assert_eq!(hits.load(Ordering::SeqCst), 0);
            prop_assert!(bus.kernel.meltdowns().is_empty());
        }

        #[test]
        fn prop_tripped_module_stays_latched(module in "[a-z][a-zA-Z0-9]{0,15}") {
            prop_assume!(module != "observer");
            let bus = Bus::new();
            let event = EventName::custom("observer.ping");
            let hits = bus.counting_listener(event.clone(), "observer");

            // No token: trip.
            let bare = Payload::from_module(module.clone(), ModuleType::Community);
            let forwarded = bus.kernel.emit(event.clone(), bare, Reply::from_fn(|_| {}));
            prop_assert!(!forwarded);
            prop_assert!(bus.kernel.is_melted(&module));

            // A valid token no longer helps, nor does a public event.
            let token = bus.module_token(&module, TrustLevel::High);
            let signed = Payload::from_module(module.clone(), ModuleType::Community).with_token(token);
            let custom = bus.kernel.emit(event, signed.clone(), Reply::from_fn(|_| {}));
            let public = bus.kernel.emit(EventName::IssuePublicToken, signed, Reply::from_fn(|_| {}));
            prop_assert!(!custom);
            prop_assert!(!public);
            prop_assert_eq!(hits.load(Ordering::SeqCst), 0);

            // Nor can it register listeners.
            let refused = bus.kernel.on(
                EventName::custom("late.listener"),
                &module,
                ModuleType::Community,
                Arc::new(|_: Payload, _: Reply| {}),
            );
            prop_assert!(refused.is_none());
        }
    }

    #[tokio::test]
    async fn test_public_event_still_needs_identity() {
        let bus = Bus::new();
        let body = json!({ "purpose": "login" });

        let (forwarded, result) = bus
            .call(EventName::IssuePublicToken, Payload::default().with_body(body.clone()))
            .await;
        assert!(!forwarded);
        assert_eq!(result, Err(BusError::ReplyDropped));

        let anonymous = Payload::from_module("loginPage", ModuleType::Core).with_body(body);
        let (forwarded, result) = bus.call(EventName::IssuePublicToken, anonymous).await;
        assert!(forwarded);
        assert!(matches!(result, Ok(Value::String(_))));
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    #[tokio::test]
    async fn test_tier_tampering_is_caught() {
        let bus = Bus::new();
        let low = bus.module_token("gallery", TrustLevel::Low);
        let forged = tamper_tier(&low, "high");

        assert!(bus.codec.verify(&low, Utc::now().timestamp()).is_ok());
        assert!(bus.codec.verify(&forged, Utc::now().timestamp()).is_err());

        let hits = bus.counting_listener(EventName::custom("observer.ping"), "observer");
        let payload = Payload::from_module("gallery", ModuleType::Community).with_token(forged);
        let (forwarded, result) = bus.call(EventName::custom("observer.ping"), payload).await;

        assert!(!forwarded);
        assert_eq!(
            result,
            Err(BusError::Meltdown {
                module: "gallery".into(),
                reason: MeltdownReason::InvalidToken,
            })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    // =========================================================================
    // REPLIES
    // =========================================================================

    #[tokio::test]
    async fn test_reply_fires_once_with_first_result() {
        let bus = Bus::new();
        let event = EventName::custom("observer.echo");
        for value in [1, 2] {
            bus.kernel
                .on(
                    event.clone(),
                    "observer",
                    ModuleType::Core,
                    Arc::new(move |_: Payload, reply: Reply| {
                        reply.ok(json!(value));
                        reply.ok(json!(value * 10));
                        reply.err(BusError::Handler("late".into()));
                    }),
                )
                .unwrap();
        }

        let seen: Arc<Mutex<Vec<BusResult>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let token = bus.module_token("gallery", TrustLevel::Low);
        let payload = Payload::from_module("gallery", ModuleType::Community).with_token(token);

        assert!(bus.kernel.emit(
            event,
            payload,
            Reply::from_fn(move |result| sink.lock().unwrap().push(result)),
        ));
        assert_eq!(*seen.lock().unwrap(), vec![Ok(json!(1))]);
    }

    #[tokio::test]
    async fn test_panicking_listener_is_contained() {
        let bus = Bus::new();
        let event = EventName::custom("observer.fragile");
        bus.kernel
            .on(
                event.clone(),
                "observer",
                ModuleType::Core,
                Arc::new(|_: Payload, _: Reply| panic!("listener bug")),
            )
            .unwrap();

        let token = bus.module_token("gallery", TrustLevel::Low);
        let payload = Payload::from_module("gallery", ModuleType::Community).with_token(token);
        let (forwarded, result) = bus.call(event, payload).await;

        assert!(forwarded);
        assert!(matches!(result, Err(BusError::Handler(_))));
        assert!(!bus.kernel.is_melted("gallery"));
    }

    // =========================================================================
    // BOOTSTRAP PATH
    // =========================================================================

    fn issue_request(sign_as: &str) -> IssueModuleTokenRequest {
        IssueModuleTokenRequest {
            sign_as_module: sign_as.to_string(),
            trust_level: TrustLevel::High,
            auth_secret: None,
        }
    }

    #[tokio::test]
    async fn test_issue_module_token_scenario() {
        let bus = Bus::new();
        let mut security = bus.feed.subscribe(NotificationFilter::types(vec![NotificationType::Security]));

        // Correct secret: a token signed as databaseManager.
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_bootstrap(BOOTSTRAP_SECRET)
            .with_request(&issue_request("databaseManager"))
            .unwrap();
        let (forwarded, result) = bus.call(EventName::IssueModuleToken, payload).await;
        assert!(forwarded);
        let Ok(Value::String(token)) = result else {
            panic!("expected a token, got {result:?}");
        };
        let claims = bus.codec.verify(&token, Utc::now().timestamp()).unwrap();
        assert_eq!(claims.module_name.as_deref(), Some("databaseManager"));
        assert_eq!(claims.trust_level, TrustLevel::High);

        // Wrong secret: auth melts.
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_bootstrap("not-the-secret")
            .with_request(&issue_request("databaseManager"))
            .unwrap();
        let (forwarded, result) = bus.call(EventName::IssueModuleToken, payload).await;
        assert!(!forwarded);
        assert_eq!(
            result,
            Err(BusError::Meltdown {
                module: "auth".into(),
                reason: MeltdownReason::InvalidSecret,
            })
        );

        // Every later call from auth is dropped, correct secret or not.
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_bootstrap(BOOTSTRAP_SECRET)
            .with_request(&issue_request("auth"))
            .unwrap();
        let (forwarded, result) = bus.call(EventName::IssueModuleToken, payload).await;
        assert!(!forwarded);
        assert_eq!(result, Err(BusError::ReplyDropped));

        let sent = security.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].module_name, "auth");
        assert_eq!(sent[0].priority, NotificationPriority::Critical);
    }

    #[tokio::test]
    async fn test_unlisted_bootstrap_pair_trips() {
        let bus = Bus::new();
        let gallery_hits = bus.counting_listener(EventName::custom("gallery.list"), "gallery");

        // Allow-listed module, wrong event.
        let payload = Payload::from_module("auth", ModuleType::Core).with_bootstrap(BOOTSTRAP_SECRET);
        let (_, result) = bus.call(EventName::RegistrySelect, payload).await;
        assert!(matches!(
            result,
            Err(BusError::Meltdown {
                reason: MeltdownReason::UnauthorizedSkipJwt,
                ..
            })
        ));

        // Right event, unlisted module, correct secret.
        let payload = Payload::from_module("gallery", ModuleType::Community)
            .with_bootstrap(BOOTSTRAP_SECRET)
            .with_request(&issue_request("gallery"))
            .unwrap();
        let (forwarded, _) = bus.call(EventName::IssueModuleToken, payload).await;
        assert!(!forwarded);
        assert_eq!(
            bus.kernel.meltdown_reason("gallery"),
            Some(MeltdownReason::UnauthorizedSkipJwt)
        );
        assert_eq!(
            MeltdownReason::UnauthorizedSkipJwt.as_str(),
            "unauthorized skipJWT usage"
        );

        // The module's listeners were swept.
        assert!(bus.kernel.listeners_for_module("gallery").is_empty());
        let token = bus.module_token("observer", TrustLevel::High);
        let payload = Payload::from_module("observer", ModuleType::Core).with_token(token);
        let (forwarded, _) = bus.call(EventName::custom("gallery.list"), payload).await;
        assert!(!forwarded);
        assert_eq!(gallery_hits.load(Ordering::SeqCst), 0);
    }
}

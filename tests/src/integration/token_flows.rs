//! # Token Issuance Flows
//!
//! Issuance and verification over the bus, with the kernel in front of the
//! token and registry modules.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{Bus, BOOTSTRAP_SECRET};
    use chrono::Utc;
    use serde_json::{json, Value};
    use shared_bus::EventName;
    use shared_types::{
        BusError, IssueUserTokenRequest, ModuleType, Payload, RegistryFilter, RegistrySelectRequest, TokenClaims,
        TrustLevel, VerifyTokenRequest,
    };

    fn user_request() -> IssueUserTokenRequest {
        IssueUserTokenRequest {
            user_id: "user-17".into(),
            roles: vec!["editor".into()],
            permissions: vec!["media.upload".into()],
        }
    }

    #[tokio::test]
    async fn test_user_token_needs_high_caller() {
        let bus = Bus::new();

        let low = bus.module_token("gallery", TrustLevel::Low);
        let payload = Payload::from_module("gallery", ModuleType::Community)
            .with_token(low)
            .with_request(&user_request())
            .unwrap();
        let (forwarded, result) = bus.call(EventName::IssueUserToken, payload).await;
        assert!(forwarded);
        assert!(matches!(result, Err(BusError::Forbidden(_))));
        assert!(!bus.kernel.is_melted("gallery"));

        let high = bus.module_token("auth", TrustLevel::High);
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_token(high)
            .with_request(&user_request())
            .unwrap();
        let (_, result) = bus.call(EventName::IssueUserToken, payload).await;
        let Ok(Value::String(token)) = result else {
            panic!("expected a user token, got {result:?}");
        };

        let claims = bus.codec.verify(&token, Utc::now().timestamp()).unwrap();
        assert_eq!(claims.user_id.as_deref(), Some("user-17"));
        assert_eq!(claims.role.as_deref(), Some("editor"));
        assert_eq!(claims.permissions, vec!["content.read", "content.write", "media.upload"]);
        assert!(claims.module_name.is_none());
    }

    #[tokio::test]
    async fn test_public_token_cannot_reach_registry() {
        let bus = Bus::new();

        let payload = Payload::from_module("loginPage", ModuleType::Core).with_body(json!({ "purpose": "login" }));
        let (forwarded, result) = bus.call(EventName::IssuePublicToken, payload).await;
        assert!(forwarded);
        let Ok(Value::String(public)) = result else {
            panic!("expected a public token, got {result:?}");
        };
        let claims = bus.codec.verify(&public, Utc::now().timestamp()).unwrap();
        assert_eq!(claims.trust_level, TrustLevel::Low);
        assert!(claims.is_public);

        // Authenticates, but the registry refuses it.
        let payload = Payload::from_module("loginPage", ModuleType::Core)
            .with_token(public)
            .with_request(&RegistrySelectRequest {
                filter: RegistryFilter::All,
            })
            .unwrap();
        let (forwarded, result) = bus.call(EventName::RegistrySelect, payload).await;
        assert!(forwarded);
        assert!(matches!(result, Err(BusError::Forbidden(_))));
        assert!(bus.kernel.meltdowns().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_public_purpose_is_refused() {
        let bus = Bus::new();
        let payload = Payload::from_module("loginPage", ModuleType::Core).with_body(json!({ "purpose": "adminPanel" }));
        let (forwarded, result) = bus.call(EventName::IssuePublicToken, payload).await;
        assert!(forwarded);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_verify_token_for_third_party() {
        let bus = Bus::new();
        let caller = bus.module_token("auth", TrustLevel::High);
        let presented = bus.module_token("fontsManager", TrustLevel::Medium);

        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_token(caller.clone())
            .with_request(&VerifyTokenRequest { token: presented })
            .unwrap();
        let (_, result) = bus.call(EventName::VerifyToken, payload).await;
        let claims: TokenClaims = serde_json::from_value(result.unwrap()).unwrap();
        assert_eq!(claims.module_name.as_deref(), Some("fontsManager"));
        assert_eq!(claims.trust_level, TrustLevel::Medium);

        // A bad presented token is a reply error, not a caller meltdown.
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_token(caller)
            .with_request(&VerifyTokenRequest {
                token: "garbage".into(),
            })
            .unwrap();
        let (forwarded, result) = bus.call(EventName::VerifyToken, payload).await;
        assert!(forwarded);
        assert!(result.is_err());
        assert!(!bus.kernel.is_melted("auth"));
    }

    #[tokio::test]
    async fn test_high_token_signs_for_another_module_only_with_secret() {
        let bus = Bus::new();
        let high = bus.module_token("auth", TrustLevel::High);
        let request = |body: Value| {
            Payload::from_module("auth", ModuleType::Core)
                .with_token(high.clone())
                .with_body(body)
        };

        let (forwarded, result) = bus
            .call(
                EventName::IssueModuleToken,
                request(json!({ "signAsModule": "gallery", "trustLevel": "low" })),
            )
            .await;
        assert!(forwarded);
        assert!(matches!(result, Err(BusError::Forbidden(_))), "minted without secret: {result:?}");
        assert!(!bus.kernel.is_melted("auth"));

        let (_, result) = bus
            .call(
                EventName::IssueModuleToken,
                request(json!({ "signAsModule": "gallery", "trustLevel": "low", "authSecret": BOOTSTRAP_SECRET })),
            )
            .await;
        let Ok(Value::String(token)) = result else {
            panic!("expected a module token, got {result:?}");
        };
        let claims = bus.codec.verify(&token, Utc::now().timestamp()).unwrap();
        assert_eq!(claims.module_name.as_deref(), Some("gallery"));
        assert_eq!(claims.trust_level, TrustLevel::Low);
    }
}

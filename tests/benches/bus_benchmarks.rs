//! # CMS Trust Bus Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | Token codec | Sign and verify per tier |
//! | Kernel emit | Authenticated dispatch to N listeners |
//! | Kernel drop | Cost of rejecting calls (invalid identity, latched module) |

use cms_01_capability_tokens::{CapabilityTokenApi, TokenService};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::{EventName, KernelHandle, Reply, TracingNotifier, TrustKernel};
use shared_crypto::{BaseSecret, SharedSecret, TierKeyring, TokenCodec};
use shared_types::{MeltdownReason, ModuleType, Payload, TokenClaims, TrustLevel};
use std::sync::Arc;
use std::time::Duration;

const SECRET: &str = "bench-bootstrap";

fn codec() -> TokenCodec {
    TokenCodec::new(TierKeyring::derive(&BaseSecret::from_bytes([9u8; 32])))
}

fn module_token(codec: &TokenCodec, module_name: &str, trust_level: TrustLevel) -> String {
    TokenService::new(codec.clone(), SharedSecret::new(SECRET))
        .issue_module_token(SECRET, module_name, trust_level)
        .unwrap()
}

// ============================================================================
// TOKEN CODEC
// ============================================================================

fn bench_token_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("token-codec");
    let codec = codec();
    let now = chrono::Utc::now().timestamp();

    for tier in [TrustLevel::Low, TrustLevel::Medium, TrustLevel::High] {
        let mut claims = TokenClaims::new(tier, now, now + 3600);
        claims.module_name = Some("gallery".into());
        let token = codec.sign(&claims).unwrap();

        group.bench_with_input(BenchmarkId::new("sign", tier), &claims, |b, claims| {
            b.iter(|| black_box(codec.sign(claims).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("verify", tier), &token, |b, token| {
            b.iter(|| black_box(codec.verify(token, now).is_ok()))
        });
    }

    group.finish();
}

// ============================================================================
// KERNEL DISPATCH
// ============================================================================

fn kernel_with_listeners(codec: &TokenCodec, event: &EventName, listeners: usize) -> TrustKernel {
    let kernel = TrustKernel::new(codec.clone(), SharedSecret::new(SECRET), Arc::new(TracingNotifier));
    for i in 0..listeners {
        kernel.on(
            event.clone(),
            &format!("listener{i}"),
            ModuleType::Core,
            Arc::new(|_: Payload, reply: Reply| {
                reply.ok(json!(true));
            }),
        );
    }
    kernel
}

fn bench_kernel_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel-emit");
    group.measurement_time(Duration::from_secs(5));
    let codec = codec();
    let event = EventName::custom("gallery.listAlbums");
    let token = module_token(&codec, "auth", TrustLevel::High);

    for listeners in [1, 8, 32] {
        let kernel = kernel_with_listeners(&codec, &event, listeners);
        let payload = Payload::from_module("auth", ModuleType::Core).with_token(token.clone());

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::new("authenticated", listeners), &payload, |b, payload| {
            b.iter(|| black_box(kernel.emit(event.clone(), payload.clone(), Reply::from_fn(|_| {}))))
        });
    }

    let kernel = kernel_with_listeners(&codec, &event, 1);
    let public = Payload::from_module("loginPage", ModuleType::Core);
    kernel.on(
        EventName::IssuePublicToken,
        "capabilityTokens",
        ModuleType::Core,
        Arc::new(|_: Payload, reply: Reply| {
            reply.ok(json!("token"));
        }),
    );
    group.bench_function("public", |b| {
        b.iter(|| {
            black_box(kernel.emit(EventName::IssuePublicToken, public.clone(), Reply::from_fn(|_| {})))
        })
    });

    group.finish();
}

fn bench_kernel_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel-drop");
    let codec = codec();
    let event = EventName::custom("gallery.listAlbums");
    let kernel = kernel_with_listeners(&codec, &event, 8);

    let anonymous = Payload::default().with_token(module_token(&codec, "auth", TrustLevel::High));
    group.bench_function("invalid_identity", |b| {
        b.iter(|| black_box(kernel.emit(event.clone(), anonymous.clone(), Reply::none())))
    });

    kernel.meltdown("rogue", MeltdownReason::NoToken);
    let latched = Payload::from_module("rogue", ModuleType::Community)
        .with_token(module_token(&codec, "rogue", TrustLevel::Low));
    group.bench_function("latched_module", |b| {
        b.iter(|| black_box(kernel.emit(event.clone(), latched.clone(), Reply::none())))
    });

    group.finish();
}

criterion_group!(benches, bench_token_codec, bench_kernel_emit, bench_kernel_drop);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use chrono::{Duration, Utc};
use tokio::runtime::Runtime;

use warden_auth::{
    AuthSettings, NewRefreshRecord, RefreshStore, TokenIssuer, TokenValidator, looks_like_access_token,
    rotation,
};
use warden_core::PrincipalId;
use warden_infra::directory::InMemoryDirectory;
use warden_infra::refresh_store::InMemoryRefreshStore;

fn settings() -> AuthSettings {
    AuthSettings::new("bench-signing-key").unwrap()
}

fn bench_access_tokens(c: &mut Criterion) {
    let mut group = c.benchmark_group("access_token");
    group.throughput(Throughput::Elements(1));

    let settings = settings();
    let issuer = TokenIssuer::new(&settings);
    let validator = TokenValidator::new(&settings);
    let now = Utc::now();
    let token = issuer.issue_access(PrincipalId::new(42), now).unwrap();

    group.bench_function("issue", |b| {
        b.iter(|| issuer.issue_access(black_box(PrincipalId::new(42)), now).unwrap());
    });

    group.bench_function("validate", |b| {
        b.iter(|| validator.validate(black_box(&token), now).unwrap());
    });

    // The structural pre-check is what keeps refresh tokens away from HMAC work.
    let refresh = issuer.issue_refresh().unwrap();
    group.bench_function("precheck_refresh_token", |b| {
        b.iter(|| looks_like_access_token(black_box(refresh.as_str())));
    });

    group.finish();
}

fn bench_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_rotation");
    group.sample_size(200);

    let rt = Runtime::new().unwrap();
    let settings = settings();
    let issuer = TokenIssuer::new(&settings);

    group.bench_function("rotate_in_memory", |b| {
        let store = InMemoryRefreshStore::new();
        let directory = InMemoryDirectory::new();
        let principal = rt
            .block_on(warden_auth::PrincipalDirectory::insert(
                &directory,
                warden_auth::NewPrincipal {
                    email: "bench@example.com".to_string(),
                    username: "bench".to_string(),
                    password_hash: "unused".to_string(),
                    full_name: None,
                    is_superuser: false,
                    created_at: Utc::now(),
                },
            ))
            .unwrap();

        let now = Utc::now();
        let mut current = rt
            .block_on(store.create(NewRefreshRecord {
                token: issuer.issue_refresh().unwrap(),
                principal_id: principal.id,
                expires_at: now + Duration::days(7),
                issued_at: now,
            }))
            .unwrap()
            .token;

        b.iter(|| {
            let rotated = rt
                .block_on(rotation::rotate(&store, &directory, &issuer, &current, now))
                .unwrap();
            current = rotated.record.token;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_access_tokens, bench_rotation);
criterion_main!(benches);

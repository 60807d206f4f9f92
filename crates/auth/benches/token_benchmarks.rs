use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chrono::{Duration, Utc};
use keystone_auth::{wrapped, Claims, HumanUser, RegistrationGrant, RsaKeyPair, SessionLogin};
use keystone_core::{PartyId, PartyScope, PartyType, UserId};

const PRIVATE_PEM: &[u8] = include_bytes!("../tests/fixtures/test_private_key.pem");
const PUBLIC_PEM: &[u8] = include_bytes!("../tests/fixtures/test_public_key.pem");

fn session() -> Claims {
    Claims::HumanUserLogin(SessionLogin::issue(
        UserId::new("U1"),
        PartyScope::new(PartyType::Company, PartyId::new("C1")),
        Utc::now(),
        Duration::minutes(90),
    ))
}

fn registration() -> Claims {
    let scope = PartyScope::new(PartyType::Client, PartyId::new("CL1"))
        .with_parent(PartyType::Company, PartyId::new("C1"));
    let user = HumanUser::invited(UserId::new("U9"), "new@cl1.example", &scope);
    Claims::RegisterClientUser(RegistrationGrant::issue(user, Utc::now(), Duration::days(7)))
}

fn bench_token_round_trip(c: &mut Criterion) {
    let keys = RsaKeyPair::from_pem(PRIVATE_PEM, PUBLIC_PEM).unwrap();
    let issuer = keys.issuer();
    let validator = keys.validator();

    let mut group = c.benchmark_group("token");

    let claims = session();
    group.bench_function("issue_session", |b| {
        b.iter(|| issuer.issue(black_box(&claims)).unwrap());
    });

    let token = issuer.issue(&claims).unwrap();
    group.bench_function("validate_session", |b| {
        b.iter(|| validator.validate(black_box(&token)).unwrap());
    });

    let grant = issuer.issue(&registration()).unwrap();
    group.bench_function("validate_and_unwrap_registration", |b| {
        b.iter(|| {
            let envelope = validator.validate(black_box(&grant)).unwrap();
            wrapped::unwrap(&envelope).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_token_round_trip);
criterion_main!(benches);

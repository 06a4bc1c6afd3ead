use alloc::sync::Arc;

use crypto_bigint::U256;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_assert::{Deserializer, Serializer, Token};

use crate::{
    attributes::{AttributeKind, Predicate, RawAttributes, Schema, SchemaId},
    dev::Bls12_381,
    entities::{Issuer, Prover, Verifier},
    errors::Error,
    primary::PrimaryPublicKey,
    proof::{FullProof, Nonce, ProofRequest, SubProofRequest},
    storage::{InMemoryAttributeStore, InMemoryKeyStore, InMemoryWallet, KeyStore, Wallet},
    test_utils::test_secret_key,
};

type E = Bls12_381;

fn gvt() -> Schema {
    Schema::new(
        "gvt",
        "1.0",
        [
            ("name", AttributeKind::Hashed),
            ("age", AttributeKind::Numeric),
            ("sex", AttributeKind::Hashed),
        ],
    )
    .unwrap()
}

fn xyz() -> Schema {
    Schema::new(
        "xyz",
        "1.0",
        [("status", AttributeKind::Hashed), ("period", AttributeKind::Numeric)],
    )
    .unwrap()
}

fn alex() -> RawAttributes {
    RawAttributes::new()
        .with("name", "Alex")
        .with("age", "25")
        .with("sex", "male")
}

struct Setup {
    keys: Arc<InMemoryKeyStore<E>>,
    attributes: Arc<InMemoryAttributeStore>,
    issuer: Issuer<E>,
    verifier: Verifier<E>,
}

impl Setup {
    fn new() -> Self {
        let keys = Arc::new(InMemoryKeyStore::new());
        let attributes = Arc::new(InMemoryAttributeStore::new());
        Self {
            issuer: Issuer::new(attributes.clone(), keys.clone()),
            verifier: Verifier::new(keys.clone()),
            keys,
            attributes,
        }
    }

    /// Publishes a definition using one of the pregenerated test keys.
    fn define(&mut self, rng: &mut ChaCha8Rng, schema: &Schema, key_index: usize, max_claim_num: Option<u32>) {
        let sk = test_secret_key(key_index);
        let pk = PrimaryPublicKey::new(rng, &sk, &schema.attribute_names()).unwrap();
        self.issuer
            .add_definition(rng, schema.clone(), pk, sk, max_claim_num)
            .unwrap();
    }

    fn holder(&self, rng: &mut ChaCha8Rng, id: &str) -> (Prover<E>, Arc<InMemoryWallet<E>>) {
        let wallet = Arc::new(InMemoryWallet::new());
        let prover = Prover::new(id, wallet.clone(), self.keys.clone(), self.attributes.clone());
        prover.generate_master_secret(rng).unwrap();
        (prover, wallet)
    }

    fn enroll(&self, rng: &mut ChaCha8Rng, prover: &Prover<E>, schema_id: &SchemaId, raw: RawAttributes) {
        self.attributes.insert(prover.id(), schema_id, raw).unwrap();
        let request = prover.request_claim(rng, schema_id).unwrap();
        let claim = self.issuer.issue(rng, schema_id, &request).unwrap();
        prover.process_claim(schema_id, claim).unwrap();
    }
}

fn roundtrip<T>(value: &T) -> T
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let serializer = Serializer::builder().build();
    let tokens = value.serialize(&serializer).unwrap();
    let mut deserializer = Deserializer::builder(tokens).build();
    T::deserialize(&mut deserializer).unwrap()
}

/// Serializes the proof, lets `f` edit the tokens following the field reached through `path`,
/// and deserializes back.
fn tamper(proof: &FullProof<E>, path: &[&str], f: impl FnOnce(&mut [Token])) -> FullProof<E> {
    let serializer = Serializer::builder().build();
    let mut tokens = proof.serialize(&serializer).unwrap().into_iter().collect::<Vec<_>>();
    let mut start = 0;
    for name in path {
        start += tokens[start..]
            .iter()
            .position(|token| matches!(token, Token::Field(field) if field == name))
            .unwrap()
            + 1;
    }
    f(&mut tokens[start..]);
    let mut deserializer = Deserializer::builder(tokens).build();
    FullProof::deserialize(&mut deserializer).unwrap()
}

/// Appends a digit to the first decimal value.
fn append_digit(tokens: &mut [Token]) {
    match tokens.iter_mut().find(|token| matches!(token, Token::Str(_))) {
        Some(Token::Str(value)) => value.push('1'),
        other => panic!("no decimal value: {other:?}"),
    }
}

/// Flips the lowest bit of the first byte.
fn flip_first_byte(tokens: &mut [Token]) {
    match tokens.iter_mut().find(|token| matches!(token, Token::U8(_))) {
        Some(Token::U8(byte)) => *byte ^= 1,
        other => panic!("no byte: {other:?}"),
    }
}

#[test_log::test]
fn predicate_and_disclosure() {
    let mut rng = ChaCha8Rng::seed_from_u64(101);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, None);
    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &id, alex());

    let request = setup.verifier.new_request(&mut rng).with(
        id.clone(),
        SubProofRequest::new()
            .reveal("name")
            .predicate(Predicate::ge("age", 18)),
    );
    let proof = prover.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &proof).unwrap());

    // The disclosed value is recovered, the hidden one appears nowhere in clear.
    assert_eq!(proof.revealed_attr(&id, "name"), Some("Alex"));
    let credential_proof = proof.proofs().get(&id).unwrap();
    assert_eq!(
        credential_proof.eq_proof().revealed().keys().collect::<Vec<_>>(),
        vec!["name"]
    );
    assert!(credential_proof.revealed_attrs().get("age").is_none());
    assert_eq!(credential_proof.ge_proofs().len(), 1);
    assert!(credential_proof.non_revoc_proof().is_none());

    // The boundary value is accepted too.
    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(id.clone(), SubProofRequest::new().predicate(Predicate::ge("age", 25)));
    let proof = prover.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &proof).unwrap());
}

#[test]
fn unsatisfied_predicate_fails_at_build_time() {
    let mut rng = ChaCha8Rng::seed_from_u64(102);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, None);
    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &id, alex());

    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(id, SubProofRequest::new().predicate(Predicate::ge("age", 30)));
    assert_eq!(
        prover.present(&mut rng, &request).unwrap_err(),
        Error::PredicateNotSatisfied("age >= 30".into())
    );
}

#[test]
fn malformed_requests_are_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(103);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, None);
    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &id, alex());

    // Range predicates only apply to numeric attributes.
    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(id.clone(), SubProofRequest::new().predicate(Predicate::ge("name", 1)));
    assert!(matches!(prover.present(&mut rng, &request), Err(Error::InvalidInput(_))));

    // A predicate cannot be proven on a disclosed attribute.
    let request = setup.verifier.new_request(&mut rng).with(
        id.clone(),
        SubProofRequest::new().reveal("age").predicate(Predicate::ge("age", 1)),
    );
    assert!(matches!(prover.present(&mut rng, &request), Err(Error::InvalidInput(_))));

    // No claim for an unknown schema.
    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(SchemaId::new("unknown:1.0"), SubProofRequest::new());
    assert!(matches!(prover.present(&mut rng, &request), Err(Error::NotFound(_))));
}

#[test_log::test]
fn multi_issuer_presentation() {
    let mut rng = ChaCha8Rng::seed_from_u64(104);
    let mut setup = Setup::new();
    let (gvt, xyz) = (gvt(), xyz());
    setup.define(&mut rng, &gvt, 0, None);
    setup.define(&mut rng, &xyz, 1, None);

    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &gvt.id(), alex());
    setup.enroll(
        &mut rng,
        &prover,
        &xyz.id(),
        RawAttributes::new().with("status", "partial").with("period", "8"),
    );

    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(gvt.id(), SubProofRequest::new().predicate(Predicate::ge("age", 18)))
        .with(
            xyz.id(),
            SubProofRequest::new()
                .reveal("status")
                .predicate(Predicate::ge("period", 5)),
        );
    let proof = prover.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &proof).unwrap());

    // One challenge over both credentials: `A'` and `T1..T4, T_delta` for each.
    assert_eq!(proof.aggregated().c_list().len(), 12);
    assert!(proof.aggregated().c_hash().len() <= 32);
    assert_ne!(proof.aggregated().c_hash().first(), Some(&0));
    assert_eq!(proof.revealed_attr(&xyz.id(), "status"), Some("partial"));

    // A request about a single credential does not accept the combined proof.
    let partial = ProofRequest::new(*request.nonce()).with(
        gvt.id(),
        request.get(&gvt.id()).unwrap().clone(),
    );
    assert!(matches!(
        setup.verifier.verify(&partial, &proof),
        Err(Error::InvalidInput(_))
    ));
}

#[test_log::test]
fn tampering_is_detected() {
    let mut rng = ChaCha8Rng::seed_from_u64(105);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, None);
    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &id, alex());

    let sub_request = SubProofRequest::new()
        .reveal("sex")
        .predicate(Predicate::ge("age", 18));
    let request = setup.verifier.new_request(&mut rng).with(id.clone(), sub_request.clone());
    let proof = prover.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &proof).unwrap());
    assert_eq!(roundtrip(&proof), proof);

    // Another session.
    let other_nonce = ProofRequest::new(Nonce::new(U256::from_u64(42))).with(id.clone(), sub_request);
    assert!(!setup.verifier.verify(&other_nonce, &proof).unwrap());

    // Responses of the equality proof.
    for field in ["e", "v", "m1", "m2"] {
        let tampered = tamper(&proof, &["eq_proof", field], append_digit);
        assert!(!setup.verifier.verify(&request, &tampered).unwrap(), "{field}");
    }

    // Responses and blinded values of the predicate proof.
    for field in ["u", "r", "alpha", "r_delta", "mj", "t", "t_delta"] {
        let tampered = tamper(&proof, &["ge_proofs", field], append_digit);
        assert!(!setup.verifier.verify(&request, &tampered).unwrap(), "{field}");
    }

    // The challenge itself.
    let tampered = tamper(&proof, &["aggregated", "c_hash"], flip_first_byte);
    assert!(!setup.verifier.verify(&request, &tampered).unwrap());

    // A disclosed raw value that does not match the signed one.
    let tampered = tamper(&proof, &["revealed_attrs"], |tokens| {
        for token in tokens.iter_mut() {
            if matches!(token, Token::Str(value) if value == "male") {
                *token = Token::Str("female".into());
            }
        }
    });
    assert_eq!(tampered.revealed_attr(&id, "sex"), Some("female"));
    assert!(!setup.verifier.verify(&request, &tampered).unwrap());
}

#[test_log::test]
fn non_revocation_tampering_is_detected() {
    let mut rng = ChaCha8Rng::seed_from_u64(110);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, Some(3));
    let (prover, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &prover, &id, alex());

    let request = setup.verifier.new_request(&mut rng).with(id.clone(), SubProofRequest::new());
    let proof = prover.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &proof).unwrap());

    // Every response of the non-revocation proof. Scalars are little-endian, so the low bit is flipped.
    for field in [
        "rho",
        "r",
        "r_prime",
        "r_prime_prime",
        "r_prime_prime_prime",
        "o",
        "o_prime",
        "m",
        "m_prime",
        "t",
        "t_prime",
        "m2",
        "s",
        "c",
    ] {
        let tampered = tamper(&proof, &["non_revoc_proof", "x_list", field], flip_first_byte);
        assert!(!setup.verifier.verify(&request, &tampered).unwrap(), "{field}");
    }

    // A blinded value replaced by another valid point of the same group.
    let tampered = tamper(&proof, &["non_revoc_proof", "c_list"], |tokens| {
        let bytes_of = |tokens: &[Token], name: &str| {
            let start = tokens
                .iter()
                .position(|token| matches!(token, Token::Field(field) if *field == name))
                .unwrap();
            let end = start
                + tokens[start..]
                    .iter()
                    .position(|token| matches!(token, Token::SeqEnd))
                    .unwrap();
            start..end
        };
        let (e, a) = (bytes_of(tokens, "e"), bytes_of(tokens, "a"));
        let a_bytes = tokens[a]
            .iter()
            .filter_map(|token| match token {
                Token::U8(byte) => Some(*byte),
                _ => None,
            })
            .collect::<Vec<_>>();
        let e_bytes = tokens[e].iter_mut().filter(|token| matches!(token, Token::U8(_)));
        for (token, byte) in e_bytes.zip(a_bytes) {
            *token = Token::U8(byte);
        }
    });
    assert!(!setup.verifier.verify(&request, &tampered).unwrap());
}

#[test_log::test]
fn revocation_lifecycle() {
    let mut rng = ChaCha8Rng::seed_from_u64(106);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, Some(5));

    let (alice, alice_wallet) = setup.holder(&mut rng, "alice");
    let (bob, _bob_wallet) = setup.holder(&mut rng, "bob");
    setup.enroll(&mut rng, &alice, &id, alex());
    setup.enroll(
        &mut rng,
        &bob,
        &id,
        RawAttributes::new()
            .with("name", "Bob")
            .with("age", "40")
            .with("sex", "male"),
    );

    let alice_index = alice_wallet
        .claim(&id)
        .unwrap()
        .non_revocation
        .map(|claim| claim.index())
        .unwrap();
    assert_eq!(alice_index, 1);

    let request = setup
        .verifier
        .new_request(&mut rng)
        .with(id.clone(), SubProofRequest::new().predicate(Predicate::ge("age", 18)));

    // Alice's witness predates Bob's index; it is brought up to date while presenting.
    let alice_proof = alice.present(&mut rng, &request).unwrap();
    assert!(alice_proof.proofs().get(&id).unwrap().non_revoc_proof().is_some());
    assert!(setup.verifier.verify(&request, &alice_proof).unwrap());
    assert_eq!(roundtrip(&alice_proof), alice_proof);

    // The synchronized witness is kept in the wallet.
    let stored = alice_wallet.claim(&id).unwrap().non_revocation.unwrap();
    assert_eq!(stored.witness().v(), setup.keys.accumulator(&id).unwrap().v());

    setup.issuer.revoke(&id, alice_index).unwrap();
    assert!(!setup.keys.accumulator(&id).unwrap().v().contains(&alice_index));
    assert_eq!(setup.issuer.accumulator(&id).unwrap(), setup.keys.accumulator(&id).unwrap());

    // A proof made before the revocation no longer verifies.
    assert!(!setup.verifier.verify(&request, &alice_proof).unwrap());

    assert_eq!(alice.refresh_witness(&id), Err(Error::Revoked(alice_index)));
    assert_eq!(alice.present(&mut rng, &request).unwrap_err(), Error::Revoked(alice_index));

    let bob_proof = bob.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &bob_proof).unwrap());

    // Revoking twice fails.
    assert!(matches!(setup.issuer.revoke(&id, alice_index), Err(Error::NotFound(_))));

    // A new holder gets a fresh index, and the revoked one stays out.
    let (carol, carol_wallet) = setup.holder(&mut rng, "carol");
    setup.enroll(&mut rng, &carol, &id, alex());
    let carol_index = carol_wallet.claim(&id).unwrap().non_revocation.map(|claim| claim.index());
    assert_eq!(carol_index, Some(3));
    assert!(!setup.keys.accumulator(&id).unwrap().v().contains(&alice_index));
    assert_eq!(alice.refresh_witness(&id), Err(Error::Revoked(alice_index)));
    let carol_proof = carol.present(&mut rng, &request).unwrap();
    assert!(setup.verifier.verify(&request, &carol_proof).unwrap());
}

#[test]
fn accumulator_capacity() {
    let mut rng = ChaCha8Rng::seed_from_u64(107);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, Some(1));

    let (alice, _wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &alice, &id, alex());

    let (bob, _wallet) = setup.holder(&mut rng, "bob");
    setup.attributes.insert(bob.id(), &id, alex()).unwrap();
    let request = bob.request_claim(&mut rng, &id).unwrap();
    assert_eq!(setup.issuer.issue(&mut rng, &id, &request).unwrap_err(), Error::AccumulatorFull);
}

#[test]
fn concurrent_issuance() {
    let mut rng = ChaCha8Rng::seed_from_u64(108);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, Some(8));

    let holders = (0..4)
        .map(|i| {
            let (prover, wallet) = setup.holder(&mut rng, &format!("holder-{i}"));
            setup.attributes.insert(prover.id(), &id, alex()).unwrap();
            let request = prover.request_claim(&mut rng, &id).unwrap();
            (prover, wallet, request)
        })
        .collect::<Vec<_>>();

    let claims = std::thread::scope(|scope| {
        let handles = holders
            .iter()
            .enumerate()
            .map(|(seed, (_, _, request))| {
                let (issuer, id) = (&setup.issuer, &id);
                scope.spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
                    issuer.issue(&mut rng, id, request).unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    let mut indices = claims
        .iter()
        .map(|claim| claim.non_revocation.as_ref().unwrap().index())
        .collect::<Vec<_>>();
    indices.sort();
    assert_eq!(indices, vec![1, 2, 3, 4]);

    for ((prover, wallet, _), claim) in holders.iter().zip(claims) {
        prover.process_claim(&id, claim).unwrap();
        prover.refresh_witness(&id).unwrap();
        let claim = wallet.claim(&id).unwrap();
        assert_eq!(
            claim.non_revocation.unwrap().witness().v(),
            setup.keys.accumulator(&id).unwrap().v()
        );
    }
}

#[test]
fn serde_roundtrips() {
    let mut rng = ChaCha8Rng::seed_from_u64(109);
    let mut setup = Setup::new();
    let schema = gvt();
    let id = schema.id();
    setup.define(&mut rng, &schema, 0, Some(3));
    let (alice, wallet) = setup.holder(&mut rng, "alice");
    setup.enroll(&mut rng, &alice, &id, alex());

    let definition = setup.keys.definition(&id).unwrap();
    assert_eq!(roundtrip(&definition.public_key), definition.public_key);
    assert_eq!(roundtrip(&definition), definition);

    let claim = wallet.claim(&id).unwrap();
    assert_eq!(roundtrip(&claim.primary), claim.primary);
    assert_eq!(roundtrip(&claim), claim);

    let accumulator = setup.keys.accumulator(&id).unwrap();
    assert_eq!(roundtrip(&accumulator), accumulator);

    let ms = wallet.master_secret().unwrap();
    assert_eq!(roundtrip(&ms), ms);

    // The signature exponent `e` travels as a decimal string.
    let serializer = Serializer::builder().build();
    let tokens = claim.primary.serialize(&serializer).unwrap().into_iter().collect::<Vec<_>>();
    let e = tokens
        .iter()
        .position(|token| matches!(token, Token::Field(field) if *field == "e"))
        .unwrap();
    assert!(matches!(
        tokens.get(e + 1),
        Some(Token::Str(value)) if value.len() > 170 && value.chars().all(|c| c.is_ascii_digit())
    ));

    let sk = test_secret_key(0);
    let restored = roundtrip(&sk);
    assert_eq!(restored.modulus(), sk.modulus());
    assert_eq!(restored.group_order(), sk.group_order());
}

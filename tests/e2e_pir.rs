//! End-to-end PIR correctness tests for SealPIR
//!
//! Tests the full protocol: Setup → Keys → Query → Evaluate → Decode = Original Element

use std::sync::Arc;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use sealpir::params::{PirParams, PirParamsBuilder, QueryLayout};
use sealpir::pir::{recompose, PirClient, PirError, PirServer};

fn random_database(count: usize, size: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut database = vec![0u8; count * size];
    rng.fill_bytes(&mut database);
    database
}

fn element(database: &[u8], size: usize, index: usize) -> &[u8] {
    &database[index * size..(index + 1) * size]
}

/// Server loaded with `database` and a registered client with id 0
fn setup(params: &PirParams, database: &[u8], seed: u64) -> (PirServer, PirClient, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let server = PirServer::new(params.clone()).unwrap();
    server.setup(database).unwrap();
    let client = PirClient::from_rng(params.clone(), &mut rng).unwrap();
    server.set_galois_key(0, client.galois_key()).unwrap();
    (server, client, rng)
}

fn fetch(server: &PirServer, client: &PirClient, rng: &mut ChaCha20Rng, index: usize) -> Vec<u8> {
    let query = client.generate_query_with_rng(index, rng).unwrap();
    let reply = server.evaluate(&query, 0).unwrap();
    client.decode_element(index, &reply).unwrap()
}

#[test]
fn test_e2e_two_dimensions() {
    let params = PirParams::derive(200, 288, 2048, 12, 2).unwrap();
    assert_eq!(params.extents, vec![5, 4]);
    let database = random_database(200, 288, 1);
    let (server, client, mut rng) = setup(&params, &database, 2);

    let mut indices = vec![0, 1, 9, 10, 199];
    indices.extend((0..5).map(|_| rng.gen_range(0..200)));
    for index in indices {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 288, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_concrete_scenario() {
    let params = PirParams::derive(100, 288, 4096, 20, 2).unwrap();
    assert_eq!(params.elements_per_plaintext, 35);
    assert_eq!(params.extents, vec![2, 2]);
    assert!(params.extents.iter().product::<usize>() >= params.plaintext_count);

    let database = random_database(100, 288, 3);
    let (server, client, mut rng) = setup(&params, &database, 4);

    let query = client.generate_query_with_rng(37, &mut rng).unwrap();
    assert_eq!(query.count, 2);
    assert_eq!(query.ciphertexts.len(), 2 * params.ciphertext_size());

    let reply = server.evaluate(&query, 0).unwrap();
    assert_eq!(reply.count as usize, params.expansion_ratio());
    assert_eq!(reply.count, 12);

    let result = client.decode_element(37, &reply).unwrap();
    assert_eq!(result, element(&database, 288, 37));
}

#[test]
fn test_e2e_single_element() {
    let params = PirParams::derive(1, 32, 2048, 12, 2).unwrap();
    assert_eq!(params.extents, vec![1, 1]);
    assert!(params.galois_elements().is_empty());

    let database = random_database(1, 32, 5);
    let (server, client, mut rng) = setup(&params, &database, 6);
    assert_eq!(fetch(&server, &client, &mut rng, 0), database);
}

#[test]
fn test_e2e_odd_element_size() {
    // 37 bytes = 296 bits, not a multiple of the 12-bit coefficient width
    let params = PirParams::derive(150, 37, 2048, 12, 1).unwrap();
    assert_eq!(params.coefficients_per_element, 25);
    assert_eq!(params.plaintext_count, 2);

    let database = random_database(150, 37, 7);
    let (server, client, mut rng) = setup(&params, &database, 8);
    for index in [0, 80, 81, 149] {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 37, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_large_elements_span_columns() {
    let params = PirParams::derive(5, 5000, 2048, 12, 2).unwrap();
    assert_eq!(params.columns, 2);
    assert_eq!(params.reply_count(), 2 * params.expansion_ratio());

    let database = random_database(5, 5000, 9);
    let (server, client, mut rng) = setup(&params, &database, 10);
    for index in [0, 4] {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 5000, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_wide_dimension() {
    // 2100 rows do not fit in one N = 2048 selector
    let params = PirParams::derive(2100, 3072, 2048, 12, 1).unwrap();
    assert_eq!(params.elements_per_plaintext, 1);
    assert_eq!(params.extents, vec![2100]);
    assert_eq!(params.query_count(), 2);

    let database = random_database(2100, 3072, 31);
    let (server, client, mut rng) = setup(&params, &database, 32);

    let query = client.generate_query_with_rng(0, &mut rng).unwrap();
    assert_eq!(query.count, 2);

    for index in [0, 2047, 2048, 2099] {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 3072, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_three_primes() {
    let params = PirParams::derive(300, 1000, 8192, 24, 2).unwrap();
    assert_eq!(params.moduli.len(), 3);
    assert_eq!(params.elements_per_plaintext, 24);
    assert_eq!(params.extents, vec![4, 4]);
    assert_eq!(params.reply_count(), 18);

    let database = random_database(300, 1000, 33);
    let (server, client, mut rng) = setup(&params, &database, 34);
    for index in [0, 23, 24, 157, 299] {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 1000, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_packed_layout() {
    let params = PirParamsBuilder::new(200, 288)
        .poly_degree(2048)
        .plain_bits(12)
        .layout(QueryLayout::Packed)
        .build()
        .unwrap();
    let database = random_database(200, 288, 11);
    let (server, client, mut rng) = setup(&params, &database, 12);

    for index in [0, 57, 199] {
        let query = client.generate_query_with_rng(index, &mut rng).unwrap();
        assert_eq!(query.count, 1);
        let reply = server.evaluate(&query, 0).unwrap();
        let result = client.decode_element(index, &reply).unwrap();
        assert_eq!(result, element(&database, 288, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_three_dimensions() {
    let params = PirParams::derive(60, 288, 2048, 12, 3).unwrap();
    assert_eq!(params.extents, vec![2, 2, 2]);
    assert_eq!(params.reply_count(), 100);

    let database = random_database(60, 288, 13);
    let (server, client, mut rng) = setup(&params, &database, 14);
    for index in [0, 33, 59] {
        let result = fetch(&server, &client, &mut rng, index);
        assert_eq!(result, element(&database, 288, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_e2e_decode_reply_returns_whole_plaintext() {
    let params = PirParams::derive(30, 100, 2048, 12, 1).unwrap();
    let database = random_database(30, 100, 15);
    let (server, client, mut rng) = setup(&params, &database, 16);

    let index = 25;
    let query = client.generate_query_with_rng(index, &mut rng).unwrap();
    let reply = server.evaluate(&query, 0).unwrap();
    let bytes = client.decode_reply(&reply).unwrap();
    assert_eq!(bytes.len(), params.bytes_per_plaintext());

    let row = client.plaintext_index(index);
    let epp = params.elements_per_plaintext;
    let first = row * epp;
    let last = (first + epp).min(30);
    assert_eq!(&bytes[..(last - first) * 100], &database[first * 100..last * 100]);
}

#[test]
fn test_update_consistency() {
    let params = PirParams::derive(200, 288, 2048, 12, 2).unwrap();
    let mut database = random_database(200, 288, 17);
    let (server, client, mut rng) = setup(&params, &database, 18);

    let updated = 42;
    let same_row = 45;
    let other_row = 150;
    assert_eq!(client.plaintext_index(updated), client.plaintext_index(same_row));
    assert_ne!(client.plaintext_index(updated), client.plaintext_index(other_row));

    let original = database.clone();
    database[updated * 288..(updated + 1) * 288].fill(0x5A);
    server.update_element(&database, 200, 288, updated).unwrap();
    assert_eq!(server.preprocess().unwrap(), 1);

    assert_eq!(fetch(&server, &client, &mut rng, updated), vec![0x5A; 288]);
    assert_eq!(
        fetch(&server, &client, &mut rng, same_row),
        element(&original, 288, same_row)
    );
    assert_eq!(
        fetch(&server, &client, &mut rng, other_row),
        element(&original, 288, other_row)
    );
}

#[test]
fn test_stale_state_rejected() {
    let params = PirParams::derive(20, 64, 2048, 12, 1).unwrap();
    let database = random_database(20, 64, 19);
    let mut rng = ChaCha20Rng::seed_from_u64(20);

    let server = PirServer::new(params.clone()).unwrap();
    let client = PirClient::from_rng(params.clone(), &mut rng).unwrap();
    server.set_galois_key(0, client.galois_key()).unwrap();
    let query = client.generate_query_with_rng(3, &mut rng).unwrap();

    // Never loaded
    assert!(matches!(
        server.evaluate(&query, 0),
        Err(PirError::StalePreprocessedState)
    ));

    // Loaded but not preprocessed
    server.load_database(&database, 20, 64).unwrap();
    assert!(matches!(
        server.evaluate(&query, 0),
        Err(PirError::StalePreprocessedState)
    ));

    server.preprocess().unwrap();
    assert!(server.evaluate(&query, 0).is_ok());

    // Updated but not preprocessed
    server.update_element(&database, 20, 64, 3).unwrap();
    assert!(matches!(
        server.evaluate(&query, 0),
        Err(PirError::StalePreprocessedState)
    ));
    assert_eq!(server.preprocess().unwrap(), 1);
    assert_eq!(server.preprocess().unwrap(), 0);

    let reply = server.evaluate(&query, 0).unwrap();
    assert_eq!(client.decode_element(3, &reply).unwrap(), element(&database, 64, 3));
}

#[test]
fn test_missing_client_key() {
    let params = PirParams::derive(20, 64, 2048, 12, 1).unwrap();
    let database = random_database(20, 64, 21);
    let (server, client, mut rng) = setup(&params, &database, 22);

    let query = client.generate_query_with_rng(5, &mut rng).unwrap();
    assert!(matches!(
        server.evaluate(&query, 7),
        Err(PirError::MissingClientKey(7))
    ));

    // Registered client is unaffected
    let reply = server.evaluate(&query, 0).unwrap();
    assert_eq!(client.decode_element(5, &reply).unwrap(), element(&database, 64, 5));
}

#[test]
fn test_invalid_key_blob() {
    let params = PirParams::derive(200, 288, 2048, 12, 2).unwrap();
    let server = PirServer::new(params.clone()).unwrap();

    assert!(matches!(
        server.set_galois_key(1, &[1, 2, 3]),
        Err(PirError::InvalidKey(_))
    ));

    // Keys for a different shape cover the wrong rounds and gadget
    let other = PirParams::derive(2, 288, 2048, 12, 1).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(23);
    let other_client = PirClient::from_rng(other, &mut rng).unwrap();
    assert!(matches!(
        server.set_galois_key(1, other_client.galois_key()),
        Err(PirError::InvalidKey(_))
    ));
}

#[test]
fn test_malformed_query() {
    let params = PirParams::derive(20, 64, 2048, 12, 1).unwrap();
    let database = random_database(20, 64, 24);
    let (server, client, mut rng) = setup(&params, &database, 25);

    let mut query = client.generate_query_with_rng(0, &mut rng).unwrap();
    query.ciphertexts.pop();
    assert!(matches!(
        server.evaluate(&query, 0),
        Err(PirError::MalformedQuery(_))
    ));

    query.count += 1;
    assert!(matches!(
        server.evaluate(&query, 0),
        Err(PirError::MalformedQuery(_))
    ));
}

#[test]
fn test_index_out_of_range() {
    let params = PirParams::derive(20, 64, 2048, 12, 1).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(26);
    let client = PirClient::from_rng(params, &mut rng).unwrap();

    assert!(matches!(
        client.generate_query_with_rng(20, &mut rng),
        Err(PirError::IndexOutOfRange {
            index: 20,
            element_count: 20
        })
    ));
    assert!(client.coordinate(20).is_err());
}

#[test]
fn test_coordinate_bijection() {
    let params = PirParams::derive(1000, 8, 2048, 12, 3).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(27);
    let client = PirClient::from_rng(params.clone(), &mut rng).unwrap();

    let mut last = None;
    for index in (0..1000).step_by(params.elements_per_plaintext) {
        let coords = client.coordinate(index).unwrap();
        let row = recompose(&coords, &params.extents);
        assert_eq!(row, client.plaintext_index(index));
        assert_ne!(Some(coords.clone()), last);
        last = Some(coords);
    }
}

#[test]
fn test_concurrent_evaluations() {
    let params = PirParams::derive(100, 64, 2048, 12, 2).unwrap();
    let database = random_database(100, 64, 28);
    let (server, client, mut rng) = setup(&params, &database, 29);
    let server = Arc::new(server);

    let queries: Vec<_> = [3usize, 50, 99]
        .iter()
        .map(|&index| (index, client.generate_query_with_rng(index, &mut rng).unwrap()))
        .collect();

    let replies: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|(index, query)| {
                let server = Arc::clone(&server);
                scope.spawn(move || (*index, server.evaluate(query, 0).unwrap()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (index, reply) in replies {
        let result = client.decode_element(index, &reply).unwrap();
        assert_eq!(result, element(&database, 64, index), "Element {} mismatch", index);
    }
}

#[test]
fn test_params_shared_as_json() {
    let params = PirParams::derive(100, 64, 2048, 12, 2).unwrap();
    let json = serde_json::to_string(&params).unwrap();
    let server_params: PirParams = serde_json::from_str(&json).unwrap();

    let database = random_database(100, 64, 30);
    let mut rng = ChaCha20Rng::seed_from_u64(31);
    let server = PirServer::new(server_params).unwrap();
    server.setup(&database).unwrap();
    let client = PirClient::from_rng(params, &mut rng).unwrap();
    server.set_galois_key(0, client.galois_key()).unwrap();

    assert_eq!(fetch(&server, &client, &mut rng, 64), element(&database, 64, 64));
}

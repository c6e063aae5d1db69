mod types {
    include!("../types.rs");
}

use core::time;
use std::thread;

use reqwest::blocking::Client;
use ring::rand;
use ring::signature::{Ed25519KeyPair, KeyPair, Signature};
use types::{GetNonceMessage, GetNonceResponse, SignedRequest, hex_key, signing_bytes};

const FETCH_NONCE_URL: &str = "http://localhost:1843/v1/nonce";
const VERIFY_REQUEST_URL: &str = "http://localhost:1843/v1/verify";

fn generate_keypair() -> Result<Ed25519KeyPair, String> {
    let rng = rand::SystemRandom::new();
    let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|_| "Failed to generate Ed25519 Key Pair".to_string())?;

    Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref())
        .map_err(|_| "Failed to parse Ed25519 Key Pair".to_string())
}

fn build_request(
    key_pair: Ed25519KeyPair,
    message: &[u8],
    sig: Signature,
    nonce: u64,
) -> SignedRequest {
    let public_key_bytes = key_pair.public_key().as_ref();

    SignedRequest {
        stark_key: hex_key(public_key_bytes),
        nonce,
        message: message.to_vec(),
        signature: sig.as_ref().to_vec(),
        public_key: public_key_bytes.to_vec(),
    }
}

// HTTP Related Functions
// Fetch a nonce for the given stark key from the server
fn fetch_nonce(stark_key: &str) -> Result<u64, String> {
    println!("  1. Fetching Nonce for {}...", stark_key);
    let client = Client::new();

    let body = serde_json::to_string(&GetNonceMessage::new(stark_key.to_string()))
        .map_err(|_| "Failed to serialize nonce request".to_string())?;

    let response = client
        .post(FETCH_NONCE_URL)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .map_err(|_| "Failed to fetch nonce".to_string())?;

    let text = response
        .text()
        .map_err(|_| "Failed to fetch nonce".to_string())?;
    let envelope: GetNonceResponse =
        serde_json::from_str(&text).map_err(|_| "Malformed nonce response".to_string())?;

    if envelope.status != "OK" {
        return Err(envelope
            .error
            .unwrap_or_else(|| "Nonce request rejected".to_string()));
    }

    envelope
        .data
        .map(|data| data.nonce)
        .ok_or("Nonce response missing data".to_string())
}

// Asks the server to verify the signed request
fn submit_request(request: SignedRequest) -> Result<(), String> {
    let client = Client::new();

    let request_json =
        serde_json::to_string(&request).map_err(|_| "Failed to serialize request".to_string())?;

    let response = client
        .post(VERIFY_REQUEST_URL)
        .header("Content-Type", "application/json")
        .body(request_json)
        .send()
        .map_err(|_| "Failed to submit request".to_string())?;

    if response.status().is_success() {
        Ok(())
    } else if response.status() == 401 {
        let text_response = response
            .text()
            .map_err(|_| "Failed to read rejection".to_string())?;
        Err(text_response)
    } else {
        Err("Failed to verify request".to_string())
    }
}

fn main() {
    const MESSAGE: &[u8] = b"Hello, world!";

    // Here we gonna set up 4 cases:
    //   1. Valid Request
    //   2. Replayed Nonce
    //   3. Invalid Signature
    //   4. Expired Nonce

    println!();
    test_1(MESSAGE);
    println!();
    test_2(MESSAGE);
    println!();
    test_3(MESSAGE);
    println!();
    test_4(MESSAGE);
    println!();
}

// TEST FUNCTIONS
fn test_1(message: &[u8]) {
    let key_pair = match generate_keypair() {
        Ok(key_pair) => key_pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    // Case 1: Valid Request
    println!("---- Case 1: Valid Request ----");
    let stark_key = hex_key(key_pair.public_key().as_ref());
    let nonce = match fetch_nonce(&stark_key) {
        Ok(nonce) => nonce,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    run_signed_request(key_pair, message, nonce, None);
}

fn test_2(message: &[u8]) {
    // The same pkcs8 document is parsed twice so the replay signs with the
    // same stark key and hits the consumed nonce, not an unknown key
    let rng = rand::SystemRandom::new();
    let pkcs8_bytes = match Ed25519KeyPair::generate_pkcs8(&rng) {
        Ok(pkcs8_bytes) => pkcs8_bytes,
        Err(_) => {
            eprintln!("Error: Failed to generate Ed25519 Key Pair");
            return;
        }
    };
    let key_pair = match Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref()) {
        Ok(key_pair) => key_pair,
        Err(_) => {
            eprintln!("Error: Failed to parse Ed25519 Key Pair");
            return;
        }
    };

    println!("\n---- Case 2: Valid Request followed by Replay of same nonce (Should Fail) ----");
    let stark_key = hex_key(key_pair.public_key().as_ref());
    let nonce = match fetch_nonce(&stark_key) {
        Ok(nonce) => nonce,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    run_signed_request(key_pair, message, nonce, None);

    let key_pair2 = match Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref()) {
        Ok(key_pair) => key_pair,
        Err(_) => {
            eprintln!("Error: Failed to parse Ed25519 Key Pair");
            return;
        }
    };
    run_signed_request(key_pair2, message, nonce, None);
}

fn test_3(message: &[u8]) {
    let key_pair = match generate_keypair() {
        Ok(key_pair) => key_pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    println!("---- Case 3: Valid Nonce but Invalid Signature (Should Fail) ----");
    let stark_key = hex_key(key_pair.public_key().as_ref());
    let nonce = match fetch_nonce(&stark_key) {
        Ok(nonce) => nonce,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    run_signed_request(key_pair, message, nonce, Some(b"RANDOM MESSAGE"));
}

fn test_4(message: &[u8]) {
    let key_pair = match generate_keypair() {
        Ok(key_pair) => key_pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    println!("\n---- Case 4: Valid Request After Nonce Expiration (Should Fail) ----");
    let stark_key = hex_key(key_pair.public_key().as_ref());
    let nonce = match fetch_nonce(&stark_key) {
        Ok(nonce) => nonce,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    thread::sleep(time::Duration::from_secs(6));
    run_signed_request(key_pair, message, nonce, None);
}

fn run_signed_request(
    key_pair: Ed25519KeyPair,
    message: &[u8],
    nonce: u64,
    wrong_message: Option<&[u8]>,
) {
    let message_to_sign = wrong_message.unwrap_or(message);

    println!("  2. Signing Nonce and Message...");
    let sig = key_pair.sign(&signing_bytes(nonce, message_to_sign));
    println!("  3. Building Signed Request...");
    let request = build_request(key_pair, message, sig, nonce);

    println!("  4. Submitting Request...");
    match submit_request(request) {
        Ok(_) => println!("Request verified successfully!"),
        Err(e) => eprintln!("Error: {}", e),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // The replay demo depends on both parses of one pkcs8 document
    // presenting the same stark key to the server
    #[test]
    fn same_pkcs8_document_yields_same_stark_key() {
        let rng = rand::SystemRandom::new();
        let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        let first = Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref()).unwrap();
        let second = Ed25519KeyPair::from_pkcs8(pkcs8_bytes.as_ref()).unwrap();
        assert_eq!(
            hex_key(first.public_key().as_ref()),
            hex_key(second.public_key().as_ref())
        );
    }
}

mod types {
    include!("../types.rs");
}

use rocket::http::Status;
use rocket::response::status;
use types::{GetNonceMessage, GetNonceResponse, SignedRequest, hex_key, signing_bytes};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ring::signature;

#[macro_use]
extern crate rocket;

struct NonceEntry {
    nonce: u64,
    issued_at: Instant,
    consumed: bool,
}

struct NonceStore {
    entries: HashMap<String, NonceEntry>, // stark_key -> latest issued nonce
    expiration_time: Duration,
}

impl NonceStore {
    fn new(expiration_time: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiration_time,
        }
    }

    // Per-key monotonic counter; issuing again invalidates the previous nonce
    fn issue_nonce(&mut self, stark_key: &str) -> u64 {
        let next = self
            .entries
            .get(stark_key)
            .map(|entry| entry.nonce + 1)
            .unwrap_or(0);
        self.entries.insert(
            stark_key.to_string(),
            NonceEntry {
                nonce: next,
                issued_at: Instant::now(),
                consumed: false,
            },
        );
        next
    }

    fn verify_and_consume(&mut self, stark_key: &str, nonce: u64) -> bool {
        if let Some(entry) = self.entries.get_mut(stark_key) {
            // Only the latest issued nonce for this key is acceptable
            if entry.nonce != nonce || entry.consumed {
                return false;
            }

            // Entry stays in the map so the counter keeps advancing
            if entry.issued_at.elapsed() > self.expiration_time {
                entry.consumed = true;
                return false;
            }

            entry.consumed = true;
            return true;
        }
        false
    }
}

type NonceStoreRef = rocket::State<Arc<Mutex<NonceStore>>>;

// Parse the request body and issue a nonce bound to its stark key
fn nonce_envelope(body: &str, store: &mut NonceStore) -> GetNonceResponse {
    match serde_json::from_str::<GetNonceMessage>(body) {
        Ok(message) if message.stark_key.is_empty() => {
            GetNonceResponse::error("stark_key is required".to_string())
        }
        Ok(message) => GetNonceResponse::ok(store.issue_nonce(&message.stark_key)),
        Err(e) => GetNonceResponse::error(format!("Failed to parse nonce request: {}", e)),
    }
}

#[post("/v1/nonce", format = "json", data = "<body>")]
fn nonce(body: String, store: &NonceStoreRef) -> String {
    let mut store = store.lock().unwrap();
    serde_json::to_string(&nonce_envelope(&body, &mut store)).unwrap()
}

#[post("/v1/verify", format = "json", data = "<request>")]
fn verify_request(request: String, store: &NonceStoreRef) -> status::Custom<String> {
    let request: SignedRequest = match serde_json::from_str(&request) {
        Ok(request) => request,
        Err(e) => {
            return status::Custom(
                Status::BadRequest,
                format!("Failed to parse request: {}", e),
            );
        }
    };

    // The claimed stark key must be the hex form of the embedded public key
    if request.stark_key != hex_key(&request.public_key) {
        return status::Custom(
            Status::Unauthorized,
            "Stark key does not match public key".to_string(),
        );
    }

    let mut store = store.lock().unwrap();
    if !store.verify_and_consume(&request.stark_key, request.nonce) {
        return status::Custom(Status::Unauthorized, "Invalid or expired nonce".to_string());
    }

    let holder_public_key =
        signature::UnparsedPublicKey::new(&signature::ED25519, request.public_key.as_slice());

    // The signature covers the nonce and the message together
    let signed = signing_bytes(request.nonce, &request.message);
    if holder_public_key
        .verify(&signed, request.signature.as_slice())
        .is_ok()
    {
        return status::Custom(Status::Ok, "Request verified successfully".to_string());
    }

    status::Custom(Status::Unauthorized, "Invalid Signature".to_string())
}

#[launch]
fn rocket() -> _ {
    // 5 seconds expiration time - just to make it easier to test
    let nonce_store = NonceStore::new(Duration::from_secs(5));

    rocket::build()
        .configure(rocket::Config {
            port: 1843,
            ..Default::default()
        })
        .manage(Arc::new(Mutex::new(nonce_store)))
        .mount("/", routes![nonce, verify_request])
}

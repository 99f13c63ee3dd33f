//! Development helper: builds a fake (but correctly signed) node
//! registration and prints the URL that submits it to a running portal.
//!
//! ```
//! fake-reg SEED WALLETADDR [CONTRACTADDR] URL
//! ```
//!
//! The same SEED always produces the same keys, so a registration can be
//! re-submitted or replaced deterministically. WALLETADDR (and the
//! optional CONTRACTADDR) accept the literal `RANDOM` to invent one.

use std::env;
use std::process::exit;

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use portal_common::eth;

fn usage(err: Option<&str>) -> ! {
    if let Some(err) = err {
        eprintln!("{err}\n");
    }
    eprintln!(
        "Usage: fake-reg SEED WALLETADDR [CONTRACTADDR] URL\n\
         \n\
         Create a fake node registration signature operated by WALLETADDR and\n\
         print the URL that submits it to a staking portal.\n\
         \n\
         SEED         a number; the same seed produces the same keys\n\
         WALLETADDR   the operator address, or RANDOM\n\
         CONTRACTADDR multi-contributor contract address, or RANDOM; omit for solo\n\
         URL          portal base URL, e.g. http://127.0.0.1:8080/"
    );
    exit(1)
}

fn parse_addr_arg(arg: &str, rng: &mut StdRng) -> Option<[u8; 20]> {
    if arg == "RANDOM" {
        let mut addr = [0u8; 20];
        rng.fill(&mut addr);
        return Some(addr);
    }
    eth::parse_address(arg).ok()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if !(4..=5).contains(&args.len()) {
        usage(None);
    }

    let seed: u64 = match args[1].parse() {
        Ok(s) => s,
        Err(_) => usage(Some("Invalid SEED")),
    };
    let mut rng = StdRng::seed_from_u64(seed);

    // keys first so RANDOM addresses do not shift with the argument shape
    let mut sk_seed = [0u8; 32];
    rng.fill(&mut sk_seed);
    let mut pubkey_bls = [0u8; 64];
    rng.fill(&mut pubkey_bls);
    let mut sig_bls = [0u8; 128];
    rng.fill(&mut sig_bls[..]);

    let Some(operator) = parse_addr_arg(&args[2], &mut rng) else {
        usage(Some("That doesn't look like an operator wallet address"));
    };

    let (contract, url_arg) = if args.len() == 5 {
        match parse_addr_arg(&args[3], &mut rng) {
            Some(addr) => (Some(addr), &args[4]),
            None => usage(Some("That doesn't look like a contract address")),
        }
    } else {
        (None, &args[3])
    };

    if !url_arg.starts_with("http://") && !url_arg.starts_with("https://") {
        usage(Some("That doesn't look like a URL"));
    }
    let mut url = url_arg.clone();
    if !url.ends_with('/') {
        url.push('/');
    }

    let signing_key = SigningKey::from_bytes(&sk_seed);
    let pubkey_ed25519 = signing_key.verifying_key().to_bytes();

    let mut message = Vec::with_capacity(32 + 64);
    message.extend_from_slice(&pubkey_ed25519);
    message.extend_from_slice(&pubkey_bls);
    let sig_ed25519 = signing_key.sign(&message).to_bytes();

    let contract_param = contract
        .map(|c| format!("&contract={}", eth::to_checksum(&c)))
        .unwrap_or_default();

    println!(
        "{url}store/{}?pubkey_bls={}&sig_ed25519={}&sig_bls={}&operator={}{contract_param}",
        hex::encode(pubkey_ed25519),
        hex::encode(pubkey_bls),
        hex::encode(sig_ed25519),
        hex::encode(sig_bls),
        eth::to_checksum(&operator),
    );
}

//! Demo loader
//!
//! Tries to load the library named on the command line, first from the
//! system search path and then from the embedded bundle. Run with
//! RUST_LOG=debug to watch which path the loader takes.

use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "geocoder".to_string());

    println!("[Demo] Loading library: {}", name);

    match nativestage::load_or_fail(&name) {
        Ok(()) => println!("[Demo] Loaded {} into the process", name),
        Err(e) => {
            eprintln!("[Demo] Failed to load: {}", e);
            std::process::exit(1);
        }
    }
}

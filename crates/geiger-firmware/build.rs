//! Bakes the WiFi credentials from `.env` into the firmware and sets up
//! the esp-hal linker script.

const CREDENTIAL_VARS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for var in CREDENTIAL_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // A missing .env is fine: the device then runs offline
    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=No .env loaded ({e}), WiFi credentials left empty");
    }

    for var in CREDENTIAL_VARS {
        let value = std::env::var(var).unwrap_or_default();
        println!("cargo:rustc-env={var}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
